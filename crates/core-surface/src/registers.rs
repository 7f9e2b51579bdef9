//! Yank registers.
//!
//! - `"` (unnamed) mirrors the latest payload written to any register.
//! - `a`..`z` named registers; writing `A`..`Z` appends to the lowercase one.
//! - `0`..`9` numbered ring; `0` holds the latest write through
//!   [`Registers::push_numbered`], older entries shift up and the oldest drops.
//! - Any other character is rejected.

use tracing::trace;

pub const UNNAMED_REGISTER: char = '"';
const NUMBERED_CAP: usize = 10;

#[derive(Debug, Default, Clone)]
pub struct Registers {
    unnamed: String,
    numbered: Vec<String>, // newest at index 0, length <= 10
    named: [String; 26],
}

impl Registers {
    pub fn get(&self, name: char) -> Option<&str> {
        match name {
            UNNAMED_REGISTER => Some(self.unnamed.as_str()),
            'a'..='z' | 'A'..='Z' => {
                let idx = (name.to_ascii_lowercase() as u8 - b'a') as usize;
                Some(self.named[idx].as_str())
            }
            '0'..='9' => {
                let idx = (name as u8 - b'0') as usize;
                self.numbered.get(idx).map(String::as_str)
            }
            _ => None,
        }
    }

    /// Write `text` into `name`. Returns false for unknown register names.
    pub fn set(&mut self, name: char, text: &str) -> bool {
        match name {
            UNNAMED_REGISTER => {
                self.push_numbered(text);
            }
            'a'..='z' => {
                let idx = (name as u8 - b'a') as usize;
                self.named[idx] = text.to_string();
            }
            'A'..='Z' => {
                let idx = (name.to_ascii_lowercase() as u8 - b'a') as usize;
                self.named[idx].push_str(text);
            }
            '0'..='9' => {
                let idx = (name as u8 - b'0') as usize;
                while self.numbered.len() <= idx {
                    self.numbered.push(String::new());
                }
                self.numbered[idx] = text.to_string();
            }
            _ => return false,
        }
        self.unnamed = text.to_string();
        trace!(target: "surface.register", register = %name, len = text.len(), "register_write");
        true
    }

    fn push_numbered(&mut self, text: &str) {
        self.numbered.insert(0, text.to_string());
        self.numbered.truncate(NUMBERED_CAP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_write_mirrors_unnamed() {
        let mut r = Registers::default();
        assert!(r.set('a', "alpha"));
        assert_eq!(r.get('a'), Some("alpha"));
        assert_eq!(r.get('"'), Some("alpha"));
    }

    #[test]
    fn uppercase_appends() {
        let mut r = Registers::default();
        r.set('b', "one");
        r.set('B', "two");
        assert_eq!(r.get('b'), Some("onetwo"));
    }

    #[test]
    fn unnamed_rotates_numbered_ring() {
        let mut r = Registers::default();
        for i in 0..12 {
            r.set('"', &i.to_string());
        }
        assert_eq!(r.get('0'), Some("11"));
        assert_eq!(r.get('9'), Some("2"));
    }

    #[test]
    fn unknown_register_rejected() {
        let mut r = Registers::default();
        assert!(!r.set('%', "x"));
        assert_eq!(r.get('%'), None);
    }
}
