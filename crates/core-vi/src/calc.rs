//! `=` calculator: decimal numbers, `+ - * / %`, parentheses and unary minus.

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected {1:?} at {0}")]
    Unexpected(usize, char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("division by zero")]
    DivisionByZero,
}

struct Calc<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Calc<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    fn skip_blanks(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_blanks();
        self.chars.peek().map(|&(_, c)| c)
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.chars.next();
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.chars.next();
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some('-') => {
                self.chars.next();
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.chars.next();
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            None => Err(CalcError::UnexpectedEnd),
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                match self.peek() {
                    Some(')') => {
                        self.chars.next();
                        Ok(value)
                    }
                    Some(c) => Err(self.unexpected(c)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(self.unexpected(c)),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let Some(&(start, first)) = self.chars.peek() else {
            return Err(CalcError::UnexpectedEnd);
        };
        let mut end = start;
        while let Some((idx, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit() || *c == '.') {
            end = idx + c.len_utf8();
        }
        self.src[start..end]
            .parse()
            .map_err(|_| CalcError::Unexpected(start, first))
    }

    fn unexpected(&mut self, c: char) -> CalcError {
        let at = self.chars.peek().map(|&(idx, _)| idx).unwrap_or(self.src.len());
        CalcError::Unexpected(at, c)
    }
}

/// Evaluate `expr`.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let mut calc = Calc::new(expr);
    if calc.peek().is_none() {
        return Err(CalcError::Empty);
    }
    let value = calc.expr()?;
    match calc.peek() {
        None => Ok(value),
        Some(c) => Err(calc.unexpected(c)),
    }
}

/// Integral results print without a fraction.
pub fn format(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(evaluate("-(4 - 6) % 3").unwrap(), 2.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
    }

    #[test]
    fn errors() {
        assert_eq!(evaluate("  "), Err(CalcError::Empty));
        assert_eq!(evaluate("1 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("2 x"), Err(CalcError::Unexpected(2, 'x')));
        assert_eq!(evaluate("(1"), Err(CalcError::UnexpectedEnd));
        assert!(evaluate("1..2").is_err());
    }

    #[test]
    fn formatting() {
        assert_eq!(format(4.0), "4");
        assert_eq!(format(-3.0), "-3");
        assert_eq!(format(3.5), "3.5");
    }
}
