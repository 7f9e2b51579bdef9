//! Script driver and terminal collaborators for the command line front end.
//!
//! A script is a list of commands. Each entry is decoded from angle-bracket
//! key notation (`<Esc>`, `<CR>`, `<BS>`, `<C-v>`, `<lt>`) and handed to
//! [`Vi::command`].

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use core_surface::{Dialog, ProcessRunner, StatusSink};
use core_vi::Vi;
use tracing::{debug, info, warn};

/// Decode `<Name>` key notation into raw key characters. Unknown names are
/// kept literally.
pub fn decode_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('>') else {
            out.push_str(tail);
            return out;
        };
        let name = &tail[1..close];
        match key_by_name(name) {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

fn key_by_name(name: &str) -> Option<char> {
    Some(match name.to_ascii_lowercase().as_str() {
        "esc" => '\u{1b}',
        "cr" | "enter" | "return" => '\r',
        "bs" | "backspace" => '\u{8}',
        "del" => '\u{7f}',
        "c-v" => '\u{16}',
        "tab" => '\t',
        "space" => ' ',
        "lt" => '<',
        _ => return None,
    })
}

/// Script lines from a file; blank lines and lines starting with `#` are
/// skipped.
pub fn read_script(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Outcome counts of a script run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptReport {
    pub commands: usize,
    pub failed: usize,
}

/// Feed every entry through the engine. A failing command does not stop the
/// run.
pub fn run_scripts(vi: &mut Vi, scripts: &[String]) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (idx, entry) in scripts.iter().enumerate() {
        let keys = decode_keys(entry);
        let handled = vi.command(&keys);
        report.commands += 1;
        if !handled {
            report.failed += 1;
        }
        debug!(target: "runtime.script", idx, entry = %entry, handled, mode = ?vi.mode(), "script_command");
    }
    vi.escape();
    info!(target: "runtime.script", commands = report.commands, failed = report.failed, "script_done");
    report
}

/// Status messages go to stderr, prefixed by their pane.
pub struct StderrStatus {
    pub quiet: bool,
}

impl StatusSink for StderrStatus {
    fn set_status(&mut self, text: &str, pane: &str) {
        debug!(target: "ui.status", pane, text, "status");
        if !self.quiet && !text.is_empty() {
            eprintln!("[{pane}] {text}");
        }
    }
}

/// Prompts on stderr, answers read from stdin. End of input cancels.
pub struct TerminalDialog;

impl TerminalDialog {
    fn read_answer(prompt: &str) -> Option<String> {
        eprint!("{prompt}: ");
        io::stderr().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = line.trim_end_matches(['\r', '\n']).to_string();
                (!answer.is_empty()).then_some(answer)
            }
        }
    }
}

impl Dialog for TerminalDialog {
    fn prompt_choice(&mut self, title: &str, choices: &[String]) -> Option<String> {
        for (idx, choice) in choices.iter().enumerate() {
            eprintln!("{:>3} {choice}", idx + 1);
        }
        let answer = Self::read_answer(title)?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=choices.len()).contains(&n) => Some(choices[n - 1].clone()),
            _ => choices.iter().find(|c| **c == answer).cloned(),
        }
    }

    fn prompt_text(&mut self, title: &str, default: &str) -> Option<String> {
        let prompt = if default.is_empty() {
            title.to_string()
        } else {
            format!("{title} [{default}]")
        };
        Self::read_answer(&prompt).or_else(|| (!default.is_empty()).then(|| default.to_string()))
    }
}

/// Runs `!cmd` through `sh -c`.
pub struct ShellRunner;

impl ProcessRunner for ShellRunner {
    fn run(&mut self, command: &str, input: Option<&str>) -> Result<String> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning {command}"))?;
        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(target: "runtime.exec", command, status = %output.status, "exec_nonzero");
            bail!("{}: {}", output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Config;
    use core_macros::Macros;
    use core_surface::{TextSurface, into_ref};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn key_notation() {
        assert_eq!(decode_keys("ihello<Esc>"), "ihello\u{1b}");
        assert_eq!(decode_keys(":3<CR>"), ":3\r");
        assert_eq!(decode_keys("<C-v>jI-<esc>"), "\u{16}jI-\u{1b}");
        assert_eq!(decode_keys("a<lt>b<Nope>"), "a<b<Nope>");
        assert_eq!(decode_keys("x < y"), "x < y");
    }

    #[test]
    fn script_file_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# setup\nqa\n\ndd\nq").unwrap();
        assert_eq!(read_script(file.path()).unwrap(), vec!["qa", "dd", "q"]);
    }

    #[test]
    fn scripts_drive_the_engine() {
        let surface = into_ref(TextSurface::new("t", "one\ntwo\nthree").unwrap());
        let macros = Rc::new(RefCell::new(Macros::new()));
        let mut vi = Vi::new(Some(surface.clone()), macros.clone(), &Config::default())
            .with_status(Box::new(StderrStatus { quiet: true }));
        let scripts: Vec<String> = ["qa", "dd", "q", "@a", ":%s/e/E/g", "ix<Esc>"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = run_scripts(&mut vi, &scripts);
        assert_eq!(report.commands, 6);
        assert_eq!(report.failed, 0);
        assert_eq!(surface.borrow().text(), "xthrEE");
        assert_eq!(macros.borrow().get("a"), Some("dd"));
    }

    #[test]
    fn shell_runner_reports_failures() {
        let mut runner = ShellRunner;
        assert_eq!(runner.run("printf hi", None).unwrap(), "hi");
        assert_eq!(runner.run("cat", Some("piped")).unwrap(), "piped");
        assert!(runner.run("exit 3", None).is_err());
    }
}
