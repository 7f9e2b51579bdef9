//! wex entrypoint: runs vi command scripts against a file.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, load_from};
use core_macros::Macros;
use core_surface::{SurfaceRef, SurfaceSet, TextSurface, into_ref};
use core_vi::Vi;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

mod script;

use script::{ShellRunner, StderrStatus, TerminalDialog, read_script, run_scripts};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "wex", version, about = "vi command and macro engine")]
struct Args {
    /// File to edit. Without one an empty surface is used.
    pub path: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `wex.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Macro registry document (overrides `macros.file`).
    #[arg(long = "macros")]
    pub macros: Option<PathBuf>,
    /// Command to run, in `<Esc>`/`<CR>` key notation. Repeatable.
    #[arg(short = 'c', long = "command")]
    pub commands: Vec<String>,
    /// File with one command per line.
    #[arg(long = "script")]
    pub script: Option<PathBuf>,
    /// Open the surface readonly.
    #[arg(long)]
    pub readonly: bool,
    /// Write the result back to `path` instead of printing it.
    #[arg(long)]
    pub write: bool,
    /// Suppress status messages on stderr.
    #[arg(short, long)]
    pub quiet: bool,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("wex.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "wex.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn open_surface(path: Option<&Path>, readonly: bool) -> Result<(String, SurfaceRef)> {
    let (name, content) = match path {
        Some(path) => {
            let content = if path.exists() {
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?
            } else {
                String::new()
            };
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("file")
                .to_string();
            tracing::debug!(target: "io", file = %path.display(), size_bytes = content.len(), "file_read_ok");
            (name, content)
        }
        None => ("untitled".to_string(), String::new()),
    };
    let surface = into_ref(TextSurface::new(name.clone(), &content)?);
    if readonly {
        surface.borrow_mut().set_readonly(true);
    }
    Ok((name, surface))
}

fn load_macros(args: &Args, config: &Config) -> Result<Rc<RefCell<Macros>>> {
    let path = args
        .macros
        .clone()
        .unwrap_or_else(|| config.macros().resolved_file());
    Ok(Rc::new(RefCell::new(Macros::load_document(&path)?)))
}

fn run(args: Args) -> Result<()> {
    let config = load_from(args.config.clone())?;
    let macros = load_macros(&args, &config)?;
    let (name, surface) = open_surface(args.path.as_deref(), args.readonly)?;

    let workspace = Rc::new(RefCell::new(SurfaceSet::new()));
    workspace.borrow_mut().insert(name.clone(), surface.clone());

    let mut vi = Vi::new(Some(surface.clone()), macros.clone(), &config)
        .with_dialog(Box::new(TerminalDialog))
        .with_status(Box::new(StderrStatus { quiet: args.quiet }))
        .with_workspace(Box::new(workspace.clone()))
        .with_process(Box::new(ShellRunner));

    let mut scripts = args.commands.clone();
    if let Some(path) = &args.script {
        scripts.extend(read_script(path)?);
    }
    let report = run_scripts(&mut vi, &scripts);
    info!(
        target: "runtime",
        surface = name.as_str(),
        commands = report.commands,
        failed = report.failed,
        "run_complete"
    );

    // The scripts may have switched to another surface through `:e`.
    let current = vi.surface().unwrap_or(surface);
    let text = current.borrow().text();
    match (&args.path, args.write) {
        (Some(path), true) => {
            std::fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            info!(target: "io", file = %path.display(), size_bytes = text.len(), "file_written");
        }
        _ => print!("{text}"),
    }

    if macros.borrow_mut().save_document()? {
        info!(target: "runtime", "macros_saved");
    }
    Ok(())
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let result = run(Args::parse());
    if let Err(err) = &result {
        error!(target: "runtime", ?err, "run_failed");
    }
    info!(target: "runtime", "shutdown");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn args_collect_repeated_commands() {
        let args = Args::parse_from(["wex", "file.txt", "-c", "dd", "-c", "ix<Esc>", "--write"]);
        assert_eq!(args.path.as_deref(), Some(Path::new("file.txt")));
        assert_eq!(args.commands, vec!["dd", "ix<Esc>"]);
        assert!(args.write);
        assert!(!args.readonly);
    }

    #[test]
    fn missing_file_opens_empty_and_readonly_sticks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let (name, surface) = open_surface(Some(&path), true).unwrap();
        assert_eq!(name, "new.txt");
        assert_eq!(surface.borrow().text(), "");
        assert!(surface.borrow().is_readonly());
    }
}
