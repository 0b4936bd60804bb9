//! hostbridge - interactive shell over the host request bridge.
//!
//! ```text
//! main() -> load config -> init_tracing() -> Shell::new(...)
//!                                               |
//!                                               v
//!                        read line -> Shell::execute -> Flow::Continue | Exit
//! ```
//!
//! The runtime is single-threaded. Store requests complete on later turns of
//! the same carrier, so every `wait` in the shell yields before it blocks.
//!
//! With arguments, the arguments are run as one command line and the process
//! exits; without, commands are read from stdin until EOF or `exit`.

mod builtins;
mod console;
mod shell;
mod store;

use std::{
    env,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use hostbridge_config::{HostbridgeConfig, Settings};
use hostbridge_core::RequestBridge;

use crate::console::TerminalConsole;
use crate::shell::{Flow, Shell};
use crate::store::ScratchStore;

const LOG_FILE: &str = "hostbridge.log";

/// Log to a file or not at all; the terminal belongs to the shell.
fn init_tracing(config_filter: Option<&str>) {
    let mut failures = Vec::new();
    let Some((path, file)) = open_log_file(log_dirs(), &mut failures) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    tracing::info!(path = %path.display(), "Logging initialized");
    for failure in failures {
        tracing::warn!("{failure}");
    }
}

/// `~/.hostbridge`, then `./.hostbridge`.
fn log_dirs() -> Vec<PathBuf> {
    let home = HostbridgeConfig::path().and_then(|config| config.parent().map(Path::to_path_buf));
    home.into_iter().chain([PathBuf::from(".hostbridge")]).collect()
}

/// Append to `logs/hostbridge.log` under the first directory that accepts it.
fn open_log_file(dirs: Vec<PathBuf>, failures: &mut Vec<String>) -> Option<(PathBuf, File)> {
    for dir in dirs {
        let logs = dir.join("logs");
        let path = logs.join(LOG_FILE);
        let opened = fs::create_dir_all(&logs)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));
        match opened {
            Ok(file) => return Some((path, file)),
            Err(e) => failures.push(format!("Cannot log to {}: {e}", path.display())),
        }
    }
    None
}

/// A broken config file should not keep the shell from starting.
fn load_settings() -> (Settings, Option<String>) {
    let resolved = HostbridgeConfig::load()
        .and_then(|config| config.unwrap_or_default().resolve());
    match resolved {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(format!("{e}; using defaults"))),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (settings, config_warning) = load_settings();
    init_tracing(settings.log_filter.as_deref());
    if let Some(warning) = config_warning {
        tracing::warn!("{warning}");
        eprintln!("hostbridge: {warning}");
    }

    let bridge = RequestBridge::new()?.with_settings(settings.bridge);
    let store = ScratchStore::new(settings.store, Handle::current());
    let cwd = env::current_dir().context("reading current directory")?;
    let mut shell = Shell::new(TerminalConsole::new(), cwd, bridge, store);

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        let code = match shell.execute(&args.join(" ")).await {
            Flow::Continue => 0,
            Flow::Exit(code) => code,
        };
        std::process::exit(code);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        {
            let mut stdout = std::io::stdout();
            write!(stdout, "{}", settings.shell.prompt())?;
            stdout.flush()?;
        }

        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            break;
        };
        if let Flow::Exit(code) = shell.execute(&line).await {
            tracing::info!(code, "Shell exiting");
            std::process::exit(code);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_falls_back_to_next_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocked = tmp.path().join("blocked");
        fs::write(&blocked, "not a directory").unwrap();
        let usable = tmp.path().join("usable");

        let mut failures = Vec::new();
        let (path, _file) = open_log_file(vec![blocked, usable.clone()], &mut failures).unwrap();

        assert_eq!(path, usable.join("logs").join(LOG_FILE));
        assert!(path.exists());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("Cannot log to"));
    }

    #[test]
    fn no_usable_dir_means_no_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocked = tmp.path().join("blocked");
        fs::write(&blocked, "").unwrap();

        let mut failures = Vec::new();
        assert!(open_log_file(vec![blocked], &mut failures).is_none());
        assert_eq!(failures.len(), 1);
    }
}
