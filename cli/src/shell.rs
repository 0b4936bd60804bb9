//! Command dispatch.
//!
//! Every command runs inside the boundary guard: a panicking builtin prints
//! an error and the shell keeps going.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use hostbridge_core::{RequestBridge, guard, guard_async};
use hostbridge_types::HostValue;

use crate::builtins::{self, FileCommand};
use crate::console::Console;
use crate::store::ScratchStore;

/// What the read loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreCommand {
    Get,
    Put,
    Del,
}

impl StoreCommand {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "get" => Some(Self::Get),
            "put" => Some(Self::Put),
            "del" => Some(Self::Del),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    File(FileCommand),
    Store(StoreCommand),
}

impl Command {
    fn from_name(name: &str) -> Option<Self> {
        FileCommand::from_name(name)
            .map(Self::File)
            .or_else(|| StoreCommand::from_name(name).map(Self::Store))
    }
}

pub struct Shell<C: Console> {
    console: C,
    cwd: PathBuf,
    bridge: RequestBridge,
    store: ScratchStore,
}

impl<C: Console> Shell<C> {
    pub fn new(console: C, cwd: PathBuf, bridge: RequestBridge, store: ScratchStore) -> Self {
        Self {
            console,
            cwd,
            bridge,
            store,
        }
    }

    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Run one input line. Errors are reported on stderr, never returned.
    pub async fn execute(&mut self, line: &str) -> Flow {
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some((name, args)) = words.split_first() else {
            return Flow::Continue;
        };

        match self.run(name, args).await {
            Ok(flow) => flow,
            Err(e) => {
                tracing::debug!(command = %name, "Command failed: {e:#}");
                if let Err(io_err) = writeln!(self.console.stderr(), "{name}: {e:#}") {
                    tracing::warn!("Failed to write to stderr: {io_err}");
                }
                Flow::Continue
            }
        }
    }

    async fn run(&mut self, name: &str, args: &[String]) -> Result<Flow> {
        let Some(command) = Command::from_name(name) else {
            bail!("command not found");
        };

        match command {
            Command::File(command) => {
                let console: &mut dyn Console = &mut self.console;
                let cwd = &mut self.cwd;
                guard(|| builtins::run(command, console, cwd, args))
            }
            Command::Store(command) => guard_async(self.run_store(command, args)).await,
        }
    }

    async fn run_store(&mut self, command: StoreCommand, args: &[String]) -> Result<Flow> {
        match command {
            StoreCommand::Get => {
                let [key] = args else {
                    bail!("usage: get KEY");
                };
                let value = self.bridge.submit(self.store.get(key)).wait().await?;
                match value {
                    HostValue::String(text) => writeln!(self.console.stdout(), "{text}")?,
                    other => writeln!(self.console.stdout(), "{other}")?,
                }
            }
            StoreCommand::Put => {
                let Some((key, words)) = args.split_first() else {
                    bail!("usage: put KEY VALUE...");
                };
                if words.is_empty() {
                    bail!("usage: put KEY VALUE...");
                }
                let value = HostValue::String(words.join(" "));
                self.bridge.submit(self.store.put(key, value)).wait().await?;
            }
            StoreCommand::Del => {
                if args.is_empty() {
                    bail!("usage: del KEY...");
                }
                for key in args {
                    self.bridge.submit(self.store.delete(key)).wait().await?;
                }
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use hostbridge_types::StoreSettings;
    use std::fs;
    use tokio::runtime::Handle;

    fn shell_in(dir: &Path) -> Shell<BufferConsole> {
        let bridge = RequestBridge::new().unwrap();
        let store = ScratchStore::new(StoreSettings::default(), Handle::current());
        Shell::new(
            BufferConsole::default(),
            fs::canonicalize(dir).unwrap(),
            bridge,
            store,
        )
    }

    fn take_out(shell: &mut Shell<BufferConsole>) -> String {
        let text = shell.console_mut().out_text();
        shell.console_mut().out.clear();
        text
    }

    fn take_err(shell: &mut Shell<BufferConsole>) -> String {
        let text = shell.console_mut().err_text();
        shell.console_mut().err.clear();
        text
    }

    #[tokio::test]
    async fn echo_joins_args() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        assert_eq!(shell.execute("echo hello   world").await, Flow::Continue);
        assert_eq!(take_out(&mut shell), "hello world\n");
    }

    #[tokio::test]
    async fn blank_line_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        assert_eq!(shell.execute("   ").await, Flow::Continue);
        assert!(take_out(&mut shell).is_empty());
        assert!(take_err(&mut shell).is_empty());
    }

    #[tokio::test]
    async fn unknown_command_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        assert_eq!(shell.execute("frobnicate").await, Flow::Continue);
        assert_eq!(take_err(&mut shell), "frobnicate: command not found\n");
    }

    #[tokio::test]
    async fn touch_ls_cat_mv_rm() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());

        shell.execute("touch b.txt a.txt").await;
        shell.execute("ls").await;
        assert_eq!(take_out(&mut shell), "a.txt\nb.txt\n");

        fs::write(dir.path().join("a.txt"), "contents").unwrap();
        shell.execute("touch a.txt").await;
        shell.execute("cat a.txt").await;
        assert_eq!(take_out(&mut shell), "contents");

        shell.execute("mkdir sub").await;
        shell.execute("mv a.txt sub/").await;
        assert!(dir.path().join("sub").join("a.txt").exists());
        assert!(!dir.path().join("a.txt").exists());

        shell.execute("rm b.txt").await;
        assert!(!dir.path().join("b.txt").exists());
        assert!(take_err(&mut shell).is_empty());
    }

    #[tokio::test]
    async fn ls_multiple_dirs_prints_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("x")).unwrap();
        fs::create_dir(dir.path().join("y")).unwrap();
        fs::write(dir.path().join("x").join("one"), "").unwrap();

        let mut shell = shell_in(dir.path());
        shell.execute("ls x y").await;
        assert_eq!(take_out(&mut shell), "x:\none\n\ny:\n\n");
    }

    #[tokio::test]
    async fn rm_refuses_directories_without_r() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tree").join("leaf")).unwrap();
        let mut shell = shell_in(dir.path());

        shell.execute("rm tree").await;
        assert!(take_err(&mut shell).contains("is a directory"));
        assert!(dir.path().join("tree").exists());

        shell.execute("rm -r tree").await;
        assert!(!dir.path().join("tree").exists());

        shell.execute("rm -r already-gone").await;
        assert!(take_err(&mut shell).is_empty());

        shell.execute("rm -x tree").await;
        assert!(take_err(&mut shell).contains("unknown flag: -x"));
    }

    #[tokio::test]
    async fn rmdir_refuses_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file"), "").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let mut shell = shell_in(dir.path());

        shell.execute("rmdir file").await;
        assert!(take_err(&mut shell).contains("not a directory"));

        shell.execute("rmdir empty").await;
        assert!(!dir.path().join("empty").exists());
    }

    #[tokio::test]
    async fn cd_and_pwd_track_shell_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("inner")).unwrap();
        let mut shell = shell_in(dir.path());

        shell.execute("cd inner").await;
        shell.execute("pwd").await;
        let expected = fs::canonicalize(dir.path().join("inner")).unwrap();
        assert_eq!(take_out(&mut shell), format!("{}\n", expected.display()));
        assert_eq!(shell.cwd(), expected.as_path());

        shell.execute("cd missing").await;
        assert!(!take_err(&mut shell).is_empty());
        assert_eq!(shell.cwd(), expected.as_path());

        shell.execute("cd a b").await;
        assert!(take_err(&mut shell).contains("too many args"));
    }

    #[tokio::test]
    async fn mv_argument_count_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        shell.execute("mv only").await;
        assert!(take_err(&mut shell).contains("not enough args"));
        shell.execute("mv a b c").await;
        assert!(take_err(&mut shell).contains("too many args"));
    }

    #[tokio::test]
    async fn exit_returns_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());

        assert_eq!(shell.execute("exit").await, Flow::Exit(0));
        assert!(take_err(&mut shell).is_empty());

        assert_eq!(shell.execute("exit 3").await, Flow::Exit(3));
        assert!(take_err(&mut shell).contains("Exited with code 3"));

        assert_eq!(shell.execute("exit nope").await, Flow::Continue);
        assert!(take_err(&mut shell).contains("invalid exit code"));
    }

    #[tokio::test]
    async fn clear_uses_console() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        shell.execute("clear").await;
        assert_eq!(shell.console_mut().clears, 1);
    }

    #[tokio::test]
    async fn store_commands_go_through_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());

        shell.execute("put greeting hello there").await;
        shell.execute("get greeting").await;
        assert_eq!(take_out(&mut shell), "hello there\n");

        shell.execute("del greeting").await;
        shell.execute("get greeting").await;
        let err = take_err(&mut shell);
        assert!(err.starts_with("get: NotFoundError"), "got {err:?}");

        shell.execute("put lonely").await;
        assert!(take_err(&mut shell).contains("usage: put"));
    }
}
