//! Output streams the shell writes to.

use std::io::{self, Stderr, Stdout, Write};

use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};

pub trait Console {
    fn stdout(&mut self) -> &mut dyn Write;
    fn stderr(&mut self) -> &mut dyn Write;
    fn clear(&mut self) -> io::Result<()>;
}

/// The process's real stdout/stderr.
pub struct TerminalConsole {
    stdout: Stdout,
    stderr: Stderr,
}

impl TerminalConsole {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            stderr: io::stderr(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn stderr(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }

    fn clear(&mut self) -> io::Result<()> {
        execute!(
            self.stdout,
            Clear(ClearType::Purge),
            Clear(ClearType::All),
            MoveTo(0, 0)
        )
    }
}

/// Captures output in memory.
#[cfg(test)]
#[derive(Default)]
pub struct BufferConsole {
    pub out: Vec<u8>,
    pub err: Vec<u8>,
    pub clears: usize,
}

#[cfg(test)]
impl BufferConsole {
    pub fn out_text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn err_text(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }
}

#[cfg(test)]
impl Console for BufferConsole {
    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn stderr(&mut self) -> &mut dyn Write {
        &mut self.err
    }

    fn clear(&mut self) -> io::Result<()> {
        self.clears += 1;
        Ok(())
    }
}
