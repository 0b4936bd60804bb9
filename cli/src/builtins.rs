//! Filesystem builtins.
//!
//! Thin wrappers over `std::fs`. Relative paths resolve against the shell's
//! working directory, not the process's.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;

use crate::console::Console;
use crate::shell::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCommand {
    Cat,
    Cd,
    Clear,
    Echo,
    Exit,
    Ls,
    Mkdir,
    Mv,
    Pwd,
    Rm,
    Rmdir,
    Touch,
    Which,
}

impl FileCommand {
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name {
            "cat" => Self::Cat,
            "cd" => Self::Cd,
            "clear" => Self::Clear,
            "echo" => Self::Echo,
            "exit" => Self::Exit,
            "ls" => Self::Ls,
            "mkdir" => Self::Mkdir,
            "mv" => Self::Mv,
            "pwd" => Self::Pwd,
            "rm" => Self::Rm,
            "rmdir" => Self::Rmdir,
            "touch" => Self::Touch,
            "which" => Self::Which,
            _ => return None,
        };
        Some(command)
    }
}

pub fn run(
    command: FileCommand,
    console: &mut dyn Console,
    cwd: &mut PathBuf,
    args: &[String],
) -> Result<Flow> {
    match command {
        FileCommand::Cat => cat(console, cwd, args)?,
        FileCommand::Cd => cd(cwd, args)?,
        FileCommand::Clear => console.clear()?,
        FileCommand::Echo => writeln!(console.stdout(), "{}", args.join(" "))?,
        FileCommand::Exit => return exit(console, args),
        FileCommand::Ls => ls(console, cwd, args)?,
        FileCommand::Mkdir => mkdir(cwd, args)?,
        FileCommand::Mv => mv(cwd, args)?,
        FileCommand::Pwd => writeln!(console.stdout(), "{}", cwd.display())?,
        FileCommand::Rm => rm(cwd, args)?,
        FileCommand::Rmdir => rmdir(cwd, args)?,
        FileCommand::Touch => touch(cwd, args)?,
        FileCommand::Which => which(console, args)?,
    }
    Ok(Flow::Continue)
}

fn resolve(cwd: &Path, arg: &str) -> PathBuf {
    let path = Path::new(arg);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn cat(console: &mut dyn Console, cwd: &Path, args: &[String]) -> Result<()> {
    for arg in args {
        let mut file = fs::File::open(resolve(cwd, arg)).with_context(|| arg.clone())?;
        io::copy(&mut file, console.stdout()).with_context(|| arg.clone())?;
    }
    Ok(())
}

fn cd(cwd: &mut PathBuf, args: &[String]) -> Result<()> {
    let target = match args {
        [] => dirs::home_dir().context("could not determine home directory")?,
        [dir] => resolve(cwd, dir),
        _ => bail!("too many args"),
    };
    let metadata = fs::metadata(&target).with_context(|| target.display().to_string())?;
    if !metadata.is_dir() {
        bail!("{}: not a directory", target.display());
    }
    *cwd = fs::canonicalize(&target).with_context(|| target.display().to_string())?;
    Ok(())
}

fn exit(console: &mut dyn Console, args: &[String]) -> Result<Flow> {
    let Some(raw) = args.first() else {
        return Ok(Flow::Exit(0));
    };
    let code: i32 = raw
        .parse()
        .with_context(|| format!("invalid exit code '{raw}'"))?;
    writeln!(
        console.stderr(),
        "{}",
        format!("Exited with code {code}").red()
    )?;
    Ok(Flow::Exit(code))
}

fn ls(console: &mut dyn Console, cwd: &Path, args: &[String]) -> Result<()> {
    match args {
        [] => print_file_names(console, cwd, "."),
        [dir] => print_file_names(console, cwd, dir),
        dirs => {
            for dir in dirs {
                writeln!(console.stdout(), "{dir}:")?;
                print_file_names(console, cwd, dir)?;
                writeln!(console.stdout())?;
            }
            Ok(())
        }
    }
}

fn print_file_names(console: &mut dyn Console, cwd: &Path, dir: &str) -> Result<()> {
    let mut names = fs::read_dir(resolve(cwd, dir))
        .with_context(|| dir.to_string())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()
        .with_context(|| dir.to_string())?;
    names.sort();

    for name in names {
        writeln!(console.stdout(), "{name}")?;
    }
    Ok(())
}

fn mkdir(cwd: &Path, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("must provide a path to create a directory");
    }
    for dir in args {
        fs::create_dir(resolve(cwd, dir)).with_context(|| dir.clone())?;
    }
    Ok(())
}

fn mv(cwd: &Path, args: &[String]) -> Result<()> {
    let [src, dest] = args else {
        if args.len() < 2 {
            bail!("not enough args");
        }
        bail!("too many args");
    };

    let mut dest = dest.clone();
    if dest.ends_with('/')
        && let Some(base) = Path::new(src).file_name()
    {
        dest.push_str(&base.to_string_lossy());
    }

    fs::rename(resolve(cwd, src), resolve(cwd, &dest))
        .with_context(|| format!("{src} -> {dest}"))?;
    Ok(())
}

fn rm(cwd: &Path, args: &[String]) -> Result<()> {
    let mut recursive = false;
    let mut operands = Vec::new();
    let mut flags_done = false;

    for arg in args {
        if !flags_done && arg == "--" {
            flags_done = true;
        } else if !flags_done && arg.len() > 1 && arg.starts_with('-') {
            for flag in arg[1..].chars() {
                match flag {
                    'r' => recursive = true,
                    other => bail!("unknown flag: -{other}"),
                }
            }
        } else {
            flags_done = true;
            operands.push(arg);
        }
    }

    if operands.is_empty() {
        bail!("not enough args");
    }

    for arg in operands {
        let path = resolve(cwd, arg);
        if recursive {
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    fs::remove_dir_all(&path).with_context(|| arg.clone())?;
                }
                Ok(_) => fs::remove_file(&path).with_context(|| arg.clone())?,
                // Recursive removal of a missing path is not an error.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| arg.clone()),
            }
        } else {
            let meta = fs::metadata(&path).with_context(|| arg.clone())?;
            if meta.is_dir() {
                bail!("{arg}: is a directory");
            }
            fs::remove_file(&path).with_context(|| arg.clone())?;
        }
    }
    Ok(())
}

fn rmdir(cwd: &Path, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("not enough args");
    }
    for arg in args {
        let path = resolve(cwd, arg);
        let meta = fs::metadata(&path).with_context(|| arg.clone())?;
        if !meta.is_dir() {
            bail!("{arg}: not a directory");
        }
        fs::remove_dir(&path).with_context(|| arg.clone())?;
    }
    Ok(())
}

fn touch(cwd: &Path, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("not enough args");
    }
    for arg in args {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(resolve(cwd, arg))
        {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e).with_context(|| arg.clone()),
        }
    }
    Ok(())
}

fn which(console: &mut dyn Console, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("not enough args");
    }
    for arg in args {
        let path = which::which(arg).with_context(|| arg.clone())?;
        writeln!(console.stdout(), "{}", path.display())?;
    }
    Ok(())
}
