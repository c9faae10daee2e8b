//! Thin helpers around `std::process::Command` that echo what they run.

use crate::{interrupt, MigrateError, Result};
use std::ffi::OsStr;
use std::os::unix::process::CommandExt;
use std::process::{Command, Output, Stdio};

/// Render a command the way a user could paste it into a shell.
pub fn display_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        arg.into_owned()
    } else {
        format!("'{}'", arg.replace('\'', r#"'"'"'"#))
    }
}

pub fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Print the command line before running it.
pub fn echo(cmd: &Command) {
    println!("+ {}", display_command(cmd));
    tracing::debug!(command = %display_command(cmd), "Running command");
}

/// Run with inherited stdio; non-zero exit is an error.
///
/// The child gets its own process group so SIGINT/SIGTERM reach it through
/// [`interrupt`] rather than directly from the terminal.
pub fn run(cmd: &mut Command) -> Result<()> {
    echo(cmd);
    let mut child = cmd
        .process_group(0)
        .spawn()
        .map_err(|source| MigrateError::CommandSpawn {
            program: program_name(cmd),
            source,
        })?;

    let status = {
        let _tracked = interrupt::track(&child);
        child.wait()?
    };

    if !status.success() {
        interrupt::check()?;
        return Err(MigrateError::CommandFailed {
            program: program_name(cmd),
            code: status.code(),
        });
    }

    Ok(())
}

/// Run and capture stdout. Stderr is passed through to the terminal.
pub fn run_capture(cmd: &mut Command) -> Result<Output> {
    echo(cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .output()
        .map_err(|source| MigrateError::CommandSpawn {
            program: program_name(cmd),
            source,
        })
}

/// Run and capture stdout; non-zero exit is an error.
pub fn run_checked_capture(cmd: &mut Command) -> Result<String> {
    let output = run_capture(cmd)?;
    if !output.status.success() {
        return Err(MigrateError::CommandFailed {
            program: program_name(cmd),
            code: output.status.code(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
