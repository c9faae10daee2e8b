use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::io::{self, BufRead, Write};
use std::os::fd::{AsFd, BorrowedFd};

/// Restores terminal echo when dropped.
struct EchoGuard<'fd> {
    fd: BorrowedFd<'fd>,
    original: Termios,
}

impl<'fd> EchoGuard<'fd> {
    /// `None` when `fd` is not a terminal.
    fn disable(fd: BorrowedFd<'fd>) -> io::Result<Option<Self>> {
        let original = match termios::tcgetattr(fd) {
            Ok(original) => original,
            Err(_) => return Ok(None),
        };

        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        silent.local_flags.insert(LocalFlags::ECHONL);
        termios::tcsetattr(fd, SetArg::TCSANOW, &silent)?;

        Ok(Some(Self { fd, original }))
    }
}

impl Drop for EchoGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(self.fd, SetArg::TCSANOW, &self.original) {
            tracing::warn!(error = %e, "Failed to restore terminal echo");
        }
    }
}

/// Read a password from stdin without echoing it.
pub fn read_password(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let stdin = io::stdin();
    let _echo = EchoGuard::disable(stdin.as_fd())?;

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(strip_newline(&line).to_string())
}

fn strip_newline(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
