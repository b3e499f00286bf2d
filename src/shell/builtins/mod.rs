//! smallsh builtins
//!
//! `cd`, `exit` and `status` run inside the shell process. They ignore
//! redirection and `&`, and never change the status reported by `status`.

use std::io::Write;

use crate::{errors::Result, shell::Shell};

use self::cd::Cd;
use self::exit::Exit;
use self::status::Status;

mod cd;
mod exit;
mod status;

const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const STATUS_NAME: &str = "status";

/// Represents a smallsh builtin command such as cd or status.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [Cd::NAME, Exit::NAME, Status::NAME].contains(&program.as_ref())
}

/// precondition: command is a builtin.
pub fn run<S1, S2>(shell: &mut Shell, program: S1, args: &[S2], stdout: &mut dyn Write) -> Result<()>
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    match program.as_ref() {
        CD_NAME => Cd::run(shell, args, stdout),
        EXIT_NAME => Exit::run(shell, args, stdout),
        STATUS_NAME => Status::run(shell, args, stdout),
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("cd"));
        assert!(is_builtin("exit"));
        assert!(is_builtin("status"));
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("jobs"));
    }

    #[test]
    fn test_names() {
        assert_eq!(Cd::NAME, "cd");
        assert_eq!(Exit::NAME, "exit");
        assert_eq!(Status::NAME, "status");
    }
}
