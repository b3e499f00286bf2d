//! Error module. See the [error-chain](https://crates.io/crates/error-chain) crate for details.

#![allow(deprecated)]

error_chain! {
    foreign_links {
        Docopt(::docopt::Error);
        Io(::std::io::Error);
        Nix(::nix::Error);
        Readline(::rustyline::error::ReadlineError);
    }

    errors {
        /// `fork(2)` failed; the interpreter cannot continue.
        Fork {
            description("fork failed")
            display("fork failed")
        }

        /// Every job slot holds a job that is running or not yet reported.
        JobTableFull(capacity: usize) {
            description("background array is full")
            display("background array is full")
        }

        /// A word that cannot be handed to `execvp`, e.g. one with a NUL byte.
        InvalidArgument(word: String) {
            description("invalid argument")
            display("{}: invalid argument", word)
        }

        /// A builtin failed; the message is printed as is.
        BuiltinCommand(message: String) {
            description("builtin command failed")
            display("{}", message)
        }
    }
}

impl Error {
    pub(crate) fn builtin_command<T: AsRef<str>>(message: T) -> Error {
        Error::from(ErrorKind::BuiltinCommand(message.as_ref().to_string()))
    }

    pub(crate) fn invalid_argument<T: AsRef<str>>(word: T) -> Error {
        Error::from(ErrorKind::InvalidArgument(word.as_ref().to_string()))
    }
}
