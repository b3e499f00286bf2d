//! smallsh - a small shell with background jobs and a foreground-only mode

#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces
)]
#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;

/// Logs the error of a `Result` that is not worth propagating.
macro_rules! log_if_err {
    ($result:expr, $msg:expr) => {{
        if let Err(ref e) = $result {
            ::log::error!("{}: {}", $msg, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)+) => {{
        if let Err(ref e) = $result {
            ::log::error!("{}: {}", format_args!($fmt, $($arg)+), e);
        }
    }};
}

pub mod core;
pub mod editor;
pub mod errors;
pub mod execute_command;
pub mod shell;
pub mod util;

pub use crate::core::job::Termination;
pub use crate::shell::{Shell, ShellConfig};
