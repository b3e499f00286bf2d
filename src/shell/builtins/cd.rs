use std::io::Write;

use crate::{
    errors::Result,
    shell::{
        builtins::{self, BuiltinCommand},
        Shell,
    },
};

/// `cd [dir]`: changes the working directory to DIR, or to `$HOME`.
/// Arguments after DIR are ignored.
pub struct Cd;

impl BuiltinCommand for Cd {
    const NAME: &'static str = builtins::CD_NAME;

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        shell.change_directory(args.get(0).map(|dir| dir.as_ref()))
    }
}
