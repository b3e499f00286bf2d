use std::io::Write;

use crate::{
    errors::Result,
    shell::{
        builtins::{self, BuiltinCommand},
        Shell,
    },
};

/// `status`: prints how the last foreground command terminated. Before any
/// command has run this is `exited with 0`.
pub struct Status;

impl BuiltinCommand for Status {
    const NAME: &'static str = builtins::STATUS_NAME;

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<()> {
        writeln!(stdout, "{}", shell.last_status().status_message())?;
        stdout.flush()?;
        Ok(())
    }
}
