use std::io::Write;

use crate::{
    errors::{Error, Result},
    shell::{
        builtins::{self, BuiltinCommand},
        Shell,
    },
};

/// `exit [n]`: kills any background jobs still running and exits the shell
/// with status N, or 0 if N is omitted.
pub struct Exit;

impl BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let status_code = match args.get(0) {
            Some(arg) => arg.as_ref().parse::<i32>().map_err(|_| {
                Error::builtin_command(format!(
                    "exit: {}: numeric argument required",
                    arg.as_ref()
                ))
            })?,
            None => 0,
        };
        stdout.flush()?;
        shell.exit(status_code);
    }
}
