use std::env;
use std::path::PathBuf;

/// Returns `true` if the shell's stdin is a terminal.
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// `file_name` inside the user's home directory, if there is one.
pub fn home_file(file_name: &str) -> Option<PathBuf> {
    dirs::home_dir()
        .or_else(|| env::var_os("HOME").map(PathBuf::from))
        .map(|home| home.join(file_name))
}
