use std::path::PathBuf;
use std::process;

use docopt::Docopt;
use log::{debug, error};
use nix::unistd::Pid;
use serde_derive::Deserialize;

use smallsh_rs::{errors::Error, util, Shell, ShellConfig};

const LOG_FILE_NAME: &str = ".smallsh_log";
const SETUP_FAILED_EXIT_STATUS: i32 = 1;

const USAGE: &str = "
smallsh.

Usage:
    smallsh [options]
    smallsh [options] -c <command>
    smallsh [options] <file>
    smallsh (-h | --help)
    smallsh --version

Options:
    -h --help           Show this screen.
    --version           Show version.
    -c                  Run the single command line <command> and exit.
    --log=<path>        File to write log to, defaults to ~/.smallsh_log
    --max-jobs=<n>      Number of background jobs tracked at once [default: 5].
    --ignore-eof        Keep prompting when input runs out instead of exiting.
    --line-editor       Read commands with a line editor when stdin is a terminal.
    --history-size=<n>  Number of lines the line editor remembers [default: 100].
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    arg_file: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_log: Option<String>,
    flag_max_jobs: usize,
    flag_ignore_eof: bool,
    flag_line_editor: bool,
    flag_history_size: usize,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    init_logger(&args.flag_log);
    debug!("{:?}", args);

    if args.flag_version {
        println!("smallsh version {}", env!("CARGO_PKG_VERSION"));
    } else if args.flag_c || args.arg_file.is_some() {
        execute_from_command_string_or_file(&args);
    } else {
        execute_from_stdin(&args);
    }
}

fn init_logger(path: &Option<String>) {
    let log_path = match path.clone().map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => return,
    };

    let log_file = match fern::log_file(&log_path) {
        Ok(log_file) => log_file,
        Err(e) => {
            eprintln!("smallsh: {}: {}", log_path.display(), e);
            return;
        }
    };

    let pid = Pid::this();
    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(log_file)
        .apply();
    if let Err(e) = result {
        eprintln!("smallsh: failed to start logging: {}", e);
    }
}

fn default_log_path() -> Option<PathBuf> {
    util::home_file(LOG_FILE_NAME)
}

fn shell_config(args: &Args, config: ShellConfig) -> ShellConfig {
    config.with_job_table_capacity(args.flag_max_jobs)
}

fn execute_from_command_string_or_file(args: &Args) -> ! {
    let shell_config = shell_config(args, ShellConfig::noninteractive());
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));

    if let Some(ref command) = args.arg_command {
        shell.run_line(command);
        shell.check_jobs();
    } else if let Some(ref file_path) = args.arg_file {
        if let Err(e) = shell.execute_commands_from_file(file_path) {
            error!("{}", e);
            eprintln!("smallsh: {}", e);
            shell.exit(SETUP_FAILED_EXIT_STATUS);
        }
    } else {
        unreachable!();
    }

    let code = shell.last_status().code();
    shell.exit(code);
}

fn execute_from_stdin(args: &Args) -> ! {
    let shell_config = shell_config(args, ShellConfig::interactive())
        .with_exit_on_eof(!args.flag_ignore_eof)
        .with_line_editor(args.flag_line_editor)
        .with_command_history_capacity(args.flag_history_size);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));
    shell.execute_from_stdin()
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error);
    eprintln!("smallsh: {}", error);
    process::exit(SETUP_FAILED_EXIT_STATUS);
}
