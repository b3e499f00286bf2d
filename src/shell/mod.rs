//! smallsh - Shell Module
//!
//! The Shell reads lines, dispatches them to builtins or the executors, and
//! owns the background job table and the foreground-only mode.

use std::env;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process;

use log::{debug, error, info, warn};
use nix::unistd::Pid;

use crate::{
    core::{job::Termination, parser::Command},
    editor::{Editor, LineReader, PlainReader, ReadOutcome},
    errors::{Error, ErrorKind, Result, ResultExt},
    execute_command::{self, FORK_FAILED_EXIT_STATUS},
    util,
};

use self::job_control::{JobTable, WaitPidReaper, DEFAULT_JOB_TABLE_CAPACITY};
use self::signals::ModeToggle;

pub mod builtins;
pub mod job_control;
pub mod signals;

pub const PROMPT: &str = ": ";
const HISTORY_FILE_NAME: &str = ".smallsh_history";
const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Number of background jobs tracked at once.
    job_table_capacity: usize,

    /// Exit when input runs out; otherwise prompt again.
    exit_on_eof: bool,

    /// Use the line editor instead of plain reads when stdin is a terminal.
    enable_line_editor: bool,

    /// Number of entries the line editor keeps in its history.
    command_history_capacity: usize,

    /// Ignore SIGINT and route SIGTSTP to the foreground-only toggle.
    install_signal_handlers: bool,

    /// Determines if some messages (e.g. "exit") should be displayed.
    display_messages: bool,
}

impl ShellConfig {
    /// Creates a shell reading commands from a user.
    ///
    /// # Complete List
    /// - Five background job slots
    /// - End of input exits the shell
    /// - Plain line reads, no line editor
    /// - SIGINT is ignored and SIGTSTP toggles foreground-only mode
    /// - Some additional messages are displayed
    pub fn interactive() -> Self {
        Self {
            display_messages: true,
            ..Default::default()
        }
    }

    /// Creates a shell running a command string or a script.
    ///
    /// Same as `interactive` except fewer messages are displayed.
    pub fn noninteractive() -> Self {
        Default::default()
    }

    pub fn with_job_table_capacity(self, job_table_capacity: usize) -> Self {
        Self {
            job_table_capacity,
            ..self
        }
    }

    pub fn with_exit_on_eof(self, exit_on_eof: bool) -> Self {
        Self {
            exit_on_eof,
            ..self
        }
    }

    pub fn with_line_editor(self, enable_line_editor: bool) -> Self {
        Self {
            enable_line_editor,
            ..self
        }
    }

    pub fn with_command_history_capacity(self, command_history_capacity: usize) -> Self {
        Self {
            command_history_capacity,
            ..self
        }
    }

    /// Leaves the process's signal dispositions alone, e.g. for tests.
    pub fn without_signal_handlers(self) -> Self {
        Self {
            install_signal_handlers: false,
            ..self
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            job_table_capacity: DEFAULT_JOB_TABLE_CAPACITY,
            exit_on_eof: true,
            enable_line_editor: false,
            command_history_capacity: DEFAULT_HISTORY_CAPACITY,
            install_signal_handlers: true,
            display_messages: false,
        }
    }
}

pub struct Shell {
    config: ShellConfig,
    /// Substituted for `$$`
    pid: Pid,
    job_table: JobTable,
    mode: ModeToggle,
    /// How the last foreground command terminated
    last_status: Termination,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Result<Shell> {
        let shell = Shell {
            config,
            pid: Pid::this(),
            job_table: JobTable::with_capacity(config.job_table_capacity),
            mode: ModeToggle::new(),
            last_status: Termination::default(),
        };

        if config.install_signal_handlers {
            signals::ignore_interrupts()?;
            shell.mode.install()?;
        }

        info!("smallsh started up with pid {}", shell.pid);
        Ok(shell)
    }

    #[cfg(test)]
    pub(crate) fn with_mode(config: ShellConfig, mode: ModeToggle) -> Result<Shell> {
        let mut shell = Shell::new(config.without_signal_handlers())?;
        shell.mode = mode;
        Ok(shell)
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn last_status(&self) -> Termination {
        self.last_status
    }

    pub fn mode(&self) -> signals::Mode {
        self.mode.mode()
    }

    pub fn job_table(&self) -> &JobTable {
        &self.job_table
    }

    /// Reaps finished background jobs, then reports the ones found on
    /// earlier passes.
    pub fn check_jobs(&mut self) {
        self.job_table.reap_finished(&mut WaitPidReaper);
        let temp_result = self.job_table.report_completed(&mut io::stdout());
        log_if_err!(temp_result, "report_completed");
    }

    /// Parses and runs one line.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let command = match Command::parse(input, self.pid) {
            Some(command) => command,
            None => return Ok(()),
        };
        debug!("{:?}", command);

        if builtins::is_builtin(&command.program) {
            return builtins::run(self, &command.program, command.args(), &mut io::stdout());
        }

        if command.background && self.mode.mode().allows_background() {
            execute_command::spawn_background(&command, &mut self.job_table, &mut io::stdout())?;
        } else {
            let termination = execute_command::run_foreground(&command)?;
            self.last_status = termination;
            if let Termination::Signaled(_) = termination {
                println!("{}", termination.status_message());
            }
        }

        Ok(())
    }

    /// Runs every line of a script, checking jobs between lines.
    pub fn execute_commands_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let f = File::open(path).chain_err(|| format!("{}: cannot open script", path.display()))?;
        for line in BufReader::new(f).lines() {
            self.check_jobs();
            self.run_line(&line?);
        }

        self.check_jobs();
        Ok(())
    }

    /// Prompts for and runs commands until `exit` or end of input.
    pub fn execute_from_stdin(&mut self) -> ! {
        let mut reader = self.create_reader();
        loop {
            self.check_jobs();

            let input = match self.prompt(&mut *reader) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Interrupted) => continue,
                Ok(ReadOutcome::Eof) => {
                    if self.config.exit_on_eof {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    error!("failed to read input: {}", e);
                    eprintln!("smallsh: {}", e);
                    break;
                }
            };

            self.run_line(&input);
        }

        let temp_result = reader.save_history();
        log_if_err!(temp_result, "save_history");
        if self.config.display_messages {
            println!("exit");
        }
        self.exit(0)
    }

    fn create_reader(&self) -> Box<dyn LineReader> {
        if self.config.enable_line_editor && util::is_interactive() {
            match self.create_editor() {
                Ok(editor) => return Box::new(editor),
                Err(e) => warn!("falling back to plain input: {}", e),
            }
        }

        Box::new(PlainReader::stdio())
    }

    fn create_editor(&self) -> Result<Editor> {
        let mut editor = Editor::with_capacity(self.config.command_history_capacity)?;
        match util::home_file(HISTORY_FILE_NAME) {
            Some(path) => editor.load_history(path)?,
            None => warn!("unable to get home directory"),
        }
        Ok(editor)
    }

    /// Reads one line with the toggle signal deliverable only during the
    /// read.
    fn prompt(&mut self, reader: &mut dyn LineReader) -> Result<ReadOutcome> {
        if !self.config.install_signal_handlers {
            return reader.read_line(PROMPT);
        }

        let _window = self.mode.read_window()?;
        reader.read_line(PROMPT)
    }

    /// Runs one line and reports a failure on stderr. Only a failed fork
    /// ends the shell.
    pub fn run_line(&mut self, input: &str) {
        if let Err(e) = self.execute_command_string(input) {
            error!("{}", e);
            eprintln!("smallsh: {}", e);
            if let ErrorKind::Fork = *e.kind() {
                self.exit(FORK_FAILED_EXIT_STATUS);
            }
        }
    }

    /// Kills running background jobs and exits the process with `code`.
    pub fn exit(&mut self, code: i32) -> ! {
        self.job_table.kill_running();
        let _ = io::stdout().flush();
        info!("smallsh has shut down");
        process::exit(code);
    }

    /// Changes the working directory to `dir`, or to `$HOME`.
    pub fn change_directory(&mut self, dir: Option<&str>) -> Result<()> {
        let target = match dir {
            Some(dir) => dir.into(),
            None => env::var_os("HOME").ok_or_else(|| {
                Error::builtin_command("cd: HOME not set")
            })?,
        };

        env::set_current_dir(&target).map_err(|e| {
            Error::builtin_command(format!("cd: {}: {}", Path::new(&target).display(), e))
        })?;
        debug!("changed directory to {}", Path::new(&target).display());
        Ok(())
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pid: {}\tmode: {:?}\tlast status: {}\n{:?}",
            self.pid,
            self.mode.mode(),
            self.last_status.status_message(),
            self.job_table
        )
    }
}
