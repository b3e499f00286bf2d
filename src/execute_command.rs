//! Running commands as child processes.
//!
//! Both executors fork. The child applies its redirections and signal
//! dispositions and replaces itself with the program; any failure on that
//! side ends the child with one of the exit statuses below and never
//! reaches the shell except as the child's status.

use std::ffi::CString;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use log::{debug, error, warn};
use nix::{
    errno::Errno,
    fcntl::{self, OFlag},
    sys::{stat::Mode, wait},
    unistd::{self, ForkResult, Pid},
};

use crate::{
    core::{job::Termination, parser::Command},
    errors::{Error, ErrorKind, Result, ResultExt},
    shell::{
        job_control::{JobTable, WaitPidReaper},
        signals,
    },
};

/// Child could not open a redirection target.
pub const REDIRECT_OPEN_FAILED_EXIT_STATUS: i32 = 1;
/// Child could not replace its image with the program.
pub const EXEC_FAILED_EXIT_STATUS: i32 = 2;
/// Child opened a redirection target but could not bind it to the stream.
pub const REDIRECT_BIND_FAILED_EXIT_STATUS: i32 = 3;
/// The shell could not fork; it exits with this status.
pub const FORK_FAILED_EXIT_STATUS: i32 = 4;
/// Child could not reset its signal dispositions.
pub const SIGNAL_SETUP_FAILED_EXIT_STATUS: i32 = 5;

/// Background jobs read from and write to this unless redirected.
pub const NULL_DEVICE: &str = "/dev/null";

const OUTPUT_FILE_MODE: libc::mode_t = 0o640;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdin,
    Stdout,
}

impl Stream {
    fn fd(self) -> libc::c_int {
        match self {
            Stream::Stdin => libc::STDIN_FILENO,
            Stream::Stdout => libc::STDOUT_FILENO,
        }
    }

    fn direction(self) -> &'static str {
        match self {
            Stream::Stdin => "input",
            Stream::Stdout => "output",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectError {
    Open { path: String, stream: Stream, errno: Errno },
    Bind { path: String, stream: Stream, errno: Errno },
}

impl RedirectError {
    /// Status the child exits with after this failure.
    pub fn exit_status(&self) -> i32 {
        match *self {
            RedirectError::Open { .. } => REDIRECT_OPEN_FAILED_EXIT_STATUS,
            RedirectError::Bind { .. } => REDIRECT_BIND_FAILED_EXIT_STATUS,
        }
    }
}

impl fmt::Display for RedirectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RedirectError::Open {
                ref path,
                stream,
                errno,
            } => write!(
                f,
                "cannot open {} for {}: {}",
                path,
                stream.direction(),
                errno.desc()
            ),
            RedirectError::Bind {
                ref path,
                stream,
                errno,
            } => write!(
                f,
                "cannot redirect {} to {}: {}",
                stream.direction(),
                path,
                errno.desc()
            ),
        }
    }
}

/// Opens `path` and makes it the calling process's `stream`.
///
/// Input is opened read-only; output is created or truncated with mode
/// 0640. Only call this in a forked child.
pub fn redirect<P: AsRef<Path>>(path: P, stream: Stream) -> std::result::Result<(), RedirectError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let (flags, mode) = match stream {
        Stream::Stdin => (OFlag::O_RDONLY, Mode::empty()),
        Stream::Stdout => (
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::from_bits_truncate(OUTPUT_FILE_MODE),
        ),
    };

    let fd = fcntl::open(path, flags, mode).map_err(|errno| RedirectError::Open {
        path: display.clone(),
        stream,
        errno,
    })?;
    if fd == stream.fd() {
        return Ok(());
    }

    let result = unistd::dup2(fd, stream.fd()).map_err(|errno| RedirectError::Bind {
        path: display.clone(),
        stream,
        errno,
    });
    let temp_result = unistd::close(fd);
    log_if_err!(temp_result, "failed to close {}", display);
    result.map(|_| ())
}

/// Program and arguments converted up front so the child does no fallible
/// conversions before `execvp`.
struct Exec {
    program: CString,
    argv: Vec<CString>,
}

impl Exec {
    fn new(command: &Command) -> Result<Exec> {
        let to_c_string =
            |word: &String| CString::new(word.as_bytes()).map_err(|_| Error::invalid_argument(word));
        Ok(Exec {
            program: to_c_string(&command.program)?,
            argv: command
                .arguments
                .iter()
                .map(to_c_string)
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// Replaces the process image; returns only by exiting.
    fn exec(&self) -> ! {
        let errno = match unistd::execvp(&self.program, &self.argv) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };
        eprintln!("smallsh: {}: {}", self.program.to_string_lossy(), errno.desc());
        process::exit(EXEC_FAILED_EXIT_STATUS);
    }
}

/// Redirects `stream` in the child, exiting on failure.
fn redirect_or_exit(path: &str, stream: Stream) {
    if let Err(e) = redirect(path, stream) {
        eprintln!("smallsh: {}", e);
        process::exit(e.exit_status());
    }
}

fn prepare_signals_or_exit(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("smallsh: failed to reset signal handlers: {}", e);
        process::exit(SIGNAL_SETUP_FAILED_EXIT_STATUS);
    }
}

fn fork() -> Result<ForkResult> {
    // Anything still buffered would otherwise be written by both processes.
    io::stdout().flush()?;
    let result = unsafe { unistd::fork() };
    result.chain_err(|| ErrorKind::Fork)
}

/// Runs `command` and waits for it to terminate.
pub fn run_foreground(command: &Command) -> Result<Termination> {
    let exec = Exec::new(command)?;
    match fork()? {
        ForkResult::Child => {
            if let Some(ref path) = command.input_file {
                redirect_or_exit(path, Stream::Stdin);
            }
            if let Some(ref path) = command.output_file {
                redirect_or_exit(path, Stream::Stdout);
            }
            prepare_signals_or_exit(signals::prepare_foreground_child());
            exec.exec()
        }
        ForkResult::Parent { child } => {
            debug!("started foreground pid {}: {:?}", child, command.arguments);
            let termination = wait_for_child(child)?;
            debug!("foreground pid {} terminated: {}", child, termination);
            Ok(termination)
        }
    }
}

/// Starts `command` without waiting for it and tracks it in `jobs`.
///
/// Streams that are not redirected are bound to the null device. A full
/// job table is reported on `out`; the child keeps running untracked.
pub fn spawn_background(command: &Command, jobs: &mut JobTable, out: &mut dyn Write) -> Result<Pid> {
    let exec = Exec::new(command)?;
    match fork()? {
        ForkResult::Child => {
            let input = command.input_file.as_deref().unwrap_or(NULL_DEVICE);
            let output = command.output_file.as_deref().unwrap_or(NULL_DEVICE);
            redirect_or_exit(input, Stream::Stdin);
            redirect_or_exit(output, Stream::Stdout);
            prepare_signals_or_exit(signals::prepare_background_child());
            exec.exec()
        }
        ForkResult::Parent { child } => {
            debug!("started background pid {}: {:?}", child, command.arguments);
            jobs.reap_finished(&mut WaitPidReaper);
            writeln!(out, "background pid is {}", child)?;
            out.flush()?;

            if let Err(e) = jobs.insert(child) {
                if let ErrorKind::JobTableFull(capacity) = *e.kind() {
                    warn!("all {} job slots in use, not tracking pid {}", capacity, child);
                    writeln!(out, "Error: {}", e)?;
                    out.flush()?;
                } else {
                    return Err(e);
                }
            }
            Ok(child)
        }
    }
}

fn wait_for_child(child: Pid) -> Result<Termination> {
    loop {
        match wait::waitpid(child, None) {
            Ok(status) => {
                if let Some(termination) = Termination::from_wait_status(status) {
                    return Ok(termination);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                error!("failed to wait for pid {}: {}", child, e);
                return Err(e.into());
            }
        }
    }
}
