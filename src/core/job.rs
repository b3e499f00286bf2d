use std::fmt;

use nix::{sys::signal::Signal, sys::wait::WaitStatus, unistd::Pid};

/// How a child process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Exited normally with a status code
    Exited(i32),
    /// Killed by a signal
    Signaled(Signal),
}

impl Termination {
    /// Decodes a wait status, returning `None` if the child has not
    /// terminated.
    pub fn from_wait_status(status: WaitStatus) -> Option<Termination> {
        match status {
            WaitStatus::Exited(_, code) => Some(Termination::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Termination::Signaled(signal)),
            _ => None,
        }
    }

    /// Exit status code a shell would report, e.g. `128 + N` for signal N.
    pub fn code(self) -> i32 {
        match self {
            Termination::Exited(code) => code,
            Termination::Signaled(signal) => 128 + signal as i32,
        }
    }

    /// Message printed by the `status` builtin.
    pub fn status_message(self) -> String {
        match self {
            Termination::Exited(code) => format!("exited with {}", code),
            Termination::Signaled(signal) => format!("terminated by signal {}", signal as i32),
        }
    }
}

impl Default for Termination {
    fn default() -> Self {
        Termination::Exited(0)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Termination::Exited(code) => write!(f, "exit value {}", code),
            Termination::Signaled(signal) => write!(f, "terminated by signal {}", signal as i32),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    NeverRun,
    Running,
    Completed,
    Reported,
}

impl Default for JobState {
    fn default() -> Self {
        JobState::NeverRun
    }
}

/// One slot of the background job table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Job {
    /// `None` while the slot has never held a job
    pid: Option<Pid>,
    termination: Option<Termination>,
    state: JobState,
}

impl Job {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            termination: None,
            state: JobState::Running,
        }
    }

    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Returns `true` if a new job may take this slot.
    pub fn is_vacant(&self) -> bool {
        match self.state {
            JobState::NeverRun | JobState::Reported => true,
            JobState::Running | JobState::Completed => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn mark_completed(self, termination: Termination) -> Self {
        debug_assert!(self.is_running());
        Self {
            termination: Some(termination),
            state: JobState::Completed,
            ..self
        }
    }

    pub fn mark_reported(self) -> Self {
        Self {
            state: JobState::Reported,
            ..self
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.pid, self.termination) {
            (Some(pid), Some(termination)) => {
                write!(f, "background pid {} is done: {}", pid, termination)
            }
            (Some(pid), None) => write!(f, "background pid {} is running", pid),
            (None, _) => write!(f, "(empty)"),
        }
    }
}
