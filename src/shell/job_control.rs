//! Bookkeeping for background jobs.
//!
//! Jobs live in a fixed number of slots. Finished jobs are found by polling
//! with `waitpid(WNOHANG)` once per prompt and announced on the following
//! pass, so a completion is reported exactly once.

use std::fmt;
use std::io::Write;

use log::{debug, info, warn};
use nix::{
    errno::Errno,
    sys::{
        signal::{self, Signal},
        wait::{self, WaitPidFlag},
    },
    unistd::Pid,
};

use crate::{
    core::job::{Job, Termination},
    errors::{ErrorKind, Result},
};

/// Number of background jobs tracked at once unless configured otherwise.
pub const DEFAULT_JOB_TABLE_CAPACITY: usize = 5;

/// Non-blocking check on a child process.
pub trait Reaper {
    /// Returns the child's termination if it has terminated, `None` if it is
    /// still running.
    fn try_wait(&mut self, pid: Pid) -> Result<Option<Termination>>;
}

/// Reaps real children with `waitpid(pid, WNOHANG)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaitPidReaper;

impl Reaper for WaitPidReaper {
    fn try_wait(&mut self, pid: Pid) -> Result<Option<Termination>> {
        let status = wait::waitpid(pid, Some(WaitPidFlag::WNOHANG))?;
        Ok(Termination::from_wait_status(status))
    }
}

pub struct JobTable {
    slots: Vec<Job>,
}

impl JobTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Job::default(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.slots
    }

    /// Number of slots holding a running or unreported job.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|job| !job.is_vacant()).count()
    }

    /// Tracks `pid` in the first vacant slot.
    ///
    /// Fails with `JobTableFull` when every slot is running or unreported;
    /// the process itself is left alone.
    pub fn insert(&mut self, pid: Pid) -> Result<usize> {
        let index = self
            .slots
            .iter()
            .position(Job::is_vacant)
            .ok_or_else(|| ErrorKind::JobTableFull(self.capacity()))?;
        self.slots[index] = Job::new(pid);
        debug!("tracking background pid {} in slot {}", pid, index);
        Ok(index)
    }

    /// Checks every running job without blocking and marks the terminated
    /// ones completed.
    pub fn reap_finished<R: Reaper>(&mut self, reaper: &mut R) {
        for job in self.slots.iter_mut().filter(|job| job.is_running()) {
            let pid = match job.pid() {
                Some(pid) => pid,
                None => continue,
            };

            match reaper.try_wait(pid) {
                Ok(Some(termination)) => {
                    debug!("background pid {} terminated: {}", pid, termination);
                    *job = job.mark_completed(termination);
                }
                Ok(None) => {}
                Err(e) => {
                    if let ErrorKind::Nix(Errno::ECHILD) = *e.kind() {
                        // someone else collected it, nothing left to report
                        warn!("background pid {} is not our child anymore", pid);
                        *job = job.mark_reported();
                    } else {
                        warn!("failed to check background pid {}: {}", pid, e);
                    }
                }
            }
        }
    }

    /// Announces each completed job once and frees its slot.
    pub fn report_completed(&mut self, out: &mut dyn Write) -> Result<usize> {
        let mut reported = 0;
        for job in self.slots.iter_mut().filter(|job| job.is_completed()) {
            writeln!(out, "{}", job)?;
            *job = job.mark_reported();
            reported += 1;
        }
        out.flush()?;
        Ok(reported)
    }

    /// Pids of jobs not yet known to have terminated.
    pub fn running(&self) -> Vec<Pid> {
        self.slots
            .iter()
            .filter(|job| job.is_running())
            .filter_map(Job::pid)
            .collect()
    }

    /// Sends SIGKILL to every running job.
    pub fn kill_running(&mut self) {
        for pid in self.running() {
            info!("killing background pid {}", pid);
            let temp_result = signal::kill(pid, Signal::SIGKILL);
            log_if_err!(temp_result, "failed to kill background pid {}", pid);
        }
    }
}

impl Default for JobTable {
    fn default() -> Self {
        JobTable::with_capacity(DEFAULT_JOB_TABLE_CAPACITY)
    }
}

impl fmt::Debug for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} of {} job slots in use", self.occupied(), self.capacity())?;
        for (index, job) in self.slots.iter().enumerate() {
            writeln!(f, "[{}] {:?}\t{}", index, job.state(), job)?;
        }

        Ok(())
    }
}
