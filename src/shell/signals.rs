//! Signal dispositions for the shell and its children, and the
//! foreground-only mode toggled by SIGTSTP.
//!
//! The mode is a two-state machine. Each SIGTSTP delivery is one event: the
//! handler looks up the transition for the current state, stores the next
//! state and writes the transition's message. The handler registration
//! itself never changes.
//!
//! SIGTSTP stays blocked while the shell runs, except inside a
//! [`ReadWindow`] around the blocking line read.

use std::sync::atomic::{AtomicU8, Ordering};

use libc::c_int;
use log::{debug, error};
use nix::sys::signal::{
    self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

use crate::errors::Result;

/// The signal that toggles foreground-only mode.
pub const TOGGLE_SIGNAL: Signal = Signal::SIGTSTP;

pub const ENTER_FOREGROUND_ONLY_MESSAGE: &str =
    "\nEntering foreground-only mode (& is now ignored)\n";
pub const EXIT_FOREGROUND_ONLY_MESSAGE: &str = "\nExiting foreground-only mode\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// `&` runs commands in the background
    Normal = 0,
    /// `&` is ignored and every command runs in the foreground
    ForegroundOnly = 1,
}

/// The state the machine moves to and what it announces on the way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: Mode,
    pub message: &'static str,
}

/// Indexed by the current `Mode`.
const TRANSITIONS: [Transition; 2] = [
    Transition {
        next: Mode::ForegroundOnly,
        message: ENTER_FOREGROUND_ONLY_MESSAGE,
    },
    Transition {
        next: Mode::Normal,
        message: EXIT_FOREGROUND_ONLY_MESSAGE,
    },
];

impl Mode {
    fn from_u8(value: u8) -> Mode {
        if value == Mode::ForegroundOnly as u8 {
            Mode::ForegroundOnly
        } else {
            Mode::Normal
        }
    }

    /// Transition taken when the toggle signal arrives in this mode.
    pub fn on_toggle(self) -> Transition {
        TRANSITIONS[self as usize]
    }

    /// Returns `true` if `&` should start a background job.
    pub fn allows_background(self) -> bool {
        self == Mode::Normal
    }
}

/// Lock-free storage for a `Mode`, safe to touch from a signal handler.
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub const fn new() -> Self {
        ModeCell(AtomicU8::new(Mode::Normal as u8))
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Applies one toggle event and returns the transition taken.
    ///
    /// Callers are serialized: the handler runs with every signal masked and
    /// the shell only reads.
    pub fn toggle(&self) -> Transition {
        let transition = self.get().on_toggle();
        self.0.store(transition.next as u8, Ordering::SeqCst);
        transition
    }
}

static MODE: ModeCell = ModeCell::new();

extern "C" fn handle_toggle(_signo: c_int) {
    let transition = MODE.toggle();
    let message = transition.message.as_bytes();
    // write(2) is async-signal-safe; stdout's buffered handle is not.
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            message.as_ptr() as *const libc::c_void,
            message.len(),
        );
    }
}

/// Handle to the process's foreground-only mode.
#[derive(Clone, Copy, Debug)]
pub struct ModeToggle {
    cell: &'static ModeCell,
}

impl ModeToggle {
    /// The process-wide toggle fed by SIGTSTP once installed.
    pub fn new() -> Self {
        ModeToggle { cell: &MODE }
    }

    #[cfg(test)]
    pub(crate) fn with_cell(cell: &'static ModeCell) -> Self {
        ModeToggle { cell }
    }

    pub fn mode(&self) -> Mode {
        self.cell.get()
    }

    /// Feeds one toggle event to the machine without a signal.
    pub fn toggle(&self) -> Transition {
        self.cell.toggle()
    }

    /// Routes SIGTSTP into the toggle and blocks it until a `ReadWindow`
    /// opens.
    ///
    /// The handler runs with every signal masked and without `SA_RESTART`,
    /// so a delivery during the line read interrupts it.
    pub fn install(&self) -> Result<()> {
        let action = SigAction::new(
            SigHandler::Handler(handle_toggle),
            SaFlags::empty(),
            SigSet::all(),
        );
        unsafe {
            signal::sigaction(TOGGLE_SIGNAL, &action)?;
        }
        set_toggle_blocked(true)?;
        debug!("installed {:?} handler", TOGGLE_SIGNAL);
        Ok(())
    }

    /// Unblocks the toggle signal until the returned guard is dropped.
    pub fn read_window(&self) -> Result<ReadWindow> {
        set_toggle_blocked(false)?;
        Ok(ReadWindow { _private: () })
    }
}

impl Default for ModeToggle {
    fn default() -> Self {
        ModeToggle::new()
    }
}

/// RAII guard: the toggle signal is deliverable while this is alive.
#[derive(Debug)]
pub struct ReadWindow {
    _private: (),
}

impl Drop for ReadWindow {
    fn drop(&mut self) {
        if let Err(e) = set_toggle_blocked(true) {
            error!("failed to block {:?} after reading input: {}", TOGGLE_SIGNAL, e);
        }
    }
}

fn toggle_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(TOGGLE_SIGNAL);
    set
}

fn set_toggle_blocked(blocked: bool) -> Result<()> {
    let how = if blocked {
        SigmaskHow::SIG_BLOCK
    } else {
        SigmaskHow::SIG_UNBLOCK
    };
    signal::sigprocmask(how, Some(&toggle_set()), None)?;
    Ok(())
}

/// The shell itself is not interrupted by the terminal's interrupt key.
pub fn ignore_interrupts() -> Result<()> {
    set_disposition(Signal::SIGINT, SigHandler::SigIgn)
}

/// Child side of the foreground executor: killable by the interrupt key,
/// immune to the toggle.
pub fn prepare_foreground_child() -> Result<()> {
    set_disposition(Signal::SIGINT, SigHandler::SigDfl)?;
    set_disposition(TOGGLE_SIGNAL, SigHandler::SigIgn)?;
    restore_broken_pipe()?;
    clear_mask()
}

/// Child side of the background executor. SIGINT stays ignored as
/// inherited from the shell.
pub fn prepare_background_child() -> Result<()> {
    set_disposition(TOGGLE_SIGNAL, SigHandler::SigIgn)?;
    restore_broken_pipe()?;
    clear_mask()
}

/// The Rust runtime ignores SIGPIPE; programs expect to be killed by it.
fn restore_broken_pipe() -> Result<()> {
    set_disposition(Signal::SIGPIPE, SigHandler::SigDfl)
}

fn set_disposition(signal: Signal, handler: SigHandler) -> Result<()> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    unsafe {
        signal::sigaction(signal, &action)?;
    }
    Ok(())
}

fn clear_mask() -> Result<()> {
    signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)?;
    Ok(())
}
