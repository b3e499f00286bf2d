//! Line input for the interactive loop.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rustyline::{error::ReadlineError, Config, DefaultEditor};

use crate::errors::{Result, ResultExt};

/// Longest line the shell expects; longer lines are still accepted.
pub const MAX_LINE_LENGTH: usize = 2048;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One line without its trailing newline
    Line(String),
    /// A signal arrived before a full line was read
    Interrupted,
    /// No more input
    Eof,
}

pub trait LineReader {
    /// Shows `prompt` and reads one line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Persists whatever the reader keeps between sessions.
    fn save_history(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads lines straight from a byte stream.
///
/// A read that fails with `EINTR` is reported as `Interrupted` instead of
/// being retried, so the caller can show a fresh prompt. Bytes of a partial
/// line are kept for the next call.
pub struct PlainReader<R, W> {
    input: R,
    output: W,
    pending: Vec<u8>,
}

impl PlainReader<io::Stdin, io::Stdout> {
    pub fn stdio() -> Self {
        PlainReader::new(io::stdin(), io::stdout())
    }
}

impl<R: Read, W: Write> PlainReader<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            pending: Vec::with_capacity(MAX_LINE_LENGTH),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let newline = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=newline).collect();
        Some(String::from_utf8_lossy(&line[..newline]).into_owned())
    }
}

impl<R: Read, W: Write> LineReader for PlainReader<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut buffer = [0; MAX_LINE_LENGTH];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadOutcome::Line(line));
            }

            match self.input.read(&mut buffer) {
                Ok(0) if self.pending.is_empty() => return Ok(ReadOutcome::Eof),
                Ok(0) => {
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    return Ok(ReadOutcome::Line(line));
                }
                Ok(n) => self.pending.extend_from_slice(&buffer[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                    debug!("line read interrupted");
                    return Ok(ReadOutcome::Interrupted);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R, W> fmt::Debug for PlainReader<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlainReader {{ pending: {} bytes }}", self.pending.len())
    }
}

/// Interactive line editor with history.
pub struct Editor {
    internal: DefaultEditor,
    history_file: Option<PathBuf>,
}

impl Editor {
    pub fn with_capacity(history_capacity: usize) -> Result<Editor> {
        let config = Config::builder()
            .max_history_size(history_capacity.max(1))?
            .history_ignore_space(true)
            .auto_add_history(false)
            .build();
        let internal = DefaultEditor::with_config(config)?;

        Ok(Editor {
            internal,
            history_file: None,
        })
    }

    /// Loads history from `path` and saves it back there on shutdown. A
    /// missing file is not an error.
    pub fn load_history<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.history_file = Some(path.to_path_buf());
        match self.internal.load_history(path) {
            Ok(()) => Ok(()),
            Err(ReadlineError::Io(ref inner)) if inner.kind() == io::ErrorKind::NotFound => {
                debug!("no history file at {}", path.display());
                Ok(())
            }
            Err(e) => Err(e).chain_err(|| format!("failed to load history from {}", path.display())),
        }
    }
}

impl LineReader for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.internal.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let temp_result = self.internal.add_history_entry(line.as_str());
                    log_if_err!(temp_result, "add_history_entry");
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(e) => Err(e.into()),
        }
    }

    fn save_history(&mut self) -> Result<()> {
        if let Some(ref path) = self.history_file {
            self.internal.save_history(path)?;
        } else {
            warn!("no history file to save to");
        }
        Ok(())
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Editor {{ history_file: {:?} }}", self.history_file)
    }
}
