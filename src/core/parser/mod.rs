//! smallsh parser
//!
//! Input lines are split on whitespace; there is no quoting. The first word
//! names the program and the words up to the first `<`, `>` or `&` are its
//! arguments. What follows is read two words at a time: `< file`, `> file`,
//! or a lone trailing `&`. Anything else in that tail is ignored.

use log::trace;
use nix::unistd::Pid;

use crate::core::variable_expansion::expand_pid;

const COMMENT: char = '#';
const INPUT_REDIRECT: &str = "<";
const OUTPUT_REDIRECT: &str = ">";
const BACKGROUND: &str = "&";

/// A parsed input line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    /// Program to execute, also the first element of `arguments`
    pub program: String,
    /// Full argument vector handed to the program
    pub arguments: Vec<String>,
    /// Redirect stdin from this file
    pub input_file: Option<String>,
    /// Redirect stdout to this file
    pub output_file: Option<String>,
    /// Run the command in the background, defaults to false
    pub background: bool,
}

impl Command {
    /// Parses `input`, expanding `$$` in every word to `pid`.
    ///
    /// Returns `None` for blank lines and comments.
    pub fn parse(input: &str, pid: Pid) -> Option<Command> {
        let input = input.trim_start();
        if input.starts_with(COMMENT) {
            return None;
        }

        let mut words = input.split_whitespace();
        let program = expand_pid(words.next()?, pid);
        let mut command = Command {
            program: program.clone(),
            arguments: vec![program],
            ..Default::default()
        };

        let mut marker = None;
        for word in &mut words {
            if is_marker(word) {
                marker = Some(word);
                break;
            }
            command.arguments.push(expand_pid(word, pid));
        }

        while let Some(word) = marker {
            let word = expand_pid(word, pid);
            let next = words.next().map(|w| expand_pid(w, pid));
            match (word.as_str(), next) {
                (INPUT_REDIRECT, Some(path)) => command.input_file = Some(path),
                (OUTPUT_REDIRECT, Some(path)) => command.output_file = Some(path),
                (BACKGROUND, None) => command.background = true,
                (word, next) => trace!("ignoring '{}' followed by {:?}", word, next),
            }
            marker = words.next();
        }

        Some(command)
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.arguments[1..]
    }
}

fn is_marker(word: &str) -> bool {
    word == INPUT_REDIRECT || word == OUTPUT_REDIRECT || word == BACKGROUND
}
