//! Parsing and bookkeeping shared by the shell and the executors.

pub mod job;
pub mod parser;
pub mod variable_expansion;
