//! Interactive front end: the REPL loop and its slash commands

pub mod commands;
pub mod repl;

pub use repl::Repl;
