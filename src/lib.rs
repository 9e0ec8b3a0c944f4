//! A minimal sequential command runner.
//!
//! One input line is split into `;`/newline separated statements, and each
//! statement is launched as its own OS process, waited on, timed and reported
//! before the next one starts. Two interchangeable process creation backends
//! are provided: a plain fork+exec and a `clone(2)` onto an explicitly mapped
//! stack.
//!
//! The main entry point is [`Interpreter`]. The lower layers ([`Tokenizer`],
//! [`Sequencer`] and the [`ProcessSpawner`] backends) are public so they can
//! be driven directly.

pub mod command;
pub mod config;
pub mod error;
mod interpreter;
mod parser;
mod sequencer;
pub mod spawner;

pub use command::{Command, CommandBatch, CommandKind, ExitCode, Truncation};
pub use config::{Config, Limits};
pub use error::SpawnError;
pub use interpreter::{EXIT_KEYWORD, Interpreter, PROMPT};
pub use parser::Tokenizer;
pub use sequencer::{NoReentry, Outcome, Reentry, Sequencer};
pub use spawner::{Backend, CloneStack, ExecutionResult, ForkExec, ProcessSpawner};
