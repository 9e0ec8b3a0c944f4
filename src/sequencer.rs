use crate::command::{CommandBatch, CommandKind, ExitCode};
use crate::error::SpawnError;
use crate::spawner::{ExecutionResult, ProcessSpawner};
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};

/// Callback used when a batch contains a self-reference command.
///
/// The callback receives the report stream so a nested session can keep
/// writing to it. A blanket implementation exists for matching closures.
pub trait Reentry {
    fn reenter(&mut self, out: &mut dyn Write) -> anyhow::Result<()>;
}

impl<F: FnMut(&mut dyn Write) -> anyhow::Result<()>> Reentry for F {
    fn reenter(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        self(out)
    }
}

/// Reentry handler that ignores self-references.
pub struct NoReentry;

impl Reentry for NoReentry {
    fn reenter(&mut self, _out: &mut dyn Write) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What happened to one command of a batch.
#[derive(Debug)]
pub enum Outcome {
    /// The child ran and was waited on.
    Finished(ExecutionResult),
    /// The launch machinery failed; there is no child status.
    LaunchFailed(SpawnError),
    /// The read-execute loop was re-entered instead of spawning.
    Reentered,
}

impl Outcome {
    /// Exit status of the child, if one exists.
    pub fn status(&self) -> Option<ExitCode> {
        match self {
            Outcome::Finished(result) => Some(result.status),
            _ => None,
        }
    }
}

/// Runs every command of a batch, in order, through one spawner.
///
/// A failing command never stops the batch: each command runs after the
/// previous one has terminated, whatever its status.
pub struct Sequencer {
    spawner: Box<dyn ProcessSpawner>,
}

impl Sequencer {
    pub fn new(spawner: Box<dyn ProcessSpawner>) -> Self {
        Self { spawner }
    }

    pub fn spawner(&self) -> &dyn ProcessSpawner {
        self.spawner.as_ref()
    }

    /// Execute `batch`, writing progress reports to `out`.
    ///
    /// Each command is dropped as soon as its launch-and-wait cycle returns.
    /// A report that cannot be written is logged and the batch carries on, so
    /// the returned outcomes always cover every command.
    pub fn run(
        &self,
        batch: CommandBatch,
        out: &mut dyn Write,
        reentry: &mut dyn Reentry,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(batch.len());

        for command in batch {
            if command.kind() == CommandKind::Reenter {
                debug!(program = command.program(), "re-entering read-execute loop");
                drop(command);
                if let Err(err) = reentry.reenter(out) {
                    warn!("nested session failed: {err:#}");
                }
                outcomes.push(Outcome::Reentered);
                continue;
            }

            debug!(program = command.program(), args = ?command.args(), "launching");
            // The child writes straight to the inherited descriptor, so the
            // header is flushed before the spawn.
            report(out, format_args!("Executing: {}\n", command.program()));

            let result = self.spawner.spawn(&command);
            drop(command);

            match result {
                Ok(result) => {
                    report(
                        out,
                        format_args!(
                            "Execution time: {}\nExit code: {}\n",
                            result.elapsed_display(),
                            result.status
                        ),
                    );
                    outcomes.push(Outcome::Finished(result));
                }
                Err(err) => {
                    warn!(backend = self.spawner.name(), "launch failed: {err}");
                    report(out, format_args!("Launch failed: {err}\n"));
                    outcomes.push(Outcome::LaunchFailed(err));
                }
            }
        }

        outcomes
    }
}

/// Write and flush one report, logging a failure instead of returning it.
fn report(out: &mut dyn Write, args: fmt::Arguments<'_>) {
    if let Err(err) = out.write_fmt(args).and_then(|()| out.flush()) {
        warn!(%err, "failed to write command report");
    }
}
