use super::{ExecImage, ExecutionResult, ProcessSpawner, timed, wait_for};
use crate::command::{Command, ExitCode};
use crate::error::SpawnError;
use nix::libc;
use nix::unistd::{ForkResult, fork};
use tracing::debug;

/// Classic backend: duplicate the process, replace the duplicate's image.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkExec;

impl ForkExec {
    pub const NOT_FOUND_STATUS: ExitCode = 1;
}

impl ProcessSpawner for ForkExec {
    fn name(&self) -> &'static str {
        "fork"
    }

    fn not_found_status(&self) -> ExitCode {
        Self::NOT_FOUND_STATUS
    }

    fn spawn(&self, command: &Command) -> Result<ExecutionResult, SpawnError> {
        let image = ExecImage::prepare(command)?;
        timed(|| {
            // SAFETY: the child only runs execvp, write and _exit on memory
            // prepared before the fork.
            match unsafe { fork() }.map_err(SpawnError::Fork)? {
                ForkResult::Child => unsafe {
                    image.replace_image();
                    libc::_exit(Self::NOT_FOUND_STATUS)
                },
                ForkResult::Parent { child } => {
                    debug!(pid = %child, program = command.program(), "forked");
                    wait_for(child)
                }
            }
        })
    }
}
