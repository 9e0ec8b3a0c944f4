use super::{ChildStack, ExecImage, ExecutionResult, ProcessSpawner, timed, wait_for};
use crate::command::{Command, ExitCode};
use crate::error::SpawnError;
use nix::libc;
use nix::sched::{CloneCb, CloneFlags, clone};
use tracing::debug;

/// Lower-level backend: map a dedicated stack and `clone` the child onto it.
///
/// No `CLONE_VM`, so the child gets its own copy of the address space, just
/// like after a fork, and runs its entry point on the mapped stack.
#[derive(Debug, Clone, Copy)]
pub struct CloneStack {
    stack_size: usize,
}

impl CloneStack {
    pub const NOT_FOUND_STATUS: ExitCode = 127;

    pub fn new(stack_size: usize) -> Self {
        Self { stack_size }
    }
}

impl ProcessSpawner for CloneStack {
    fn name(&self) -> &'static str {
        "clone"
    }

    fn not_found_status(&self) -> ExitCode {
        Self::NOT_FOUND_STATUS
    }

    fn spawn(&self, command: &Command) -> Result<ExecutionResult, SpawnError> {
        let image = ExecImage::prepare(command)?;
        timed(|| {
            let mut stack = ChildStack::allocate(self.stack_size)?;
            let entry: CloneCb<'_> = Box::new(|| {
                // SAFETY: runs as the entry point of the new process.
                unsafe { image.replace_image() };
                Self::NOT_FOUND_STATUS as isize
            });
            // SAFETY: the child owns a copy of everything the entry point
            // touches; SIGCHLD makes it waitable like a forked child.
            let pid = unsafe {
                clone(
                    entry,
                    stack.as_mut_slice(),
                    CloneFlags::empty(),
                    Some(libc::SIGCHLD),
                )
            }
            .map_err(SpawnError::Clone)?;
            debug!(%pid, program = command.program(), stack = stack.len(), "cloned");

            let status = wait_for(pid);
            drop(stack);
            status
        })
    }
}
