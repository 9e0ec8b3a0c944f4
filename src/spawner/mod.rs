//! Process creation backends.
//!
//! Every backend launches exactly one child per [`Command`], blocks until the
//! child terminates and reports its status together with the wall time spent.
//! Failures of the launch machinery itself come back as [`SpawnError`] so they
//! can never be confused with a status the child produced.

mod clone_stack;
mod fork_exec;
mod stack;

pub use clone_stack::CloneStack;
pub use fork_exec::ForkExec;
pub use stack::ChildStack;

use crate::command::{Command, ExitCode};
use crate::error::SpawnError;
use nix::errno::Errno;
use nix::libc::{self, c_char};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use std::ffi::CString;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Status and duration of one finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub status: ExitCode,
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// Elapsed time formatted as `<seconds>.<nanoseconds>s`.
    pub fn elapsed_display(&self) -> Elapsed {
        Elapsed(self.elapsed)
    }
}

/// Display adapter printing a duration with nine fractional digits.
pub struct Elapsed(pub Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.0.as_secs(), self.0.subsec_nanos())
    }
}

/// Object-safe interface shared by all process creation backends.
pub trait ProcessSpawner {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Status the child exits with when the program cannot be executed.
    fn not_found_status(&self) -> ExitCode;

    /// Launch `command`, wait for it and return its status.
    fn spawn(&self, command: &Command) -> Result<ExecutionResult, SpawnError>;
}

/// Selects one of the built-in backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    ForkExec,
    CloneStack,
}

impl Backend {
    /// Instantiate the backend. `stack_size` only matters for [`Backend::CloneStack`].
    pub fn spawner(self, stack_size: usize) -> Box<dyn ProcessSpawner> {
        match self {
            Backend::ForkExec => Box::new(ForkExec),
            Backend::CloneStack => Box::new(CloneStack::new(stack_size)),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fork" | "fork-exec" => Ok(Backend::ForkExec),
            "clone" | "clone-stack" => Ok(Backend::CloneStack),
            other => Err(format!(
                "unknown backend `{other}`, expected `fork` or `clone`"
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::ForkExec => f.write_str("fork"),
            Backend::CloneStack => f.write_str("clone"),
        }
    }
}

/// Everything a child needs to replace its image, prepared before the child
/// exists so the child never allocates.
pub(crate) struct ExecImage {
    argv: Vec<CString>,
    /// Pointers into `argv`, closed by a null end-of-list marker.
    argv_ptrs: Vec<*const c_char>,
    not_found: Vec<u8>,
}

impl ExecImage {
    pub(crate) fn prepare(command: &Command) -> Result<Self, SpawnError> {
        let argv = command.to_cstrings()?;
        let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
        argv_ptrs.push(std::ptr::null());
        let not_found = format!("Command not found: {}\n", command.program()).into_bytes();
        Ok(Self {
            argv,
            argv_ptrs,
            not_found,
        })
    }

    /// Replace the current process image with the prepared program.
    ///
    /// Only returns when exec failed, after writing the not-found message to
    /// this process's standard output.
    ///
    /// # Safety
    ///
    /// Must only be called inside a freshly created child process.
    pub(crate) unsafe fn replace_image(&self) {
        unsafe {
            libc::execvp(self.argv[0].as_ptr(), self.argv_ptrs.as_ptr());
            libc::write(
                libc::STDOUT_FILENO,
                self.not_found.as_ptr().cast(),
                self.not_found.len(),
            );
        }
    }
}

/// Measure the wall time of a launch-and-wait cycle.
pub(crate) fn timed<F>(launch: F) -> Result<ExecutionResult, SpawnError>
where
    F: FnOnce() -> Result<ExitCode, SpawnError>,
{
    let started = Instant::now();
    let status = launch()?;
    Ok(ExecutionResult {
        status,
        elapsed: started.elapsed(),
    })
}

/// Block until `pid` terminates and translate its wait status.
///
/// A child killed by a signal reports `128 + signal`, the usual shell convention.
pub(crate) fn wait_for(pid: Pid) -> Result<ExitCode, SpawnError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(%pid, code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!(%pid, ?signal, "child killed by signal");
                return Ok(128 + signal as i32);
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(err) => return Err(SpawnError::Wait(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_has_nine_fraction_digits() {
        let elapsed = Elapsed(Duration::new(2, 5_000));
        assert_eq!(elapsed.to_string(), "2.000005000s");
        assert_eq!(Elapsed(Duration::ZERO).to_string(), "0.000000000s");
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("fork".parse::<Backend>(), Ok(Backend::ForkExec));
        assert_eq!("clone-stack".parse::<Backend>(), Ok(Backend::CloneStack));
        assert!("vfork".parse::<Backend>().is_err());
        assert_eq!(Backend::CloneStack.to_string(), "clone");
    }

    #[test]
    fn test_argv_is_null_terminated() {
        let cmd = Command::program_from(&["echo", "hi"]).unwrap();
        let image = ExecImage::prepare(&cmd).unwrap();
        assert_eq!(image.argv_ptrs.len(), 3);
        assert!(image.argv_ptrs[2].is_null());
        assert_eq!(image.not_found, b"Command not found: echo\n");
    }

    #[test]
    fn test_nul_in_argument_is_a_spawn_error() {
        let cmd = Command::program_from(&["echo", "a\0b"]).unwrap();
        let err = ExecImage::prepare(&cmd).err().expect("prepare should fail");
        assert!(matches!(err, SpawnError::InvalidArgument(_)));
    }

    #[test]
    fn test_backends_keep_their_own_not_found_status() {
        assert_eq!(Backend::ForkExec.spawner(4096).not_found_status(), 1);
        assert_eq!(Backend::CloneStack.spawner(4096).not_found_status(), 127);
    }
}
