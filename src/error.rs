//! Error types for the process spawner.
//!
//! A [`SpawnError`] means the launch machinery failed before a child status
//! existed. It is never turned into an exit code.

use nix::errno::Errno;
use std::ffi::NulError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpawnError {
    /// An argument cannot be passed to exec because it contains a NUL byte.
    #[error("argument contains an interior NUL byte: {0}")]
    InvalidArgument(#[from] NulError),

    /// Mapping the child stack failed.
    #[error("failed to allocate child stack: {0}")]
    StackAllocation(#[source] Errno),

    #[error("fork failed: {0}")]
    Fork(#[source] Errno),

    #[error("clone failed: {0}")]
    Clone(#[source] Errno),

    /// The child was created but waiting on it failed.
    #[error("waitpid failed: {0}")]
    Wait(#[source] Errno),
}
