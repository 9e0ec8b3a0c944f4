use crate::error::SpawnError;
use nix::errno::Errno;
use nix::libc::c_void;
use nix::sys::mman::{MapFlags, ProtFlags, mmap_anonymous, munmap};
use std::num::NonZeroUsize;
use std::ptr::NonNull;
use tracing::warn;

/// Anonymous memory mapping used as the stack of a cloned child.
///
/// The mapping is released when the guard is dropped, whichever way the
/// launch ends.
pub struct ChildStack {
    base: NonNull<c_void>,
    len: NonZeroUsize,
}

impl ChildStack {
    /// Map `size` bytes of private read/write memory.
    pub fn allocate(size: usize) -> Result<Self, SpawnError> {
        let len = NonZeroUsize::new(size).ok_or(SpawnError::StackAllocation(Errno::EINVAL))?;
        // SAFETY: a fresh anonymous mapping aliases no existing memory.
        let base = unsafe {
            mmap_anonymous(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE,
            )
        }
        .map_err(SpawnError::StackAllocation)?;
        Ok(Self { base, len })
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is `len` bytes, readable and writable, and owned
        // exclusively by this guard until drop.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().cast::<u8>(), self.len.get()) }
    }
}

impl Drop for ChildStack {
    fn drop(&mut self) {
        // SAFETY: `base`/`len` describe the mapping created in `allocate`, and
        // no slice borrowed from it outlives `self`.
        if let Err(err) = unsafe { munmap(self.base, self.len.get()) } {
            warn!(%err, "failed to unmap child stack");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_is_writable_end_to_end() {
        let mut stack = ChildStack::allocate(64 * 1024).unwrap();
        assert_eq!(stack.len(), 64 * 1024);
        let slice = stack.as_mut_slice();
        slice[0] = 0xAA;
        let last = slice.len() - 1;
        slice[last] = 0x55;
        assert_eq!(slice[0], 0xAA);
        assert_eq!(slice[last], 0x55);
    }

    #[test]
    fn test_zero_size_is_an_allocation_error() {
        let err = ChildStack::allocate(0).err().expect("zero-sized stack must fail");
        assert!(matches!(err, SpawnError::StackAllocation(Errno::EINVAL)));
    }
}
