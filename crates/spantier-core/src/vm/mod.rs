//! Virtual-memory source.
//!
//! The span allocator consumes, but does not implement, a page-granularity
//! view of process address space: reserve, commit, decommit, release. The
//! interface is injected at construction so the core stays free of hidden
//! process-wide state and can be driven by a test double.
//!
//! [`SystemVm`] is the production implementation: anonymous private
//! mappings reserved with `PROT_NONE`, committed with `mprotect`, and
//! decommitted with `madvise(MADV_DONTNEED)` so the range stays usable
//! while its physical backing is returned to the OS.

use crate::error::VmError;

/// Fixed allocation granularity of the span layer, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Page-range operations on process address space.
///
/// All addresses are page-aligned `usize` values. Failures carry the OS
/// errno; they indicate an environment problem, not allocator state.
pub trait VirtualMemory {
    /// Reserves a contiguous page-aligned range without committing backing
    /// storage. Returns the base address.
    fn reserve(&mut self, page_count: usize) -> Result<usize, VmError>;

    /// Reserves and commits in one step.
    fn reserve_and_commit(&mut self, page_count: usize) -> Result<usize, VmError> {
        let base = self.reserve(page_count)?;
        if let Err(err) = self.commit(base, page_count) {
            let _ = self.release(base, page_count);
            return Err(err);
        }
        Ok(base)
    }

    /// Makes a reserved, currently-uncommitted range read/write accessible.
    fn commit(&mut self, base: usize, page_count: usize) -> Result<(), VmError>;

    /// Releases physical backing while keeping the range reserved and
    /// accessible. Idempotent on already-decommitted ranges; the next
    /// touch reads as zero.
    fn decommit(&mut self, base: usize, page_count: usize) -> Result<(), VmError>;

    /// Frees an entire reservation. Must be called with the exact
    /// base/size pair originally returned by `reserve`.
    fn release(&mut self, base: usize, page_count: usize) -> Result<(), VmError>;
}

fn byte_len(page_count: usize) -> Option<usize> {
    page_count.checked_mul(PAGE_SIZE)
}

/// Production virtual-memory source backed by mmap/mprotect/madvise/munmap.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemVm;

#[cfg(unix)]
impl SystemVm {
    fn errno() -> i32 {
        std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
    }
}

#[cfg(unix)]
impl VirtualMemory for SystemVm {
    fn reserve(&mut self, page_count: usize) -> Result<usize, VmError> {
        let len = byte_len(page_count).ok_or(VmError::Reserve {
            pages: page_count,
            errno: libc::ENOMEM,
        })?;
        // SAFETY: anonymous mapping at a kernel-chosen address; no aliasing
        // of existing Rust objects is possible.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(VmError::Reserve {
                pages: page_count,
                errno: Self::errno(),
            });
        }
        Ok(ptr as usize)
    }

    fn commit(&mut self, base: usize, page_count: usize) -> Result<(), VmError> {
        let len = byte_len(page_count).ok_or(VmError::Commit {
            base,
            pages: page_count,
            errno: libc::ENOMEM,
        })?;
        // SAFETY: `base` was returned by `reserve` and the range is still
        // mapped; mprotect does not move or free it.
        let rc = unsafe {
            libc::mprotect(
                base as *mut libc::c_void,
                len,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if rc != 0 {
            return Err(VmError::Commit {
                base,
                pages: page_count,
                errno: Self::errno(),
            });
        }
        Ok(())
    }

    fn decommit(&mut self, base: usize, page_count: usize) -> Result<(), VmError> {
        let len = byte_len(page_count).ok_or(VmError::Decommit {
            base,
            pages: page_count,
            errno: libc::ENOMEM,
        })?;
        // SAFETY: the range stays mapped; MADV_DONTNEED only drops the
        // physical pages, which is idempotent.
        let rc = unsafe { libc::madvise(base as *mut libc::c_void, len, libc::MADV_DONTNEED) };
        if rc != 0 {
            return Err(VmError::Decommit {
                base,
                pages: page_count,
                errno: Self::errno(),
            });
        }
        Ok(())
    }

    fn release(&mut self, base: usize, page_count: usize) -> Result<(), VmError> {
        let len = byte_len(page_count).ok_or(VmError::Release {
            base,
            pages: page_count,
            errno: libc::ENOMEM,
        })?;
        // SAFETY: exact base/length pair originally produced by `reserve`;
        // the caller hands over sole ownership of the mapping.
        let rc = unsafe { libc::munmap(base as *mut libc::c_void, len) };
        if rc != 0 {
            return Err(VmError::Release {
                base,
                pages: page_count,
                errno: Self::errno(),
            });
        }
        Ok(())
    }
}
