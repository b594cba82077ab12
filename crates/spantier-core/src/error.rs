//! Typed errors for the allocator core.
//!
//! Only two situations produce typed errors: the OS virtual-memory boundary
//! failing, and invalid reservation parameters at `SpanAllocator`
//! construction. Everything else follows the allocator's error taxonomy:
//! precondition violations panic (caller bugs), and exhaustion is an
//! ordinary `None` return that propagates unchanged through the tiers.

use thiserror::Error;

/// Failure at the virtual-memory source boundary.
///
/// Carries the failing operation and the OS errno so an environment problem
/// (address space pressure, rlimits) can be told apart from ordinary
/// allocator exhaustion.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum VmError {
    #[error("reserve of {pages} pages failed (errno {errno})")]
    Reserve { pages: usize, errno: i32 },
    #[error("commit of {pages} pages at {base:#x} failed (errno {errno})")]
    Commit {
        base: usize,
        pages: usize,
        errno: i32,
    },
    #[error("decommit of {pages} pages at {base:#x} failed (errno {errno})")]
    Decommit {
        base: usize,
        pages: usize,
        errno: i32,
    },
    #[error("release of {pages} pages at {base:#x} failed (errno {errno})")]
    Release {
        base: usize,
        pages: usize,
        errno: i32,
    },
}

/// Failure constructing a [`crate::span::SpanAllocator`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SpanCreateError {
    /// Reservation sizes must be an exact power of two pages.
    #[error("reserved page count {0} is not a power of two")]
    NotPowerOfTwo(usize),
    /// Reservations below the minimum cannot fit control pages plus a
    /// useful span mix.
    #[error("reserved page count {requested} is below the minimum of {min}")]
    TooFewPages { requested: usize, min: usize },
    /// Caller-supplied memory must start on a page boundary.
    #[error("supplied base address {0:#x} is not page aligned")]
    UnalignedBase(usize),
    /// The virtual-memory source refused the reservation.
    #[error(transparent)]
    Vm(#[from] VmError),
}
