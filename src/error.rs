//! Error types for the heap.
//!
//! Zero-size allocations and null-pointer frees are not errors — spec-wise
//! they are no-ops (`allocate(0) -> null`, `free(null) -> ()`) — so they
//! never appear here. This enum only covers the outcomes spec.md §7 calls
//! out as genuine error kinds the caller must be able to branch on.

/// Errors a [`crate::Heap`] can report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// The region extender refused to grow the heap (resource exhaustion).
    #[error("region extender failed to grow the heap")]
    OutOfMemory,
    /// [`crate::Heap::init`] was called on an already-initialized heap.
    #[error("heap already initialized")]
    AlreadyInitialized,
    /// An operation other than `init` was attempted before `init` ran.
    #[error("heap not initialized")]
    NotInitialized,
}
