//! Region-extension primitive.
//!
//! This is the external collaborator spec.md §1 calls out as out of scope:
//! a monotonic "extend the region by N bytes" call, plus queries for the
//! region's bounds. The heap consumes it through a trait rather than a free
//! function, the same separation this codebase already draws between an
//! allocator and its backend (`FrameAlloc`/`PhysMapper` in `kernel-vmem`,
//! consumed by `kernel-alloc::vmm::Vmm`).
//!
//! Production code backs this with a real `sbrk`-like syscall or a static
//! `.bss` arena; `#[cfg(test)]` code backs it with an in-memory byte buffer
//! (below).

/// A caller-supplied, monotonically-growable memory region.
///
/// # Safety
/// Implementors must guarantee that the byte range returned by a successful
/// `extend` remains valid, writable, and exclusively owned by the heap for
/// the remaining lifetime of the region — the heap never shrinks it and
/// never revisits bytes outside `[heap_lo(), heap_hi())`.
pub unsafe trait RegionExtender {
    /// Grow the region by `n_bytes`, returning the address of the first new
    /// byte, or `None` if the region could not be grown (the "error
    /// sentinel" of spec.md §6, rendered as `Option` rather than a
    /// distinguished pointer value).
    fn extend(&mut self, n_bytes: usize) -> Option<*mut u8>;

    /// Lowest address currently owned by the region.
    fn heap_lo(&self) -> *const u8;

    /// One past the highest address currently owned by the region.
    fn heap_hi(&self) -> *const u8;

    /// Current size of the region in bytes (`heap_hi() - heap_lo()`).
    fn heap_size(&self) -> usize;
}
