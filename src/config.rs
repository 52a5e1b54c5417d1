//! Compile-time tuning constants.
//!
//! There is no runtime configuration surface (no files, no env vars,
//! no CLI) — the heap's shape is fixed at compile time, the same way
//! `kernel-alloc/src/static_heap.rs` fixes `HEAP_SIZE` as a `const` rather
//! than reading it from anywhere.

use core::mem::size_of;

/// Size of a word: the natural pointer-sized unit.
pub const WSIZE: usize = size_of::<usize>();

/// Size of a double-word. All block sizes are multiples of this.
pub const DSIZE: usize = 2 * WSIZE;

/// Amount (bytes) to extend the heap by when no fit is found.
pub const CHUNKSIZE: usize = 4096;

/// Minimum block size in words: header + prev-link + next-link + footer.
pub const MIN_BLOCK_WORDS: usize = 4;

/// Minimum block size in bytes.
pub const MIN_BLOCK_SIZE: usize = MIN_BLOCK_WORDS * WSIZE;

/// `place` splits a fit only if the remainder is at least this many
/// double-words — large enough to not immediately become a useless sliver.
pub const SPLIT_THRESHOLD_DWORDS: usize = 3;

/// Round `n` up to the next multiple of `align` (`align` must be a power of two).
#[inline]
#[must_use]
pub const fn round_up(n: usize, align: usize) -> usize {
    (n + (align - 1)) & !(align - 1)
}
