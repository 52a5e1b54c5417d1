//! Block layout and boundary tags.
//!
//! Every block, free or allocated, is a header word, a payload/link area of
//! at least two words, and a footer word:
//!
//! ```text
//! [ header: 1 word ] [ payload/link area: >= 2 words ] [ footer: 1 word ]
//! ```
//!
//! Header and footer both hold `size | allocated_bit`: the low bit carries
//! the allocation flag, the remaining bits carry the total block size
//! (header + payload + footer, padded to a double-word multiple). A "block
//! pointer" always points at the first payload byte, one word past the
//! header.
//!
//! All unsafe pointer arithmetic on untyped heap bytes is confined to the
//! `read_word`/`write_word` primitives here; every other module in this
//! crate builds on the safe-looking `BlockRef` view below instead of raw
//! offsets.

use crate::config::{DSIZE, WSIZE};
use core::ptr;

const ALLOC_BIT: usize = 0x1;
const SIZE_MASK: usize = !(DSIZE - 1);

/// Read a word at a raw byte address.
///
/// # Safety
/// `addr` must be valid for reads of `WSIZE` bytes and correctly aligned.
#[inline]
pub unsafe fn read_word(addr: *const u8) -> usize {
    unsafe { ptr::read(addr.cast::<usize>()) }
}

/// Write a word at a raw byte address.
///
/// # Safety
/// `addr` must be valid for writes of `WSIZE` bytes and correctly aligned.
#[inline]
pub unsafe fn write_word(addr: *mut u8, value: usize) {
    unsafe { ptr::write(addr.cast::<usize>(), value) };
}

/// Pack a size and allocated bit into a header/footer word.
#[inline]
#[must_use]
pub const fn pack(size: usize, allocated: bool) -> usize {
    size | (allocated as usize)
}

/// Extract the size field from a header/footer word.
#[inline]
#[must_use]
pub const fn unpack_size(word: usize) -> usize {
    word & SIZE_MASK
}

/// Extract the allocated bit from a header/footer word.
#[inline]
#[must_use]
pub const fn unpack_alloc(word: usize) -> bool {
    word & ALLOC_BIT != 0
}

/// A view over one block, addressed by its payload pointer (`bp`).
///
/// Cheap to construct and copy; it carries no state beyond the pointer
/// itself, the same way this codebase's `PhysicalAddress`/`VirtualAddress`
/// newtypes wrap a bare integer rather than caching derived data.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct BlockRef {
    bp: *mut u8,
}

impl BlockRef {
    /// Wrap a payload pointer as a block view.
    ///
    /// # Safety
    /// `bp` must point at the payload of a live, well-formed block (header
    /// at `bp - WSIZE` must be readable and its footer, if the block is not
    /// the epilogue, reachable at `bp + size - DSIZE`).
    #[inline]
    #[must_use]
    pub const unsafe fn new(bp: *mut u8) -> Self {
        Self { bp }
    }

    /// The payload pointer itself — what callers of `allocate` receive.
    #[inline]
    #[must_use]
    pub const fn as_ptr(self) -> *mut u8 {
        self.bp
    }

    #[inline]
    fn header_addr(self) -> *mut u8 {
        self.bp.wrapping_sub(WSIZE)
    }

    /// Read this block's header word.
    #[inline]
    #[must_use]
    pub fn header(self) -> usize {
        unsafe { read_word(self.header_addr()) }
    }

    /// This block's total size (header + payload + footer), in bytes.
    #[inline]
    #[must_use]
    pub fn size(self) -> usize {
        unpack_size(self.header())
    }

    /// Whether this block is currently allocated.
    #[inline]
    #[must_use]
    pub fn is_allocated(self) -> bool {
        unpack_alloc(self.header())
    }

    #[inline]
    fn footer_addr(self) -> *mut u8 {
        self.bp.wrapping_add(self.size()).wrapping_sub(DSIZE)
    }

    /// Read this block's footer word.
    ///
    /// Not valid for the epilogue, which has no footer.
    #[inline]
    #[must_use]
    pub fn footer(self) -> usize {
        unsafe { read_word(self.footer_addr()) }
    }

    /// Write `(size, allocated)` into both this block's header and footer.
    ///
    /// The footer address is derived from the `size` argument, not from the
    /// (possibly stale) current header — callers rewriting a block to a new
    /// size, as coalescing does, must have the footer land at the new end of
    /// the block, not the old one.
    ///
    /// Not valid for the epilogue (no footer to write).
    #[inline]
    pub fn set_header_footer(self, size: usize, allocated: bool) {
        let word = pack(size, allocated);
        let footer_addr = self.bp.wrapping_add(size).wrapping_sub(DSIZE);
        unsafe {
            write_word(self.header_addr(), word);
            write_word(footer_addr, word);
        }
    }

    /// Write only the header word (used for the zero-size epilogue, which
    /// has no footer).
    #[inline]
    pub fn set_header_only(self, size: usize, allocated: bool) {
        unsafe { write_word(self.header_addr(), pack(size, allocated)) };
    }

    /// The block physically following this one (valid as long as this block
    /// is not the epilogue: the epilogue's own "next block" is undefined).
    #[inline]
    #[must_use]
    pub fn next_block(self) -> BlockRef {
        unsafe { BlockRef::new(self.bp.wrapping_add(self.size())) }
    }

    /// The block physically preceding this one, found via its footer.
    ///
    /// Invalid when called on the block right after the prologue (there is
    /// no block before it); callers must not call this on `heap_start`.
    #[inline]
    #[must_use]
    pub fn prev_block(self) -> BlockRef {
        let prev_footer_addr = self.header_addr().wrapping_sub(WSIZE);
        let prev_size = unpack_size(unsafe { read_word(prev_footer_addr) });
        unsafe { BlockRef::new(self.bp.wrapping_sub(prev_size)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let word = pack(64, true);
        assert_eq!(unpack_size(word), 64);
        assert!(unpack_alloc(word));

        let word = pack(128, false);
        assert_eq!(unpack_size(word), 128);
        assert!(!unpack_alloc(word));
    }

    #[test]
    fn allocated_bit_does_not_perturb_size() {
        // Sizes are always double-word multiples, so the low bit is free
        // for the allocated flag without masking away any size bits.
        for size in [16usize, 32, 4096, 1 << 20] {
            assert_eq!(unpack_size(pack(size, true)), size);
            assert_eq!(unpack_size(pack(size, false)), size);
        }
    }

    /// A freestanding buffer big enough to host a handful of blocks, used to
    /// exercise `BlockRef` without going through `Heap`/`RegionExtender`.
    fn arena(words: usize) -> alloc::vec::Vec<u8> {
        alloc::vec![0u8; words * WSIZE]
    }

    #[test]
    fn set_header_footer_places_footer_at_new_size() {
        let mut buf = arena(16);
        // Payload pointer two words in, leaving room for a header before it.
        let bp = unsafe { BlockRef::new(buf.as_mut_ptr().add(WSIZE)) };

        bp.set_header_footer(8 * WSIZE, false);
        assert_eq!(bp.size(), 8 * WSIZE);
        assert!(!bp.is_allocated());
        assert_eq!(bp.header(), bp.footer());

        // Shrinking (as a split does) must move the footer, not leave the
        // old one stale at the previous size's offset.
        bp.set_header_footer(4 * WSIZE, true);
        assert_eq!(bp.size(), 4 * WSIZE);
        assert!(bp.is_allocated());
        assert_eq!(bp.header(), bp.footer());
    }

    #[test]
    fn next_and_prev_block_are_inverses() {
        let mut buf = arena(16);
        let bp = unsafe { BlockRef::new(buf.as_mut_ptr().add(WSIZE)) };
        bp.set_header_footer(4 * WSIZE, false);

        let next = bp.next_block();
        next.set_header_footer(4 * WSIZE, true);

        assert_eq!(next.prev_block(), bp);
    }
}
