//! # Explicit Free-List Heap Allocator
//!
//! A general-purpose dynamic memory allocator over a single, contiguous,
//! monotonically-growable region of memory. It implements the classic
//! allocate / free / reallocate surface of a heap manager and is built to
//! stand in for the system allocator via [`GlobalAlloc`](core::alloc::GlobalAlloc)
//! (see [`global`], behind the `global` feature).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Heap<E>                           │
//! │   • init / allocate / free / reallocate              │
//! │   • find_fit (first-fit) + place (split-on-excess)    │
//! │   • coalesce (four-case boundary-tag merge)           │
//! └─────────────────┬─────────────────────┬───────────────┘
//!                   │                     │
//! ┌─────────────────▼───────┐ ┌───────────▼───────────────┐
//! │      block               │ │        free_list           │
//! │  header/footer encoding  │ │  circular doubly-linked     │
//! │  neighbor navigation     │ │  list threaded through      │
//! └───────────────────────────┘ │  free-block payloads       │
//!                               └─────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              RegionExtender (caller-supplied)        │
//! │   • extend(n) -> new bytes, sbrk-like                │
//! │   • heap_lo / heap_hi / heap_size                    │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! The heap never talks to the region extender except through its own
//! epilogue sentinel; every byte between the region start and the current
//! break belongs to the heap, laid out as a chain of blocks terminated by a
//! zero-size allocated epilogue header (see [`block`]).
//!
//! ## Safety model
//!
//! All pointer arithmetic on raw heap bytes is confined to [`block`]'s
//! `read_word`/`write_word` primitives and the views built on top of them.
//! Everything above that — placement, coalescing, the free list, realloc —
//! is ordinary safe Rust operating on those views. The crate is
//! single-threaded and non-reentrant by design (see `SPEC_FULL.md` §7): it
//! does not lock anything internally. A caller wiring this into a
//! `#[global_allocator]` on a multi-threaded target is responsible for
//! wrapping a [`Heap`] in their own mutex, the same way this codebase keeps
//! `SpinLock<FreeListAllocator>` as a concern separate from the allocator
//! logic it wraps.
//!
//! ## Example
//! ```
//! use heap_alloc::{Heap, RegionExtender};
//!
//! struct VecExtender { storage: Vec<u8>, cap: usize }
//!
//! // SAFETY: capacity for `cap` bytes is reserved up front and never
//! // exceeded, so growing `storage` never reallocates and moves bytes
//! // already handed out by a prior `extend` call.
//! unsafe impl RegionExtender for VecExtender {
//!     fn extend(&mut self, n_bytes: usize) -> Option<*mut u8> {
//!         let start = self.storage.len();
//!         if start + n_bytes > self.cap {
//!             return None;
//!         }
//!         self.storage.resize(start + n_bytes, 0);
//!         Some(self.storage.as_mut_ptr().wrapping_add(start))
//!     }
//!     fn heap_lo(&self) -> *const u8 { self.storage.as_ptr() }
//!     fn heap_hi(&self) -> *const u8 { self.storage.as_ptr().wrapping_add(self.storage.len()) }
//!     fn heap_size(&self) -> usize { self.storage.len() }
//! }
//!
//! let mut storage = Vec::new();
//! storage.reserve(1 << 20);
//! let mut heap = Heap::new(VecExtender { storage, cap: 1 << 20 });
//! heap.init().unwrap();
//! let p = heap.allocate(100).unwrap();
//! heap.free(p);
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod block;
pub mod check;
pub mod config;
pub mod error;
pub mod extend;
pub mod free_list;
mod heap;

#[cfg(feature = "global")]
pub mod global;

pub use error::AllocError;
pub use extend::RegionExtender;
pub use heap::Heap;
