//! Consistency checker: heap walk, block checks, free-list sanity, and
//! coalescing sanity.
//!
//! This never runs on the hot path (spec.md §7 Non-goals rule out
//! always-on auditing); it's a diagnostic a caller opts into, the same way
//! `kernel-alloc`'s debug builds call `checkheap`-style routines under a
//! feature flag rather than on every allocation.

use crate::block::BlockRef;
use crate::config::DSIZE;
use crate::extend::RegionExtender;
use crate::free_list;
use crate::heap::Heap;
use alloc::vec::Vec;
use core::fmt;

/// Which sentinel block a [`CheckViolation::BadSentinel`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Prologue,
    Epilogue,
}

/// One violated invariant, naming the offending block(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckViolation {
    /// A payload pointer isn't double-word aligned.
    Misaligned { block: *const u8 },
    /// A block's header and footer words disagree.
    HeaderFooterMismatch { block: *const u8 },
    /// A block's size is zero (other than the epilogue) or not a
    /// double-word multiple.
    BadSize { block: *const u8, size: usize },
    /// A block reachable from the free list reports itself allocated.
    FreeListMemberAllocated { block: *const u8 },
    /// A block on the free list isn't reachable by walking from the
    /// prologue, or vice versa.
    MembershipMismatch { block: *const u8, on_free_list: bool },
    /// Two physically adjacent blocks are both free — coalescing missed one.
    AdjacentFreeBlocks { first: *const u8, second: *const u8 },
    /// The prologue or epilogue doesn't carry the expected header.
    BadSentinel { which: Sentinel },
    /// The heap walk ran far longer than any real heap should, i.e. it
    /// never reached the epilogue — a corrupt `next_block` chain.
    WalkDidNotTerminate,
    /// A block lies outside the region the extender actually granted.
    OutOfBounds { block: *const u8 },
}

/// Aggregate result of a [`Heap::check`] pass.
#[derive(Debug, Default, Clone)]
pub struct CheckReport {
    pub violations: Vec<CheckViolation>,
}

impl CheckReport {
    /// Whether no violations were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Human-readable summary, one violation per line — the printf-free
/// equivalent of the original's `printblock`/`checkheap` trace output.
impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return write!(f, "heap check: clean");
        }
        writeln!(f, "heap check: {} violation(s)", self.violations.len())?;
        for (i, v) in self.violations.iter().enumerate() {
            writeln!(f, "  [{i}] {v:?}")?;
        }
        Ok(())
    }
}

/// Generous bound on the number of blocks a walk should ever visit before
/// concluding the `next_block` chain is broken rather than just long.
const MAX_WALK_STEPS: usize = 1 << 24;

pub(crate) fn run<E: RegionExtender>(heap: &Heap<E>, verbose: bool) -> CheckReport {
    let mut report = CheckReport::default();

    let (Some(heap_start), Some(sentinel)) = (heap.heap_start(), heap.sentinel()) else {
        return report;
    };

    if heap_start.size() != DSIZE || !heap_start.is_allocated() {
        report.violations.push(CheckViolation::BadSentinel {
            which: Sentinel::Prologue,
        });
    }

    walk_heap(heap, heap_start, sentinel, &mut report);
    check_free_list(heap_start, sentinel, &mut report);

    if verbose {
        for v in &report.violations {
            log::warn!("heap check violation: {v:?}");
        }
    }
    report
}

/// Walk every block from the prologue to the epilogue via `next_block`,
/// checking each block's own shape and the no-adjacent-free-blocks
/// invariant, and cross-checking free blocks against the free list.
fn walk_heap<E: RegionExtender>(
    heap: &Heap<E>,
    heap_start: BlockRef,
    sentinel: BlockRef,
    report: &mut CheckReport,
) {
    let lo = heap.extender().heap_lo();
    let hi = heap.extender().heap_hi();

    let mut bp = heap_start;
    let mut steps = 0usize;
    loop {
        check_block(bp, lo, hi, report);

        if !bp.is_allocated() {
            let on_list = free_list::contains(sentinel, bp);
            if !on_list {
                report.violations.push(CheckViolation::MembershipMismatch {
                    block: bp.as_ptr(),
                    on_free_list: false,
                });
            }
            if bp.size() != 0 {
                let next = bp.next_block();
                if !next.is_allocated() {
                    report.violations.push(CheckViolation::AdjacentFreeBlocks {
                        first: bp.as_ptr(),
                        second: next.as_ptr(),
                    });
                }
            }
        }

        if bp.size() == 0 {
            // Reached the epilogue.
            if !bp.is_allocated() {
                report.violations.push(CheckViolation::BadSentinel {
                    which: Sentinel::Epilogue,
                });
            }
            break;
        }

        steps += 1;
        if steps > MAX_WALK_STEPS {
            report.violations.push(CheckViolation::WalkDidNotTerminate);
            break;
        }
        bp = bp.next_block();
    }
}

/// Every block reachable from the free list must report itself free, and
/// must also be reachable by the heap walk above (checked the other way
/// via `MembershipMismatch { on_free_list: false }`).
fn check_free_list(heap_start: BlockRef, sentinel: BlockRef, report: &mut CheckReport) {
    for bp in free_list::iter(sentinel) {
        if bp.is_allocated() {
            report
                .violations
                .push(CheckViolation::FreeListMemberAllocated { block: bp.as_ptr() });
        }
        if !reachable_from_heap_walk(heap_start, bp) {
            report.violations.push(CheckViolation::MembershipMismatch {
                block: bp.as_ptr(),
                on_free_list: true,
            });
        }
    }
}

fn reachable_from_heap_walk(heap_start: BlockRef, needle: BlockRef) -> bool {
    let mut bp = heap_start;
    let mut steps = 0usize;
    loop {
        if bp == needle {
            return true;
        }
        if bp.size() == 0 {
            return false;
        }
        steps += 1;
        if steps > MAX_WALK_STEPS {
            return false;
        }
        bp = bp.next_block();
    }
}


fn check_block(bp: BlockRef, lo: *const u8, hi: *const u8, report: &mut CheckReport) {
    if (bp.as_ptr() as usize) % DSIZE != 0 {
        report
            .violations
            .push(CheckViolation::Misaligned { block: bp.as_ptr() });
    }
    let addr = bp.as_ptr().cast_const();
    if addr < lo || addr > hi {
        report
            .violations
            .push(CheckViolation::OutOfBounds { block: bp.as_ptr() });
    }

    let size = bp.size();
    // The epilogue is the only block allowed size 0 and no footer.
    if size == 0 {
        return;
    }
    if size % DSIZE != 0 {
        report
            .violations
            .push(CheckViolation::BadSize { block: bp.as_ptr(), size });
    }
    if bp.header() != bp.footer() {
        report
            .violations
            .push(CheckViolation::HeaderFooterMismatch { block: bp.as_ptr() });
    }
}
