//! The shared flat memory region and each worker's private bump allocator
//! over its partition of it.

use crate::error::RuntimeError;
use crate::link::{Lnk, MAX_VAL};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A default heap size suitable for interactive use: 64 Mi words (512 MiB).
pub const DEFAULT_HEAP_WORDS: usize = 64 * 1024 * 1024;

/// Maximum arity of any node (constructor, function call, or rule
/// right-hand side), bounding the exact-size free-list array.
pub const MAX_ARITY: usize = 256;

/// The address holding the root link of the graph under reduction.
pub const ROOT: u32 = 0;

/// The shared, process-wide array of tagged link words, plus the
/// duplication-node lock bits. Every word is touched through relaxed
/// atomics: cross-worker synchronization is provided
/// by the fork/join protocol in `pool.rs`, not by the memory ordering of
/// individual word accesses.
pub struct Heap {
  mem: Box<[AtomicU64]>,
  /// One flag per heap position; only positions that are the slot-2 subject
  /// of a live duplication node are ever locked, but the array is addressed
  /// directly by heap position rather than by a separate dense index.
  dup_lock: Box<[AtomicBool]>,
}

impl Heap {
  /// Builds a heap of exactly `words` words, shared across `workers` equal
  /// partitions.
  pub fn new(words: usize, workers: usize) -> Result<Heap, RuntimeError> {
    if workers == 0 {
      return Err(RuntimeError::NoWorkers);
    }
    if words == 0 || words - 1 > MAX_VAL as usize {
      return Err(RuntimeError::HeapTooLarge { requested: words, max: MAX_VAL as usize + 1 });
    }
    if words % workers != 0 {
      return Err(RuntimeError::HeapNotDivisible { workers });
    }
    let mut mem = Vec::with_capacity(words);
    mem.resize_with(words, || AtomicU64::new(0));
    let mut dup_lock = Vec::with_capacity(words);
    dup_lock.resize_with(words, || AtomicBool::new(false));
    Ok(Heap { mem: mem.into_boxed_slice(), dup_lock: dup_lock.into_boxed_slice() })
  }

  pub fn len(&self) -> usize {
    self.mem.len()
  }

  #[inline]
  pub fn get(&self, addr: u32) -> Lnk {
    Lnk(self.mem[addr as usize].load(Ordering::Relaxed))
  }

  #[inline]
  pub fn set(&self, addr: u32, lnk: Lnk) {
    self.mem[addr as usize].store(lnk.0, Ordering::Relaxed);
  }

  #[inline]
  pub fn cas(&self, addr: u32, expected: Lnk, new: Lnk) -> bool {
    self.mem[addr as usize].compare_exchange(expected.0, new.0, Ordering::Relaxed, Ordering::Relaxed).is_ok()
  }

  /// Attempts to acquire the duplication lock at `addr`. Returns `true` on
  /// success. Used by `DP0`/`DP1` descent to resolve two workers racing
  /// through the two projections of the same fan.
  #[inline]
  pub fn try_lock_dup(&self, addr: u32) -> bool {
    self.dup_lock[addr as usize].swap(true, Ordering::Acquire) == false
  }

  #[inline]
  pub fn unlock_dup(&self, addr: u32) {
    self.dup_lock[addr as usize].store(false, Ordering::Release);
  }
}

/// A worker's private view of its slice of the heap: a bump-allocated
/// frontier plus one free-list per exact node size. Never shared between
/// workers — only the `Heap` words it writes into are shared.
pub struct Partition {
  base: u32,
  limit: u32,
  next: u32,
  free: Vec<Vec<u32>>,
}

impl Partition {
  /// `tid` is the worker index; `size` is this partition's word count.
  /// Worker 0's partition reserves address [`ROOT`] for the root link, so
  /// its allocator starts one word past its base, plus `reserved` further
  /// words for data an external caller already wrote directly after
  /// [`ROOT`] (e.g. a call's argument block laid out before the first
  /// `normalize`). `reserved` is ignored for any other worker, since only
  /// worker 0's partition ever starts at [`ROOT`].
  pub fn new(tid: usize, size: u32, reserved: u32) -> Partition {
    let base = tid as u32 * size;
    let next = if tid == 0 { base + 1 + reserved } else { base };
    Partition { base, limit: base + size, next, free: vec![Vec::new(); MAX_ARITY + 1] }
  }

  pub fn alloc(&mut self, size: u32) -> u32 {
    if size == 0 {
      return 0;
    }
    if let Some(loc) = self.free[size as usize].pop() {
      return loc;
    }
    let loc = self.next;
    let new_next = self.next + size;
    assert!(new_next <= self.limit, "heap exhausted: worker partition [{}, {}) cannot fit {} more words", self.base, self.limit, size);
    self.next = new_next;
    loc
  }

  pub fn clear(&mut self, loc: u32, size: u32) {
    if size == 0 {
      return;
    }
    self.free[size as usize].push(loc);
  }

  pub fn words_used(&self) -> u32 {
    self.next - self.base
  }
}

/// Per-worker monotonic generator of fan/duplication colors (the 24-bit
/// `ext` field of SUP/DP0/DP1 links), seeded with a disjoint range per
/// worker so no two workers ever mint the same color.
pub struct ColorGen {
  next: u32,
  limit: u32,
}

/// Width of the color space (`ext` is 24 bits).
const COLOR_SPACE: u32 = 1 << 24;

impl ColorGen {
  pub fn new(tid: usize, workers: usize) -> ColorGen {
    let workers = workers.max(1) as u32;
    let space = COLOR_SPACE / workers;
    let base = tid as u32 * space;
    ColorGen { next: base, limit: base + space }
  }

  pub fn fresh(&mut self) -> u32 {
    debug_assert!(self.next < self.limit, "color space exhausted for this worker");
    let c = self.next;
    self.next = self.next.wrapping_add(1);
    c
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_zero_workers() {
    assert!(Heap::new(1024, 0).is_err());
  }

  #[test]
  fn rejects_indivisible() {
    assert!(Heap::new(1000, 3).is_err());
  }

  #[test]
  fn rejects_oversize() {
    assert!(Heap::new(1usize << 40, 1).is_err());
  }

  #[test]
  fn alloc_then_clear_reuses_block() {
    let mut p = Partition::new(0, 1024, 0);
    let a = p.alloc(3);
    p.clear(a, 3);
    let b = p.alloc(3);
    assert_eq!(a, b);
  }

  #[test]
  fn worker_zero_reserves_root() {
    let mut p = Partition::new(0, 1024, 0);
    assert_ne!(p.alloc(1), ROOT);
  }

  #[test]
  fn worker_zero_reserves_external_prefix() {
    let mut p = Partition::new(0, 1024, 5);
    assert_eq!(p.alloc(1), 1 + 5);
  }

  #[test]
  fn color_gens_are_disjoint_across_workers() {
    let mut a = ColorGen::new(0, 2);
    let mut b = ColorGen::new(1, 2);
    assert_eq!(a.limit, b.next);
    assert!(a.fresh() < b.fresh());
  }

  #[test]
  fn dup_lock_round_trips() {
    let h = Heap::new(1024, 1).unwrap();
    assert!(h.try_lock_dup(5));
    assert!(!h.try_lock_dup(5));
    h.unlock_dup(5);
    assert!(h.try_lock_dup(5));
  }
}
