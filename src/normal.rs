//! The parallel normalizer: head reduction followed by a recursive,
//! work-forking descent into children until the whole graph is in normal
//! form.

use crate::heap::{ColorGen, Heap, Partition};
use crate::link::{Lnk, Tag};
use crate::pool::Pool;
use crate::program::Program;
use crate::reduce::{reduce, ReduceCtx};
use crate::stats::Cost;
use crate::util::maybe_grow;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks which heap addresses have already been visited during the current
/// pass, so overlapping subtrees (shared via SUP/DUP) are not re-reduced.
/// Shared across all workers participating in one `normal_go` call.
pub struct Seen(Box<[AtomicBool]>);

impl Seen {
  pub fn new(len: usize) -> Seen {
    let mut v = Vec::with_capacity(len);
    v.resize_with(len, || AtomicBool::new(false));
    Seen(v.into_boxed_slice())
  }

  /// Marks `addr` visited; returns `true` if this call is the one that
  /// newly marked it (i.e. it had not been visited yet).
  fn mark(&self, addr: u32) -> bool {
    !self.0[addr as usize].swap(true, Ordering::Relaxed)
  }

  fn reset(&self) {
    for b in self.0.iter() {
      b.store(false, Ordering::Relaxed);
    }
  }
}

fn children_of(heap: &Heap, program: &Program, term: Lnk, slen: usize) -> Vec<u32> {
  match term.tag() {
    Tag::Lam => vec![term.loc(1)],
    Tag::App | Tag::Sup => vec![term.loc(0), term.loc(1)],
    Tag::Op2 => {
      if slen > 1 {
        vec![term.loc(0), term.loc(1)]
      } else {
        vec![]
      }
    }
    Tag::Dp0 | Tag::Dp1 => vec![term.loc(2)],
    Tag::Ctr | Tag::Fun => {
      let arity = program.arity(term.tag(), term.ext());
      (0..arity).map(|i| term.loc(i)).collect()
    }
    _ => vec![],
  }
}

/// Normalizes the subtree rooted at `host`, forking across the worker range
/// `[sidx, sidx + slen)` when there is enough headroom to split work among
/// its children.
#[allow(clippy::too_many_arguments)]
pub fn normal_go(
  heap: &Heap,
  program: &Program,
  pool: &Pool,
  part: &mut Partition,
  colors: &mut ColorGen,
  cost: &mut Cost,
  host: u32,
  sidx: usize,
  slen: usize,
  seen: &Seen,
) {
  maybe_grow(|| normal_go_inner(heap, program, pool, part, colors, cost, host, sidx, slen, seen))
}

#[allow(clippy::too_many_arguments)]
fn normal_go_inner(
  heap: &Heap,
  program: &Program,
  pool: &Pool,
  part: &mut Partition,
  colors: &mut ColorGen,
  cost: &mut Cost,
  host: u32,
  sidx: usize,
  slen: usize,
  seen: &Seen,
) {
  if !seen.mark(host) {
    return;
  }

  let term = {
    let mut rctx = ReduceCtx { heap, part, program, colors, cost };
    reduce(&mut rctx, host, slen)
  };

  let children = children_of(heap, program, term, slen);
  let k = children.len();

  if k >= 2 && slen >= k {
    let space = slen / k;
    for (i, &child_host) in children.iter().enumerate().skip(1) {
      let child_sidx = sidx + i * space;
      pool.fork(child_sidx, child_host, child_sidx, space);
    }
    normal_go(heap, program, pool, part, colors, cost, children[0], sidx, space, seen);
    for (i, _) in children.iter().enumerate().skip(1) {
      let child_sidx = sidx + i * space;
      pool.join(child_sidx);
    }
  } else {
    for &c in &children {
      normal_go(heap, program, pool, part, colors, cost, c, sidx, slen, seen);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::Heap;
  use crate::program::Program;

  #[test]
  fn seen_marks_once() {
    let seen = Seen::new(8);
    assert!(seen.mark(3));
    assert!(!seen.mark(3));
    seen.reset();
    assert!(seen.mark(3));
  }

  #[test]
  fn children_of_lam_is_body_only() {
    let heap = Heap::new(16, 1).unwrap();
    let program = Program::empty();
    let lam = Lnk::lam(4);
    assert_eq!(children_of(&heap, &program, lam, 1), vec![5]);
  }
}
