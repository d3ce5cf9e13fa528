//! Graph primitives: `link`, `subst`, `collect`, and duplication-node
//! construction. These are the only operations that mutate the heap outside
//! of the interaction rules themselves.

use crate::heap::{Heap, Partition};
use crate::link::{Lnk, Tag};
use crate::program::Program;
use crate::util::maybe_grow;

/// Writes `lnk` at `loc`. If `lnk` is a variable-class link (DP0/DP1/VAR),
/// also writes the back-reference `Arg(loc)` into the binder slot it
/// targets, maintaining the §3.4 invariant that every live binder slot
/// points at the current address of its occurrence.
#[inline]
pub fn link(heap: &Heap, loc: u32, lnk: Lnk) {
  heap.set(loc, lnk);
  match lnk.tag() {
    Tag::Var => heap.set(lnk.val(), Lnk::arg(loc)),
    Tag::Dp0 => heap.set(lnk.val(), Lnk::arg(loc)),
    Tag::Dp1 => heap.set(lnk.val() + 1, Lnk::arg(loc)),
    _ => {}
  }
}

/// `ask_lnk(loc) = heap.get(loc)`; `ask_arg(term, i) = ask_lnk(loc(term, i))`.
#[inline]
pub fn ask_lnk(heap: &Heap, loc: u32) -> Lnk {
  heap.get(loc)
}

#[inline]
pub fn ask_arg(heap: &Heap, term: Lnk, i: u32) -> Lnk {
  ask_lnk(heap, term.loc(i))
}

/// Splices `value` into the site a binder slot's current contents describe.
/// If the slot holds `Arg(L)`, writes `value` at `L`. If the slot is `Era`
/// (the bound variable was never used), `value` is dead and is collected
/// instead.
pub fn subst(heap: &Heap, part: &mut Partition, program: &Program, slot_value: Lnk, value: Lnk) {
  if slot_value.tag() == Tag::Era {
    collect(heap, part, program, value);
  } else {
    link(heap, slot_value.val(), value);
  }
}

/// Recursively reclaims a subterm that has become unreachable. Binder nodes
/// that are fully collected erase any remaining live occurrence of their
/// bound variable; duplication nodes only release their shared subject once
/// *both* projections are gone.
pub fn collect(heap: &Heap, part: &mut Partition, program: &Program, term: Lnk) {
  maybe_grow(|| collect_go(heap, part, program, term))
}

fn collect_go(heap: &Heap, part: &mut Partition, program: &Program, term: Lnk) {
  match term.tag() {
    Tag::Era | Tag::Num | Tag::Nil | Tag::Flo => {}
    Tag::Arg => {}
    Tag::Var => {
      heap.set(term.val(), Lnk::era());
    }
    Tag::Dp0 => {
      let p = term.val();
      heap.set(p, Lnk::era());
      if heap.get(p + 1).tag() == Tag::Era {
        collect_go(heap, part, program, heap.get(p + 2));
        part.clear(p, 3);
      }
    }
    Tag::Dp1 => {
      let p = term.val();
      heap.set(p + 1, Lnk::era());
      if heap.get(p).tag() == Tag::Era {
        collect_go(heap, part, program, heap.get(p + 2));
        part.clear(p, 3);
      }
    }
    Tag::Lam => {
      let p = term.val();
      let bind = heap.get(p);
      if bind.tag() != Tag::Era {
        heap.set(bind.val(), Lnk::era());
      }
      collect_go(heap, part, program, heap.get(p + 1));
      part.clear(p, 2);
    }
    Tag::App | Tag::Sup | Tag::Op2 => {
      let p = term.val();
      collect_go(heap, part, program, heap.get(p));
      collect_go(heap, part, program, heap.get(p + 1));
      part.clear(p, 2);
    }
    Tag::Ctr | Tag::Fun => {
      let p = term.val();
      let arity = program.arity(term.tag(), term.ext());
      for i in 0..arity {
        collect_go(heap, part, program, heap.get(p + i));
      }
      part.clear(p, arity);
    }
  }
}

/// Allocates a fresh 3-word duplication node sharing `value`, returning the
/// `(DP0, DP1)` pair of links to be linked into the two occurrence sites.
/// `color` must be unique to this duplication among all live duplications
/// in the program (see `heap::ColorGen`).
pub fn new_dup(heap: &Heap, part: &mut Partition, color: u32, value: Lnk) -> (Lnk, Lnk) {
  let p = part.alloc(3);
  heap.set(p, Lnk::era());
  heap.set(p + 1, Lnk::era());
  link(heap, p + 2, value);
  (Lnk::dp0(color, p), Lnk::dp1(color, p))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::Partition;
  use crate::program::Program;

  #[test]
  fn link_sets_back_reference_for_var_class() {
    let heap = Heap::new(1024, 1).unwrap();
    let mut part = Partition::new(0, 1024, 0);
    let lam = part.alloc(2);
    heap.set(lam, Lnk::era());
    let body_slot = part.alloc(1);
    link(&heap, lam, Lnk::var(body_slot));
    assert_eq!(heap.get(body_slot).tag(), Tag::Arg);
    assert_eq!(heap.get(body_slot).val(), lam);
  }

  #[test]
  fn subst_into_era_collects() {
    let heap = Heap::new(1024, 1).unwrap();
    let mut part = Partition::new(0, 1024, 0);
    let program = Program::empty();
    subst(&heap, &mut part, &program, Lnk::era(), Lnk::num_val(7));
  }

  #[test]
  fn dup_then_both_collected_frees_subject() {
    let heap = Heap::new(1024, 1).unwrap();
    let mut part = Partition::new(0, 1024, 0);
    let program = Program::empty();
    let (dp0, dp1) = new_dup(&heap, &mut part, 0, Lnk::num_val(42));
    collect(&heap, &mut part, &program, dp0);
    collect(&heap, &mut part, &program, dp1);
  }
}
