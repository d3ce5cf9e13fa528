//! An example generated rule table: the role an upstream rule compiler
//! would normally play, played here by hand.
//!
//! The demo program is a binary-tree builder/summer: `GenTree(depth)`
//! recurses down to `Leaf(1)` at `depth == 0`, branching into `Both(l, r)`
//! otherwise; `Sum(tree)` folds it back into a single number; `Main(n)` is
//! `Sum(GenTree(n))`. Naming follows the `Both`/`Leaf`/`GenTree` identifiers
//! already present in the original C runtime's demo constructor table.

use crate::link::{Lnk, Tag};
use crate::ops::Op2;
use crate::program::{CtrDef, FnDef, Pat, Program, Rule};
use std::sync::Arc;

pub const LEAF: u32 = 0;
pub const BOTH: u32 = 1;

pub const GEN_TREE: u32 = 0;
pub const SUM: u32 = 1;
pub const MAIN: u32 = 2;

/// Builds the demo `Program` described above.
pub fn demo_program() -> Program {
  let ctrs = vec![CtrDef { name: "Leaf".into(), arity: 1 }, CtrDef { name: "Both".into(), arity: 2 }];

  let gen_tree = FnDef {
    name: "GenTree".into(),
    arity: 1,
    strict: vec![0],
    rules: vec![
      Rule {
        pats: vec![Pat::Num(0)],
        build: Arc::new(|rctx| {
          let leaf_p = rctx.part.alloc(1);
          crate::graph::link(rctx.heap, leaf_p, Lnk::num_val(1));
          Lnk::ctr(LEAF, leaf_p)
        }),
      },
      Rule {
        pats: vec![Pat::Any],
        build: Arc::new(|rctx| {
          let depth = rctx.args[0].num();
          let n1 = Lnk::num_val(depth.wrapping_sub(1));
          let call0_p = rctx.part.alloc(1);
          crate::graph::link(rctx.heap, call0_p, n1);
          let call1_p = rctx.part.alloc(1);
          crate::graph::link(rctx.heap, call1_p, n1);
          let both_p = rctx.part.alloc(2);
          crate::graph::link(rctx.heap, both_p, Lnk::fun(GEN_TREE, call0_p));
          crate::graph::link(rctx.heap, both_p + 1, Lnk::fun(GEN_TREE, call1_p));
          Lnk::ctr(BOTH, both_p)
        }),
      },
    ],
  };

  let sum = FnDef {
    name: "Sum".into(),
    arity: 1,
    strict: vec![0],
    rules: vec![
      Rule {
        pats: vec![Pat::Ctr(LEAF)],
        build: Arc::new(|rctx| {
          let tree = rctx.args[0];
          let value = rctx.heap.get(tree.loc(0));
          rctx.part.clear(tree.val(), 1);
          value
        }),
      },
      Rule {
        pats: vec![Pat::Ctr(BOTH)],
        build: Arc::new(|rctx| {
          let tree = rctx.args[0];
          let left = rctx.heap.get(tree.loc(0));
          let right = rctx.heap.get(tree.loc(1));
          rctx.part.clear(tree.val(), 2);
          let call_l_p = rctx.part.alloc(1);
          crate::graph::link(rctx.heap, call_l_p, left);
          let call_r_p = rctx.part.alloc(1);
          crate::graph::link(rctx.heap, call_r_p, right);
          let op_p = rctx.part.alloc(2);
          crate::graph::link(rctx.heap, op_p, Lnk::fun(SUM, call_l_p));
          crate::graph::link(rctx.heap, op_p + 1, Lnk::fun(SUM, call_r_p));
          Lnk::op2(Op2::Add as u32, op_p)
        }),
      },
    ],
  };

  let main = FnDef {
    name: "Main".into(),
    arity: 1,
    strict: vec![0],
    rules: vec![Rule {
      pats: vec![Pat::Any],
      build: Arc::new(|rctx| {
        let n = rctx.args[0];
        let gen_call_p = rctx.part.alloc(1);
        crate::graph::link(rctx.heap, gen_call_p, n);
        let sum_call_p = rctx.part.alloc(1);
        crate::graph::link(rctx.heap, sum_call_p, Lnk::fun(GEN_TREE, gen_call_p));
        Lnk::fun(SUM, sum_call_p)
      }),
    }],
  };

  Program { ctrs, funs: vec![gen_tree, sum, main] }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::{Heap, ROOT};
  use crate::pool::run_parallel;

  // `Main`'s single argument word is written straight after `ROOT`, the
  // way the CLI front-end lays out a call's arguments, with `reserved_words`
  // telling `run_parallel` that address 1 is already occupied by live data.
  const ARG_SLOT: u32 = 1;

  #[test]
  fn gen_tree_depth_two_sums_to_four() {
    let program = demo_program();
    let heap = Heap::new(16384, 1).unwrap();
    crate::graph::link(&heap, ARG_SLOT, Lnk::num_val(2));
    heap.set(ROOT, Lnk::fun(MAIN, ARG_SLOT));

    let (cost, _words, root) = run_parallel(&heap, &program, 1, ROOT, 1);
    assert_eq!(root.tag(), Tag::Num);
    assert_eq!(root.num(), 4);
    assert!(cost.dref > 0);
  }

  #[test]
  fn gen_tree_confluent_across_worker_counts() {
    let program = demo_program();

    let heap1 = Heap::new(16384, 1).unwrap();
    crate::graph::link(&heap1, ARG_SLOT, Lnk::num_val(3));
    heap1.set(ROOT, Lnk::fun(MAIN, ARG_SLOT));
    let (_, _, root1) = run_parallel(&heap1, &program, 1, ROOT, 1);

    let heap4 = Heap::new(16384, 4).unwrap();
    crate::graph::link(&heap4, ARG_SLOT, Lnk::num_val(3));
    heap4.set(ROOT, Lnk::fun(MAIN, ARG_SLOT));
    let (_, _, root4) = run_parallel(&heap4, &program, 4, ROOT, 1);

    assert_eq!(root1.num(), root4.num());
    assert_eq!(root1.num(), 8);
  }
}
