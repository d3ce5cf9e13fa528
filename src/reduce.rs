//! The weak-head-normal-form reducer: an explicit-stack descent/ascent loop
//! that applies the interaction rules.

use crate::graph::{link, new_dup, subst};
use crate::heap::{ColorGen, Heap, Partition};
use crate::link::{Lnk, Tag};
use crate::ops::Op2;
use crate::program::{Program, RuleCtx};
use crate::stats::Cost;

/// The high bit of a 32-bit stack-frame address word, repurposed to carry
/// the descend/ascend phase flag. Safe because [`crate::link::MAX_VAL`]
/// bounds every real heap address to 31 bits.
const PHASE_BIT: u32 = 1 << 31;

#[inline]
fn push_frame(host: u32, redescend: bool) -> u32 {
  if redescend { host | PHASE_BIT } else { host }
}

#[inline]
fn pop_frame(frame: u32) -> (u32, bool) {
  (frame & !PHASE_BIT, frame & PHASE_BIT != 0)
}

/// Borrowed state threaded through reduction and rule application.
pub struct ReduceCtx<'a> {
  pub heap: &'a Heap,
  pub part: &'a mut Partition,
  pub program: &'a Program,
  pub colors: &'a mut ColorGen,
  pub cost: &'a mut Cost,
}

impl<'a> ReduceCtx<'a> {
  fn dup(&mut self, color: u32, value: Lnk) -> (Lnk, Lnk) {
    new_dup(self.heap, self.part, color, value)
  }
}

fn read_args(heap: &Heap, term: Lnk, arity: u32) -> Vec<Lnk> {
  (0..arity).map(|i| heap.get(term.loc(i))).collect()
}

/// Reduces the term at `root` to weak head normal form. `slen` is the
/// number of workers the caller considers available; when it is 1, or when
/// this call is already nested below another reduction on the same thread,
/// `OP2` operands are forced locally. Otherwise a top-level `OP2` is left
/// untouched so `normal` can fork its operands across workers.
pub fn reduce(ctx: &mut ReduceCtx, root: u32, slen: usize) -> Lnk {
  let mut stack: Vec<u32> = Vec::new();
  let mut host = root;
  let mut descend = true;

  loop {
    let term = ctx.heap.get(host);
    if descend {
      match term.tag() {
        Tag::App => {
          stack.push(push_frame(host, false));
          host = term.loc(0);
        }
        Tag::Dp0 | Tag::Dp1 => {
          let p = term.val();
          if ctx.heap.try_lock_dup(p) {
            stack.push(push_frame(host, false));
            host = term.loc(2);
          }
          // lock contended: loop again, re-reading `term` at the same host
        }
        Tag::Op2 => {
          if slen == 1 || !stack.is_empty() {
            let right = ctx.heap.get(term.loc(1));
            if right.tag().needs_reduction() {
              stack.push(push_frame(host, true));
              host = term.loc(1);
            } else {
              let left = ctx.heap.get(term.loc(0));
              if left.tag().needs_reduction() {
                stack.push(push_frame(host, true));
                host = term.loc(0);
              } else {
                descend = false;
              }
            }
          } else {
            // No worker headroom at the top of this reduction: surface the
            // OP2 redex itself so `normal` can fork its two operands.
            return term;
          }
        }
        Tag::Fun => match ctx.program.fun(term.ext()) {
          Some(fdef) => {
            let args = read_args(ctx.heap, term, fdef.arity);
            match fdef.next_to_force(&args) {
              Some(i) => {
                stack.push(push_frame(host, true));
                host = term.loc(i);
              }
              None => descend = false,
            }
          }
          None => descend = false,
        },
        _ => descend = false,
      }
    } else if interact(ctx, host, term) {
      descend = true; // Always re-descend after a rule fires.
    } else {
      match stack.pop() {
        Some(frame) => {
          let (parent, redescend) = pop_frame(frame);
          host = parent;
          descend = redescend;
        }
        None => break,
      }
    }
  }
  ctx.heap.get(root)
}

fn interact(ctx: &mut ReduceCtx, host: u32, term: Lnk) -> bool {
  match term.tag() {
    Tag::App => interact_app(ctx, host, term),
    Tag::Dp0 | Tag::Dp1 => interact_dup(ctx, host, term),
    Tag::Op2 => interact_op2(ctx, host, term),
    Tag::Fun => interact_fun(ctx, host, term),
    _ => false,
  }
}

fn interact_app(ctx: &mut ReduceCtx, host: u32, term: Lnk) -> bool {
  let p = term.val();
  let func = ctx.heap.get(p);
  match func.tag() {
    Tag::Lam => {
      // APP-LAM: ((lam x b) a) -> b, with x substituted by a.
      let lam_p = func.val();
      let arg = ctx.heap.get(term.loc(1));
      let bind = ctx.heap.get(lam_p);
      // The bound variable's one occurrence may itself live at `lam_p + 1`
      // (e.g. the identity function's body is exactly that occurrence), so
      // the body must be re-read after substitution, not captured before it.
      subst(ctx.heap, ctx.part, ctx.program, bind, arg);
      let body = ctx.heap.get(lam_p + 1);
      link(ctx.heap, host, body);
      ctx.part.clear(p, 2);
      ctx.part.clear(lam_p, 2);
      ctx.cost.anni += 1;
      true
    }
    Tag::Sup => {
      // APP-SUP: ({a b}^c x) -> {(a x0) (b x1)}^c, dup(c) x0 x1 = x.
      let sup_p = func.val();
      let color = func.ext();
      let a = ctx.heap.get(sup_p);
      let b = ctx.heap.get(sup_p + 1);
      let x = ctx.heap.get(term.loc(1));
      let (x0, x1) = ctx.dup(color, x);
      let app0_p = ctx.part.alloc(2);
      link(ctx.heap, app0_p, a);
      link(ctx.heap, app0_p + 1, x0);
      let app1_p = ctx.part.alloc(2);
      link(ctx.heap, app1_p, b);
      link(ctx.heap, app1_p + 1, x1);
      let outer_p = ctx.part.alloc(2);
      link(ctx.heap, outer_p, Lnk::app(app0_p));
      link(ctx.heap, outer_p + 1, Lnk::app(app1_p));
      link(ctx.heap, host, Lnk::sup(color, outer_p));
      ctx.part.clear(p, 2);
      ctx.part.clear(sup_p, 2);
      ctx.cost.comm += 1;
      true
    }
    _ => false,
  }
}

fn interact_dup(ctx: &mut ReduceCtx, _host: u32, term: Lnk) -> bool {
  let p = term.val();
  let color = term.ext();
  ctx.heap.unlock_dup(p);

  let bind0 = ctx.heap.get(p);
  let bind1 = ctx.heap.get(p + 1);
  let subject = ctx.heap.get(p + 2);

  match subject.tag() {
    Tag::Lam => {
      // DUP-LAM: dup(c) r s = (lam x b) -> r = lam x0 b0, s = lam x1 b1,
      // with x replaced by {x0 x1}^c in b, and dup(c) b0 b1 = b.
      let lam_p = subject.val();
      let bind_x = ctx.heap.get(lam_p);
      let body = ctx.heap.get(lam_p + 1);
      let (b0, b1) = ctx.dup(color, body);

      let lam0_p = ctx.part.alloc(2);
      let lam1_p = ctx.part.alloc(2);
      ctx.heap.set(lam0_p, Lnk::era());
      ctx.heap.set(lam1_p, Lnk::era());
      link(ctx.heap, lam0_p + 1, b0);
      link(ctx.heap, lam1_p + 1, b1);

      if bind_x.tag() != Tag::Era {
        // x was used once in the original body; replace that occurrence
        // with a fan of the two new lambdas' own bound variables.
        let fan_p = ctx.part.alloc(2);
        link(ctx.heap, fan_p, Lnk::var(lam0_p));
        link(ctx.heap, fan_p + 1, Lnk::var(lam1_p));
        subst(ctx.heap, ctx.part, ctx.program, bind_x, Lnk::sup(color, fan_p));
      }

      subst(ctx.heap, ctx.part, ctx.program, bind0, Lnk::lam(lam0_p));
      subst(ctx.heap, ctx.part, ctx.program, bind1, Lnk::lam(lam1_p));
      ctx.part.clear(p, 3);
      ctx.part.clear(lam_p, 2);
      ctx.cost.comm += 1;
      true
    }
    Tag::Sup => {
      let sup_p = subject.val();
      let sub_color = subject.ext();
      let a = ctx.heap.get(sup_p);
      let b = ctx.heap.get(sup_p + 1);
      if sub_color == color {
        // DUP-SUP (same color): annihilate.
        subst(ctx.heap, ctx.part, ctx.program, bind0, a);
        subst(ctx.heap, ctx.part, ctx.program, bind1, b);
        ctx.part.clear(p, 3);
        ctx.part.clear(sup_p, 2);
        ctx.cost.anni += 1;
      } else {
        // DUP-SUP (different colors): commute.
        let (a0, a1) = ctx.dup(color, a);
        let (b0, b1) = ctx.dup(color, b);
        let sup0_p = ctx.part.alloc(2);
        link(ctx.heap, sup0_p, a0);
        link(ctx.heap, sup0_p + 1, b0);
        let sup1_p = ctx.part.alloc(2);
        link(ctx.heap, sup1_p, a1);
        link(ctx.heap, sup1_p + 1, b1);
        subst(ctx.heap, ctx.part, ctx.program, bind0, Lnk::sup(sub_color, sup0_p));
        subst(ctx.heap, ctx.part, ctx.program, bind1, Lnk::sup(sub_color, sup1_p));
        ctx.part.clear(p, 3);
        ctx.part.clear(sup_p, 2);
        ctx.cost.comm += 1;
      }
      true
    }
    Tag::Num => {
      // DUP-NUM: numbers are freely copied.
      subst(ctx.heap, ctx.part, ctx.program, bind0, subject);
      subst(ctx.heap, ctx.part, ctx.program, bind1, subject);
      ctx.part.clear(p, 3);
      ctx.cost.comm += 1;
      true
    }
    Tag::Era => {
      subst(ctx.heap, ctx.part, ctx.program, bind0, Lnk::era());
      subst(ctx.heap, ctx.part, ctx.program, bind1, Lnk::era());
      ctx.part.clear(p, 3);
      ctx.cost.eras += 1;
      true
    }
    Tag::Ctr => {
      // DUP-CTR: propagate the duplication into every child.
      let id = subject.ext();
      let ctr_p = subject.val();
      let arity = ctx.program.arity(Tag::Ctr, id);
      if arity == 0 {
        subst(ctx.heap, ctx.part, ctx.program, bind0, Lnk::ctr(id, 0));
        subst(ctx.heap, ctx.part, ctx.program, bind1, Lnk::ctr(id, 0));
        ctx.part.clear(p, 3);
      } else {
        let children = read_args(ctx.heap, subject, arity);
        let ctr0_p = ctx.part.alloc(arity);
        let ctr1_p = ctx.part.alloc(arity);
        for (i, &child) in children.iter().enumerate() {
          let (d0, d1) = ctx.dup(color, child);
          link(ctx.heap, ctr0_p + i as u32, d0);
          link(ctx.heap, ctr1_p + i as u32, d1);
        }
        subst(ctx.heap, ctx.part, ctx.program, bind0, Lnk::ctr(id, ctr0_p));
        subst(ctx.heap, ctx.part, ctx.program, bind1, Lnk::ctr(id, ctr1_p));
        ctx.part.clear(p, 3);
        ctx.part.clear(ctr_p, arity);
      }
      ctx.cost.comm += 1;
      true
    }
    _ => false,
  }
}

fn interact_op2(ctx: &mut ReduceCtx, host: u32, term: Lnk) -> bool {
  let p = term.val();
  let op = Op2::from_u32(term.ext());
  let left = ctx.heap.get(p);
  let right = ctx.heap.get(p + 1);
  match (left.tag(), right.tag()) {
    (Tag::Num, Tag::Num) => {
      let result = op.apply(left.num(), right.num());
      link(ctx.heap, host, Lnk::num_val(result));
      ctx.part.clear(p, 2);
      ctx.cost.oper += 1;
      true
    }
    (Tag::Sup, _) => {
      op2_sup(ctx, host, term.ext(), p, left, right, true);
      true
    }
    (_, Tag::Sup) => {
      op2_sup(ctx, host, term.ext(), p, right, left, false);
      true
    }
    _ => false,
  }
}

/// OP2-SUP: commutes a binary operator through a fan on one side, duplicating
/// the other (non-fan) operand. `sup_on_left` records which original slot
/// the fan came from, so the rebuilt operator nodes keep the right argument
/// order.
fn op2_sup(ctx: &mut ReduceCtx, host: u32, op: u32, node_p: u32, sup_side: Lnk, other: Lnk, sup_on_left: bool) {
  let sup_p = sup_side.val();
  let color = sup_side.ext();
  let a = ctx.heap.get(sup_p);
  let b = ctx.heap.get(sup_p + 1);
  let (o0, o1) = ctx.dup(color, other);
  let (op0_p, op1_p) = {
    let op0_p = ctx.part.alloc(2);
    let op1_p = ctx.part.alloc(2);
    if sup_on_left {
      link(ctx.heap, op0_p, a);
      link(ctx.heap, op0_p + 1, o0);
      link(ctx.heap, op1_p, b);
      link(ctx.heap, op1_p + 1, o1);
    } else {
      link(ctx.heap, op0_p, o0);
      link(ctx.heap, op0_p + 1, a);
      link(ctx.heap, op1_p, o1);
      link(ctx.heap, op1_p + 1, b);
    }
    (op0_p, op1_p)
  };
  let outer_p = ctx.part.alloc(2);
  link(ctx.heap, outer_p, Lnk::op2(op, op0_p));
  link(ctx.heap, outer_p + 1, Lnk::op2(op, op1_p));
  link(ctx.heap, host, Lnk::sup(color, outer_p));
  ctx.part.clear(node_p, 2);
  ctx.part.clear(sup_p, 2);
  ctx.cost.comm += 1;
}

fn interact_fun(ctx: &mut ReduceCtx, host: u32, term: Lnk) -> bool {
  let id = term.ext();
  let p = term.val();
  let Some(fdef) = ctx.program.fun(id) else { return false };
  let arity = fdef.arity;
  let args = read_args(ctx.heap, term, arity);

  if let Some(&first_strict) = fdef.strict.first() {
    let a = args[first_strict as usize];
    if a.tag() == Tag::Sup {
      fun_sup(ctx, host, term, arity, first_strict, a, &args);
      return true;
    }
  }

  let Some(rule) = fdef.find_rule(&args) else { return false };
  let build = rule.build.clone();
  let result = {
    let mut rctx = RuleCtx { heap: ctx.heap, part: ctx.part, program: ctx.program, colors: ctx.colors, args: &args };
    build(&mut rctx)
  };
  link(ctx.heap, host, result);
  ctx.part.clear(p, arity);
  ctx.cost.dref += 1;
  true
}

/// FUN-SUP: the generic rule lifting a function call
/// through a fan at one of its strict positions, always tried before any
/// user-defined arm.
fn fun_sup(ctx: &mut ReduceCtx, host: u32, term: Lnk, arity: u32, strict_pos: u32, sup_arg: Lnk, args: &[Lnk]) {
  let p = term.val();
  let id = term.ext();
  let sup_p = sup_arg.val();
  let color = sup_arg.ext();
  let sa = ctx.heap.get(sup_p);
  let sb = ctx.heap.get(sup_p + 1);

  let mut args0 = Vec::with_capacity(arity as usize);
  let mut args1 = Vec::with_capacity(arity as usize);
  for (i, &arg) in args.iter().enumerate() {
    if i as u32 == strict_pos {
      args0.push(sa);
      args1.push(sb);
    } else {
      let (d0, d1) = ctx.dup(color, arg);
      args0.push(d0);
      args1.push(d1);
    }
  }

  let call0_p = ctx.part.alloc(arity);
  let call1_p = ctx.part.alloc(arity);
  for i in 0..arity as usize {
    link(ctx.heap, call0_p + i as u32, args0[i]);
    link(ctx.heap, call1_p + i as u32, args1[i]);
  }
  let outer_p = ctx.part.alloc(2);
  link(ctx.heap, outer_p, Lnk::fun(id, call0_p));
  link(ctx.heap, outer_p + 1, Lnk::fun(id, call1_p));
  link(ctx.heap, host, Lnk::sup(color, outer_p));
  ctx.part.clear(p, arity);
  ctx.part.clear(sup_p, 2);
  ctx.cost.comm += 1;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::Heap;
  use crate::program::Program;

  fn ctx<'a>(heap: &'a Heap, part: &'a mut Partition, program: &'a Program, colors: &'a mut ColorGen, cost: &'a mut Cost) -> ReduceCtx<'a> {
    ReduceCtx { heap, part, program, colors, cost }
  }

  #[test]
  fn church_identity_applied_to_forty_two() {
    let heap = Heap::new(1024, 1).unwrap();
    let mut part = Partition::new(0, 1024, 0);
    let program = Program::empty();
    let mut colors = ColorGen::new(0, 1);
    let mut cost = Cost::default();

    // (lam x x) 42
    let lam_p = part.alloc(2);
    link(&heap, lam_p, Lnk::era());
    let x_slot = lam_p + 1;
    link(&heap, x_slot, Lnk::var(lam_p)); // body = x, bound by lam's slot0
    let app_p = part.alloc(2);
    link(&heap, app_p, Lnk::lam(lam_p));
    link(&heap, app_p + 1, Lnk::num_val(42));

    let mut c = ctx(&heap, &mut part, &program, &mut colors, &mut cost);
    let root = part_root_word(&heap, Lnk::app(app_p));
    let result = reduce(&mut c, root, 1);
    assert_eq!(result.tag(), Tag::Num);
    assert_eq!(result.num(), 42);
    assert_eq!(cost.total(), 1);
  }

  fn part_root_word(heap: &Heap, initial: Lnk) -> u32 {
    heap.set(0, initial);
    0
  }

  #[test]
  fn arithmetic_add_of_two_nums() {
    let heap = Heap::new(1024, 1).unwrap();
    let mut part = Partition::new(0, 1024, 0);
    let program = Program::empty();
    let mut colors = ColorGen::new(0, 1);
    let mut cost = Cost::default();

    let op_p = part.alloc(2);
    link(&heap, op_p, Lnk::num_val(21));
    link(&heap, op_p + 1, Lnk::num_val(21));
    heap.set(0, Lnk::op2(Op2::Add as u32, op_p));

    let mut c = ctx(&heap, &mut part, &program, &mut colors, &mut cost);
    let result = reduce(&mut c, 0, 1);
    assert_eq!(result.tag(), Tag::Num);
    assert_eq!(result.num(), 42);
  }
}
