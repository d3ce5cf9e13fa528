//! In-memory representation of what an upstream rule compiler would
//! generate: the constructor/function arity and name tables, and each
//! function's strict positions and match arms.

use crate::heap::{ColorGen, Heap, Partition};
use crate::link::{Lnk, Tag};
use std::sync::Arc;

/// A constructor: just a name and an arity.
#[derive(Clone, Debug)]
pub struct CtrDef {
  pub name: String,
  pub arity: u32,
}

/// A pattern over one of a function's strict argument positions.
#[derive(Clone, Debug)]
pub enum Pat {
  /// Matches a `Ctr` link with this constructor id.
  Ctr(u32),
  /// Matches a `Num` link with exactly this value.
  Num(u64),
  /// Matches anything (including values that are not yet in WHNF).
  Any,
}

impl Pat {
  fn matches(&self, arg: Lnk) -> bool {
    match self {
      Pat::Ctr(id) => arg.tag() == Tag::Ctr && arg.ext() == *id,
      Pat::Num(n) => arg.tag() == Tag::Num && arg.num() == *n,
      Pat::Any => true,
    }
  }
}

/// Inputs available to a rule's right-hand-side builder.
pub struct RuleCtx<'a> {
  pub heap: &'a Heap,
  pub part: &'a mut Partition,
  pub program: &'a Program,
  pub colors: &'a mut ColorGen,
  /// The call node's full argument list, in declaration order (not just the
  /// strict ones), already read out of the heap.
  pub args: &'a [Lnk],
}

impl<'a> RuleCtx<'a> {
  /// Allocates a fresh duplication of `value`, for a right-hand side that
  /// uses a bound variable more than once. Mirrors an upstream compiler's
  /// `dup_value` helper.
  pub fn dup_value(&mut self, value: Lnk) -> (Lnk, Lnk) {
    let color = self.colors.fresh();
    crate::graph::new_dup(self.heap, self.part, color, value)
  }
}

/// One rule arm: a pattern per strict position (aligned with `FnDef::strict`)
/// and a builder that allocates and links the replacement subgraph.
pub struct Rule {
  pub pats: Vec<Pat>,
  pub build: Arc<dyn Fn(&mut RuleCtx) -> Lnk + Send + Sync>,
}

/// A user-defined function: its arity, the order in which arguments must be
/// forced to WHNF before arms are tried, and its arms.
pub struct FnDef {
  pub name: String,
  pub arity: u32,
  pub strict: Vec<u32>,
  pub rules: Vec<Rule>,
}

impl FnDef {
  /// Finds the first strict position (in forcing order) whose current
  /// argument is not yet known to be in WHNF-compatible form for matching.
  /// A constructor or number is always considered ready; anything else
  /// needs to be forced first.
  pub fn next_to_force(&self, args: &[Lnk]) -> Option<u32> {
    for &i in &self.strict {
      let a = args[i as usize];
      if a.tag().needs_reduction() {
        return Some(i);
      }
    }
    None
  }

  /// Finds the first rule whose patterns all match the current arguments.
  pub fn find_rule(&self, args: &[Lnk]) -> Option<&Rule> {
    self.rules.iter().find(|rule| self.strict.iter().zip(&rule.pats).all(|(&i, pat)| pat.matches(args[i as usize])))
  }
}

/// The generated rule table: constructors and functions, addressed by id.
#[derive(Default)]
pub struct Program {
  pub ctrs: Vec<CtrDef>,
  pub funs: Vec<FnDef>,
}

impl Program {
  pub fn empty() -> Program {
    Program::default()
  }

  pub fn ctr_name(&self, id: u32) -> Option<&str> {
    self.ctrs.get(id as usize).map(|c| c.name.as_str())
  }

  pub fn fun_name(&self, id: u32) -> Option<&str> {
    self.funs.get(id as usize).map(|f| f.name.as_str())
  }

  pub fn fun(&self, id: u32) -> Option<&FnDef> {
    self.funs.get(id as usize)
  }

  /// Arity of a `Ctr`/`Fun` link; anything else (or an id out of range,
  /// which the reducer treats as a stuck term) is 0.
  pub fn arity(&self, tag: Tag, ext: u32) -> u32 {
    match tag {
      Tag::Ctr => self.ctrs.get(ext as usize).map_or(0, |c| c.arity),
      Tag::Fun => self.funs.get(ext as usize).map_or(0, |f| f.arity),
      _ => 0,
    }
  }

  pub fn ctr_id_by_name(&self, name: &str) -> Option<u32> {
    self.ctrs.iter().position(|c| c.name == name).map(|i| i as u32)
  }

  pub fn fun_id_by_name(&self, name: &str) -> Option<u32> {
    self.funs.iter().position(|f| f.name == name).map(|i| i as u32)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn next_to_force_skips_already_whnf_args() {
    let f = FnDef { name: "f".into(), arity: 1, strict: vec![0], rules: vec![] };
    assert_eq!(f.next_to_force(&[Lnk::num_val(1)]), None);
    assert_eq!(f.next_to_force(&[Lnk::var(0)]), Some(0));
  }

  #[test]
  fn find_rule_picks_first_full_match() {
    let rules = vec![
      Rule { pats: vec![Pat::Num(0)], build: Arc::new(|_| Lnk::num_val(0)) },
      Rule { pats: vec![Pat::Any], build: Arc::new(|_| Lnk::num_val(1)) },
    ];
    let f = FnDef { name: "f".into(), arity: 1, strict: vec![0], rules };
    assert!(f.find_rule(&[Lnk::num_val(0)]).is_some());
    assert!(f.find_rule(&[Lnk::num_val(5)]).is_some());
  }
}
