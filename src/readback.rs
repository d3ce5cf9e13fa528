//! Textual pretty-printer: a variable-enumeration pass followed by a print
//! pass that resolves duplication/superposition scopes via a per-color
//! direction stack.

use crate::heap::Heap;
use crate::link::{Lnk, Tag};
use crate::ops::Op2;
use crate::program::Program;
use crate::util::maybe_grow;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

struct Printer<'a> {
  heap: &'a Heap,
  program: &'a Program,
  names: HashMap<u32, String>,
  visited_for_naming: HashSet<u32>,
  next_id: u32,
  dirs: HashMap<u32, Vec<u8>>,
}

impl<'a> Printer<'a> {
  fn new(heap: &'a Heap, program: &'a Program) -> Printer<'a> {
    Printer { heap, program, names: HashMap::new(), visited_for_naming: HashSet::new(), next_id: 0, dirs: HashMap::new() }
  }

  fn enumerate(&mut self, addr: u32) {
    maybe_grow(|| self.enumerate_go(addr))
  }

  fn enumerate_go(&mut self, addr: u32) {
    if !self.visited_for_naming.insert(addr) {
      return;
    }
    let term = self.heap.get(addr);
    match term.tag() {
      Tag::Lam => {
        let p = term.val();
        let bind = self.heap.get(p);
        if bind.tag() != Tag::Era {
          let name = format!("x{}", self.next_id);
          self.next_id += 1;
          self.names.insert(p, name);
        }
        self.enumerate_go(p + 1);
      }
      Tag::App | Tag::Sup | Tag::Op2 => {
        self.enumerate_go(term.loc(0));
        self.enumerate_go(term.loc(1));
      }
      Tag::Dp0 | Tag::Dp1 => {
        self.enumerate_go(term.loc(2));
      }
      Tag::Ctr | Tag::Fun => {
        let arity = self.program.arity(term.tag(), term.ext());
        for i in 0..arity {
          self.enumerate_go(term.loc(i));
        }
      }
      _ => {}
    }
  }

  fn print(&mut self, addr: u32) -> String {
    maybe_grow(|| self.print_go(addr))
  }

  fn print_go(&mut self, addr: u32) -> String {
    let term = self.heap.get(addr);
    match term.tag() {
      Tag::Var => self.names.get(&term.val()).cloned().unwrap_or_else(|| "_".to_string()),
      Tag::Era => "*".to_string(),
      Tag::Num => term.num().to_string(),
      Tag::Lam => {
        let p = term.val();
        let bind = self.heap.get(p);
        let name = if bind.tag() == Tag::Era { "_".to_string() } else { self.names.get(&p).cloned().unwrap_or_else(|| "_".to_string()) };
        let body = self.print_go(term.loc(1));
        format!("@{} {}", name, body)
      }
      Tag::App => {
        let f = self.print_go(term.loc(0));
        let a = self.print_go(term.loc(1));
        format!("({} {})", f, a)
      }
      Tag::Op2 => {
        let a = self.print_go(term.loc(0));
        let b = self.print_go(term.loc(1));
        format!("({} {} {})", a, Op2::from_u32(term.ext()).symbol(), b)
      }
      Tag::Ctr | Tag::Fun => {
        let id = term.ext();
        let name = match term.tag() {
          Tag::Ctr => self.program.ctr_name(id).map(str::to_string),
          _ => self.program.fun_name(id).map(str::to_string),
        }
        .unwrap_or_else(|| format!("${}", id));
        let arity = self.program.arity(term.tag(), id);
        let mut out = String::new();
        out.push('(');
        out.push_str(&name);
        for i in 0..arity {
          out.push(' ');
          let arg = self.print_go(term.loc(i));
          out.push_str(&arg);
        }
        out.push(')');
        out
      }
      Tag::Sup => {
        let c = term.ext();
        let p = term.val();
        if let Some(dir) = self.dirs.get(&c).and_then(|s| s.last()).copied() {
          return self.print_go(if dir == 0 { p } else { p + 1 });
        }
        let a = self.print_go(p);
        let b = self.print_go(p + 1);
        format!("<{} {}>", a, b)
      }
      Tag::Dp0 => self.print_dup(term, 0),
      Tag::Dp1 => self.print_dup(term, 1),
      Tag::Arg | Tag::Flo | Tag::Nil => "_".to_string(),
    }
  }

  fn print_dup(&mut self, term: Lnk, dir: u8) -> String {
    let c = term.ext();
    let p = term.val();
    self.dirs.entry(c).or_default().push(dir);
    let r = self.print_go(p + 2);
    self.dirs.get_mut(&c).unwrap().pop();
    r
  }
}

/// Pretty-prints the graph rooted at `root`.
pub fn readback(heap: &Heap, program: &Program, root: u32) -> String {
  let mut printer = Printer::new(heap, program);
  printer.enumerate(root);
  printer.print(root)
}

/// Formats a CLI entry-point application `Name(arg0, arg1, ...)` as plain
/// text, for diagnostics that don't need the full graph printer.
pub fn format_call(name: &str, args: &[u64]) -> String {
  let mut out = String::new();
  let _ = write!(out, "{}", name);
  for a in args {
    let _ = write!(out, " {}", a);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::link;
  use crate::heap::Heap;
  use crate::program::Program;

  #[test]
  fn prints_a_plain_number() {
    let heap = Heap::new(16, 1).unwrap();
    heap.set(0, Lnk::num_val(42));
    let program = Program::empty();
    assert_eq!(readback(&heap, &program, 0), "42");
  }

  #[test]
  fn prints_identity_lambda() {
    let heap = Heap::new(16, 1).unwrap();
    // @x0 x0
    let lam_p = 1;
    heap.set(lam_p, Lnk::era());
    link(&heap, lam_p + 1, Lnk::var(lam_p));
    heap.set(0, Lnk::lam(lam_p));
    let program = Program::empty();
    assert_eq!(readback(&heap, &program, 0), "@x0 x0");
  }

  #[test]
  fn prints_unscoped_fan() {
    let heap = Heap::new(16, 1).unwrap();
    let sup_p = 1;
    heap.set(sup_p, Lnk::num_val(5));
    heap.set(sup_p + 1, Lnk::num_val(5));
    heap.set(0, Lnk::sup(0, sup_p));
    let program = Program::empty();
    assert_eq!(readback(&heap, &program, 0), "<5 5>");
  }
}
