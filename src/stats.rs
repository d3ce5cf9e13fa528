//! Rewrite-count and timing statistics: a breakdown by rule family printed
//! to stderr, not a tracing/log framework.

use std::ops::AddAssign;
use std::time::Duration;

/// Rewrite counts broken down by interaction family. The reducer increments
/// exactly one field per successful rule application (`reduce.rs`); `normal`
/// folds every worker's `Cost` into one total.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cost {
  /// Same-constructor annihilation: APP-LAM, same-color DUP-SUP.
  pub anni: u64,
  /// Different-constructor commutation: APP-SUP, DUP-LAM, DUP-CTR, DUP-NUM,
  /// different-color DUP-SUP, OP2-SUP, FUN-SUP.
  pub comm: u64,
  /// Interactions that erase a subterm: DUP-ERA.
  pub eras: u64,
  /// User rule-table dispatch: a `FnDef` arm firing.
  pub dref: u64,
  /// Numeric operator application: OP2-NUM.
  pub oper: u64,
}

impl Cost {
  pub fn total(&self) -> u64 {
    self.anni + self.comm + self.eras + self.dref + self.oper
  }
}

impl AddAssign for Cost {
  fn add_assign(&mut self, other: Cost) {
    self.anni += other.anni;
    self.comm += other.comm;
    self.eras += other.eras;
    self.dref += other.dref;
    self.oper += other.oper;
  }
}

/// One completed `Runtime::normalize` call's totals (the `ffi_cost`/
/// `ffi_size` pair, plus wall-clock time).
#[derive(Clone, Copy, Debug)]
pub struct Stats {
  pub cost: Cost,
  pub words_used: u32,
  pub elapsed: Duration,
}

impl Stats {
  /// Prints the rewrite/time breakdown to stderr.
  pub fn print(&self) {
    eprintln!("RWTS   : {:>15}", pretty_num(self.cost.total()));
    eprintln!("- ANNI : {:>15}", pretty_num(self.cost.anni));
    eprintln!("- COMM : {:>15}", pretty_num(self.cost.comm));
    eprintln!("- ERAS : {:>15}", pretty_num(self.cost.eras));
    eprintln!("- DREF : {:>15}", pretty_num(self.cost.dref));
    eprintln!("- OPER : {:>15}", pretty_num(self.cost.oper));
    eprintln!("SIZE   : {:>15}", pretty_num(self.words_used as u64));
    eprintln!("TIME   : {:.3?}", self.elapsed);
    let millis = self.elapsed.as_millis().max(1);
    eprintln!("RPS    : {:.3} M", (self.cost.total() as f64) / (millis as f64) / 1000.0);
  }
}

/// Inserts `_` every three digits, e.g. `1234567` -> `1_234_567`.
fn pretty_num(n: u64) -> String {
  n.to_string().as_bytes().rchunks(3).rev().map(|x| std::str::from_utf8(x).unwrap()).flat_map(|x| ["_", x]).skip(1).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn total_sums_all_families() {
    let cost = Cost { anni: 1, comm: 2, eras: 3, dref: 4, oper: 5 };
    assert_eq!(cost.total(), 15);
  }

  #[test]
  fn add_assign_folds_worker_costs() {
    let mut a = Cost { anni: 1, ..Default::default() };
    let b = Cost { anni: 1, comm: 2, ..Default::default() };
    a += b;
    assert_eq!(a.anni, 2);
    assert_eq!(a.comm, 2);
  }

  #[test]
  fn pretty_num_groups_by_thousands() {
    assert_eq!(pretty_num(1_234_567), "1_234_567");
    assert_eq!(pretty_num(42), "42");
  }
}
