//! Wires a [`Program`] and a [`Heap`] together and owns the worker pool for
//! the duration of one normalization: the `ffi_normal`/`ffi_cost`/`ffi_size`
//! entry point, adapted to return a [`Stats`] value instead of writing
//! through process-global statics.

use crate::error::RuntimeError;
use crate::heap::{Heap, DEFAULT_HEAP_WORDS, ROOT};
use crate::link::Lnk;
use crate::pool::run_parallel;
use crate::program::Program;
use crate::stats::Stats;
use std::time::Instant;

/// Configuration for one [`Runtime`]: heap capacity and worker count.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
  pub heap_words: usize,
  pub workers: usize,
}

impl Default for RuntimeConfig {
  fn default() -> RuntimeConfig {
    RuntimeConfig { heap_words: DEFAULT_HEAP_WORDS, workers: 1 }
  }
}

/// A `Program` plus a freshly allocated `Heap`, ready to normalize a graph
/// written at [`ROOT`].
pub struct Runtime {
  pub heap: Heap,
  pub program: Program,
  workers: usize,
}

impl Runtime {
  pub fn new(program: Program, config: RuntimeConfig) -> Result<Runtime, RuntimeError> {
    let heap = Heap::new(config.heap_words, config.workers)?;
    Ok(Runtime { heap, program, workers: config.workers })
  }

  /// Writes `root` at the reserved root address, ready for `normalize`.
  pub fn set_root(&self, root: Lnk) {
    self.heap.set(ROOT, root);
  }

  /// Runs `normal` to completion over the graph rooted at [`ROOT`],
  /// spawning the worker pool for the duration of this call only. Returns
  /// the rewrite/size/time statistics and the final root link.
  ///
  /// `reserved_words` is the number of words directly after [`ROOT`] that
  /// the caller already wrote before calling `normalize` — typically a
  /// call's own argument block, laid out at addresses `1..=arity` before
  /// `set_root` points at it. Worker 0's allocator starts its frontier
  /// past this prefix instead of at a hardcoded `ROOT + 1`, so it never
  /// reuses an address that is still live. Pass `0` when nothing was
  /// written ahead of `ROOT`.
  pub fn normalize(&self, reserved_words: u32) -> (Stats, Lnk) {
    let start = Instant::now();
    let (cost, words_used, root) = run_parallel(&self.heap, &self.program, self.workers, ROOT, reserved_words);
    let elapsed = start.elapsed();
    (Stats { cost, words_used, elapsed }, root)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::link;
  use crate::link::Tag;

  #[test]
  fn normalizes_church_identity() {
    let runtime = Runtime::new(Program::empty(), RuntimeConfig { heap_words: 1024, workers: 1 }).unwrap();
    // (lam x x) 42, hand-placed at fixed addresses since ROOT (0) is
    // reserved for the application link itself.
    let lam_p = 8;
    runtime.heap.set(lam_p, Lnk::era());
    link(&runtime.heap, lam_p + 1, Lnk::var(lam_p));
    let app_p = 16;
    link(&runtime.heap, app_p, Lnk::lam(lam_p));
    link(&runtime.heap, app_p + 1, Lnk::num_val(42));
    runtime.set_root(Lnk::app(app_p));

    let (stats, root) = runtime.normalize(0);
    assert_eq!(root.tag(), Tag::Num);
    assert_eq!(root.num(), 42);
    assert_eq!(stats.cost.total(), 1);
  }
}
