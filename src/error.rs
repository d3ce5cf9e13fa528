//! Fallible, non-fatal errors at the boundary between user-supplied
//! configuration and the runtime. Internal invariant violations (heap
//! exhaustion mid-reduction, a corrupt graph) stay fatal aborts; they are
//! not represented here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
  #[error("requested heap of {requested} words exceeds the maximum addressable size of {max} words")]
  HeapTooLarge { requested: usize, max: usize },

  #[error("heap size must be divisible by the worker count ({workers})")]
  HeapNotDivisible { workers: usize },

  #[error("at least one worker is required")]
  NoWorkers,

  #[error("invalid memory size {0:?}: expected a plain integer or a suffix of K, M or G")]
  InvalidMemorySize(String),
}
