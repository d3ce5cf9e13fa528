//! Convenience re-exports for crates embedding the runtime directly, so
//! callers can pull the whole public surface from one `use` line.

pub use crate::error::RuntimeError;
pub use crate::heap::{Heap, ROOT};
pub use crate::link::{Lnk, Tag};
pub use crate::ops::Op2;
pub use crate::program::{CtrDef, FnDef, Pat, Program, Rule};
pub use crate::readback::readback;
pub use crate::runtime::{Runtime, RuntimeConfig};
pub use crate::stats::{Cost, Stats};
