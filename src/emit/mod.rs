//! Output generation: the rewritten source and the record header.

pub mod header;
pub mod planner;
pub mod splice;

pub use header::{default_guard, render_header};
pub use planner::{plan, PlanInputs, STATE_POINTER};
pub use splice::{apply_edits, Edit, Rewriter, SpliceError};
