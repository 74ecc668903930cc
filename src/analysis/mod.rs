//! Analyses over the lowered tree: where the function suspends, and which
//! locals have to survive a suspension.

pub mod boundary;
pub mod liveness;

pub use boundary::{find_boundaries, Boundaries, CallSite, Handle};
pub use liveness::{analyze, Liveness, ReachSet, StateId, StorageClass};
