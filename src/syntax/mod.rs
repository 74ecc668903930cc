//! Typed, arena-backed representation of the function being transformed.

pub mod lower;
pub mod tree;
pub mod visit;

pub use lower::lower_function;
pub use tree::{Node, NodeId, NodeKind, Tree};
pub use visit::{visit_node, walk_children, Visitor};
