//! Compiler driver
//!
//! [`compile`] runs the passes in order over a shared [`context::CompilerCtx`].
//! Each pass checks that its predecessor completed and reports problems
//! through the context; the first stage that ends with an error stops the run
//! and hands back everything reported so far.

pub mod context;
pub mod errors;
pub mod options;
pub mod pipeline;
pub mod report;

pub use context::{Diagnostic, Severity, Stage};
pub use errors::CompileError;
pub use options::Options;
pub use pipeline::{compile, Compilation};
