//! # Introduction
//!
//! unblock rewrites a C handler function written in blocking style into a
//! resumable state machine. Wherever the function waits on an asynchronous
//! primitive, the rewritten version stores a resume point, returns a
//! "waiting" status, and on its next invocation jumps straight back to where
//! it left off. Locals whose values must survive the suspension move into a
//! persistent record declared in a companion header.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → Lowering → Checks → Boundaries → Liveness
//!        → States → Emission (splice edits + header)
//! ```
//!
//! 1. [`parser`]: tokenises the source, keeping byte offsets, and builds a
//!    concrete tree for every function definition.
//! 2. [`syntax`]: lowers the target function into an arena tree with
//!    resolved variable references, plus a [`syntax::Visitor`] framework.
//! 3. [`check`]: structural checks on the tree and on the state graph.
//! 4. [`analysis`]: finds the blocking call sites and computes reach sets,
//!    deciding which locals escape into the record.
//! 5. [`states`]: splits the function into states and lays out the
//!    persistent record.
//! 6. [`emit`]: plans text edits over the original source and renders the
//!    header. Everything outside the edits is copied byte for byte.
//!
//! [`compiler::compile`] drives the passes; [`catalog`] describes the
//! primitives that count as blocking.
//!
//! ## Supported C subset
//!
//! Declarations with initializers, `if/else`, `while`, `do-while`, `for`,
//! `switch/case`, `break`, `continue`, `goto`, `return` and the full C
//! expression grammar. Blocking calls may appear as plain statements at the
//! top level of the body or directly inside a single `if`/`else`.

pub mod analysis;
pub mod catalog;
pub mod check;
pub mod compiler;
pub mod emit;
pub mod parser;
pub mod states;
pub mod syntax;

pub use catalog::Catalog;
pub use compiler::{compile, Compilation, CompileError, Options};
