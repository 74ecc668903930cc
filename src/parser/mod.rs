//! C source code parser
//!
//! This module transforms C source text into a concrete parse tree:
//! - [`lexer`]: Tokenization (source text → tokens with byte offsets)
//! - [`parse`]: Parser struct, helpers and the [`parse()`](parse::parse) entry point
//! - [`cst`]: Parse tree node definitions
//!
//! # Accepted C Subset
//!
//! - Top level: function definitions are parsed in full, everything else
//!   (prototypes, typedefs, struct definitions, globals) is kept as an opaque
//!   token range
//! - Types: builtin keywords, typedef names, struct/union/enum, pointers, arrays
//! - Statements: every C statement form including `switch`, `goto` and labels
//! - Expressions: full C precedence, casts, `sizeof`, the comma operator
//! - No preprocessor: `#` lines are skipped by the lexer and survive in the
//!   rewritten output because edits are spliced into the original text
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one method per precedence level.
//! No external parser generator dependencies.

pub mod cst;
pub mod lexer;
pub mod parse;

mod declarations;
mod expressions;
mod statements;

pub use parse::{parse, ParseError, Parser};
