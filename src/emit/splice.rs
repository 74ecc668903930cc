//! Text splicing over the original source
//!
//! Edits are collected against token positions and applied in one pass, so
//! every byte that no edit touches (comments, whitespace, preprocessor lines)
//! comes out exactly as it went in.

use crate::parser::cst::{Program, TokenIndex, TokenRange};
use std::ops::Range;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    #[error("edit at bytes {start}..{end} overlaps an earlier edit ending at byte {previous_end}")]
    Overlap {
        start: usize,
        end: usize,
        previous_end: usize,
    },
    #[error("edit at bytes {start}..{end} lies outside the {len}-byte source")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Replace `range` with `text`; an empty range is an insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

/// Apply byte-range edits to `source`
///
/// Insertions at the same offset come out in the order given. An insertion at
/// the start of a replaced range goes before the replacement, one at its end
/// goes after. Replacements may touch but not overlap.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, SpliceError> {
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by_key(|&index| (edits[index].range.start, edits[index].range.end, index));

    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;
    for index in order {
        let Edit { range, text } = &edits[index];
        if range.start > range.end || range.end > source.len() {
            return Err(SpliceError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: source.len(),
            });
        }
        if range.start < cursor {
            return Err(SpliceError::Overlap {
                start: range.start,
                end: range.end,
                previous_end: cursor,
            });
        }
        output.push_str(&source[cursor..range.start]);
        output.push_str(text);
        cursor = range.end;
    }
    output.push_str(&source[cursor..]);
    Ok(output)
}

/// Token-addressed edit list over one source text
pub struct Rewriter<'a> {
    source: &'a str,
    program: &'a Program,
    edits: Vec<Edit>,
}

impl<'a> Rewriter<'a> {
    pub fn new(source: &'a str, program: &'a Program) -> Self {
        Self {
            source,
            program,
            edits: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn insert_before(&mut self, token: TokenIndex, text: impl Into<String>) {
        let offset = self.program.location(token).offset;
        self.push(offset..offset, text.into());
    }

    pub fn insert_after(&mut self, token: TokenIndex, text: impl Into<String>) {
        let offset = self.program.location(token).end();
        self.push(offset..offset, text.into());
    }

    pub fn replace(&mut self, range: TokenRange, text: impl Into<String>) {
        let bytes = self.program.byte_range(range);
        self.push(bytes, text.into());
    }

    pub fn delete(&mut self, range: TokenRange) {
        self.replace(range, "");
    }

    fn push(&mut self, range: Range<usize>, text: String) {
        trace!(start = range.start, end = range.end, text = %text, "edit");
        self.edits.push(Edit { range, text });
    }

    pub fn finish(self) -> Result<String, SpliceError> {
        apply_edits(self.source, &self.edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn edit(start: usize, end: usize, text: &str) -> Edit {
        Edit {
            range: start..end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_no_edits_is_identity() {
        let source = "#include <x.h>\n/* keep */ int f() {\treturn 0; }\n";
        assert_eq!(apply_edits(source, &[]).unwrap(), source);

        let program = parse(source).unwrap();
        assert_eq!(Rewriter::new(source, &program).finish().unwrap(), source);
    }

    #[test]
    fn test_insertions_keep_order() {
        let out = apply_edits("ab", &[edit(1, 1, "1"), edit(1, 1, "2"), edit(0, 0, "0")]).unwrap();
        assert_eq!(out, "0a12b");
    }

    #[test]
    fn test_insertions_around_replacement() {
        let edits = [edit(2, 4, "XY"), edit(4, 4, ">"), edit(2, 2, "<")];
        assert_eq!(apply_edits("abcdef", &edits).unwrap(), "ab<XY>ef");
    }

    #[test]
    fn test_overlap_is_rejected() {
        let result = apply_edits("abcdef", &[edit(1, 4, "x"), edit(3, 5, "y")]);
        assert_eq!(
            result,
            Err(SpliceError::Overlap {
                start: 3,
                end: 5,
                previous_end: 4
            })
        );
        assert!(apply_edits("abcdef", &[edit(1, 4, "x"), edit(2, 2, "y")]).is_err());
        assert!(apply_edits("abc", &[edit(2, 9, "x")]).is_err());
    }

    #[test]
    fn test_token_addressed_edits() {
        let source = "void f() {\n    g(1);\n}\n";
        let program = parse(source).unwrap();
        let mut rewriter = Rewriter::new(source, &program);
        // tokens: void f ( ) { g ( 1 ) ; }
        rewriter.replace(TokenRange::single(5), "h");
        rewriter.insert_after(9, " /* done */");
        rewriter.insert_before(10, "x();\n");
        assert_eq!(
            rewriter.finish().unwrap(),
            "void f() {\n    h(1); /* done */\nx();\n}\n"
        );
    }
}
