use crate::compiler::errors::CompileError;
use crate::parser::cst::{Program, TokenRange};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::debug;

// -----------------------------------------------------------------------------
// Pipeline stages
// -----------------------------------------------------------------------------

/// Pipeline stages, in the order they complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Parsed,
    Selected,
    Lowered,
    Validated,
    BoundaryAnalyzed,
    LivenessAnalyzed,
    Decomposed,
    Emitted,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Stage::Parsed => "parsing",
            Stage::Selected => "target selection",
            Stage::Lowered => "lowering",
            Stage::Validated => "validation",
            Stage::BoundaryAnalyzed => "boundary analysis",
            Stage::LivenessAnalyzed => "liveness analysis",
            Stage::Decomposed => "state decomposition",
            Stage::Emitted => "emission",
        };
        write!(f, "{}", name)
    }
}

// -----------------------------------------------------------------------------
// Diagnostics
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte span in the original source, with the line/column of its start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub len: usize,
}

impl Span {
    pub fn from_tokens(program: &Program, range: TokenRange) -> Self {
        let first = program.location(range.start);
        let bytes = program.byte_range(range);
        Self {
            start: Position {
                offset: first.offset,
                line: first.line,
                column: first.column,
            },
            len: bytes.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", self.span.start, severity, self.message)
    }
}

// -----------------------------------------------------------------------------
// Compiler context
// -----------------------------------------------------------------------------

/// Per-compilation state shared by every pass: the diagnostic sink and the
/// last completed stage
///
/// A pass that hits a fatal problem reports it and marks the unit failed, but
/// keeps going so that one run surfaces as many diagnostics as possible.
pub struct CompilerCtx<'a> {
    pub program: &'a Program,
    diagnostics: Vec<Diagnostic>,
    failed: bool,
    stage: Stage,
}

impl<'a> CompilerCtx<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            diagnostics: Vec::new(),
            failed: false,
            stage: Stage::Parsed,
        }
    }

    pub fn error(&mut self, range: TokenRange, message: impl Into<String>) {
        self.report(Severity::Error, range, message.into());
        self.failed = true;
    }

    pub fn warning(&mut self, range: TokenRange, message: impl Into<String>) {
        self.report(Severity::Warning, range, message.into());
    }

    fn report(&mut self, severity: Severity, range: TokenRange, message: String) {
        let span = Span::from_tokens(self.program, range);
        debug!(position = %span.start, ?severity, "{}", message);
        self.diagnostics.push(Diagnostic {
            severity,
            message,
            span,
        });
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Fails unless `stage` has already completed
    pub fn require(&self, stage: Stage) -> Result<(), CompileError> {
        if self.stage < stage {
            return Err(CompileError::StageOrder {
                required: stage,
                current: self.stage,
            });
        }
        Ok(())
    }

    /// Marks `stage` complete, or aborts with every diagnostic gathered so far
    pub fn complete(&mut self, stage: Stage) -> Result<(), CompileError> {
        if self.failed {
            return Err(CompileError::Failed {
                stage,
                diagnostics: std::mem::take(&mut self.diagnostics),
            });
        }
        debug!("{} complete", stage);
        self.stage = stage;
        Ok(())
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_error_marks_unit_failed() {
        let program = parse("void f() { g(); }").unwrap();
        let mut ctx = CompilerCtx::new(&program);
        ctx.warning(TokenRange::single(0), "just a warning");
        assert!(!ctx.failed());

        ctx.error(TokenRange::new(5, 8), "bad call");
        assert!(ctx.failed());
        assert_eq!(ctx.diagnostics()[1].span.start.column, 12);
        assert_eq!(ctx.diagnostics()[1].span.len, 4);

        match ctx.complete(Stage::Lowered) {
            Err(CompileError::Failed { stage, diagnostics }) => {
                assert_eq!(stage, Stage::Lowered);
                assert_eq!(diagnostics.len(), 2);
            }
            _ => panic!("Expected failure"),
        }
    }

    #[test]
    fn test_stage_order() {
        let program = parse("void f() { }").unwrap();
        let mut ctx = CompilerCtx::new(&program);
        assert!(ctx.require(Stage::Lowered).is_err());
        ctx.complete(Stage::Lowered).unwrap();
        assert!(ctx.require(Stage::Lowered).is_ok());
        assert!(ctx.require(Stage::Validated).is_err());
    }
}
