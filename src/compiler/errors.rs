use crate::compiler::context::{Diagnostic, Stage};
use crate::emit::splice::SpliceError;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{stage} failed with {} error(s)", count_errors(.diagnostics))]
    Failed {
        stage: Stage,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("{required} has not completed (last completed stage: {current})")]
    StageOrder { required: Stage, current: Stage },

    #[error(transparent)]
    Splice(#[from] SpliceError),
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == crate::compiler::context::Severity::Error)
        .count()
}

impl CompileError {
    /// Diagnostics carried by the error, empty for syntax and internal errors
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Failed { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}
