use crate::compiler::context::{Diagnostic, Severity};
use crate::compiler::errors::CompileError;
use miette::{NamedSource, Report, SourceSpan};
use thiserror::Error;

/// A diagnostic attached to the source it points into, for terminal rendering
#[derive(Debug, Error, miette::Diagnostic, Clone)]
#[error("{message}")]
pub struct SourceDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SourceDiagnostic {
    pub fn from_diagnostic(src: NamedSource<String>, diagnostic: &Diagnostic, help: Option<String>) -> Self {
        let label = match diagnostic.severity {
            Severity::Error => "here",
            Severity::Warning => "warning raised here",
        };
        Self {
            src,
            span: SourceSpan::from((diagnostic.span.start.offset, diagnostic.span.len)),
            help,
            message: diagnostic.message.clone(),
            label: label.to_string(),
        }
    }
}

/// One report per problem in `error`
pub fn error_reports(path: &str, source: &str, error: &CompileError) -> Vec<Report> {
    let src = NamedSource::new(path, source.to_string());
    match error {
        CompileError::Parse(parse) => {
            let diagnostic = SourceDiagnostic {
                src,
                span: SourceSpan::from((parse.location.offset, parse.location.len)),
                help: Some(
                    "only a subset of C is accepted; the crate documentation lists the supported constructs"
                        .to_string(),
                ),
                message: parse.message.clone(),
                label: "syntax error".to_string(),
            };
            vec![Report::new(diagnostic)]
        }
        CompileError::Failed { stage, diagnostics } => diagnostics
            .iter()
            .map(|diagnostic| {
                let help = Some(format!("reported during {}", stage));
                Report::new(SourceDiagnostic::from_diagnostic(src.clone(), diagnostic, help))
            })
            .collect(),
        other => vec![Report::msg(other.to_string())],
    }
}

/// Reports for the warnings of a successful compilation
pub fn warning_reports(path: &str, source: &str, diagnostics: &[Diagnostic]) -> Vec<Report> {
    let src = NamedSource::new(path, source.to_string());
    diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .map(|diagnostic| Report::new(SourceDiagnostic::from_diagnostic(src.clone(), diagnostic, None)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::compiler::{compile, Options};

    #[test]
    fn test_reports_point_into_source() {
        let source = "void f(h) { int x; x = wait_op(h, 1); }";
        let error = compile(source, &Catalog::builtin(), &Options::default()).unwrap_err();
        let reports = error_reports("f.c", source, &error);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].to_string().contains("disallowed position"));
    }

    #[test]
    fn test_parse_error_report() {
        let source = "void f() { g(; }";
        let error = compile(source, &Catalog::builtin(), &Options::default()).unwrap_err();
        let reports = error_reports("f.c", source, &error);
        assert_eq!(reports.len(), 1);
        let help = reports[0].help().map(|help| help.to_string()).unwrap_or_default();
        assert!(help.contains("crate documentation"));
        assert!(!help.contains("README"));
    }
}
