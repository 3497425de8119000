//! Error adapter for converting TypeInfoError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a [`typeinfo_parser::error::ParseError`] contains multiple
//! diagnostics, each diagnostic is rendered independently. A run in which
//! several units failed reports every unit's errors, followed by a summary.

use std::{fmt, iter};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, SourceSpan};

use typeinfo::TypeInfoError;
use typeinfo_parser::error::Diagnostic;

/// Adapter for a single front end diagnostic.
///
/// This adapter wraps a single [`Diagnostic`] together with the named source
/// it was reported against.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    src: NamedSource<String>,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter for `diag` reported in `file`.
    pub fn new(diag: &'a Diagnostic, file: &str, src: &str) -> Self {
        Self {
            diag,
            src: NamedSource::new(file, src.to_string()),
        }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .field("file", &self.src.name())
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        if self.diag.severity().is_warning() {
            Some(miette::Severity::Warning)
        } else {
            Some(miette::Severity::Error)
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for non-diagnostic [`TypeInfoError`] variants.
///
/// This adapter handles errors that carry no source location, such as I/O,
/// extraction, and emission errors.
pub struct ErrorAdapter<'a>(pub &'a TypeInfoError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TypeInfoError::Io(_) => "typeinfo::io",
            TypeInfoError::Read { .. } => "typeinfo::read",
            TypeInfoError::Parse { .. } => return None,
            TypeInfoError::Extract { .. } => "typeinfo::extract",
            TypeInfoError::Json(_) => "typeinfo::json",
            TypeInfoError::Emit(_) => "typeinfo::emit",
            TypeInfoError::UnknownType(_) => "typeinfo::unknown_type",
            TypeInfoError::Config(_) => "typeinfo::config",
            TypeInfoError::UnitsFailed { .. } => "typeinfo::units_failed",
            TypeInfoError::Persist { .. } => "typeinfo::persist",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            TypeInfoError::UnknownType(_) => "only types generated with `--json` can be rendered",
            TypeInfoError::UnitsFailed { .. } => "outputs were written for the remaining units",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
///
/// This enum wraps either a single diagnostic or a non-diagnostic error,
/// providing a uniform interface for error rendering.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a front end [`Span`](typeinfo_parser::Span) to a miette [`SourceSpan`].
fn span_to_miette(span: typeinfo_parser::Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`TypeInfoError`] into a list of reportable errors.
///
/// [`TypeInfoError::Parse`] yields one [`Reportable`] per diagnostic, and
/// [`TypeInfoError::UnitsFailed`] yields the reportables of every failed
/// unit followed by the summary. Other variants yield a single
/// [`Reportable`].
pub fn to_reportables(err: &TypeInfoError) -> Vec<Reportable<'_>> {
    match err {
        TypeInfoError::Parse {
            err: parse_err,
            file,
            src,
        } => parse_err
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, file, src)))
            .collect(),
        TypeInfoError::UnitsFailed { failed, .. } => failed
            .iter()
            .flat_map(to_reportables)
            .chain(iter::once(Reportable::Error(ErrorAdapter(err))))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use typeinfo_parser::{
        Span,
        error::{ErrorCode, ParseError},
    };

    use super::*;

    #[test]
    fn test_single_diagnostic() {
        let diag = Diagnostic::error("unknown type name `Foo`")
            .with_code(ErrorCode::E300)
            .with_label(Span::new(0..3), "here")
            .with_help("declare the type first");
        let parse_err = ParseError::from(diag);
        let err = TypeInfoError::new_parse_error(parse_err, "types.h", "Foo x;");

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);

        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(d.to_string(), "unknown type name `Foo`");
                assert_eq!(d.code().map(|c| c.to_string()), Some("E300".to_string()));
                assert_eq!(d.severity(), Some(miette::Severity::Error));
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }
    }

    #[test]
    fn test_multiple_diagnostics() {
        let diags = vec![
            Diagnostic::error("first error")
                .with_code(ErrorCode::E001)
                .with_label(Span::new(0..5), "first"),
            Diagnostic::error("second error")
                .with_code(ErrorCode::E002)
                .with_label(Span::new(10..15), "second")
                .with_help("help for second"),
            Diagnostic::error("third error").with_label(Span::new(20..25), "third"),
        ];
        let parse_err = ParseError::from(diags);
        let err = TypeInfoError::new_parse_error(parse_err, "a.h", "source code here...........");

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 3);
        assert_eq!(reportables[0].to_string(), "first error");
        assert_eq!(reportables[1].to_string(), "second error");
        assert_eq!(reportables[2].to_string(), "third error");
    }

    #[test]
    fn test_non_parse_error() {
        let err = TypeInfoError::UnknownType("Missing".to_string());

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "type `Missing` not found in graph");
                assert_eq!(
                    e.code().map(|c| c.to_string()),
                    Some("typeinfo::unknown_type".to_string())
                );
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_failed_units_are_flattened() {
        let parse_err = ParseError::from(vec![
            Diagnostic::error("expected `;`").with_label(Span::new(0..1), "here"),
            Diagnostic::error("expected `}`").with_label(Span::new(1..2), "here"),
        ]);
        let err = TypeInfoError::UnitsFailed {
            failed: vec![
                TypeInfoError::new_parse_error(parse_err, "broken.h", "struct"),
                TypeInfoError::Config("bad".to_string()),
            ],
            total: 4,
        };

        let messages: Vec<String> = to_reportables(&err).iter().map(|r| r.to_string()).collect();
        assert_eq!(
            messages,
            [
                "expected `;`",
                "expected `}`",
                "Configuration error: bad",
                "2 of 4 units failed",
            ]
        );
    }

    #[test]
    fn test_all_labels_returned() {
        let diag = Diagnostic::error("error with labels")
            .with_label(Span::new(0..5), "primary label")
            .with_secondary_label(Span::new(10..15), "secondary label");

        let adapter = DiagnosticAdapter::new(&diag, "labels.h", "some source code");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label(), Some("primary label"));
        assert_eq!(labels[1].label(), Some("secondary label"));
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
    }

    #[test]
    fn test_warning_severity() {
        let diag = Diagnostic::warning("unknown type name `FILE`").with_label(Span::new(0..4), "here");
        let adapter = DiagnosticAdapter::new(&diag, "io.h", "FILE *f;");

        assert_eq!(adapter.severity(), Some(miette::Severity::Warning));
    }
}
