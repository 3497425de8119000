//! Error and diagnostic system for the C front end.
//!
//! Every phase (lexing, parsing, elaboration) reports problems as
//! [`Diagnostic`]s carrying an [`ErrorCode`], labeled source spans, and
//! optional help text. A failed unit returns them wrapped in a
//! [`ParseError`]; a successful unit keeps its warnings.
//!
//! # Example
//!
//! ```
//! # use typeinfo_parser::error::{Diagnostic, ErrorCode};
//! # use typeinfo_parser::Span;
//!
//! let diag = Diagnostic::error("redefinition of `struct Node`")
//!     .with_code(ErrorCode::E201)
//!     .with_label(Span::new(100..104), "redefined here")
//!     .with_secondary_label(Span::new(7..11), "previous definition is here");
//! assert_eq!(diag.to_string(), "error[E201]: redefinition of `struct Node`");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use parse_error::Result;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
