//! # Typeinfo Parser
//!
//! Front end for C declarations. This crate turns a header or source file
//! into a [`Unit`], an elaborated view of its types and declarations that
//! answers the [`typeinfo_core::provider::TypeProvider`] queries the
//! extraction engine relies on.
//!
//! Only declarations are understood: function bodies and initializers are
//! skipped, and preprocessor directives are ignored rather than expanded.
//! Layouts follow the System V rules for the configured [`DataModel`].
//!
//! ## Usage
//!
//! ```
//! # use typeinfo_parser::{parse, ParseError, TargetConfig};
//! use typeinfo_core::provider::TypeProvider;
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"
//!         struct point { int x; int y; };
//!     "#;
//!
//!     let unit = parse(source, "point.h", TargetConfig::default())?;
//!     let point = unit.find_decl("point").expect("declared above");
//!     assert_eq!(unit.fields(point).len(), 2);
//!     Ok(())
//! }
//! ```

mod builtin_types;
mod elaborate;
pub mod error;
mod layout;
mod lexer;
mod parser;
#[cfg(test)]
mod parser_tests;
mod parser_types;
mod span;
mod target;
mod tokens;
mod unit;

pub use error::ParseError;
pub use span::Span;
pub use target::{DataModel, TargetConfig};
pub use unit::{DeclId, TypeId, Unit};

use log::debug;

use elaborate::Builder;

/// Parse C source text into an elaborated unit.
///
/// The pipeline runs in three steps:
///
/// 1. **Tokenize** - Convert source text to tokens, dropping comments and
///    directives
/// 2. **Parse** - Build the declaration AST, stopping at the first error
/// 3. **Elaborate** - Bind names, evaluate constants, and lay out records
///
/// # Arguments
///
/// * `source` - The C source text
/// * `file` - File name recorded in declaration origins
/// * `config` - Data model and `char` signedness used for layout
///
/// # Returns
///
/// Returns the [`Unit`] on success. Warnings are kept on the unit, see
/// [`Unit::warnings`]. On failure the [`ParseError`] carries every error
/// diagnostic with its source span.
pub fn parse(source: &str, file: &str, config: TargetConfig) -> Result<Unit, ParseError> {
    debug!(file, data_model:% = config.data_model; "Parsing unit");

    // Step 1: Tokenize
    let tokens: Vec<_> = lexer::tokenize(source)?
        .into_iter()
        .filter(|token| !token.token.is_trivia())
        .collect();

    // Step 2: Parse
    let ast = parser::build_unit(&tokens)?;

    // Step 3: Elaborate
    let builder = Builder::new(file, source, config);
    builder.build(&ast)
}
