//! Error types for typeinfo operations.
//!
//! [`TypeInfoError`] wraps everything that can go wrong while generating
//! descriptors for a set of source files. [`ExtractError`] covers failures of
//! the extraction engine itself, independent of the front end used.

use std::{io, path::PathBuf};

use thiserror::Error;

use typeinfo_core::provider::LayoutError;
use typeinfo_parser::error::ParseError;

/// Failure while extracting the type graph of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A field has no byte offset, e.g. because it is a bit-field.
    #[error("error computing offset of field `{field}` in `{record}`: {reason}")]
    FieldOffset {
        field: String,
        record: String,
        reason: LayoutError,
    },

    /// A type reached through a field has no usable size or alignment.
    #[error("error computing layout of `{name}`: {reason}")]
    Layout { name: String, reason: LayoutError },
}

/// The main error type for typeinfo operations.
///
/// # Diagnostic Variants
///
/// The `Parse` variant keeps the source text next to the diagnostics so a
/// caller can render labelled snippets.
#[derive(Debug, Error)]
pub enum TypeInfoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read `{}`: {err}", path.display())]
    Read { path: PathBuf, err: io::Error },

    #[error("{err}")]
    Parse {
        err: ParseError,
        file: String,
        src: String,
    },

    #[error("{file}: {err}")]
    Extract { err: ExtractError, file: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Emit error: {0}")]
    Emit(#[from] crate::emit::Error),

    #[error("type `{0}` not found in graph")]
    UnknownType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Some units could not be processed; the others were still emitted.
    #[error("{} of {total} units failed", failed.len())]
    UnitsFailed {
        failed: Vec<TypeInfoError>,
        total: usize,
    },

    #[error("failed to write `{}`: {err}", path.display())]
    Persist { path: PathBuf, err: io::Error },
}

impl TypeInfoError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, file: impl Into<String>, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            file: file.into(),
            src: src.into(),
        }
    }

    pub fn new_extract_error(err: ExtractError, file: impl Into<String>) -> Self {
        Self::Extract {
            err,
            file: file.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offset_message() {
        let err = ExtractError::FieldOffset {
            field: "flags".to_string(),
            record: "Header".to_string(),
            reason: LayoutError::BitField,
        };
        assert_eq!(
            err.to_string(),
            "error computing offset of field `flags` in `Header`: \
             layout error: field is a bit-field and has no byte offset"
        );

        let wrapped = TypeInfoError::new_extract_error(err, "types.h");
        assert!(wrapped.to_string().starts_with("types.h: error computing offset"));

        let summary = TypeInfoError::UnitsFailed {
            failed: vec![wrapped],
            total: 3,
        };
        assert_eq!(summary.to_string(), "1 of 3 units failed");
    }
}
