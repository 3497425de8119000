//! Error codes for the diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E2xx` - Elaboration errors
//! - `E3xx` - Elaboration warnings

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    E001,

    /// Unexpected character.
    ///
    /// A character that starts no C token, e.g. `@` or a stray backtick.
    E002,

    /// Invalid escape sequence in a string or character literal.
    E003,

    /// Invalid numeric literal.
    ///
    /// Digits that do not fit the radix, or an integer wider than 64 bits.
    E004,

    /// Unterminated block comment.
    E005,

    /// Invalid character literal.
    ///
    /// An empty or unterminated `'...'` literal.
    E006,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    E100,

    /// Incomplete input.
    ///
    /// The input ended before a complete declaration was parsed.
    E101,

    /// Invalid combination of type specifiers, e.g. `short double`.
    E102,

    // =========================================================================
    // Elaboration Errors (E2xx)
    // =========================================================================
    /// Use of an undeclared identifier in a constant expression.
    E200,

    /// Redefinition of a tag, typedef, or enumerator.
    E201,

    /// Expression is not an integer constant expression.
    E202,

    /// Array declared with a negative or non-constant size.
    E203,

    /// Invalid bit-field width or bit-field type.
    E204,

    /// Field has an incomplete type.
    E205,

    /// Duplicate member name in a struct or union.
    E206,

    /// Tag used with a different kind than its previous declaration.
    E207,

    /// Type whose size in bits does not fit in 64 bits.
    E208,

    // =========================================================================
    // Elaboration Warnings (E3xx)
    // =========================================================================
    /// Unknown type name, treated as an opaque incomplete type.
    E300,

    /// Attribute not understood and ignored.
    E301,

    /// Declaration does not declare anything.
    E302,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            // Parser errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            // Elaboration errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",
            // Elaboration warnings
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "invalid escape sequence",
            ErrorCode::E004 => "invalid numeric literal",
            ErrorCode::E005 => "unterminated comment",
            ErrorCode::E006 => "invalid character literal",
            // Parser errors
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "invalid type specifier",
            // Elaboration errors
            ErrorCode::E200 => "undeclared identifier",
            ErrorCode::E201 => "redefinition",
            ErrorCode::E202 => "not an integer constant expression",
            ErrorCode::E203 => "invalid array size",
            ErrorCode::E204 => "invalid bit-field",
            ErrorCode::E205 => "incomplete field type",
            ErrorCode::E206 => "duplicate member",
            ErrorCode::E207 => "tag kind mismatch",
            ErrorCode::E208 => "type too large",
            // Elaboration warnings
            ErrorCode::E300 => "unknown type name",
            ErrorCode::E301 => "attribute ignored",
            ErrorCode::E302 => "empty declaration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E100.to_string(), "E100");
        assert_eq!(ErrorCode::E205.to_string(), "E205");
        assert_eq!(ErrorCode::E300.to_string(), "E300");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E001.description(), "unterminated string literal");
        assert_eq!(ErrorCode::E205.description(), "incomplete field type");
        assert_eq!(ErrorCode::E301.description(), "attribute ignored");
    }
}
