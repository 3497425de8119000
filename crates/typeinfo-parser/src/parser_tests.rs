//! Unit tests for the declaration parser over realistic header shapes
//!
//! These tests run the lexer and parser together and check that common C
//! header constructs are accepted and malformed input is rejected with a
//! located diagnostic.

use crate::{
    error::{Diagnostic, ErrorCode},
    lexer, parser,
    parser_types::TranslationUnit,
    tokens::PositionedToken,
};

fn significant_tokens(source: &str) -> Vec<PositionedToken<'_>> {
    lexer::tokenize(source)
        .expect("Lexer should succeed")
        .into_iter()
        .filter(|t| !t.token.is_trivia())
        .collect()
}

/// Helper function to parse a source string and return the declaration
/// count or the first diagnostic
fn parse_source(source: &str) -> Result<usize, String> {
    let tokens = lexer::tokenize(source).map_err(|err| format!("Lexer error: {}", err))?;
    let significant: Vec<_> = tokens.into_iter().filter(|t| !t.token.is_trivia()).collect();
    let unit = parser::build_unit(&significant).map_err(|err| format!("Parser error: {}", err))?;
    Ok(unit.declarations.len())
}

/// Helper function to parse a source string and assert success
fn assert_parses_successfully(source: &str) {
    if let Err(e) = parse_source(source) {
        panic!("Expected parsing to succeed, but got error: {}", e);
    }
}

/// Helper function to parse a source string and assert failure
fn assert_parse_fails(source: &str) {
    if parse_source(source).is_ok() {
        panic!("Expected parsing to fail, but it succeeded");
    }
}

/// Helper to run the parser on a source expected to fail
fn parse_error(source: &str) -> Diagnostic {
    let tokens = significant_tokens(source);
    match parser::build_unit(&tokens) {
        Ok(_) => panic!("Expected parsing to fail for {source:?}"),
        Err(err) => err,
    }
}

fn with_unit(source: &str, check: impl FnOnce(&TranslationUnit<'_>)) {
    let tokens = significant_tokens(source);
    let unit = parser::build_unit(&tokens).unwrap_or_else(|e| panic!("{e}"));
    check(&unit);
}

#[cfg(test)]
mod basic_parsing_tests {
    use super::*;

    #[test]
    fn test_simple_struct() {
        let source = r#"
            struct point {
                int x;
                int y;
            };
        "#;
        assert_parses_successfully(source);
    }

    #[test]
    fn test_declaration_count() {
        let source = r#"
            typedef unsigned long size_type;
            struct a { int v; };
            union b { int i; float f; };
            enum c { C0, C1 };
            ;;
        "#;
        assert_eq!(parse_source(source), Ok(4));
    }

    #[test]
    fn test_forward_declarations() {
        let source = r#"
            struct list;
            typedef struct list list_t;
            struct list { list_t *next; };
        "#;
        assert_eq!(parse_source(source), Ok(3));
    }

    #[test]
    fn test_multiple_declarators_per_field() {
        with_unit("struct s { int a, *b, c[2]; };", |unit| {
            let crate::parser_types::TypeSpecifier::Record(record) =
                unit.declarations[0].specifiers.specifier.inner()
            else {
                panic!("expected record");
            };
            let field = &record.fields.as_ref().unwrap()[0];
            assert_eq!(field.declarators.len(), 3);
        });
    }
}

#[cfg(test)]
mod attribute_parsing_tests {
    use super::*;

    #[test]
    fn test_root_marker_positions() {
        let sources = [
            "TI_ROOT struct a { int x; };",
            "struct TI_ROOT a { int x; };",
            "struct a { int x; } TI_ROOT;",
            "typedef struct TI_ROOT { int x; } a;",
        ];
        for source in sources {
            assert_parses_successfully(source);
        }
    }

    #[test]
    fn test_ignored_attributes() {
        let source = r#"
            struct __attribute__((aligned(8), __packed__)) a { int x; };
            __declspec(dllexport) extern int counter;
            struct b { int y __attribute__((deprecated("use z"))); };
            extern int renamed __asm__("real_name");
        "#;
        assert_parses_successfully(source);
    }

    #[test]
    fn test_annotation_on_bit_field() {
        assert_parses_successfully("struct a { unsigned f : 2 TI_ANN(Flags); };");
    }

    #[test]
    fn test_malformed_annotation() {
        assert_parse_fails("struct a { int x __attribute__((annotate(1))); };");
        assert_parse_fails("struct a { int x TI_ANN(; };");
    }
}

#[cfg(test)]
mod declarator_tests {
    use super::*;

    #[test]
    fn test_function_pointer_fields() {
        let source = r#"
            struct ops {
                int (*open)(const char *path, int flags);
                void (*callbacks[4])(void);
                void *(*alloc)(unsigned long);
            };
        "#;
        assert_parses_successfully(source);
    }

    #[test]
    fn test_array_sizes() {
        let source = r#"
            enum { LEN = 8 };
            struct buffers {
                char a[LEN];
                char b[LEN * 2 + 1];
                char c[sizeof(int) << 2];
                char d[(LEN > 4) ? 16 : 4];
                int grid[2][3];
                char tail[];
            };
        "#;
        assert_parses_successfully(source);
    }

    #[test]
    fn test_function_prototypes_and_definitions() {
        let source = r#"
            int printf(const char *restrict fmt, ...);
            static inline void noop(void) { { } }
            _Noreturn void fail(int code);
            int (*signal(int sig, void (*handler)(int)))(int);
        "#;
        assert_eq!(parse_source(source), Ok(4));
    }

    #[test]
    fn test_gnu_extensions() {
        let source = r#"
            __extension__ typedef long long quad;
            typedef __signed__ char s8;
            struct w { volatile __const__ int reg; __restrict__ char *p; };
        "#;
        assert_parses_successfully(source);
    }
}

#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_missing_semicolon_after_struct() {
        let err = parse_error("struct a { int x; } struct b { int y; };");
        assert_eq!(err.code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse_error("struct a { int x; ");
        assert_eq!(err.code(), Some(ErrorCode::E101));
        assert!(err.message().contains("unexpected end of input"));
    }

    #[test]
    fn test_conflicting_specifiers() {
        for source in ["signed unsigned x;", "long short x;", "int int x;", "long long long x;"] {
            let err = parse_error(source);
            assert_eq!(err.code(), Some(ErrorCode::E102), "{source}");
        }
    }

    #[test]
    fn test_struct_without_tag_or_body() {
        let err = parse_error("struct;");
        assert_eq!(err.code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_missing_declarator_name() {
        assert_parse_fails("int *;");
        assert_parse_fails("struct a { int x; } *;");
    }

    #[test]
    fn test_error_span_points_at_offending_token() {
        let source = "struct a {\n    int x\n    int y;\n};";
        let err = parse_error(source);
        let span = err.primary_span().expect("error should carry a span");
        assert_eq!(&source[span.range()], "int");
        assert_eq!(span.start(), source.rfind("int y").unwrap());
    }
}
