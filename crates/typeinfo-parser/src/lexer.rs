//! Lexical analyzer for C source text.
//!
//! The lexer converts source text into a stream of [`Token`]s. Comments,
//! whitespace, and preprocessor lines are kept as trivia tokens so spans
//! stay exact; the parser filters them out.
//!
//! The public entry point is [`tokenize`], which performs error-recovering
//! lexical analysis and collects all diagnostics in a single pass.

use winnow::{
    Parser as _,
    combinator::{alt, cut_err, opt, peek, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, none_of, one_of, take_till, take_until, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    pub code: ErrorCode,
    pub message: &'static str,
    pub help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    pub start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<'a, O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn cut_with<'a, O>(input: &mut Input<'a>, diagnostic: LexerDiagnostic) -> IResult<'a, O> {
    Err(ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        diagnostic,
    )))
}

/// Parse the part of an escape sequence after the backslash.
///
/// Returns the code unit value: octal and hex escapes may denote values
/// that are not valid characters on their own.
fn escape_value<'a>(input: &mut Input<'a>) -> IResult<'a, u32> {
    let escape_start = input.current_token_start();
    '\\'.parse_next(input)?;

    let simple = opt(one_of([
        'n', 't', 'r', 'a', 'b', 'f', 'v', 'e', '\\', '\'', '"', '?',
    ]))
    .parse_next(input)?;
    if let Some(c) = simple {
        return Ok(match c {
            'n' => 0x0A,
            't' => 0x09,
            'r' => 0x0D,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0C,
            'v' => 0x0B,
            'e' => 0x1B,
            other => u32::from(other),
        });
    }

    let octal: Option<&str> =
        opt(take_while(1..=3, |c: char| matches!(c, '0'..='7'))).parse_next(input)?;
    if let Some(digits) = octal {
        return Ok(u32::from_str_radix(digits, 8).unwrap_or(0));
    }

    let hex: Option<&str> =
        opt(preceded('x', take_while(1..=8, |c: char| c.is_ascii_hexdigit()))).parse_next(input)?;
    if let Some(digits) = hex {
        return Ok(u32::from_str_radix(digits, 16).unwrap_or(0));
    }

    cut_with(
        input,
        LexerDiagnostic {
            code: ErrorCode::E003,
            message: "invalid escape sequence",
            help: Some("valid escapes: `\\n`, `\\t`, `\\r`, `\\\\`, `\\'`, `\\\"`, `\\0`, `\\x41`"),
            start: escape_start,
        },
    )
}

/// Parse a double-quoted string literal.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let string_char = none_of(['"', '\\', '\n']).map(u32::from);
    let string_content =
        repeat(0.., alt((escape_value, string_char))).fold(String::new, |mut acc, unit| {
            acc.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
            acc
        });

    let start_pos = input.current_token_start();
    '"'.parse_next(input)?;

    cut_err(terminated(string_content, '"'))
        .context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("add closing `\"`"),
            start: start_pos,
        })
        .parse_next(input)
        .map(Token::StringLiteral)
}

/// Parse a single-quoted character constant.
fn char_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start_pos = input.current_token_start();
    '\''.parse_next(input)?;

    cut_err(terminated(
        alt((escape_value, none_of(['\'', '\\', '\n']).map(u32::from))),
        '\'',
    ))
    .context(LexerDiagnostic {
        code: ErrorCode::E006,
        message: "invalid character literal",
        help: Some("a character constant holds exactly one character, e.g. `'a'`"),
        start: start_pos,
    })
    .parse_next(input)
    .map(|unit| Token::CharLiteral(i64::from(unit)))
}

fn exponent_sign<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    (one_of(['e', 'E', 'p', 'P']), one_of(['+', '-']))
        .void()
        .parse_next(input)
}

fn pp_number_tail<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    repeat(
        0..,
        alt((
            exponent_sign,
            one_of(|c: char| c.is_ascii_alphanumeric() || c == '.' || c == '_').void(),
        )),
    )
    .parse_next(input)
}

/// Parse a preprocessing number: a digit, or a dot followed by a digit,
/// then any run of identifier characters, dots, and signed exponents.
fn pp_number<'a>(input: &mut Input<'a>) -> IResult<'a, &'a str> {
    (
        alt((
            one_of(|c: char| c.is_ascii_digit()).void(),
            ('.', peek(one_of(|c: char| c.is_ascii_digit()))).void(),
        )),
        pp_number_tail,
    )
        .take()
        .parse_next(input)
}

/// Classifies a preprocessing number as an integer or floating constant.
///
/// Returns `None` if the text is not a valid constant.
fn classify_number(text: &str) -> Option<Token<'_>> {
    let lower = text.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let is_float = if is_hex {
        lower.contains('.') || lower.contains('p')
    } else {
        lower.contains('.') || lower.contains('e')
    };
    if is_float {
        return Some(Token::FloatLiteral(text));
    }

    let digits = lower.trim_end_matches(['u', 'l']);
    let value = if let Some(hex) = digits.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(binary) = digits.strip_prefix("0b") {
        u64::from_str_radix(binary, 2)
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<u64>()
    };
    value.ok().map(Token::IntLiteral)
}

fn number<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start = input.current_token_start();
    let text = pp_number.parse_next(input)?;
    match classify_number(text) {
        Some(token) => Ok(token),
        None => cut_with(
            input,
            LexerDiagnostic {
                code: ErrorCode::E004,
                message: "invalid numeric literal",
                help: Some("integer constants must fit in 64 bits and use digits valid for their base"),
                start,
            },
        ),
    }
}

/// Maps a word to its keyword token, or an identifier.
fn classify_word(word: &str) -> Token<'_> {
    match word {
        "typedef" => Token::Typedef,
        "extern" => Token::Extern,
        "static" => Token::Static,
        "auto" => Token::Auto,
        "register" => Token::Register,
        "_Thread_local" | "thread_local" | "__thread" => Token::ThreadLocal,
        "inline" | "__inline" | "__inline__" => Token::Inline,
        "_Noreturn" => Token::Noreturn,

        "const" | "__const" | "__const__" => Token::Const,
        "volatile" | "__volatile" | "__volatile__" => Token::Volatile,
        "restrict" | "__restrict" | "__restrict__" => Token::Restrict,
        "_Atomic" => Token::Atomic,

        "void" => Token::Void,
        "_Bool" | "bool" => Token::Bool,
        "char" => Token::Char,
        "short" => Token::Short,
        "int" => Token::Int,
        "long" => Token::Long,
        "float" => Token::Float,
        "double" => Token::Double,
        "signed" | "__signed" | "__signed__" => Token::Signed,
        "unsigned" => Token::Unsigned,
        "_Complex" | "__complex__" => Token::Complex,
        "__int128" => Token::Int128,
        "struct" => Token::Struct,
        "union" => Token::Union,
        "enum" => Token::Enum,

        "sizeof" => Token::Sizeof,
        "_Alignof" | "alignof" | "__alignof" | "__alignof__" => Token::Alignof,
        "_Alignas" | "alignas" => Token::Alignas,
        "_Static_assert" | "static_assert" => Token::StaticAssert,
        "__attribute__" | "__attribute" => Token::Attribute,
        "__declspec" => Token::Declspec,
        "asm" | "__asm" | "__asm__" => Token::Asm,
        "__extension__" => Token::Extension,

        _ => Token::Identifier(word),
    }
}

/// Parse identifiers and keywords
fn word<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        .verify(|s: &str| s.chars().next().is_some_and(|c| !c.is_ascii_digit()))
        .map(classify_word)
        .parse_next(input)
}

/// Parse line comment starting with '//'
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    preceded("//", take_till(0.., '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

fn block_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start_pos = input.current_token_start();
    "/*".parse_next(input)?;

    cut_err(terminated(take_until(0.., "*/"), "*/"))
        .context(LexerDiagnostic {
            code: ErrorCode::E005,
            message: "unterminated block comment",
            help: Some("add closing `*/`"),
            start: start_pos,
        })
        .parse_next(input)
        .map(Token::BlockComment)
}

fn line_continuation<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    ('\\', opt('\r'), '\n').void().parse_next(input)
}

fn directive_chars<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    repeat(0.., alt((line_continuation, none_of('\n').void()))).parse_next(input)
}

/// Parse a preprocessor line, including backslash-continued lines.
fn directive<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    preceded('#', directive_chars.take())
        .map(Token::Directive)
        .parse_next(input)
}

/// Parse operators of two or more characters (longest first)
fn multi_char_operator<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        literal("...").value(Token::Ellipsis),
        alt((
            literal("<<="),
            literal(">>="),
            literal("->"),
            literal("++"),
            literal("--"),
            literal("+="),
            literal("-="),
            literal("*="),
            literal("/="),
            literal("%="),
            literal("&="),
            literal("|="),
            literal("^="),
            literal("##"),
        ))
        .map(Token::Operator),
        literal("<<").value(Token::Shl),
        literal(">>").value(Token::Shr),
        literal("<=").value(Token::Le),
        literal(">=").value(Token::Ge),
        literal("==").value(Token::EqEq),
        literal("!=").value(Token::NotEq),
        literal("&&").value(Token::AndAnd),
        literal("||").value(Token::OrOr),
    ))
    .parse_next(input)
}

/// Parse single character punctuation
fn punctuation<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        '('.value(Token::LeftParen),
        ')'.value(Token::RightParen),
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
        '['.value(Token::LeftBracket),
        ']'.value(Token::RightBracket),
        ';'.value(Token::Semicolon),
        ','.value(Token::Comma),
        ':'.value(Token::Colon),
        '?'.value(Token::Question),
        '.'.value(Token::Dot),
    ))
    .parse_next(input)
}

/// Parse single character operators
fn single_char_operator<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        '+'.value(Token::Plus),
        '-'.value(Token::Minus),
        '*'.value(Token::Star),
        '/'.value(Token::Slash),
        '%'.value(Token::Percent),
        '&'.value(Token::Amp),
        '|'.value(Token::Pipe),
        '^'.value(Token::Caret),
        '~'.value(Token::Tilde),
        '!'.value(Token::Bang),
        '<'.value(Token::Lt),
        '>'.value(Token::Gt),
        '='.value(Token::Assign),
    ))
    .parse_next(input)
}

/// Parse whitespace (but not newlines) and escaped line breaks
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        take_while(1.., |c: char| c.is_whitespace() && c != '\n').void(),
        line_continuation,
    ))
    .value(Token::Whitespace)
    .parse_next(input)
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<'a, PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        line_comment,         // Must come before single char '/'
        block_comment,        // Must come before single char '/'
        directive,            // Consumes the whole line
        string_literal,       // Must come before any single char
        char_literal,         // Must come before any single char
        number,               // Must come before '.'
        word,                 // Keywords and identifiers
        multi_char_operator,  // Must come before single char operators
        punctuation,          // Single character punctuation
        single_char_operator, // Single character operators
        newline,              // Must come before whitespace
        whitespace,           // General whitespace
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(token) => self.tokens.push(token),
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.emit(Self::convert_err_mode(e, error_pos));

                    // Skip one character and resume.
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    /// Finish lexing and return tokens or collected errors.
    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        let tokens = self.tokens;
        self.diagnostics.finish().map(|_| tokens)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) if the error carries no
    /// diagnostic context.
    fn convert_err_mode(
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos.max(*start + 1));

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Tokenize C source text, collecting every lexical error.
///
/// # Returns
///
/// - `Ok(tokens)` - All tokens, trivia included
/// - `Err(ParseError)` - One or more errors occurred; contains all diagnostics
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let mut lexer = Lexer::new();
    lexer.tokenize(LocatingSlice::new(input));
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_single_token(input: &str, expected: Token<'_>) {
        let mut located_input = LocatingSlice::new(input);
        let result = positioned_token(&mut located_input);
        assert!(result.is_ok(), "Failed to parse: {}", input);
        assert_eq!(result.unwrap().token, expected);
    }

    fn significant(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .expect("should tokenize")
            .into_iter()
            .map(|t| t.token)
            .filter(|t| !t.is_trivia())
            .collect()
    }

    fn first_error_code(input: &str) -> ErrorCode {
        let err = tokenize(input).expect_err("should fail");
        err.diagnostics()[0].code().expect("code")
    }

    #[test]
    fn test_keywords() {
        test_single_token("typedef", Token::Typedef);
        test_single_token("struct", Token::Struct);
        test_single_token("union", Token::Union);
        test_single_token("enum", Token::Enum);
        test_single_token("unsigned", Token::Unsigned);
        test_single_token("_Bool", Token::Bool);
        test_single_token("sizeof", Token::Sizeof);
        test_single_token("__attribute__", Token::Attribute);
    }

    #[test]
    fn test_gnu_keyword_spellings() {
        test_single_token("__const", Token::Const);
        test_single_token("__restrict__", Token::Restrict);
        test_single_token("__inline__", Token::Inline);
        test_single_token("__signed__", Token::Signed);
        test_single_token("__alignof__", Token::Alignof);
        test_single_token("__asm__", Token::Asm);
    }

    #[test]
    fn test_identifiers() {
        test_single_token("hello", Token::Identifier("hello"));
        test_single_token("_private", Token::Identifier("_private"));
        test_single_token("structure", Token::Identifier("structure"));
        test_single_token("int32_t", Token::Identifier("int32_t"));
        test_single_token("TI_ROOT", Token::Identifier("TI_ROOT"));
    }

    #[test]
    fn test_integer_literals() {
        test_single_token("0", Token::IntLiteral(0));
        test_single_token("42", Token::IntLiteral(42));
        test_single_token("0x1F", Token::IntLiteral(31));
        test_single_token("0XffUL", Token::IntLiteral(255));
        test_single_token("017", Token::IntLiteral(15));
        test_single_token("0b101", Token::IntLiteral(5));
        test_single_token("10u", Token::IntLiteral(10));
        test_single_token("1ULL", Token::IntLiteral(1));
        test_single_token("18446744073709551615", Token::IntLiteral(u64::MAX));
    }

    #[test]
    fn test_float_literals() {
        test_single_token("1.5", Token::FloatLiteral("1.5"));
        test_single_token(".5f", Token::FloatLiteral(".5f"));
        test_single_token("1e+10", Token::FloatLiteral("1e+10"));
        test_single_token("0x1p-3", Token::FloatLiteral("0x1p-3"));
    }

    #[test]
    fn test_char_literals() {
        test_single_token("'a'", Token::CharLiteral(97));
        test_single_token("'\\n'", Token::CharLiteral(10));
        test_single_token("'\\0'", Token::CharLiteral(0));
        test_single_token("'\\x41'", Token::CharLiteral(0x41));
        test_single_token("'\\101'", Token::CharLiteral(0o101));
        test_single_token("'\\''", Token::CharLiteral(39));
    }

    #[test]
    fn test_string_literals() {
        test_single_token("\"\"", Token::StringLiteral(String::new()));
        test_single_token(
            "\"__TypeInfoRoot\"",
            Token::StringLiteral("__TypeInfoRoot".to_string()),
        );
        test_single_token(
            "\"tab\\there\\n\"",
            Token::StringLiteral("tab\there\n".to_string()),
        );
        test_single_token(
            "\"quote: \\\"x\\\"\"",
            Token::StringLiteral("quote: \"x\"".to_string()),
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            significant("a<<2 >= b->c ... != ||"),
            vec![
                Token::Identifier("a"),
                Token::Shl,
                Token::IntLiteral(2),
                Token::Ge,
                Token::Identifier("b"),
                Token::Operator("->"),
                Token::Identifier("c"),
                Token::Ellipsis,
                Token::NotEq,
                Token::OrOr,
            ]
        );
    }

    #[test]
    fn test_comments_and_directives_are_trivia() {
        let source = "#include \"typeinfo.h\"\n#define X \\\n  1\n/* block\n */ int // tail\nx;";
        assert_eq!(
            significant(source),
            vec![Token::Int, Token::Identifier("x"), Token::Semicolon]
        );

        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens[0].token, Token::Directive("include \"typeinfo.h\""));
        assert_eq!(tokens[2].token, Token::Directive("define X \\\n  1"));
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("struct  Foo").unwrap();
        assert_eq!(tokens[0].span, Span::new(0..6));
        assert_eq!(tokens[1].span, Span::new(6..8));
        assert_eq!(tokens[2].span, Span::new(8..11));
    }

    #[test]
    fn test_lexer_errors() {
        assert_eq!(first_error_code("\"open"), ErrorCode::E001);
        assert_eq!(first_error_code("int @x;"), ErrorCode::E002);
        assert_eq!(first_error_code("\"bad \\q\""), ErrorCode::E003);
        assert_eq!(first_error_code("int a[09];"), ErrorCode::E004);
        assert_eq!(first_error_code("/* never closed"), ErrorCode::E005);
        assert_eq!(first_error_code("''"), ErrorCode::E006);
    }

    #[test]
    fn test_multiple_errors_collected() {
        let err = tokenize("@ int ` x;").unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
        assert_eq!(err.diagnostics()[1].primary_span(), Some(Span::new(6..7)));
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn check_tokenize_never_panics(source: &str) -> Result<(), TestCaseError> {
            if let Ok(tokens) = tokenize(source) {
                let mut last_end = 0;
                for token in &tokens {
                    prop_assert_eq!(token.span.start(), last_end);
                    last_end = token.span.end();
                }
                prop_assert_eq!(last_end, source.len());
            }
            Ok(())
        }

        proptest! {
            #[test]
            fn tokenize_never_panics(source in "\\PC{0,64}") {
                check_tokenize_never_panics(&source)?;
            }

            #[test]
            fn tokenize_c_like_input_never_panics(
                source in "[a-z_ {}();*,\\[\\]0-9'\"#/\\\\\n.=+-]{0,80}"
            ) {
                check_tokenize_never_panics(&source)?;
            }
        }
    }
}
