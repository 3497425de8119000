use std::fmt;

use winnow::stream::Location;

use crate::span::Span;

/// Token types for the C declaration subset.
///
/// GNU spellings of keywords (`__const`, `__inline__`, ...) lex to the same
/// token as the standard spelling.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Storage classes and function specifiers
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    ThreadLocal,
    Inline,
    Noreturn,

    // Qualifiers
    Const,
    Volatile,
    Restrict,
    Atomic,

    // Type specifiers
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Signed,
    Unsigned,
    Complex,
    Int128,
    Struct,
    Union,
    Enum,

    // Operators spelled as keywords
    Sizeof,
    Alignof,
    Alignas,
    StaticAssert,
    Attribute,
    Declspec,
    Asm,
    Extension,

    // Literals
    Identifier(&'src str),
    IntLiteral(u64),
    FloatLiteral(&'src str),
    CharLiteral(i64),
    StringLiteral(String),

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Semicolon,    // ;
    Comma,        // ,
    Colon,        // :
    Question,     // ?
    Dot,          // .
    Ellipsis,     // ...

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Amp,        // &
    Pipe,       // |
    Caret,      // ^
    Tilde,      // ~
    Bang,       // !
    Shl,        // <<
    Shr,        // >>
    Lt,         // <
    Gt,         // >
    Le,         // <=
    Ge,         // >=
    EqEq,       // ==
    NotEq,      // !=
    AndAnd,     // &&
    OrOr,       // ||
    Assign,     // =
    /// Any other operator (`->`, `++`, `+=`, ...), only ever skipped over.
    Operator(&'src str),

    // Trivia
    LineComment(&'src str),
    BlockComment(&'src str),
    /// A preprocessor line without its leading `#`.
    Directive(&'src str),
    Whitespace,
    Newline,
}

impl Token<'_> {
    /// Returns `true` for keyword tokens, which may double as attribute
    /// names inside `__attribute__((...))`.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Typedef
                | Token::Extern
                | Token::Static
                | Token::Auto
                | Token::Register
                | Token::ThreadLocal
                | Token::Inline
                | Token::Noreturn
                | Token::Const
                | Token::Volatile
                | Token::Restrict
                | Token::Atomic
                | Token::Void
                | Token::Bool
                | Token::Char
                | Token::Short
                | Token::Int
                | Token::Long
                | Token::Float
                | Token::Double
                | Token::Signed
                | Token::Unsigned
                | Token::Complex
                | Token::Int128
                | Token::Struct
                | Token::Union
                | Token::Enum
                | Token::Sizeof
                | Token::Alignof
                | Token::Alignas
                | Token::StaticAssert
                | Token::Attribute
                | Token::Declspec
                | Token::Asm
                | Token::Extension
        )
    }

    /// Returns `true` for tokens the parser never sees.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::LineComment(_)
                | Token::BlockComment(_)
                | Token::Directive(_)
                | Token::Whitespace
                | Token::Newline
        )
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.token.fmt(f)
    }
}

impl Location for PositionedToken<'_> {
    fn previous_token_end(&self) -> usize {
        self.span.start()
    }

    fn current_token_start(&self) -> usize {
        self.span.start()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Typedef => write!(f, "typedef"),
            Token::Extern => write!(f, "extern"),
            Token::Static => write!(f, "static"),
            Token::Auto => write!(f, "auto"),
            Token::Register => write!(f, "register"),
            Token::ThreadLocal => write!(f, "_Thread_local"),
            Token::Inline => write!(f, "inline"),
            Token::Noreturn => write!(f, "_Noreturn"),

            Token::Const => write!(f, "const"),
            Token::Volatile => write!(f, "volatile"),
            Token::Restrict => write!(f, "restrict"),
            Token::Atomic => write!(f, "_Atomic"),

            Token::Void => write!(f, "void"),
            Token::Bool => write!(f, "_Bool"),
            Token::Char => write!(f, "char"),
            Token::Short => write!(f, "short"),
            Token::Int => write!(f, "int"),
            Token::Long => write!(f, "long"),
            Token::Float => write!(f, "float"),
            Token::Double => write!(f, "double"),
            Token::Signed => write!(f, "signed"),
            Token::Unsigned => write!(f, "unsigned"),
            Token::Complex => write!(f, "_Complex"),
            Token::Int128 => write!(f, "__int128"),
            Token::Struct => write!(f, "struct"),
            Token::Union => write!(f, "union"),
            Token::Enum => write!(f, "enum"),

            Token::Sizeof => write!(f, "sizeof"),
            Token::Alignof => write!(f, "_Alignof"),
            Token::Alignas => write!(f, "_Alignas"),
            Token::StaticAssert => write!(f, "_Static_assert"),
            Token::Attribute => write!(f, "__attribute__"),
            Token::Declspec => write!(f, "__declspec"),
            Token::Asm => write!(f, "__asm__"),
            Token::Extension => write!(f, "__extension__"),

            Token::Identifier(name) => write!(f, "{name}"),
            Token::IntLiteral(value) => write!(f, "{value}"),
            Token::FloatLiteral(text) => write!(f, "{text}"),
            Token::CharLiteral(value) => write!(f, "'\\x{value:x}'"),
            Token::StringLiteral(s) => write!(f, "{s:?}"),

            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::Dot => write!(f, "."),
            Token::Ellipsis => write!(f, "..."),

            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::Bang => write!(f, "!"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Assign => write!(f, "="),
            Token::Operator(op) => write!(f, "{op}"),

            Token::LineComment(comment) => write!(f, "//{comment}"),
            Token::BlockComment(comment) => write!(f, "/*{comment}*/"),
            Token::Directive(line) => write!(f, "#{line}"),
            Token::Whitespace => write!(f, " "),
            Token::Newline => write!(f, "\\n"),
        }
    }
}
