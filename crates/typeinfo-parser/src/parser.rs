//! Parser for C declarations.
//!
//! This module transforms the significant tokens produced by the
//! [`lexer`](super::lexer) into the AST defined in
//! [`parser_types`](super::parser_types). The public entry point is
//! [`build_unit`].
//!
//! Only what type extraction needs is modelled: declarations, struct,
//! union, and enum bodies, declarators, attributes, and integer constant
//! expressions. Function bodies, parameter lists, and initializers are
//! skipped as balanced token groups.
//!
//! Without a symbol table the parser decides whether an identifier names a
//! type by position: an identifier in a specifier list is a typedef name
//! only if no other type specifier was seen before it.

use winnow::{
    Parser as _,
    combinator::{opt, preceded, repeat, separated},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use typeinfo_core::{provider::ROOT_MARKER, qualifier::Qualifiers};

use crate::{
    error::{Diagnostic, ErrorCode},
    parser_types as types,
    span::{Span, Spanned},
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what is currently being parsed
    Label(&'static str),
    /// Remaining token count (`eof_offset()`) at error start position
    ///
    /// Used to calculate start_offset as: `tokens.len() - start_offset_value`
    StartOffset(usize),
    /// Error code overriding the generic "unexpected token"
    Code(ErrorCode),
}

type Input<'src> = TokenSlice<'src, PositionedToken<'src>>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// Name of the marker macro that flags a root type.
const ROOT_MACRO: &str = "TI_ROOT";
/// Name of the marker macro that attaches a free-form annotation.
const ANNOTATION_MACRO: &str = "TI_ANN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaratorMode {
    Named,
    Abstract,
    Either,
}

fn cut_err<'src, O, F>(input: &mut Input<'src>, f: F) -> IResult<O>
where
    F: FnOnce(&mut Input<'src>) -> IResult<O>,
{
    let start_remaining = input.eof_offset();

    match f(input) {
        Ok(o) => Ok(o),
        Err(ErrMode::Backtrack(mut e)) | Err(ErrMode::Cut(mut e)) => {
            e.push(Context::StartOffset(start_remaining));
            Err(ErrMode::Cut(e))
        }
        Err(e) => Err(e),
    }
}

/// Helper to create a Backtrack error carrying a label
fn expected<O>(label: &'static str) -> IResult<O> {
    let mut e = ContextError::new();
    e.push(Context::Label(label));
    Err(ErrMode::Backtrack(e))
}

/// Helper to create a Cut error with a code and a specific StartOffset value
fn cut_error_with_code(
    code: ErrorCode,
    label: &'static str,
    start_offset: usize,
) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::Code(code));
    e.push(Context::Label(label));
    e.push(Context::StartOffset(start_offset));
    ErrMode::Cut(e)
}

fn peek<'src>(input: &Input<'src>) -> Option<&'src Token<'src>> {
    input.peek_token().map(|t| &t.token)
}

/// Look `n` significant tokens ahead without consuming anything.
fn peek_nth<'src>(input: &mut Input<'src>, n: usize) -> Option<&'src Token<'src>> {
    let checkpoint = input.checkpoint();
    let mut found = None;
    for _ in 0..=n {
        found = input.next_token();
        if found.is_none() {
            break;
        }
    }
    input.reset(&checkpoint);
    found.map(|t| &t.token)
}

fn at<'src>(input: &Input<'src>, expected: &Token<'_>) -> bool {
    peek(input).is_some_and(|t| t == expected)
}

/// Parse one specific token, returning its span
fn token<'src>(
    expected: Token<'static>,
    label: &'static str,
) -> impl FnMut(&mut Input<'src>) -> IResult<Span> {
    move |input: &mut Input<'src>| {
        any.verify_map(|t: &PositionedToken<'src>| (t.token == expected).then_some(t.span))
            .context(Context::Label(label))
            .parse_next(input)
    }
}

fn semicolon<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(Token::Semicolon, "`;`").parse_next(input)
}

fn comma<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(Token::Comma, "`,`").parse_next(input)
}

fn is_marker(name: &str) -> bool {
    name == ROOT_MACRO || name == ANNOTATION_MACRO
}

/// Parse an identifier that is not one of the marker macros
fn raw_identifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    any.verify_map(|t: &PositionedToken<'src>| match &t.token {
        Token::Identifier(name) if !is_marker(name) => Some(Spanned::new(*name, t.span)),
        _ => None,
    })
    .context(Context::Label("identifier"))
    .parse_next(input)
}

/// Consume a group opened by `open` up to its matching `close`.
///
/// Returns the tokens strictly inside the group and the span of the whole
/// group.
fn balanced_group<'src>(
    input: &mut Input<'src>,
    open: Token<'static>,
    close: Token<'static>,
    label: &'static str,
) -> IResult<(Vec<&'src PositionedToken<'src>>, Span)> {
    let open_span = token(open.clone(), label).parse_next(input)?;
    let mut depth = 0usize;
    let mut inner = Vec::new();
    loop {
        let Some(t) = input.next_token() else {
            return expected(label);
        };
        if t.token == open {
            depth += 1;
        } else if t.token == close {
            if depth == 0 {
                return Ok((inner, open_span.union(t.span)));
            }
            depth -= 1;
        }
        inner.push(t);
    }
}

fn paren_group<'src>(input: &mut Input<'src>) -> IResult<(Vec<&'src PositionedToken<'src>>, Span)> {
    balanced_group(input, Token::LeftParen, Token::RightParen, "`(`")
}

fn brace_group<'src>(input: &mut Input<'src>) -> IResult<Span> {
    balanced_group(input, Token::LeftBrace, Token::RightBrace, "`{`").map(|(_, span)| span)
}

/// Renders tokens back to text the way the preprocessor stringifies a
/// macro argument: adjacent tokens are joined directly, separated tokens
/// with a single space.
fn stringify(tokens: &[&PositionedToken<'_>]) -> String {
    let mut text = String::new();
    let mut previous_end = None;
    for t in tokens {
        if previous_end.is_some_and(|end| end != t.span.start()) {
            text.push(' ');
        }
        match &t.token {
            Token::StringLiteral(s) => {
                text.push('"');
                text.push_str(s);
                text.push('"');
            }
            other => text.push_str(&other.to_string()),
        }
        previous_end = Some(t.span.end());
    }
    text
}

/// Parse the name of a GNU attribute, which may be spelled as a keyword
fn attribute_name<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    any.verify_map(|t: &PositionedToken<'src>| match &t.token {
        Token::Identifier(name) => Some(Spanned::new(name.to_string(), t.span)),
        other if other.is_keyword() => Some(Spanned::new(other.to_string(), t.span)),
        _ => None,
    })
    .context(Context::Label("attribute name"))
    .parse_next(input)
}

/// Parse one entry of a `__attribute__((...))` list.
///
/// Returns `None` for attributes that matter neither for annotations nor
/// for layout.
fn gnu_attribute<'src>(input: &mut Input<'src>) -> IResult<Option<Spanned<types::Attribute>>> {
    let name = attribute_name.parse_next(input)?;
    let arguments = if at(input, &Token::LeftParen) {
        Some(paren_group(input)?)
    } else {
        None
    };

    let bare = name.trim_matches('_');
    let span = arguments
        .as_ref()
        .map_or(name.span(), |(_, group)| name.span().union(*group));
    match bare {
        "annotate" => {
            let text: Option<String> = arguments.and_then(|(tokens, _)| {
                let strings: Vec<&str> = tokens
                    .iter()
                    .map_while(|t| match &t.token {
                        Token::StringLiteral(s) => Some(s.as_str()),
                        _ => None,
                    })
                    .collect();
                (!strings.is_empty()).then(|| strings.concat())
            });
            match text {
                Some(text) => Ok(Some(Spanned::new(types::Attribute::Annotate(text), span))),
                None => expected("annotation string"),
            }
        }
        "packed" | "aligned" | "ms_struct" | "gcc_struct" | "mode" | "vector_size" => Ok(Some(
            Spanned::new(types::Attribute::LayoutAffecting(bare.to_string()), span),
        )),
        _ => Ok(None),
    }
}

fn gnu_attributes<'src>(input: &mut Input<'src>) -> IResult<Vec<Spanned<types::Attribute>>> {
    token(Token::LeftParen, "`((`").parse_next(input)?;
    token(Token::LeftParen, "`((`").parse_next(input)?;
    let entries: Vec<Option<Spanned<types::Attribute>>> =
        separated(0.., gnu_attribute, comma).parse_next(input)?;
    token(Token::RightParen, "`))`").parse_next(input)?;
    token(Token::RightParen, "`))`").parse_next(input)?;
    Ok(entries.into_iter().flatten().collect())
}

/// Parse a single attribute group.
///
/// Handles `TI_ROOT`, `TI_ANN(...)`, `__attribute__((...))`, `_Alignas(...)`,
/// and skips `__declspec(...)` and `__asm__(...)` labels.
fn attribute_group<'src>(input: &mut Input<'src>) -> IResult<Vec<Spanned<types::Attribute>>> {
    let Some(first) = input.peek_token() else {
        return expected("attribute");
    };
    match &first.token {
        Token::Identifier(ROOT_MACRO) => {
            input.next_token();
            Ok(vec![Spanned::new(
                types::Attribute::Annotate(ROOT_MARKER.to_string()),
                first.span,
            )])
        }
        Token::Identifier(ANNOTATION_MACRO) => {
            input.next_token();
            let (tokens, group) = cut_err(input, paren_group)?;
            Ok(vec![Spanned::new(
                types::Attribute::Annotate(stringify(&tokens)),
                first.span.union(group),
            )])
        }
        Token::Attribute => {
            input.next_token();
            cut_err(input, gnu_attributes)
        }
        Token::Alignas => {
            input.next_token();
            let (_, group) = cut_err(input, paren_group)?;
            Ok(vec![Spanned::new(
                types::Attribute::LayoutAffecting("_Alignas".to_string()),
                first.span.union(group),
            )])
        }
        Token::Declspec | Token::Asm => {
            input.next_token();
            cut_err(input, paren_group)?;
            Ok(Vec::new())
        }
        _ => expected("attribute"),
    }
}

/// Parse zero or more attribute groups
fn attribute_list<'src>(input: &mut Input<'src>) -> IResult<Vec<Spanned<types::Attribute>>> {
    repeat(0.., attribute_group)
        .fold(Vec::new, |mut acc: Vec<_>, group| {
            acc.extend(group);
            acc
        })
        .parse_next(input)
}

fn starts_attribute(token: &Token<'_>) -> bool {
    match token {
        Token::Identifier(name) => is_marker(name),
        Token::Attribute | Token::Alignas | Token::Declspec | Token::Asm => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Word {
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
}

/// Counts of each arithmetic type keyword in one specifier list.
#[derive(Debug, Default)]
struct Words([u8; 12]);

impl Words {
    fn push(&mut self, word: Word) {
        self.0[word as usize] = self.0[word as usize].saturating_add(1);
    }

    fn has(&self, word: Word) -> bool {
        self.0[word as usize] > 0
    }

    fn count(&self, word: Word) -> u8 {
        self.0[word as usize]
    }

    fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    /// Returns `true` if every keyword present is in `allowed`.
    fn only(&self, allowed: &[Word]) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, &n)| n == 0 || allowed.iter().any(|w| *w as usize == i))
    }

    /// Resolves the keyword multiset into a scalar type.
    fn resolve(&self) -> Option<types::ScalarSpec> {
        use types::ScalarSpec as S;
        use Word as W;

        let duplicated = self
            .0
            .iter()
            .enumerate()
            .any(|(i, &n)| n > 1 && i != W::Long as usize);
        if duplicated || self.count(W::Long) > 2 || (self.has(W::Signed) && self.has(W::Unsigned))
        {
            return None;
        }
        let unsigned = self.has(W::Unsigned);
        let long = self.count(W::Long);

        if self.has(W::Complex) {
            if !self.only(&[W::Complex, W::Float, W::Double, W::Long]) {
                return None;
            }
            return match (self.has(W::Float), self.has(W::Double), long) {
                (true, false, 0) => Some(S::ComplexFloat),
                (false, _, 0) => Some(S::ComplexDouble),
                (false, true, 1) => Some(S::ComplexLongDouble),
                _ => None,
            };
        }
        if self.has(W::Void) {
            return self.only(&[W::Void]).then_some(S::Void);
        }
        if self.has(W::Bool) {
            return self.only(&[W::Bool]).then_some(S::Bool);
        }
        if self.has(W::Float) {
            return self.only(&[W::Float]).then_some(S::Float);
        }
        if self.has(W::Double) {
            return match (self.only(&[W::Double, W::Long]), long) {
                (true, 0) => Some(S::Double),
                (true, 1) => Some(S::LongDouble),
                _ => None,
            };
        }
        if self.has(W::Char) {
            if !self.only(&[W::Char, W::Signed, W::Unsigned]) {
                return None;
            }
            return Some(if unsigned {
                S::UnsignedChar
            } else if self.has(W::Signed) {
                S::SignedChar
            } else {
                S::Char
            });
        }
        if self.has(W::Int128) {
            if !self.only(&[W::Int128, W::Signed, W::Unsigned]) {
                return None;
            }
            return Some(if unsigned { S::UnsignedInt128 } else { S::Int128 });
        }
        if self.has(W::Short) {
            if long > 0 {
                return None;
            }
            return Some(if unsigned { S::UnsignedShort } else { S::Short });
        }
        Some(match (long, unsigned) {
            (0, false) => S::Int,
            (0, true) => S::UnsignedInt,
            (1, false) => S::Long,
            (1, true) => S::UnsignedLong,
            (_, false) => S::LongLong,
            (_, true) => S::UnsignedLongLong,
        })
    }
}

fn scalar_word(token: &Token<'_>) -> Option<Word> {
    Some(match token {
        Token::Void => Word::Void,
        Token::Bool => Word::Bool,
        Token::Char => Word::Char,
        Token::Short => Word::Short,
        Token::Int => Word::Int,
        Token::Long => Word::Long,
        Token::Float => Word::Float,
        Token::Double => Word::Double,
        Token::Signed => Word::Signed,
        Token::Unsigned => Word::Unsigned,
        Token::Complex => Word::Complex,
        Token::Int128 => Word::Int128,
        _ => return None,
    })
}

fn storage_class(token: &Token<'_>) -> Option<types::StorageClass> {
    Some(match token {
        Token::Typedef => types::StorageClass::Typedef,
        Token::Extern => types::StorageClass::Extern,
        Token::Static => types::StorageClass::Static,
        Token::Auto => types::StorageClass::Auto,
        Token::Register => types::StorageClass::Register,
        Token::ThreadLocal => types::StorageClass::ThreadLocal,
        _ => return None,
    })
}

fn qualifier(token: &Token<'_>) -> Option<Qualifiers> {
    Some(match token {
        Token::Const => Qualifiers::CONST,
        Token::Volatile => Qualifiers::VOLATILE,
        Token::Restrict => Qualifiers::RESTRICT,
        // `_Atomic` does not change layout on supported targets.
        Token::Atomic => Qualifiers::NONE,
        _ => return None,
    })
}

/// Returns `true` if `token` can only begin a type name.
fn starts_type_keyword(token: &Token<'_>) -> bool {
    scalar_word(token).is_some()
        || qualifier(token).is_some()
        || matches!(token, Token::Struct | Token::Union | Token::Enum)
}

/// Parse declaration specifiers: storage class, qualifiers, attributes, and
/// exactly one type specifier.
fn decl_specifiers<'src>(input: &mut Input<'src>) -> IResult<types::DeclSpecifiers<'src>> {
    let start_remaining = input.eof_offset();
    let mut storage = None;
    let mut qualifiers = Qualifiers::NONE;
    let mut attributes = Vec::new();
    let mut words = Words::default();
    let mut words_span: Option<Span> = None;
    let mut specifier: Option<Spanned<types::TypeSpecifier<'src>>> = None;

    while let Some(next) = input.peek_token() {
        let untyped = specifier.is_none() && words.is_empty();
        match &next.token {
            t if storage_class(t).is_some() => {
                input.next_token();
                storage = storage_class(t);
            }
            Token::Inline | Token::Noreturn | Token::Extension => {
                input.next_token();
            }
            t if qualifier(t).is_some() => {
                input.next_token();
                if let Some(q) = qualifier(t) {
                    qualifiers |= q;
                }
            }
            t if scalar_word(t).is_some() => {
                input.next_token();
                if let Some(word) = scalar_word(t) {
                    words.push(word);
                }
                words_span = Some(words_span.map_or(next.span, |s| s.union(next.span)));
            }
            Token::Struct | Token::Union if untyped => {
                specifier = Some(record_specifier(input)?);
            }
            Token::Enum if untyped => {
                specifier = Some(enum_specifier(input)?);
            }
            t if starts_attribute(t) => {
                attributes.extend(attribute_group(input)?);
            }
            Token::Identifier(name) if untyped => {
                input.next_token();
                specifier = Some(Spanned::new(types::TypeSpecifier::TypedefName(*name), next.span));
            }
            _ => break,
        }
    }

    if let Some(span) = words_span {
        let scalar = match (&specifier, words.resolve()) {
            (None, Some(scalar)) => scalar,
            _ => {
                return Err(cut_error_with_code(
                    ErrorCode::E102,
                    "valid combination of type specifiers",
                    start_remaining,
                ));
            }
        };
        specifier = Some(Spanned::new(types::TypeSpecifier::Scalar(scalar), span));
    }

    match specifier {
        Some(specifier) => Ok(types::DeclSpecifiers {
            storage,
            qualifiers,
            specifier,
            attributes,
        }),
        None => expected("type specifier"),
    }
}

/// Parse a `struct` or `union` specifier
fn record_specifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<types::TypeSpecifier<'src>>> {
    let (kind, keyword) = any
        .verify_map(|t: &PositionedToken<'src>| match t.token {
            Token::Struct => Some((types::RecordKind::Struct, t.span)),
            Token::Union => Some((types::RecordKind::Union, t.span)),
            _ => None,
        })
        .context(Context::Label("`struct` or `union`"))
        .parse_next(input)?;

    cut_err(input, |input| {
        let mut attributes = attribute_list(input)?;
        let tag = opt(raw_identifier).parse_next(input)?;
        let mut span = tag.as_ref().map_or(keyword, |tag| keyword.union(tag.span()));

        let fields = if at(input, &Token::LeftBrace) {
            let (fields, body) = record_body(input)?;
            span = span.union(body);
            attributes.extend(attribute_list(input)?);
            Some(fields)
        } else if tag.is_none() {
            return expected("struct tag or body");
        } else {
            None
        };

        Ok(Spanned::new(
            types::TypeSpecifier::Record(types::RecordSpecifier {
                kind,
                keyword,
                tag,
                attributes,
                fields,
            }),
            span,
        ))
    })
}

/// Skip `_Static_assert(...);`
fn static_assertion<'src>(input: &mut Input<'src>) -> IResult<()> {
    token(Token::StaticAssert, "`_Static_assert`").parse_next(input)?;
    cut_err(input, |input| {
        paren_group(input)?;
        semicolon(input)?;
        Ok(())
    })
}

/// Parse `{ field-declarations }`
fn record_body<'src>(input: &mut Input<'src>) -> IResult<(Vec<types::FieldDeclaration<'src>>, Span)> {
    let open = token(Token::LeftBrace, "`{`").parse_next(input)?;
    let mut fields = Vec::new();
    loop {
        match peek(input) {
            Some(Token::RightBrace) => {
                let close = token(Token::RightBrace, "`}`").parse_next(input)?;
                return Ok((fields, open.union(close)));
            }
            Some(Token::Semicolon) => {
                input.next_token();
            }
            Some(Token::StaticAssert) => static_assertion(input)?,
            Some(_) => fields.push(field_declaration(input)?),
            None => return expected("`}`"),
        }
    }
}

fn field_declaration<'src>(input: &mut Input<'src>) -> IResult<types::FieldDeclaration<'src>> {
    let specifiers = decl_specifiers(input)?;
    cut_err(input, |input| {
        let declarators = if at(input, &Token::Semicolon) {
            Vec::new()
        } else {
            separated(1.., field_declarator, comma).parse_next(input)?
        };
        let end = semicolon(input)?;
        Ok(types::FieldDeclaration {
            span: specifiers.specifier.span().union(end),
            specifiers,
            declarators,
        })
    })
}

fn field_declarator<'src>(input: &mut Input<'src>) -> IResult<types::FieldDeclarator<'src>> {
    let mut declarator = declarator(input, DeclaratorMode::Either)?;
    let bit_width = opt(preceded(token(Token::Colon, "`:`"), conditional_expr)).parse_next(input)?;
    if let Some(width) = &bit_width {
        declarator.span = declarator.span.union(width.span());
    }
    declarator.attributes.extend(attribute_list(input)?);
    Ok(types::FieldDeclarator {
        declarator,
        bit_width,
    })
}

/// Parse an `enum` specifier
fn enum_specifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<types::TypeSpecifier<'src>>> {
    let keyword = token(Token::Enum, "`enum`").parse_next(input)?;

    cut_err(input, |input| {
        let mut attributes = attribute_list(input)?;
        let tag = opt(raw_identifier).parse_next(input)?;
        let mut span = tag.as_ref().map_or(keyword, |tag| keyword.union(tag.span()));

        let enumerators = if at(input, &Token::LeftBrace) {
            let open = token(Token::LeftBrace, "`{`").parse_next(input)?;
            let mut enumerators = Vec::new();
            while !at(input, &Token::RightBrace) {
                enumerators.push(enumerator(input)?);
                if opt(comma).parse_next(input)?.is_none() {
                    break;
                }
            }
            let close = token(Token::RightBrace, "`}`").parse_next(input)?;
            span = span.union(open).union(close);
            attributes.extend(attribute_list(input)?);
            Some(enumerators)
        } else if tag.is_none() {
            return expected("enum tag or body");
        } else {
            None
        };

        Ok(Spanned::new(
            types::TypeSpecifier::Enum(types::EnumSpecifier {
                keyword,
                tag,
                attributes,
                enumerators,
            }),
            span,
        ))
    })
}

fn enumerator<'src>(input: &mut Input<'src>) -> IResult<types::Enumerator<'src>> {
    let name = raw_identifier.parse_next(input)?;
    let attributes = attribute_list(input)?;
    let value = opt(preceded(token(Token::Assign, "`=`"), conditional_expr)).parse_next(input)?;
    Ok(types::Enumerator {
        name,
        attributes,
        value,
    })
}

/// Returns `true` if the `(` at the current position opens a nested
/// declarator rather than a parameter list.
fn opens_nested_declarator<'src>(input: &mut Input<'src>, mode: DeclaratorMode) -> bool {
    match peek_nth(input, 1) {
        Some(Token::Star | Token::LeftParen | Token::Attribute) => true,
        Some(Token::Identifier(name)) => mode != DeclaratorMode::Abstract && !is_marker(name),
        _ => false,
    }
}

/// Parse `[size]`
fn array_suffix<'src>(input: &mut Input<'src>) -> IResult<(types::Suffix<'src>, Span)> {
    let open = token(Token::LeftBracket, "`[`").parse_next(input)?;
    while peek(input).is_some_and(|t| qualifier(t).is_some() || *t == Token::Static) {
        input.next_token();
    }
    let size = if at(input, &Token::RightBracket) {
        None
    } else if at(input, &Token::Star) && peek_nth(input, 1) == Some(&Token::RightBracket) {
        input.next_token();
        None
    } else {
        Some(conditional_expr(input)?)
    };
    let close = token(Token::RightBracket, "`]`").parse_next(input)?;
    Ok((types::Suffix::Array(size), open.union(close)))
}

/// Parse a declarator: pointers, a name or nested declarator, then array
/// and function suffixes, then trailing attributes.
fn declarator<'src>(input: &mut Input<'src>, mode: DeclaratorMode) -> IResult<types::Declarator<'src>> {
    let mut span: Option<Span> = None;
    let extend = |span: &mut Option<Span>, other: Span| {
        *span = Some(span.map_or(other, |s| s.union(other)));
    };
    let mut attributes = Vec::new();
    let mut pointers = Vec::new();

    while let Some(star) = input.peek_token().filter(|t| t.token == Token::Star) {
        input.next_token();
        extend(&mut span, star.span);
        let mut qualifiers = Qualifiers::NONE;
        while let Some(next) = peek(input) {
            if let Some(q) = qualifier(next) {
                input.next_token();
                qualifiers |= q;
            } else if starts_attribute(next) {
                attributes.extend(attribute_group(input)?);
            } else {
                break;
            }
        }
        pointers.push(qualifiers);
    }

    let direct = match input.peek_token() {
        Some(PositionedToken {
            token: Token::Identifier(name),
            span: name_span,
        }) if mode != DeclaratorMode::Abstract && !is_marker(name) => {
            input.next_token();
            extend(&mut span, *name_span);
            types::DirectDeclarator::Name(Spanned::new(*name, *name_span))
        }
        Some(PositionedToken {
            token: Token::LeftParen,
            span: open,
        }) if opens_nested_declarator(input, mode) => {
            input.next_token();
            let inner = cut_err(input, |input| declarator(input, mode))?;
            let close = token(Token::RightParen, "`)`").parse_next(input)?;
            extend(&mut span, open.union(close));
            types::DirectDeclarator::Nested(Box::new(inner))
        }
        _ if mode != DeclaratorMode::Named => types::DirectDeclarator::Abstract,
        _ => return expected("declarator"),
    };

    let mut suffixes = Vec::new();
    loop {
        match peek(input) {
            Some(Token::LeftBracket) => {
                let (suffix, suffix_span) = cut_err(input, array_suffix)?;
                extend(&mut span, suffix_span);
                suffixes.push(suffix);
            }
            Some(Token::LeftParen) => {
                let (_, group) = paren_group(input)?;
                extend(&mut span, group);
                suffixes.push(types::Suffix::Function);
            }
            _ => break,
        }
    }

    attributes.extend(attribute_list(input)?);

    Ok(types::Declarator {
        pointers,
        direct,
        suffixes,
        attributes,
        span: span.unwrap_or_default(),
    })
}

fn type_name<'src>(input: &mut Input<'src>) -> IResult<types::TypeName<'src>> {
    let specifiers = decl_specifiers(input)?;
    let declarator = declarator(input, DeclaratorMode::Abstract)?;
    Ok(types::TypeName {
        specifiers,
        declarator,
    })
}

/// Returns `true` if `token` can begin the operand of a cast.
fn starts_operand(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::IntLiteral(_)
            | Token::CharLiteral(_)
            | Token::FloatLiteral(_)
            | Token::Identifier(_)
            | Token::LeftParen
            | Token::Tilde
            | Token::Bang
            | Token::Sizeof
            | Token::Alignof
    )
}

/// Decides whether the `(` at the current position opens a type name.
///
/// Keywords settle it. A lone identifier, optionally followed by `*`s, is
/// taken as a typedef name when it is closed right away and, for casts,
/// followed by something that can only be an operand.
fn type_name_ahead<'src>(input: &mut Input<'src>, for_cast: bool) -> bool {
    match peek_nth(input, 1) {
        Some(t) if starts_type_keyword(t) => true,
        Some(Token::Identifier(name)) if !is_marker(name) => {
            let mut n = 2;
            while peek_nth(input, n) == Some(&Token::Star) {
                n += 1;
            }
            if peek_nth(input, n) != Some(&Token::RightParen) {
                return false;
            }
            !for_cast || n > 2 || peek_nth(input, n + 1).is_some_and(starts_operand)
        }
        _ => false,
    }
}

fn parenthesized_type_name<'src>(input: &mut Input<'src>) -> IResult<(types::TypeName<'src>, Span)> {
    let open = token(Token::LeftParen, "`(`").parse_next(input)?;
    let name = cut_err(input, type_name)?;
    let close = token(Token::RightParen, "`)`").parse_next(input)?;
    Ok((name, open.union(close)))
}

fn primary_expr<'src>(input: &mut Input<'src>) -> IResult<types::Expr<'src>> {
    if at(input, &Token::LeftParen) {
        let open = token(Token::LeftParen, "`(`").parse_next(input)?;
        let inner = cut_err(input, conditional_expr)?;
        let close = token(Token::RightParen, "`)`").parse_next(input)?;
        return Ok(Spanned::new(inner.into_inner(), open.union(close)));
    }

    any.verify_map(|t: &PositionedToken<'src>| {
        let kind = match &t.token {
            Token::IntLiteral(value) => types::ExprKind::Int(*value),
            Token::CharLiteral(value) => types::ExprKind::Char(*value),
            Token::FloatLiteral(text) => types::ExprKind::Float(*text),
            Token::Identifier(name) if !is_marker(name) => types::ExprKind::Ident(*name),
            _ => return None,
        };
        Some(Spanned::new(kind, t.span))
    })
    .context(Context::Label("expression"))
    .parse_next(input)
}

fn unary_expr<'src>(input: &mut Input<'src>) -> IResult<types::Expr<'src>> {
    let Some(first) = input.peek_token() else {
        return expected("expression");
    };

    let op = match first.token {
        Token::Plus => Some(types::UnaryOp::Plus),
        Token::Minus => Some(types::UnaryOp::Neg),
        Token::Tilde => Some(types::UnaryOp::BitNot),
        Token::Bang => Some(types::UnaryOp::Not),
        _ => None,
    };
    if let Some(op) = op {
        input.next_token();
        let operand = cut_err(input, unary_expr)?;
        let span = first.span.union(operand.span());
        return Ok(Spanned::new(types::ExprKind::Unary(op, Box::new(operand)), span));
    }

    match first.token {
        Token::Sizeof => {
            input.next_token();
            if at(input, &Token::LeftParen) && type_name_ahead(input, false) {
                let (name, group) = parenthesized_type_name(input)?;
                Ok(Spanned::new(
                    types::ExprKind::SizeofType(Box::new(name)),
                    first.span.union(group),
                ))
            } else {
                let operand = cut_err(input, unary_expr)?;
                let span = first.span.union(operand.span());
                Ok(Spanned::new(types::ExprKind::SizeofExpr(Box::new(operand)), span))
            }
        }
        Token::Alignof => {
            input.next_token();
            let (name, group) = cut_err(input, parenthesized_type_name)?;
            Ok(Spanned::new(
                types::ExprKind::AlignofType(Box::new(name)),
                first.span.union(group),
            ))
        }
        Token::LeftParen if type_name_ahead(input, true) => {
            let (name, group) = parenthesized_type_name(input)?;
            let operand = cut_err(input, unary_expr)?;
            let span = group.union(operand.span());
            Ok(Spanned::new(
                types::ExprKind::Cast(Box::new(name), Box::new(operand)),
                span,
            ))
        }
        _ => primary_expr(input),
    }
}

/// Binary operator and precedence, higher binds tighter
fn binary_op(token: &Token<'_>) -> Option<(types::BinaryOp, u8)> {
    use types::BinaryOp as B;
    Some(match token {
        Token::OrOr => (B::Or, 1),
        Token::AndAnd => (B::And, 2),
        Token::Pipe => (B::BitOr, 3),
        Token::Caret => (B::BitXor, 4),
        Token::Amp => (B::BitAnd, 5),
        Token::EqEq => (B::Eq, 6),
        Token::NotEq => (B::Ne, 6),
        Token::Lt => (B::Lt, 7),
        Token::Gt => (B::Gt, 7),
        Token::Le => (B::Le, 7),
        Token::Ge => (B::Ge, 7),
        Token::Shl => (B::Shl, 8),
        Token::Shr => (B::Shr, 8),
        Token::Plus => (B::Add, 9),
        Token::Minus => (B::Sub, 9),
        Token::Star => (B::Mul, 10),
        Token::Slash => (B::Div, 10),
        Token::Percent => (B::Rem, 10),
        _ => return None,
    })
}

/// Precedence climbing over left-associative binary operators
fn binary_expr<'src>(input: &mut Input<'src>, min_precedence: u8) -> IResult<types::Expr<'src>> {
    let mut lhs = unary_expr(input)?;
    while let Some((op, precedence)) = peek(input).and_then(binary_op) {
        if precedence < min_precedence {
            break;
        }
        input.next_token();
        let rhs = cut_err(input, |input| binary_expr(input, precedence + 1))?;
        let span = lhs.span().union(rhs.span());
        lhs = Spanned::new(types::ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

/// Parse a conditional expression, the grammar's constant expression
fn conditional_expr<'src>(input: &mut Input<'src>) -> IResult<types::Expr<'src>> {
    let condition = binary_expr(input, 1)?;
    if !at(input, &Token::Question) {
        return Ok(condition);
    }
    input.next_token();
    cut_err(input, |input| {
        let then = conditional_expr(input)?;
        token(Token::Colon, "`:`").parse_next(input)?;
        let otherwise = conditional_expr(input)?;
        let span = condition.span().union(otherwise.span());
        Ok(Spanned::new(
            types::ExprKind::Conditional(Box::new(condition), Box::new(then), Box::new(otherwise)),
            span,
        ))
    })
}

/// Skip an initializer up to the `,` or `;` that ends it
fn skip_initializer<'src>(input: &mut Input<'src>) -> IResult<()> {
    let mut consumed = false;
    loop {
        match peek(input) {
            Some(Token::Comma | Token::Semicolon) if consumed => return Ok(()),
            Some(Token::LeftBrace) => {
                brace_group(input)?;
            }
            Some(Token::LeftParen) => {
                paren_group(input)?;
            }
            Some(Token::LeftBracket) => {
                balanced_group(input, Token::LeftBracket, Token::RightBracket, "`[`")?;
            }
            Some(Token::RightBrace | Token::RightParen | Token::RightBracket) | None => {
                return expected("initializer");
            }
            Some(_) => {
                input.next_token();
            }
        }
        consumed = true;
    }
}

/// Parse a declaration or function definition
fn declaration<'src>(input: &mut Input<'src>) -> IResult<types::Declaration<'src>> {
    let specifiers = decl_specifiers(input)?;
    cut_err(input, |input| {
        let start = specifiers.specifier.span();
        let mut declarators = Vec::new();
        if at(input, &Token::Semicolon) {
            let end = semicolon(input)?;
            return Ok(types::Declaration {
                specifiers,
                declarators,
                span: start.union(end),
            });
        }

        loop {
            let declarator = declarator(input, DeclaratorMode::Named)?;
            if declarators.is_empty() && declarator.is_function() && at(input, &Token::LeftBrace) {
                let body = brace_group(input)?;
                declarators.push(declarator);
                return Ok(types::Declaration {
                    specifiers,
                    declarators,
                    span: start.union(body),
                });
            }
            if at(input, &Token::Assign) {
                input.next_token();
                skip_initializer(input)?;
            }
            declarators.push(declarator);
            if opt(comma).parse_next(input)?.is_none() {
                break;
            }
        }
        let end = semicolon(input)?;
        Ok(types::Declaration {
            specifiers,
            declarators,
            span: start.union(end),
        })
    })
}

fn external_declaration<'src>(input: &mut Input<'src>) -> IResult<Option<types::Declaration<'src>>> {
    match peek(input) {
        Some(Token::Semicolon) => {
            input.next_token();
            Ok(None)
        }
        Some(Token::StaticAssert) => {
            static_assertion(input)?;
            Ok(None)
        }
        Some(Token::Asm) => {
            input.next_token();
            cut_err(input, |input| {
                paren_group(input)?;
                semicolon(input)
            })?;
            Ok(None)
        }
        _ => declaration(input).map(Some),
    }
}

fn translation_unit<'src>(input: &mut Input<'src>) -> IResult<types::TranslationUnit<'src>> {
    let mut declarations = Vec::new();
    while input.eof_offset() > 0 {
        if let Some(declaration) = external_declaration(input)? {
            declarations.push(declaration);
        }
    }
    Ok(types::TranslationUnit { declarations })
}

/// Utility function to convert winnow errors to our custom error format
///
/// Extracts position information from error context (StartOffset) and calculates
/// precise error spans using the token array.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken],
    current_remaining: usize,
) -> Diagnostic {
    let fallback_span = tokens
        .last()
        .map(|t| Span::new(t.span.end()..t.span.end()))
        .unwrap_or_default();

    let e = match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => {
            // Not reachable with complete input, kept for exhaustiveness.
            return Diagnostic::error("incomplete input, more tokens expected")
                .with_code(ErrorCode::E101)
                .with_label(fallback_span, "incomplete")
                .with_help("ensure input is complete");
        }
    };

    let start_remaining = e.context().find_map(|ctx| match ctx {
        Context::StartOffset(n) => Some(*n),
        _ => None,
    });
    let code = e
        .context()
        .find_map(|ctx| match ctx {
            Context::Code(code) => Some(*code),
            _ => None,
        })
        .unwrap_or(ErrorCode::E100);

    let end_offset = tokens.len() - current_remaining;
    let start_offset = start_remaining.map(|r| tokens.len() - r).unwrap_or(0);

    let labels: Vec<String> = e
        .context()
        .filter_map(|ctx| match ctx {
            Context::Label(label) => Some(format!("expected {label}")),
            _ => None,
        })
        .collect();

    if end_offset >= tokens.len() && code == ErrorCode::E100 {
        let message = labels.first().cloned().unwrap_or_default();
        return Diagnostic::error(format!("unexpected end of input: {message}"))
            .with_code(ErrorCode::E101)
            .with_label(fallback_span, "input ends here")
            .with_help("check for a missing `;` or closing brace");
    }

    let error_span = if code == ErrorCode::E100 {
        tokens[end_offset].span
    } else {
        let end = end_offset.max(start_offset + 1).min(tokens.len());
        tokens
            .get(start_offset..end)
            .and_then(|range| range.iter().map(|t| t.span).reduce(|acc, span| acc.union(span)))
            .unwrap_or(fallback_span)
    };

    let message = if code == ErrorCode::E100 {
        let expected = if labels.is_empty() {
            "unexpected token or end of input".to_string()
        } else {
            labels.join(" → ")
        };
        format!("unexpected token `{}`: {expected}", tokens[end_offset].token)
    } else {
        code.description().to_string()
    };

    Diagnostic::error(message)
        .with_code(code)
        .with_label(error_span, code.description())
}

/// Build the AST of one unit from its significant tokens
pub fn build_unit<'src>(
    tokens: &'src [PositionedToken<'src>],
) -> Result<types::TranslationUnit<'src>, Diagnostic> {
    let mut token_slice = TokenSlice::new(tokens);

    translation_unit
        .parse_next(&mut token_slice)
        .map_err(|e| convert_error(e, tokens, token_slice.eof_offset()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::tokenize, parser_types::ExprKind};

    fn significant(input: &str) -> Vec<PositionedToken<'_>> {
        tokenize(input)
            .expect("Failed to tokenize input")
            .into_iter()
            .filter(|t| !t.token.is_trivia())
            .collect()
    }

    #[test]
    fn test_scalar_specifier_combinations() {
        use types::ScalarSpec as S;

        let cases = [
            ("unsigned x;", S::UnsignedInt),
            ("long unsigned int x;", S::UnsignedLong),
            ("long long x;", S::LongLong),
            ("unsigned long long int x;", S::UnsignedLongLong),
            ("signed char x;", S::SignedChar),
            ("char x;", S::Char),
            ("short int x;", S::Short),
            ("long double x;", S::LongDouble),
            ("_Complex double x;", S::ComplexDouble),
            ("unsigned __int128 x;", S::UnsignedInt128),
            ("_Bool x;", S::Bool),
        ];
        for (source, expected) in cases {
            let tokens = significant(source);
            let unit = build_unit(&tokens).unwrap_or_else(|e| panic!("{source}: {e}"));
            let specifier = &unit.declarations[0].specifiers.specifier;
            assert!(
                matches!(specifier.inner(), types::TypeSpecifier::Scalar(s) if *s == expected),
                "{source}"
            );
        }
    }

    #[test]
    fn test_invalid_specifier_combination() {
        let tokens = significant("short double x;");
        let err = build_unit(&tokens).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E102));
        assert_eq!(err.primary_span(), Some(Span::new(0..12)));
    }

    #[test]
    fn test_typedef_name_heuristic() {
        let tokens = significant("Foo const *bar; int Foo;");
        let unit = build_unit(&tokens).unwrap();

        let first = &unit.declarations[0];
        assert!(matches!(
            first.specifiers.specifier.inner(),
            types::TypeSpecifier::TypedefName("Foo")
        ));
        assert_eq!(first.specifiers.qualifiers, Qualifiers::CONST);
        assert_eq!(*first.declarators[0].name().unwrap(), "bar");

        let second = &unit.declarations[1];
        assert_eq!(*second.declarators[0].name().unwrap(), "Foo");
    }

    #[test]
    fn test_declarator_shapes() {
        let tokens = significant("int *a[3], (*b)[4], *const c, f(void), (*g)(int);");
        let unit = build_unit(&tokens).unwrap();
        let d = &unit.declarations[0].declarators;

        assert_eq!(d.len(), 5);
        assert_eq!(d[0].pointers.len(), 1);
        assert_eq!(d[0].suffixes.len(), 1);
        assert!(matches!(d[1].direct, types::DirectDeclarator::Nested(_)));
        assert_eq!(*d[1].name().unwrap(), "b");
        assert_eq!(d[2].pointers, vec![Qualifiers::CONST]);
        assert!(d[3].is_function());
        assert!(!d[4].is_function());
    }

    #[test]
    fn test_struct_with_markers() {
        let source = r#"
            typedef struct TI_ROOT Node {
                const char name[256] TI_ANN(CStr);
                struct Node *next;
                unsigned flags : 3;
                union { int i; float f; };
            } Node;
        "#;
        let tokens = significant(source);
        let unit = build_unit(&tokens).unwrap();
        let decl = &unit.declarations[0];
        assert!(decl.specifiers.is_typedef());

        let types::TypeSpecifier::Record(record) = decl.specifiers.specifier.inner() else {
            panic!("expected record specifier");
        };
        assert_eq!(record.kind, types::RecordKind::Struct);
        assert_eq!(record.tag.as_ref().map(|t| *t.inner()), Some("Node"));
        assert_eq!(
            record.attributes[0].inner(),
            &types::Attribute::Annotate(ROOT_MARKER.to_string())
        );

        let fields = record.fields.as_ref().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(
            fields[0].declarators[0].declarator.attributes[0].inner(),
            &types::Attribute::Annotate("CStr".to_string())
        );
        assert!(fields[2].declarators[0].bit_width.is_some());
        assert!(fields[3].declarators.is_empty());
    }

    #[test]
    fn test_gnu_attributes() {
        let source = r#"
            struct __attribute__((annotate("a" "b"), packed, unused)) S { int x; };
            enum E { A __attribute__((annotate("first"))) = 1, B, };
        "#;
        let tokens = significant(source);
        let unit = build_unit(&tokens).unwrap();

        let types::TypeSpecifier::Record(record) = unit.declarations[0].specifiers.specifier.inner()
        else {
            panic!("expected record specifier");
        };
        let attributes: Vec<_> = record.attributes.iter().map(|a| a.inner().clone()).collect();
        assert_eq!(
            attributes,
            vec![
                types::Attribute::Annotate("ab".to_string()),
                types::Attribute::LayoutAffecting("packed".to_string()),
            ]
        );

        let types::TypeSpecifier::Enum(enumeration) =
            unit.declarations[1].specifiers.specifier.inner()
        else {
            panic!("expected enum specifier");
        };
        let enumerators = enumeration.enumerators.as_ref().unwrap();
        assert_eq!(enumerators.len(), 2);
        assert_eq!(enumerators[0].attributes.len(), 1);
        assert!(enumerators[1].value.is_none());
    }

    #[test]
    fn test_annotation_macro_stringifies_tokens() {
        let tokens = significant("struct S { int a TI_ANN(Range(0, 10)); };");
        let unit = build_unit(&tokens).unwrap();
        let types::TypeSpecifier::Record(record) = unit.declarations[0].specifiers.specifier.inner()
        else {
            panic!("expected record specifier");
        };
        let field = &record.fields.as_ref().unwrap()[0];
        assert_eq!(
            field.declarators[0].declarator.attributes[0].inner(),
            &types::Attribute::Annotate("Range(0, 10)".to_string())
        );
    }

    #[test]
    fn test_expression_precedence() {
        let tokens = significant("enum { A = 1 + 2 * 3 << 1 };");
        let unit = build_unit(&tokens).unwrap();
        let types::TypeSpecifier::Enum(enumeration) =
            unit.declarations[0].specifiers.specifier.inner()
        else {
            panic!("expected enum specifier");
        };
        let value = enumeration.enumerators.as_ref().unwrap()[0].value.as_ref().unwrap();
        let ExprKind::Binary(types::BinaryOp::Shl, lhs, _) = value.inner() else {
            panic!("expected shift at the root");
        };
        assert!(matches!(lhs.inner(), ExprKind::Binary(types::BinaryOp::Add, _, _)));
    }

    #[test]
    fn test_sizeof_and_casts() {
        let tokens =
            significant("char a[sizeof(struct S) + sizeof(T) + (int)1.5 + (Size)2 + (x) - 1];");
        let unit = build_unit(&tokens).unwrap();
        let types::Suffix::Array(Some(size)) = &unit.declarations[0].declarators[0].suffixes[0]
        else {
            panic!("expected sized array");
        };

        fn collect<'a>(expr: &'a types::Expr<'a>, out: &mut Vec<&'static str>) {
            match expr.inner() {
                ExprKind::Binary(_, l, r) => {
                    collect(l, out);
                    collect(r, out);
                }
                ExprKind::SizeofType(_) => out.push("sizeof-type"),
                ExprKind::Cast(..) => out.push("cast"),
                ExprKind::Ident(_) => out.push("ident"),
                ExprKind::Int(_) => out.push("int"),
                _ => out.push("other"),
            }
        }
        let mut shape = Vec::new();
        collect(size, &mut shape);
        assert_eq!(
            shape,
            ["sizeof-type", "sizeof-type", "cast", "cast", "ident", "int"]
        );
    }

    #[test]
    fn test_skips_function_bodies_and_initializers() {
        let source = r#"
            static int counter = { 0 };
            int table[] = { 1, 2, 3 }, other;
            static inline int twice(int x) { return x * 2; }
            _Static_assert(sizeof(int) == 4, "int");
            struct After { int value; };
        "#;
        let tokens = significant(source);
        let unit = build_unit(&tokens).unwrap();
        assert_eq!(unit.declarations.len(), 4);
        assert_eq!(unit.declarations[1].declarators.len(), 2);
        assert!(unit.declarations[2].declarators[0].is_function());
    }

    #[test]
    fn test_missing_semicolon_reports_position() {
        let source = "struct S { int a } x;";
        let tokens = significant(source);
        let err = build_unit(&tokens).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E100));
        assert!(err.message().contains("expected `;`"), "{}", err.message());
        assert_eq!(err.primary_span(), Some(Span::new(17..18)));
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let tokens = significant("struct S { int a;");
        let err = build_unit(&tokens).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_empty_input() {
        let tokens = significant("// nothing here\n#define X 1\n");
        let unit = build_unit(&tokens).unwrap();
        assert!(unit.declarations.is_empty());
    }
}
