//! AST for the C declaration subset.
//!
//! Leaf values (names, markers) are wrapped in [`Spanned`]; composite nodes
//! carry their own span where diagnostics need one.

use std::fmt;

use typeinfo_core::{builtin::Builtin, qualifier::Qualifiers};

use crate::span::{Span, Spanned};

#[derive(Debug, Default)]
pub struct TranslationUnit<'a> {
    pub declarations: Vec<Declaration<'a>>,
}

/// A file-scope declaration: specifiers followed by zero or more
/// declarators. Function definitions keep their declarator; the body is
/// skipped.
#[derive(Debug)]
pub struct Declaration<'a> {
    pub specifiers: DeclSpecifiers<'a>,
    pub declarators: Vec<Declarator<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    ThreadLocal,
}

/// An attribute the front end keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// `__attribute__((annotate("...")))`, or one of the `TI_ROOT` and
    /// `TI_ANN(...)` marker macros.
    Annotate(String),
    /// An attribute that changes layout in ways this front end does not
    /// model, e.g. `packed` or `aligned`.
    LayoutAffecting(String),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Annotate(text) => write!(f, "annotate(\"{text}\")"),
            Attribute::LayoutAffecting(name) => write!(f, "{name}"),
        }
    }
}

/// Resolved combination of arithmetic type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarSpec {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Int128,
    UnsignedInt128,
    Float,
    Double,
    LongDouble,
    ComplexFloat,
    ComplexDouble,
    ComplexLongDouble,
}

impl ScalarSpec {
    /// Built-in counterpart, `None` for `__int128` and complex types.
    pub fn as_builtin(self) -> Option<Builtin> {
        use ScalarSpec as S;

        Some(match self {
            S::Void => Builtin::Void,
            S::Bool => Builtin::Bool,
            S::Char => Builtin::Char,
            S::SignedChar => Builtin::SignedChar,
            S::UnsignedChar => Builtin::UnsignedChar,
            S::Short => Builtin::Short,
            S::UnsignedShort => Builtin::UnsignedShort,
            S::Int => Builtin::Int,
            S::UnsignedInt => Builtin::UnsignedInt,
            S::Long => Builtin::Long,
            S::UnsignedLong => Builtin::UnsignedLong,
            S::LongLong => Builtin::LongLong,
            S::UnsignedLongLong => Builtin::UnsignedLongLong,
            S::Float => Builtin::Float,
            S::Double => Builtin::Double,
            S::LongDouble => Builtin::LongDouble,
            S::Int128
            | S::UnsignedInt128
            | S::ComplexFloat
            | S::ComplexDouble
            | S::ComplexLongDouble => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        use ScalarSpec as S;

        !matches!(
            self,
            S::Void
                | S::Float
                | S::Double
                | S::LongDouble
                | S::ComplexFloat
                | S::ComplexDouble
                | S::ComplexLongDouble
        )
    }

    /// Signedness of an integer type. Plain `char` is reported signed; its
    /// actual signedness is a property of the target.
    pub fn is_signed(self) -> bool {
        use ScalarSpec as S;

        matches!(
            self,
            S::Char | S::SignedChar | S::Short | S::Int | S::Long | S::LongLong | S::Int128
        )
    }
}

impl fmt::Display for ScalarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spelling = match self {
            ScalarSpec::Int128 => "__int128",
            ScalarSpec::UnsignedInt128 => "unsigned __int128",
            ScalarSpec::ComplexFloat => "_Complex float",
            ScalarSpec::ComplexDouble => "_Complex double",
            ScalarSpec::ComplexLongDouble => "_Complex long double",
            other => return other.as_builtin().map_or(Ok(()), |b| write!(f, "{b}")),
        };
        write!(f, "{spelling}")
    }
}

#[derive(Debug)]
pub enum TypeSpecifier<'a> {
    Scalar(ScalarSpec),
    Record(RecordSpecifier<'a>),
    Enum(EnumSpecifier<'a>),
    TypedefName(&'a str),
}

#[derive(Debug)]
pub struct DeclSpecifiers<'a> {
    pub storage: Option<StorageClass>,
    pub qualifiers: Qualifiers,
    pub specifier: Spanned<TypeSpecifier<'a>>,
    pub attributes: Vec<Spanned<Attribute>>,
}

impl DeclSpecifiers<'_> {
    pub fn is_typedef(&self) -> bool {
        self.storage == Some(StorageClass::Typedef)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Union,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Struct => write!(f, "struct"),
            RecordKind::Union => write!(f, "union"),
        }
    }
}

/// `struct`/`union` specifier. `fields` is `None` when no body is given.
#[derive(Debug)]
pub struct RecordSpecifier<'a> {
    pub kind: RecordKind,
    pub keyword: Span,
    pub tag: Option<Spanned<&'a str>>,
    pub attributes: Vec<Spanned<Attribute>>,
    pub fields: Option<Vec<FieldDeclaration<'a>>>,
}

#[derive(Debug)]
pub struct FieldDeclaration<'a> {
    pub specifiers: DeclSpecifiers<'a>,
    /// Empty for an anonymous struct or union member.
    pub declarators: Vec<FieldDeclarator<'a>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct FieldDeclarator<'a> {
    /// Abstract for an unnamed bit-field such as `int : 3`.
    pub declarator: Declarator<'a>,
    pub bit_width: Option<Expr<'a>>,
}

#[derive(Debug)]
pub struct EnumSpecifier<'a> {
    pub keyword: Span,
    pub tag: Option<Spanned<&'a str>>,
    pub attributes: Vec<Spanned<Attribute>>,
    pub enumerators: Option<Vec<Enumerator<'a>>>,
}

#[derive(Debug)]
pub struct Enumerator<'a> {
    pub name: Spanned<&'a str>,
    pub attributes: Vec<Spanned<Attribute>>,
    pub value: Option<Expr<'a>>,
}

/// A possibly abstract declarator.
///
/// `pointers` apply to the base type first, in written order; `suffixes`
/// apply right to left; a nested declarator applies last.
#[derive(Debug)]
pub struct Declarator<'a> {
    pub pointers: Vec<Qualifiers>,
    pub direct: DirectDeclarator<'a>,
    pub suffixes: Vec<Suffix<'a>>,
    pub attributes: Vec<Spanned<Attribute>>,
    pub span: Span,
}

impl<'a> Declarator<'a> {
    pub fn name(&self) -> Option<Spanned<&'a str>> {
        match &self.direct {
            DirectDeclarator::Name(name) => Some(name.clone()),
            DirectDeclarator::Nested(inner) => inner.name(),
            DirectDeclarator::Abstract => None,
        }
    }

    /// Returns `true` for a plain identifier without pointers, arrays, or
    /// parameter lists.
    pub fn is_plain_name(&self) -> bool {
        self.pointers.is_empty()
            && self.suffixes.is_empty()
            && matches!(self.direct, DirectDeclarator::Name(_))
    }

    /// Returns `true` if the outermost derivation is a parameter list.
    pub fn is_function(&self) -> bool {
        match &self.direct {
            DirectDeclarator::Nested(inner) if !inner.is_plain_name() => inner.is_function(),
            _ => matches!(self.suffixes.first(), Some(Suffix::Function)),
        }
    }
}

#[derive(Debug)]
pub enum DirectDeclarator<'a> {
    Name(Spanned<&'a str>),
    Nested(Box<Declarator<'a>>),
    Abstract,
}

#[derive(Debug)]
pub enum Suffix<'a> {
    /// `[N]`, or `[]` with no size.
    Array(Option<Expr<'a>>),
    /// A parameter list, skipped.
    Function,
}

/// Type name as used in casts, `sizeof`, and `_Alignof`.
#[derive(Debug)]
pub struct TypeName<'a> {
    pub specifiers: DeclSpecifiers<'a>,
    pub declarator: Declarator<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    BitNot,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

pub type Expr<'a> = Spanned<ExprKind<'a>>;

/// Integer constant expression.
#[derive(Debug)]
pub enum ExprKind<'a> {
    Int(u64),
    Char(i64),
    /// A floating constant as written; only valid as an operand of a cast.
    Float(&'a str),
    Ident(&'a str),
    Unary(UnaryOp, Box<Expr<'a>>),
    Binary(BinaryOp, Box<Expr<'a>>, Box<Expr<'a>>),
    Conditional(Box<Expr<'a>>, Box<Expr<'a>>, Box<Expr<'a>>),
    Cast(Box<TypeName<'a>>, Box<Expr<'a>>),
    SizeofType(Box<TypeName<'a>>),
    SizeofExpr(Box<Expr<'a>>),
    AlignofType(Box<TypeName<'a>>),
}
