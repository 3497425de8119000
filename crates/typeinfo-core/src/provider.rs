//! Interface to a declaration front end.
//!
//! The extraction engine never parses source itself. It asks a
//! [`TypeProvider`] about declarations and types through opaque, copyable
//! handles, the way a compiler front end exposes its AST.

use thiserror::Error;

use crate::{builtin::Builtin, graph::Origin, qualifier::Qualifiers};

/// Annotation that marks a declaration as an extraction root.
///
/// Front ends attach it for the `TI_ROOT` marker; the default extraction
/// configuration matches on it.
pub const ROOT_MARKER: &str = "__TypeInfoRoot";

/// Reason a size, alignment, or offset query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout error: invalid cursor or not a field")]
    Invalid,

    #[error("layout error: field's type is incomplete")]
    Incomplete,

    #[error("layout error: field is a bit-field and has no byte offset")]
    BitField,

    #[error("layout error: type has no constant size")]
    NotConstantSize,
}

/// Kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Struct,
    Union,
    Enum,
    Typedef,
    Field,
    Enumerator,
    Other,
}

/// Classification of a canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Builtin(Builtin),
    Pointer,
    Array,
    /// An array declared without a size, e.g. a flexible array member.
    IncompleteArray,
    Record,
    Enum,
    Function,
    /// Any type without a built-in counterpart, e.g. `_Complex double`.
    Other,
}

/// Queries the extraction engine needs answered about one source unit.
pub trait TypeProvider {
    /// Handle to a type.
    type Type: Copy;
    /// Handle to a declaration.
    type Decl: Copy;

    /// Top-level declarations in source order.
    fn declarations(&self) -> Vec<Self::Decl>;

    /// Declarations nested directly inside `decl`.
    fn children(&self, decl: Self::Decl) -> Vec<Self::Decl>;

    fn decl_kind(&self, decl: Self::Decl) -> DeclKind;

    /// Name of the declaration, `None` if it is anonymous.
    fn decl_name(&self, decl: Self::Decl) -> Option<&str>;

    /// Returns `true` if `decl` is a complete definition rather than a
    /// forward declaration.
    fn is_definition(&self, decl: Self::Decl) -> bool;

    /// Declared type of `decl`. For record and enum declarations this is
    /// the type being declared; for fields and typedefs the type as written.
    fn decl_type(&self, decl: Self::Decl) -> Self::Type;

    /// Marker strings attached to `decl`, in attachment order.
    fn annotations(&self, decl: Self::Decl) -> Vec<String>;

    fn origin(&self, decl: Self::Decl) -> Option<Origin>;

    /// Resolves typedefs.
    fn canonical(&self, ty: Self::Type) -> Self::Type;

    /// Classifies a canonical type.
    fn type_class(&self, ty: Self::Type) -> TypeClass;

    /// Declaration of a record or enum type.
    fn type_declaration(&self, ty: Self::Type) -> Option<Self::Decl>;

    fn pointee(&self, ty: Self::Type) -> Option<Self::Type>;

    fn element(&self, ty: Self::Type) -> Option<Self::Type>;

    /// Declared element count of a complete array.
    fn array_len(&self, ty: Self::Type) -> Option<u64>;

    /// Size in bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the type has no statically known size.
    fn size_of(&self, ty: Self::Type) -> Result<u64, LayoutError>;

    /// Alignment in bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the type has no statically known layout.
    fn align_of(&self, ty: Self::Type) -> Result<u64, LayoutError>;

    /// Qualifiers of this type, including those a typedef carries.
    fn qualifiers(&self, ty: Self::Type) -> Qualifiers;

    /// Source spelling of a type, e.g. `_Complex double`.
    fn type_spelling(&self, ty: Self::Type) -> String;

    /// Fields of a record declaration in declaration order.
    fn fields(&self, decl: Self::Decl) -> Vec<Self::Decl>;

    /// Offset of a field in bits from the start of its record.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if `field` is not a field or has no
    /// addressable offset.
    fn field_offset_bits(&self, field: Self::Decl) -> Result<u64, LayoutError>;

    /// Enumerators of an enum declaration in declaration order.
    fn enumerators(&self, decl: Self::Decl) -> Vec<Self::Decl>;

    fn enumerator_value(&self, decl: Self::Decl) -> i64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_error_messages() {
        assert_eq!(
            LayoutError::Incomplete.to_string(),
            "layout error: field's type is incomplete"
        );
        assert_eq!(
            LayoutError::Invalid.to_string(),
            "layout error: invalid cursor or not a field"
        );
        assert!(LayoutError::BitField.to_string().contains("bit-field"));
    }
}
