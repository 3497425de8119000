//! Type descriptor model.
//!
//! A [`TypeDescriptor`] is the structural description of one C type: its
//! [`Layout`] plus a [`TypeKind`] variant. Descriptors reference other types
//! through a [`TypeRef`], which is one of three ownership forms:
//!
//! - [`TypeRef::Builtin`]: a shared, statically allocated scalar singleton
//! - [`TypeRef::Named`]: a symbolic reference to a named descriptor owned by
//!   a [`TypeGraph`](crate::graph::TypeGraph)
//! - [`TypeRef::Inline`]: an anonymous descriptor owned by its single point of
//!   use
//!
//! Cycles between named aggregates only ever pass through `Named` references,
//! so the structure itself is always a tree.
//!
//! Descriptors are produced once during extraction and are not mutated
//! afterwards.

use serde::{Deserialize, Serialize};

use crate::{builtin::Builtin, identifier::Id, qualifier::Qualifiers};

/// Size and alignment of a type in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layout {
    pub size: u64,
    pub alignment: u64,
}

impl Layout {
    pub const fn new(size: u64, alignment: u64) -> Self {
        Self { size, alignment }
    }
}

/// Structural description of a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub layout: Layout,
    pub kind: TypeKind,
}

/// The closed set of descriptor variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TypeKind {
    Void,
    Integer {
        is_signed: bool,
    },
    Float,
    Pointer {
        /// `None` for function pointers.
        pointee: Option<TypeRef>,
        pointee_qualifiers: Qualifiers,
    },
    Array {
        element: TypeRef,
        /// Zero for incomplete and flexible arrays.
        count: u64,
    },
    Struct(Aggregate),
    Union(Aggregate),
    Enum(EnumType),
}

/// Reference from one descriptor to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Builtin(Builtin),
    Named(Id),
    Inline(Box<TypeDescriptor>),
}

/// Body shared by structs and unions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Empty for anonymous aggregates.
    pub name: String,
    pub annotations: Vec<String>,
    pub members: Vec<Member>,
}

/// A struct or union member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub annotations: Vec<String>,
    /// Empty for unnamed nested aggregates.
    pub name: String,
    /// Byte offset from the start of the containing aggregate.
    pub offset: u64,
    pub ty: TypeRef,
    /// Qualifiers on the member slot itself.
    pub qualifiers: Qualifiers,
}

/// Body of an enum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    /// Empty for anonymous enums.
    pub name: String,
    pub annotations: Vec<String>,
    /// Declaration order; duplicate values are kept.
    pub values: Vec<EnumValue>,
}

/// A single enumerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub annotations: Vec<String>,
    pub name: String,
    pub value: i64,
}

impl TypeDescriptor {
    pub fn new(layout: Layout, kind: TypeKind) -> Self {
        Self { layout, kind }
    }

    pub fn size(&self) -> u64 {
        self.layout.size
    }

    pub fn alignment(&self) -> u64 {
        self.layout.alignment
    }

    /// Returns the declared name of an aggregate or enum.
    ///
    /// Returns `None` for scalars, pointers, and arrays. An anonymous
    /// aggregate yields `Some("")`.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Struct(aggregate) | TypeKind::Union(aggregate) => Some(&aggregate.name),
            TypeKind::Enum(enumeration) => Some(&enumeration.name),
            _ => None,
        }
    }

    /// Returns the annotations of an aggregate or enum, empty otherwise.
    pub fn annotations(&self) -> &[String] {
        match &self.kind {
            TypeKind::Struct(aggregate) | TypeKind::Union(aggregate) => &aggregate.annotations,
            TypeKind::Enum(enumeration) => &enumeration.annotations,
            _ => &[],
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    /// Returns the lowercase variant keyword (`struct`, `pointer`, ...).
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TypeKind::Void => "void",
            TypeKind::Integer { .. } => "integer",
            TypeKind::Float => "float",
            TypeKind::Pointer { .. } => "pointer",
            TypeKind::Array { .. } => "array",
            TypeKind::Struct(_) => "struct",
            TypeKind::Union(_) => "union",
            TypeKind::Enum(_) => "enum",
        }
    }
}

impl TypeRef {
    /// Wraps an anonymous descriptor.
    pub fn inline(descriptor: TypeDescriptor) -> Self {
        Self::Inline(Box::new(descriptor))
    }

    /// Returns the built-in this reference points to, if any.
    pub fn as_builtin(&self) -> Option<Builtin> {
        match self {
            Self::Builtin(builtin) => Some(*builtin),
            _ => None,
        }
    }
}

impl From<Builtin> for TypeRef {
    fn from(builtin: Builtin) -> Self {
        Self::Builtin(builtin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> TypeDescriptor {
        TypeDescriptor::new(
            Layout::new(8, 4),
            TypeKind::Struct(Aggregate {
                name: "Point".to_string(),
                annotations: vec!["Serializable".to_string()],
                members: vec![
                    Member {
                        annotations: vec![],
                        name: "x".to_string(),
                        offset: 0,
                        ty: Builtin::Int.into(),
                        qualifiers: Qualifiers::NONE,
                    },
                    Member {
                        annotations: vec![],
                        name: "y".to_string(),
                        offset: 4,
                        ty: Builtin::Int.into(),
                        qualifiers: Qualifiers::CONST,
                    },
                ],
            }),
        )
    }

    #[test]
    fn test_accessors() {
        let desc = point();
        assert_eq!(desc.size(), 8);
        assert_eq!(desc.alignment(), 4);
        assert_eq!(desc.name(), Some("Point"));
        assert_eq!(desc.annotations(), ["Serializable".to_string()]);
        assert_eq!(desc.kind_name(), "struct");
        assert!(!desc.is_pointer());
        assert_eq!(Builtin::Int.descriptor().name(), None);
    }

    #[test]
    fn test_type_ref_forms() {
        let builtin: TypeRef = Builtin::Char.into();
        assert_eq!(builtin.as_builtin(), Some(Builtin::Char));

        let named = TypeRef::Named(Id::new("Point"));
        assert_eq!(named.as_builtin(), None);

        let pointer = TypeRef::inline(TypeDescriptor::new(
            Layout::new(8, 8),
            TypeKind::Pointer {
                pointee: None,
                pointee_qualifiers: Qualifiers::NONE,
            },
        ));
        assert!(matches!(pointer, TypeRef::Inline(ref d) if d.is_pointer()));
    }

    #[test]
    fn test_serde_shape() {
        let value = serde_json::to_value(point()).unwrap();
        assert_eq!(value["kind"]["tag"], "struct");
        assert_eq!(value["kind"]["members"][0]["ty"]["builtin"], "int");
        assert_eq!(value["kind"]["members"][1]["qualifiers"], "const");

        let back: TypeDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, point());
    }
}
