//! Elaborated view of one source unit.
//!
//! A [`Unit`] owns interned types, declarations, and tags produced by the
//! elaborator and answers [`TypeProvider`] queries over them. Handles are
//! plain indices, so they are `Copy` and only meaningful for the unit that
//! produced them.

use std::collections::HashMap;

use typeinfo_core::{
    builtin::Builtin,
    descriptor::Layout,
    graph::Origin,
    provider::{DeclKind, LayoutError, TypeClass, TypeProvider},
    qualifier::Qualifiers,
};

use crate::{error::Diagnostic, parser_types::ScalarSpec, target::TargetConfig};

/// Handle to a type of a [`Unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// Handle to a declaration of a [`Unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TagId(u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeData {
    Scalar(ScalarSpec, Qualifiers),
    Pointer(TypeId, Qualifiers),
    /// Qualifiers of an array live on its element.
    Array(TypeId, Option<u64>),
    Record(TagId, Qualifiers),
    Enum(TagId, Qualifiers),
    Function,
    Typedef(DeclId, Qualifiers),
    /// A type name without a declaration in the unit.
    Opaque(String, Qualifiers),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Struct,
    Union,
    Enum,
}

impl TagKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            TagKind::Struct => "struct",
            TagKind::Union => "union",
            TagKind::Enum => "enum",
        }
    }
}

#[derive(Debug)]
pub(crate) struct TagData {
    pub kind: TagKind,
    pub name: Option<String>,
    /// The defining declaration once a body was seen, otherwise the first
    /// mention.
    pub decl: DeclId,
    /// Fields or enumerators in declaration order.
    pub members: Vec<DeclId>,
    /// Set once the body has been laid out.
    pub layout: Option<Layout>,
}

#[derive(Debug)]
pub(crate) enum DeclPayload {
    Tag(TagId),
    Typedef {
        underlying: TypeId,
    },
    Field {
        offset_bits: u64,
        bit_width: Option<u64>,
    },
    Enumerator {
        value: i64,
    },
    /// Variables and functions.
    Other,
}

#[derive(Debug)]
pub(crate) struct DeclData {
    pub name: Option<String>,
    /// The declared type; for a typedef its sugared name.
    pub ty: TypeId,
    pub definition: bool,
    pub annotations: Vec<String>,
    pub origin: Option<Origin>,
    pub children: Vec<DeclId>,
    pub payload: DeclPayload,
}

/// An elaborated source unit.
#[derive(Debug)]
pub struct Unit {
    pub(crate) file: String,
    pub(crate) target: TargetConfig,
    types: Vec<TypeData>,
    canonical: Vec<TypeId>,
    interned: HashMap<TypeData, TypeId>,
    pub(crate) decls: Vec<DeclData>,
    pub(crate) tags: Vec<TagData>,
    pub(crate) top_level: Vec<DeclId>,
    pub(crate) warnings: Vec<Diagnostic>,
}

impl Unit {
    pub(crate) fn new(file: impl Into<String>, target: TargetConfig) -> Self {
        Self {
            file: file.into(),
            target,
            types: Vec::new(),
            canonical: Vec::new(),
            interned: HashMap::new(),
            decls: Vec::new(),
            tags: Vec::new(),
            top_level: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Name of the file this unit was parsed from.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn target(&self) -> TargetConfig {
        self.target
    }

    /// Warnings reported while elaborating the unit.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Looks up a top-level or nested tag or typedef declaration by name.
    pub fn find_decl(&self, name: &str) -> Option<DeclId> {
        self.decls
            .iter()
            .position(|decl| {
                decl.name.as_deref() == Some(name)
                    && matches!(decl.payload, DeclPayload::Tag(_) | DeclPayload::Typedef { .. })
            })
            .map(|index| DeclId(index as u32))
    }

    // ============================================================================
    // Construction
    // ============================================================================

    pub(crate) fn data(&self, ty: TypeId) -> &TypeData {
        &self.types[ty.0 as usize]
    }

    pub(crate) fn decl(&self, decl: DeclId) -> &DeclData {
        &self.decls[decl.0 as usize]
    }

    pub(crate) fn decl_mut(&mut self, decl: DeclId) -> &mut DeclData {
        &mut self.decls[decl.0 as usize]
    }

    pub(crate) fn tag(&self, tag: TagId) -> &TagData {
        &self.tags[tag.0 as usize]
    }

    pub(crate) fn tag_mut(&mut self, tag: TagId) -> &mut TagData {
        &mut self.tags[tag.0 as usize]
    }

    pub(crate) fn add_decl(&mut self, data: DeclData) -> DeclId {
        self.decls.push(data);
        DeclId((self.decls.len() - 1) as u32)
    }

    /// Creates a tag together with its first declaration, built by `decl`
    /// from the new tag and its unqualified type.
    pub(crate) fn add_tag(
        &mut self,
        kind: TagKind,
        name: Option<String>,
        decl: impl FnOnce(TagId, TypeId) -> DeclData,
    ) -> (TagId, DeclId) {
        let tag = TagId(self.tags.len() as u32);
        let decl_id = DeclId(self.decls.len() as u32);
        self.tags.push(TagData {
            kind,
            name,
            decl: decl_id,
            members: Vec::new(),
            layout: None,
        });
        let ty = self.tag_type(tag);
        self.decls.push(decl(tag, ty));
        (tag, decl_id)
    }

    /// Unqualified type of a tag.
    pub(crate) fn tag_type(&mut self, tag: TagId) -> TypeId {
        let data = match self.tag(tag).kind {
            TagKind::Enum => TypeData::Enum(tag, Qualifiers::NONE),
            TagKind::Struct | TagKind::Union => TypeData::Record(tag, Qualifiers::NONE),
        };
        self.intern(data)
    }

    /// Tag of a record or enum type, ignoring qualifiers but not typedefs.
    pub(crate) fn tag_of(&self, ty: TypeId) -> Option<TagId> {
        match self.data(ty) {
            TypeData::Record(tag, _) | TypeData::Enum(tag, _) => Some(*tag),
            _ => None,
        }
    }

    /// Interns `data`, computing its canonical form on first sight.
    pub(crate) fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.interned.get(&data) {
            return id;
        }

        let canonical = match &data {
            TypeData::Typedef(decl, qualifiers) => {
                let underlying = self.typedef_underlying(*decl);
                let canonical = self.canonical[underlying.0 as usize];
                Some(self.qualified(canonical, *qualifiers))
            }
            TypeData::Pointer(pointee, qualifiers) => {
                let canonical = self.canonical[pointee.0 as usize];
                (canonical != *pointee).then(|| self.intern(TypeData::Pointer(canonical, *qualifiers)))
            }
            TypeData::Array(element, len) => {
                let canonical = self.canonical[element.0 as usize];
                (canonical != *element).then(|| self.intern(TypeData::Array(canonical, *len)))
            }
            _ => None,
        };

        let id = TypeId(self.types.len() as u32);
        self.types.push(data.clone());
        self.canonical.push(canonical.unwrap_or(id));
        self.interned.insert(data, id);
        id
    }

    /// Adds `qualifiers` to `ty`. Array qualifiers move to the element.
    pub(crate) fn qualified(&mut self, ty: TypeId, qualifiers: Qualifiers) -> TypeId {
        if qualifiers.is_empty() {
            return ty;
        }
        let data = match self.data(ty).clone() {
            TypeData::Scalar(scalar, q) => TypeData::Scalar(scalar, q | qualifiers),
            TypeData::Pointer(pointee, q) => TypeData::Pointer(pointee, q | qualifiers),
            TypeData::Array(element, len) => {
                let element = self.qualified(element, qualifiers);
                TypeData::Array(element, len)
            }
            TypeData::Record(tag, q) => TypeData::Record(tag, q | qualifiers),
            TypeData::Enum(tag, q) => TypeData::Enum(tag, q | qualifiers),
            TypeData::Function => return ty,
            TypeData::Typedef(decl, q) => TypeData::Typedef(decl, q | qualifiers),
            TypeData::Opaque(name, q) => TypeData::Opaque(name, q | qualifiers),
        };
        self.intern(data)
    }

    pub(crate) fn typedef_underlying(&self, decl: DeclId) -> TypeId {
        match self.decl(decl).payload {
            DeclPayload::Typedef { underlying } => underlying,
            _ => self.decl(decl).ty,
        }
    }

    /// Layout of a type, following typedefs.
    pub(crate) fn layout(&self, ty: TypeId) -> Result<Layout, LayoutError> {
        let ty = self.canonical[ty.0 as usize];
        match self.data(ty) {
            TypeData::Scalar(ScalarSpec::Void, _) => Err(LayoutError::Incomplete),
            TypeData::Scalar(scalar, _) => Ok(self.target.data_model.scalar_layout(*scalar)),
            TypeData::Pointer(..) => Ok(self.target.data_model.pointer()),
            TypeData::Array(_, None) => Err(LayoutError::Incomplete),
            TypeData::Array(element, Some(len)) => {
                let element = self.layout(*element)?;
                let size = element
                    .size
                    .checked_mul(*len)
                    .ok_or(LayoutError::NotConstantSize)?;
                Ok(Layout::new(size, element.alignment))
            }
            TypeData::Record(tag, _) | TypeData::Enum(tag, _) => {
                self.tag(*tag).layout.ok_or(LayoutError::Incomplete)
            }
            TypeData::Opaque(..) => Err(LayoutError::Incomplete),
            TypeData::Function | TypeData::Typedef(..) => Err(LayoutError::Invalid),
        }
    }

    /// Returns `true` if `ty` is an integer, `_Bool`, or enum type.
    pub(crate) fn is_integer(&self, ty: TypeId) -> bool {
        match self.data(self.canonical[ty.0 as usize]) {
            TypeData::Scalar(scalar, _) => scalar.is_integer(),
            TypeData::Enum(..) => true,
            _ => false,
        }
    }

    /// Returns whether an integer type is signed under this unit's target.
    pub(crate) fn is_signed(&self, ty: TypeId) -> bool {
        match self.data(self.canonical[ty.0 as usize]) {
            TypeData::Scalar(ScalarSpec::Char, _) => self.target.char_signed,
            TypeData::Scalar(scalar, _) => scalar.is_signed(),
            _ => true,
        }
    }

    fn spelling(&self, ty: TypeId) -> String {
        let with_qualifiers = |base: String, qualifiers: Qualifiers| {
            let mut text: Vec<&str> = qualifiers.keywords().collect();
            if text.is_empty() {
                base
            } else {
                text.push(&base);
                text.join(" ")
            }
        };
        match self.data(ty) {
            TypeData::Scalar(scalar, q) => with_qualifiers(scalar.to_string(), *q),
            TypeData::Pointer(pointee, q) => {
                let base = format!("{} *", self.spelling(*pointee));
                let qualifiers: Vec<&str> = q.keywords().collect();
                if qualifiers.is_empty() {
                    base
                } else {
                    format!("{base}{}", qualifiers.join(" "))
                }
            }
            TypeData::Array(element, Some(len)) => format!("{}[{len}]", self.spelling(*element)),
            TypeData::Array(element, None) => format!("{}[]", self.spelling(*element)),
            TypeData::Record(tag, q) | TypeData::Enum(tag, q) => {
                let tag = self.tag(*tag);
                let base = match &tag.name {
                    Some(name) => format!("{} {name}", tag.kind.keyword()),
                    None => format!("{} (anonymous)", tag.kind.keyword()),
                };
                with_qualifiers(base, *q)
            }
            TypeData::Function => "function".to_string(),
            TypeData::Typedef(decl, q) => {
                with_qualifiers(self.decl(*decl).name.clone().unwrap_or_default(), *q)
            }
            TypeData::Opaque(name, q) => with_qualifiers(name.clone(), *q),
        }
    }
}

impl TypeProvider for Unit {
    type Type = TypeId;
    type Decl = DeclId;

    fn declarations(&self) -> Vec<DeclId> {
        self.top_level.clone()
    }

    fn children(&self, decl: DeclId) -> Vec<DeclId> {
        self.decl(decl).children.clone()
    }

    fn decl_kind(&self, decl: DeclId) -> DeclKind {
        match self.decl(decl).payload {
            DeclPayload::Tag(tag) => match self.tag(tag).kind {
                TagKind::Struct => DeclKind::Struct,
                TagKind::Union => DeclKind::Union,
                TagKind::Enum => DeclKind::Enum,
            },
            DeclPayload::Typedef { .. } => DeclKind::Typedef,
            DeclPayload::Field { .. } => DeclKind::Field,
            DeclPayload::Enumerator { .. } => DeclKind::Enumerator,
            DeclPayload::Other => DeclKind::Other,
        }
    }

    fn decl_name(&self, decl: DeclId) -> Option<&str> {
        match self.decl(decl).payload {
            // Anonymous records named by a typedef take that name.
            DeclPayload::Tag(tag) => self.tag(tag).name.as_deref(),
            _ => self.decl(decl).name.as_deref(),
        }
    }

    fn is_definition(&self, decl: DeclId) -> bool {
        self.decl(decl).definition
    }

    fn decl_type(&self, decl: DeclId) -> TypeId {
        self.decl(decl).ty
    }

    fn annotations(&self, decl: DeclId) -> Vec<String> {
        self.decl(decl).annotations.clone()
    }

    fn origin(&self, decl: DeclId) -> Option<Origin> {
        self.decl(decl).origin.clone()
    }

    fn canonical(&self, ty: TypeId) -> TypeId {
        self.canonical[ty.0 as usize]
    }

    fn type_class(&self, ty: TypeId) -> TypeClass {
        match self.data(self.canonical(ty)) {
            TypeData::Scalar(scalar, _) => scalar
                .as_builtin()
                .map_or(TypeClass::Other, TypeClass::Builtin),
            TypeData::Pointer(..) => TypeClass::Pointer,
            TypeData::Array(_, Some(_)) => TypeClass::Array,
            TypeData::Array(_, None) => TypeClass::IncompleteArray,
            TypeData::Record(..) => TypeClass::Record,
            TypeData::Enum(..) => TypeClass::Enum,
            TypeData::Function => TypeClass::Function,
            TypeData::Typedef(..) | TypeData::Opaque(..) => TypeClass::Other,
        }
    }

    fn type_declaration(&self, ty: TypeId) -> Option<DeclId> {
        match self.data(self.canonical(ty)) {
            TypeData::Record(tag, _) | TypeData::Enum(tag, _) => Some(self.tag(*tag).decl),
            _ => None,
        }
    }

    fn pointee(&self, ty: TypeId) -> Option<TypeId> {
        match self.data(ty) {
            TypeData::Pointer(pointee, _) => Some(*pointee),
            TypeData::Typedef(..) => self.pointee(self.canonical(ty)),
            _ => None,
        }
    }

    fn element(&self, ty: TypeId) -> Option<TypeId> {
        match self.data(ty) {
            TypeData::Array(element, _) => Some(*element),
            TypeData::Typedef(..) => self.element(self.canonical(ty)),
            _ => None,
        }
    }

    fn array_len(&self, ty: TypeId) -> Option<u64> {
        match self.data(self.canonical(ty)) {
            TypeData::Array(_, len) => *len,
            _ => None,
        }
    }

    fn size_of(&self, ty: TypeId) -> Result<u64, LayoutError> {
        self.layout(ty).map(|layout| layout.size)
    }

    fn align_of(&self, ty: TypeId) -> Result<u64, LayoutError> {
        self.layout(ty).map(|layout| layout.alignment)
    }

    fn qualifiers(&self, ty: TypeId) -> Qualifiers {
        match self.data(ty) {
            TypeData::Scalar(_, q)
            | TypeData::Pointer(_, q)
            | TypeData::Record(_, q)
            | TypeData::Enum(_, q)
            | TypeData::Opaque(_, q) => *q,
            TypeData::Array(element, _) => self.qualifiers(*element),
            TypeData::Function => Qualifiers::NONE,
            TypeData::Typedef(decl, q) => *q | self.qualifiers(self.typedef_underlying(*decl)),
        }
    }

    fn type_spelling(&self, ty: TypeId) -> String {
        self.spelling(ty)
    }

    fn fields(&self, decl: DeclId) -> Vec<DeclId> {
        match self.decl(decl).payload {
            DeclPayload::Tag(tag) if self.tag(tag).kind != TagKind::Enum => {
                self.tag(tag).members.clone()
            }
            _ => Vec::new(),
        }
    }

    fn field_offset_bits(&self, field: DeclId) -> Result<u64, LayoutError> {
        match self.decl(field).payload {
            DeclPayload::Field {
                bit_width: Some(_), ..
            } => Err(LayoutError::BitField),
            DeclPayload::Field { offset_bits, .. } => Ok(offset_bits),
            _ => Err(LayoutError::Invalid),
        }
    }

    fn enumerators(&self, decl: DeclId) -> Vec<DeclId> {
        match self.decl(decl).payload {
            DeclPayload::Tag(tag) if self.tag(tag).kind == TagKind::Enum => {
                self.tag(tag).members.clone()
            }
            _ => Vec::new(),
        }
    }

    fn enumerator_value(&self, decl: DeclId) -> i64 {
        match self.decl(decl).payload {
            DeclPayload::Enumerator { value } => value,
            _ => 0,
        }
    }
}
