//! Elaboration phase for the declaration AST
//!
//! This module resolves the parsed declarations into a [`Unit`]: it interns
//! types, binds tags and typedef names, evaluates integer constant
//! expressions, assigns enumerator values, and lays out records. Problems are
//! collected per top-level declaration, so one bad declaration does not hide
//! errors in the rest of the unit.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use typeinfo_core::{
    descriptor::Layout,
    graph::Origin,
    provider::{LayoutError, TypeClass, TypeProvider},
    qualifier::Qualifiers,
};

use crate::{
    builtin_types,
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError, Result},
    layout::{self, FieldSlot},
    parser_types as ast,
    span::{LineIndex, Span, Spanned},
    target::TargetConfig,
    unit::{DeclData, DeclId, DeclPayload, TagId, TagKind, TypeData, TypeId, Unit},
};

pub struct Builder<'a> {
    unit: Unit,
    lines: LineIndex,
    collector: DiagnosticCollector,
    tags: HashMap<&'a str, TagId>,
    tag_definitions: HashMap<TagId, Span>,
    typedefs: HashMap<&'a str, (DeclId, Span)>,
    predefined: HashMap<&'a str, DeclId>,
    constants: HashMap<&'a str, (i128, Span)>,
    unknown_names: HashSet<&'a str>,
}

impl<'a> Builder<'a> {
    pub fn new(file: &str, source: &str, target: TargetConfig) -> Self {
        Self {
            unit: Unit::new(file, target),
            lines: LineIndex::new(source),
            collector: DiagnosticCollector::new(),
            tags: HashMap::new(),
            tag_definitions: HashMap::new(),
            typedefs: HashMap::new(),
            predefined: HashMap::new(),
            constants: HashMap::new(),
            unknown_names: HashSet::new(),
        }
    }

    // ============================================================================
    // Main Entry Methods
    // ============================================================================

    pub fn build(mut self, tree: &ast::TranslationUnit<'a>) -> std::result::Result<Unit, ParseError> {
        debug!(declarations = tree.declarations.len(); "Elaborating unit");

        for declaration in &tree.declarations {
            let mut produced = Vec::new();
            if let Err(diagnostic) = self.declaration(declaration, &mut produced) {
                self.collector.emit(diagnostic);
            }
            self.unit.top_level.extend(produced);
        }

        let warnings = self.collector.finish()?;
        debug!(
            tags = self.unit.tags.len(),
            decls = self.unit.decls.len(),
            warnings = warnings.len();
            "Unit elaborated"
        );
        self.unit.warnings = warnings;
        Ok(self.unit)
    }

    fn declaration(&mut self, declaration: &ast::Declaration<'a>, out: &mut Vec<DeclId>) -> Result<()> {
        let specifiers = &declaration.specifiers;
        let standalone = declaration.declarators.is_empty();
        let base = self.specifiers(specifiers, standalone, out)?;
        let shared = self.annotations(&specifiers.attributes);

        if standalone {
            match self.unit.tag_of(base) {
                Some(tag) => {
                    let decl = self.unit.tag(tag).decl;
                    self.unit.decl_mut(decl).annotations.extend(shared);
                }
                None => self.collector.emit(
                    Diagnostic::warning("declaration does not declare anything")
                        .with_code(ErrorCode::E302)
                        .with_label(declaration.span, "nothing declared"),
                ),
            }
            return Ok(());
        }

        for declarator in &declaration.declarators {
            let ty = self.declarator_type(base, declarator)?;
            let Some(name) = declarator.name() else {
                continue;
            };

            let mut annotations = shared.clone();
            annotations.extend(self.annotations(&declarator.attributes));

            if specifiers.is_typedef() {
                self.typedef(name, ty, declarator, annotations, out)?;
            } else {
                let definition = specifiers.storage != Some(ast::StorageClass::Extern)
                    && !declarator.is_function();
                trace!(name = *name.inner(); "Declaration");
                let decl = self.unit.add_decl(DeclData {
                    name: Some(name.to_string()),
                    ty,
                    definition,
                    annotations,
                    origin: Some(self.origin(name.span())),
                    children: Vec::new(),
                    payload: DeclPayload::Other,
                });
                out.push(decl);
            }
        }
        Ok(())
    }

    fn typedef(
        &mut self,
        name: Spanned<&'a str>,
        ty: TypeId,
        declarator: &ast::Declarator<'a>,
        annotations: Vec<String>,
        out: &mut Vec<DeclId>,
    ) -> Result<()> {
        if let Some(&(previous, previous_span)) = self.typedefs.get(name.inner()) {
            let existing = self.unit.typedef_underlying(previous);
            if self.unit.canonical(existing) == self.unit.canonical(ty) {
                return Ok(());
            }
            return Err(Diagnostic::error(format!(
                "typedef redefinition with different types (`{}` vs `{}`)",
                self.unit.type_spelling(ty),
                self.unit.type_spelling(existing)
            ))
            .with_code(ErrorCode::E201)
            .with_label(name.span(), "redefined here")
            .with_secondary_label(previous_span, "previous definition is here"));
        }

        // An anonymous record or enum takes the name of its typedef.
        if declarator.is_plain_name() {
            if let Some(tag) = self.unit.tag_of(ty) {
                let data = self.unit.tag_mut(tag);
                if data.name.is_none() {
                    debug!(name = *name.inner(); "Naming anonymous tag after typedef");
                    data.name = Some(name.to_string());
                }
            }
        }

        let decl = self.unit.add_decl(DeclData {
            name: Some(name.to_string()),
            ty,
            definition: true,
            annotations,
            origin: Some(self.origin(name.span())),
            children: Vec::new(),
            payload: DeclPayload::Typedef { underlying: ty },
        });
        let sugar = self.unit.intern(TypeData::Typedef(decl, Qualifiers::NONE));
        self.unit.decl_mut(decl).ty = sugar;
        self.typedefs.insert(*name.inner(), (decl, name.span()));
        out.push(decl);
        Ok(())
    }

    // ============================================================================
    // Types
    // ============================================================================

    fn specifiers(
        &mut self,
        specifiers: &ast::DeclSpecifiers<'a>,
        standalone: bool,
        out: &mut Vec<DeclId>,
    ) -> Result<TypeId> {
        let span = specifiers.specifier.span();
        let ty = match specifiers.specifier.inner() {
            ast::TypeSpecifier::Scalar(scalar) => {
                self.unit.intern(TypeData::Scalar(*scalar, Qualifiers::NONE))
            }
            ast::TypeSpecifier::TypedefName(name) => self.typedef_name(*name, span),
            ast::TypeSpecifier::Record(record) => {
                let tag = self.record(record, standalone, out)?;
                self.unit.tag_type(tag)
            }
            ast::TypeSpecifier::Enum(enumeration) => {
                let tag = self.enumeration(enumeration, standalone, out)?;
                self.unit.tag_type(tag)
            }
        };
        Ok(self.unit.qualified(ty, specifiers.qualifiers))
    }

    fn typedef_name(&mut self, name: &'a str, span: Span) -> TypeId {
        let decl = match self.typedefs.get(name) {
            Some(&(decl, _)) => Some(decl),
            None => self.predefined_typedef(name),
        };
        if let Some(decl) = decl {
            return self.unit.intern(TypeData::Typedef(decl, Qualifiers::NONE));
        }

        if self.unknown_names.insert(name) {
            self.collector.emit(
                Diagnostic::warning(format!("unknown type name `{name}`"))
                    .with_code(ErrorCode::E300)
                    .with_label(span, "treated as an incomplete type")
                    .with_help("declare the type in this file to make its layout known"),
            );
        }
        self.unit
            .intern(TypeData::Opaque(name.to_string(), Qualifiers::NONE))
    }

    fn predefined_typedef(&mut self, name: &'a str) -> Option<DeclId> {
        if let Some(&decl) = self.predefined.get(name) {
            return Some(decl);
        }
        let scalar = builtin_types::predefined(name, self.unit.target.data_model)?;
        let underlying = self.unit.intern(TypeData::Scalar(scalar, Qualifiers::NONE));
        let decl = self.unit.add_decl(DeclData {
            name: Some(name.to_string()),
            ty: underlying,
            definition: true,
            annotations: Vec::new(),
            origin: None,
            children: Vec::new(),
            payload: DeclPayload::Typedef { underlying },
        });
        let sugar = self.unit.intern(TypeData::Typedef(decl, Qualifiers::NONE));
        self.unit.decl_mut(decl).ty = sugar;
        self.predefined.insert(name, decl);
        Some(decl)
    }

    /// Applies pointers, then array and function suffixes right to left,
    /// then the nested declarator.
    fn declarator_type(&mut self, base: TypeId, declarator: &ast::Declarator<'a>) -> Result<TypeId> {
        let mut ty = base;
        for qualifiers in &declarator.pointers {
            ty = self.unit.intern(TypeData::Pointer(ty, *qualifiers));
        }
        for suffix in declarator.suffixes.iter().rev() {
            ty = match suffix {
                ast::Suffix::Array(size) => {
                    let len = size.as_ref().map(|size| self.array_len(size)).transpose()?;
                    self.unit.intern(TypeData::Array(ty, len))
                }
                ast::Suffix::Function => self.unit.intern(TypeData::Function),
            };
        }
        if let ast::DirectDeclarator::Nested(inner) = &declarator.direct {
            ty = self.declarator_type(ty, inner)?;
        }
        Ok(ty)
    }

    fn array_len(&mut self, size: &ast::Expr<'a>) -> Result<u64> {
        let value = self.eval(size)?;
        u64::try_from(value).map_err(|_| {
            Diagnostic::error(format!("array has negative size {value}"))
                .with_code(ErrorCode::E203)
                .with_label(size.span(), "size must not be negative")
        })
    }

    fn type_name(&mut self, type_name: &ast::TypeName<'a>) -> Result<TypeId> {
        let mut scratch = Vec::new();
        let base = self.specifiers(&type_name.specifiers, false, &mut scratch)?;
        self.declarator_type(base, &type_name.declarator)
    }

    // ============================================================================
    // Tags
    // ============================================================================

    fn record(
        &mut self,
        record: &ast::RecordSpecifier<'a>,
        standalone: bool,
        out: &mut Vec<DeclId>,
    ) -> Result<TagId> {
        let kind = match record.kind {
            ast::RecordKind::Struct => TagKind::Struct,
            ast::RecordKind::Union => TagKind::Union,
        };
        let annotations = self.annotations(&record.attributes);
        let tag = self.tag_reference(
            kind,
            record.tag.as_ref(),
            record.keyword,
            record.fields.is_some(),
            standalone,
            annotations,
            out,
        )?;
        if let Some(fields) = &record.fields {
            self.record_body(tag, kind, record.keyword, fields)?;
        }
        Ok(tag)
    }

    fn enumeration(
        &mut self,
        enumeration: &ast::EnumSpecifier<'a>,
        standalone: bool,
        out: &mut Vec<DeclId>,
    ) -> Result<TagId> {
        let annotations = self.annotations(&enumeration.attributes);
        let tag = self.tag_reference(
            TagKind::Enum,
            enumeration.tag.as_ref(),
            enumeration.keyword,
            enumeration.enumerators.is_some(),
            standalone,
            annotations,
            out,
        )?;
        if let Some(enumerators) = &enumeration.enumerators {
            self.enum_body(tag, enumerators)?;
        }
        Ok(tag)
    }

    /// Binds a tag mention, creating a declaration for bodies, standalone
    /// forward declarations, and first mentions.
    #[allow(clippy::too_many_arguments)]
    fn tag_reference(
        &mut self,
        kind: TagKind,
        name: Option<&Spanned<&'a str>>,
        keyword: Span,
        has_body: bool,
        standalone: bool,
        annotations: Vec<String>,
        out: &mut Vec<DeclId>,
    ) -> Result<TagId> {
        let origin = Some(self.origin(keyword));
        let existing = name.and_then(|name| self.tags.get(name.inner()).copied());

        let (Some(tag), Some(name)) = (existing, name) else {
            let name_text = name.map(|n| n.to_string());
            let (tag, decl) = self.unit.add_tag(kind, name_text.clone(), |tag, ty| DeclData {
                name: name_text,
                ty,
                definition: has_body,
                annotations,
                origin,
                children: Vec::new(),
                payload: DeclPayload::Tag(tag),
            });
            if let Some(name) = name {
                self.tags.insert(*name.inner(), tag);
            }
            if has_body {
                self.tag_definitions.insert(tag, keyword);
            }
            out.push(decl);
            return Ok(tag);
        };

        let previous = self.unit.tag(tag).kind;
        if previous != kind {
            return Err(Diagnostic::error(format!(
                "use of `{}` with tag type that does not match previous declaration",
                name.inner()
            ))
            .with_code(ErrorCode::E207)
            .with_label(keyword.union(name.span()), format!("used as `{}` here", kind.keyword()))
            .with_help(format!("`{}` was previously declared as `{}`", name.inner(), previous.keyword())));
        }

        if !has_body && !standalone {
            return Ok(tag);
        }
        if has_body {
            if let Some(&previous_span) = self.tag_definitions.get(&tag) {
                return Err(Diagnostic::error(format!(
                    "redefinition of `{} {}`",
                    kind.keyword(),
                    name.inner()
                ))
                .with_code(ErrorCode::E201)
                .with_label(keyword.union(name.span()), "redefined here")
                .with_secondary_label(previous_span, "previous definition is here"));
            }
            self.tag_definitions.insert(tag, keyword);
        }

        let ty = self.unit.tag_type(tag);
        let decl = self.unit.add_decl(DeclData {
            name: Some(name.to_string()),
            ty,
            definition: has_body,
            annotations,
            origin,
            children: Vec::new(),
            payload: DeclPayload::Tag(tag),
        });
        if has_body {
            self.unit.tag_mut(tag).decl = decl;
        }
        out.push(decl);
        Ok(tag)
    }

    fn record_body(
        &mut self,
        tag: TagId,
        kind: TagKind,
        keyword: Span,
        fields: &[ast::FieldDeclaration<'a>],
    ) -> Result<()> {
        let mut members = Vec::new();
        let mut children = Vec::new();
        let mut slots = Vec::new();
        let mut names: HashMap<&'a str, Span> = HashMap::new();

        for (index, field) in fields.iter().enumerate() {
            let standalone = field.declarators.is_empty();
            let mut nested = Vec::new();
            let base = self.specifiers(&field.specifiers, standalone, &mut nested)?;
            children.extend(nested);
            let shared = self.annotations(&field.specifiers.attributes);

            if standalone {
                let anonymous_member = matches!(
                    field.specifiers.specifier.inner(),
                    ast::TypeSpecifier::Record(record) if record.tag.is_none()
                );
                if !anonymous_member {
                    if self.unit.tag_of(base).is_none() {
                        self.collector.emit(
                            Diagnostic::warning("declaration does not declare anything")
                                .with_code(ErrorCode::E302)
                                .with_label(field.span, "nothing declared"),
                        );
                    }
                    continue;
                }
                let layout = self.field_layout(base, field.span, None)?;
                let member = self.unit.add_decl(DeclData {
                    name: None,
                    ty: base,
                    definition: true,
                    annotations: shared,
                    origin: Some(self.origin(field.span)),
                    children: Vec::new(),
                    payload: DeclPayload::Field {
                        offset_bits: 0,
                        bit_width: None,
                    },
                });
                children.push(member);
                members.push(member);
                slots.push(FieldSlot::new(layout));
                continue;
            }

            for (position, field_declarator) in field.declarators.iter().enumerate() {
                let declarator = &field_declarator.declarator;
                let ty = self.declarator_type(base, declarator)?;
                let name = declarator.name();
                let span = name.as_ref().map_or(declarator.span, |name| name.span());

                if let Some(name) = &name {
                    if let Some(&previous) = names.get(name.inner()) {
                        return Err(Diagnostic::error(format!("duplicate member `{}`", name.inner()))
                            .with_code(ErrorCode::E206)
                            .with_label(name.span(), "duplicate declared here")
                            .with_secondary_label(previous, "previous declaration is here"));
                    }
                    names.insert(*name.inner(), name.span());
                }

                let is_last = index + 1 == fields.len() && position + 1 == field.declarators.len();
                let (slot, bit_width) = match &field_declarator.bit_width {
                    Some(width) => {
                        let layout = self.field_layout(ty, span, name.as_ref())?;
                        let width = self.bit_width(ty, layout, width, name.as_ref())?;
                        (FieldSlot::bit_field(layout, width, name.is_some()), Some(width))
                    }
                    None if is_last && kind == TagKind::Struct && !members.is_empty() => {
                        (self.trailing_field_slot(ty, span, name.as_ref())?, None)
                    }
                    None => (FieldSlot::new(self.field_layout(ty, span, name.as_ref())?), None),
                };

                let mut annotations = shared.clone();
                annotations.extend(self.annotations(&declarator.attributes));

                let member = self.unit.add_decl(DeclData {
                    name: name.as_ref().map(|name| name.to_string()),
                    ty,
                    definition: true,
                    annotations,
                    origin: Some(self.origin(span)),
                    children: Vec::new(),
                    payload: DeclPayload::Field {
                        offset_bits: 0,
                        bit_width,
                    },
                });
                children.push(member);
                members.push(member);
                slots.push(slot);
            }
        }

        let result = match kind {
            TagKind::Union => layout::layout_union(&slots),
            TagKind::Struct | TagKind::Enum => layout::layout_struct(&slots),
        };
        let Some(result) = result else {
            let name = self.unit.tag(tag).name.clone().unwrap_or_else(|| "(anonymous)".to_string());
            return Err(Diagnostic::error(format!("`{} {name}` is too large", kind.keyword()))
                .with_code(ErrorCode::E208)
                .with_label(keyword, "size in bits overflows 64 bits"));
        };
        for (member, offset) in members.iter().zip(&result.offsets) {
            if let DeclPayload::Field { offset_bits, .. } = &mut self.unit.decl_mut(*member).payload {
                *offset_bits = *offset;
            }
        }
        trace!(
            size = result.layout.size,
            alignment = result.layout.alignment,
            fields = members.len();
            "Record laid out"
        );

        let data = self.unit.tag_mut(tag);
        data.members = members;
        data.layout = Some(result.layout);
        let decl = data.decl;
        self.unit.decl_mut(decl).children = children;
        Ok(())
    }

    fn field_layout(&self, ty: TypeId, span: Span, name: Option<&Spanned<&'a str>>) -> Result<Layout> {
        self.unit.layout(ty).map_err(|err| {
            let field = name.map_or_else(|| "anonymous member".to_string(), |n| format!("field `{}`", n.inner()));
            if err == LayoutError::NotConstantSize {
                return Diagnostic::error(format!(
                    "{field} has type `{}` whose size does not fit in 64 bits",
                    self.unit.type_spelling(ty)
                ))
                .with_code(ErrorCode::E208)
                .with_label(span, "type too large");
            }
            Diagnostic::error(format!(
                "{field} has incomplete type `{}`",
                self.unit.type_spelling(ty)
            ))
            .with_code(ErrorCode::E205)
            .with_label(span, "incomplete type")
            .with_help("define the type before this record, or use a pointer")
        })
    }

    /// The last field of a struct may be a flexible array member.
    fn trailing_field_slot(&self, ty: TypeId, span: Span, name: Option<&Spanned<&'a str>>) -> Result<FieldSlot> {
        if self.unit.type_class(ty) == TypeClass::IncompleteArray {
            if let Some(element) = self.unit.element(ty) {
                let element = self.field_layout(element, span, name)?;
                return Ok(FieldSlot::new(Layout::new(0, element.alignment)));
            }
        }
        self.field_layout(ty, span, name).map(FieldSlot::new)
    }

    fn bit_width(
        &mut self,
        ty: TypeId,
        layout: Layout,
        width: &ast::Expr<'a>,
        name: Option<&Spanned<&'a str>>,
    ) -> Result<u64> {
        let field = name.map_or_else(|| "unnamed bit-field".to_string(), |n| format!("bit-field `{}`", n.inner()));
        let invalid = |message: String| {
            Diagnostic::error(message)
                .with_code(ErrorCode::E204)
                .with_label(width.span(), "invalid width")
        };

        if !self.unit.is_integer(ty) {
            return Err(invalid(format!(
                "{field} has non-integral type `{}`",
                self.unit.type_spelling(ty)
            )));
        }
        let value = self.eval(width)?;
        let max = layout.size.saturating_mul(8);
        match u64::try_from(value) {
            Err(_) => Err(invalid(format!("{field} has negative width {value}"))),
            Ok(0) if name.is_some() => Err(invalid(format!("named {field} has zero width"))),
            Ok(bits) if bits > max => Err(invalid(format!(
                "width of {field} ({bits} bits) exceeds the width of its type ({max} bits)"
            ))),
            Ok(bits) => Ok(bits),
        }
    }

    fn enum_body(&mut self, tag: TagId, enumerators: &[ast::Enumerator<'a>]) -> Result<()> {
        let int = self.unit.intern(TypeData::Scalar(ast::ScalarSpec::Int, Qualifiers::NONE));
        let mut members = Vec::new();
        let mut next: i128 = 0;
        let (mut min, mut max) = (0i128, 0i128);

        for enumerator in enumerators {
            let name = &enumerator.name;
            let value = match &enumerator.value {
                Some(expr) => self.eval(expr)?,
                None => next,
            };
            let stored = i64::try_from(value).map_err(|_| {
                Diagnostic::error(format!(
                    "enumerator value for `{}` is not representable in 64 bits",
                    name.inner()
                ))
                .with_code(ErrorCode::E202)
                .with_label(name.span(), "value out of range")
            })?;
            if let Some(&(_, previous)) = self.constants.get(name.inner()) {
                return Err(Diagnostic::error(format!("redefinition of enumerator `{}`", name.inner()))
                    .with_code(ErrorCode::E201)
                    .with_label(name.span(), "redefined here")
                    .with_secondary_label(previous, "previous definition is here"));
            }
            self.constants.insert(*name.inner(), (value, name.span()));
            min = min.min(value);
            max = max.max(value);

            let annotations = self.annotations(&enumerator.attributes);
            let decl = self.unit.add_decl(DeclData {
                name: Some(name.to_string()),
                ty: int,
                definition: true,
                annotations,
                origin: Some(self.origin(name.span())),
                children: Vec::new(),
                payload: DeclPayload::Enumerator { value: stored },
            });
            members.push(decl);
            next = value + 1;
        }

        let fits_int = min >= i128::from(i32::MIN) && max <= i128::from(i32::MAX);
        let fits_unsigned = min >= 0 && max <= i128::from(u32::MAX);
        let layout = if fits_int || fits_unsigned {
            self.unit
                .target
                .data_model
                .scalar_layout(ast::ScalarSpec::Int)
        } else {
            self.unit
                .target
                .data_model
                .scalar_layout(ast::ScalarSpec::LongLong)
        };

        let data = self.unit.tag_mut(tag);
        data.layout = Some(layout);
        data.members = members.clone();
        let decl = data.decl;
        self.unit.decl_mut(decl).children = members;
        Ok(())
    }

    // ============================================================================
    // Constant Expressions
    // ============================================================================

    fn eval(&mut self, expr: &ast::Expr<'a>) -> Result<i128> {
        let span = expr.span();
        match expr.inner() {
            ast::ExprKind::Int(value) => Ok(i128::from(*value)),
            ast::ExprKind::Char(value) => Ok(i128::from(*value)),
            ast::ExprKind::Float(_) => Err(not_constant(
                span,
                "floating constant in an integer constant expression",
            )),
            ast::ExprKind::Ident(name) => match self.constants.get(name) {
                Some(&(value, _)) => Ok(value),
                None => Err(Diagnostic::error(format!("use of undeclared identifier `{name}`"))
                    .with_code(ErrorCode::E200)
                    .with_label(span, "not an enumerator")
                    .with_help("only enumerators can appear in constant expressions")),
            },
            ast::ExprKind::Unary(op, operand) => {
                let value = self.eval(operand)?;
                let result = match op {
                    ast::UnaryOp::Plus => Some(value),
                    ast::UnaryOp::Neg => value.checked_neg(),
                    ast::UnaryOp::BitNot => Some(!value),
                    ast::UnaryOp::Not => Some(i128::from(value == 0)),
                };
                result.ok_or_else(|| overflow(span))
            }
            ast::ExprKind::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, span),
            ast::ExprKind::Conditional(condition, then, otherwise) => {
                if self.eval(condition)? != 0 {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            ast::ExprKind::Cast(type_name, operand) => self.cast(type_name, operand, span),
            ast::ExprKind::SizeofType(type_name) => {
                if self.names_enumerator(type_name) {
                    return Ok(self.int_size());
                }
                let ty = self.type_name(type_name)?;
                self.unit
                    .layout(ty)
                    .map(|layout| i128::from(layout.size))
                    .map_err(|_| sizeof_incomplete(span, "sizeof"))
            }
            ast::ExprKind::SizeofExpr(operand) => {
                let value = self.eval(operand)?;
                if i32::try_from(value).is_ok() {
                    Ok(self.int_size())
                } else {
                    let layout = self
                        .unit
                        .target
                        .data_model
                        .scalar_layout(ast::ScalarSpec::LongLong);
                    Ok(i128::from(layout.size))
                }
            }
            ast::ExprKind::AlignofType(type_name) => {
                let ty = self.type_name(type_name)?;
                self.unit
                    .layout(ty)
                    .map(|layout| i128::from(layout.alignment))
                    .map_err(|_| sizeof_incomplete(span, "_Alignof"))
            }
        }
    }

    fn binary(
        &mut self,
        op: ast::BinaryOp,
        lhs: &ast::Expr<'a>,
        rhs: &ast::Expr<'a>,
        span: Span,
    ) -> Result<i128> {
        use ast::BinaryOp as B;

        let l = self.eval(lhs)?;
        match op {
            B::And if l == 0 => return Ok(0),
            B::Or if l != 0 => return Ok(1),
            _ => {}
        }
        let r = self.eval(rhs)?;
        let shift = || u32::try_from(r).ok().filter(|bits| *bits < 127);

        let result = match op {
            B::Mul => l.checked_mul(r),
            B::Div => l.checked_div(r),
            B::Rem => l.checked_rem(r),
            B::Add => l.checked_add(r),
            B::Sub => l.checked_sub(r),
            B::Shl => shift().and_then(|bits| l.checked_shl(bits)),
            B::Shr => shift().and_then(|bits| l.checked_shr(bits)),
            B::Lt => Some(i128::from(l < r)),
            B::Gt => Some(i128::from(l > r)),
            B::Le => Some(i128::from(l <= r)),
            B::Ge => Some(i128::from(l >= r)),
            B::Eq => Some(i128::from(l == r)),
            B::Ne => Some(i128::from(l != r)),
            B::BitAnd => Some(l & r),
            B::BitXor => Some(l ^ r),
            B::BitOr => Some(l | r),
            B::And | B::Or => Some(i128::from(r != 0)),
        };
        result.ok_or_else(|| overflow(span))
    }

    fn cast(&mut self, type_name: &ast::TypeName<'a>, operand: &ast::Expr<'a>, span: Span) -> Result<i128> {
        let ty = self.type_name(type_name)?;
        let value = match operand.inner() {
            ast::ExprKind::Float(text) => parse_float(text)
                .map(|value| value.trunc() as i128)
                .ok_or_else(|| not_constant(operand.span(), "unsupported floating constant"))?,
            _ => self.eval(operand)?,
        };

        let canonical = self.unit.canonical(ty);
        if let TypeData::Scalar(ast::ScalarSpec::Bool, _) = self.unit.data(canonical) {
            return Ok(i128::from(value != 0));
        }
        if self.unit.is_integer(ty) {
            let layout = self.unit.layout(ty).map_err(|_| sizeof_incomplete(span, "cast"))?;
            return Ok(wrap(value, layout.size * 8, self.unit.is_signed(ty)));
        }
        if self.unit.type_class(ty) == TypeClass::Pointer {
            let bits = self.unit.target.data_model.pointer().size * 8;
            return Ok(wrap(value, bits, false));
        }
        Err(not_constant(
            span,
            format!(
                "cast to `{}` in an integer constant expression",
                self.unit.type_spelling(ty)
            ),
        ))
    }

    /// `sizeof(X)` parses as a type name; `X` may be an enumerator instead.
    fn names_enumerator(&self, type_name: &ast::TypeName<'a>) -> bool {
        let ast::TypeSpecifier::TypedefName(name) = type_name.specifiers.specifier.inner() else {
            return false;
        };
        let declarator = &type_name.declarator;
        matches!(declarator.direct, ast::DirectDeclarator::Abstract)
            && declarator.pointers.is_empty()
            && declarator.suffixes.is_empty()
            && !self.typedefs.contains_key(name)
            && self.constants.contains_key(name)
    }

    fn int_size(&self) -> i128 {
        i128::from(
            self.unit
                .target
                .data_model
                .scalar_layout(ast::ScalarSpec::Int)
                .size,
        )
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    fn annotations(&mut self, attributes: &[Spanned<ast::Attribute>]) -> Vec<String> {
        let mut annotations = Vec::new();
        for attribute in attributes {
            match attribute.inner() {
                ast::Attribute::Annotate(text) => annotations.push(text.clone()),
                ast::Attribute::LayoutAffecting(name) => self.collector.emit(
                    Diagnostic::warning(format!("attribute `{name}` is ignored"))
                        .with_code(ErrorCode::E301)
                        .with_label(attribute.span(), "does not affect the computed layout")
                        .with_help("generated offsets may differ from the compiler's"),
                ),
            }
        }
        annotations
    }

    fn origin(&self, span: Span) -> Origin {
        let (line, column) = self.lines.line_col(span.start());
        Origin::new(self.unit.file.clone(), line, column)
    }
}

fn not_constant(span: Span, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(message)
        .with_code(ErrorCode::E202)
        .with_label(span, "not an integer constant")
}

fn overflow(span: Span) -> Diagnostic {
    not_constant(
        span,
        "overflow or division by zero in a constant expression",
    )
}

fn sizeof_incomplete(span: Span, operator: &str) -> Diagnostic {
    not_constant(
        span,
        format!("invalid application of `{operator}` to an incomplete type"),
    )
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim_end_matches(['f', 'F', 'l', 'L']).parse().ok()
}

/// Truncates `value` to `bits` bits, sign-extending if `signed`.
fn wrap(value: i128, bits: u64, signed: bool) -> i128 {
    if bits == 0 || bits >= 128 {
        return value;
    }
    let modulus = 1i128 << bits;
    let truncated = value.rem_euclid(modulus);
    if signed && truncated >= modulus / 2 {
        truncated - modulus
    } else {
        truncated
    }
}
