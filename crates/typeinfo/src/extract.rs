//! Graph extraction engine.
//!
//! Extraction runs in two phases over one source unit:
//!
//! 1. [`Extractor::discover_roots`] walks every declaration and queues the
//!    ones carrying the root marker.
//! 2. [`Extractor::drain`] builds a descriptor for each queued type. Field
//!    types are resolved recursively: arrays, pointers, and anonymous
//!    aggregates are built inline, while named aggregates are queued and
//!    referenced by name. A type is marked visited before its members are
//!    resolved, so self-referential and mutually referencing types terminate.

pub mod session;

use log::{debug, info, trace, warn};

use typeinfo_core::{
    builtin::Builtin,
    descriptor::{Aggregate, EnumType, EnumValue, Layout, Member, TypeDescriptor, TypeKind, TypeRef},
    graph::TypeGraph,
    identifier::Id,
    provider::{DeclKind, LayoutError, ROOT_MARKER, TypeClass, TypeProvider},
    qualifier::Qualifiers,
};

use crate::error::ExtractError;

use session::Session;

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Annotation that marks a declaration as a root. It is removed from the
    /// annotations recorded in descriptors.
    pub root_marker: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            root_marker: ROOT_MARKER.to_string(),
        }
    }
}

/// Extracts the type graph of one unit with a fresh session.
///
/// # Errors
///
/// Returns an [`ExtractError`] if a reachable field has no byte offset or a
/// reachable type has no layout.
pub fn extract<P: TypeProvider>(provider: &P, config: &ExtractConfig) -> Result<TypeGraph, ExtractError> {
    let mut extractor = Extractor::new(provider, config);
    extractor.discover_roots();
    extractor.drain()?;
    Ok(extractor.into_graph())
}

/// Extraction state bound to one provider.
pub struct Extractor<'p, P: TypeProvider> {
    provider: &'p P,
    config: &'p ExtractConfig,
    session: Session<P::Type>,
    graph: TypeGraph,
}

impl<'p, P: TypeProvider> Extractor<'p, P> {
    pub fn new(provider: &'p P, config: &'p ExtractConfig) -> Self {
        Self {
            provider,
            config,
            session: Session::new(),
            graph: TypeGraph::new(),
        }
    }

    pub fn session(&self) -> &Session<P::Type> {
        &self.session
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn into_graph(self) -> TypeGraph {
        self.graph
    }

    // ============================================================================
    // Root Discovery
    // ============================================================================

    /// Queues every root declaration of the unit in discovery order.
    ///
    /// Nested declarations are visited whether or not their parent is a
    /// root.
    pub fn discover_roots(&mut self) {
        let mut stack: Vec<P::Decl> = self.provider.declarations();
        stack.reverse();

        while let Some(decl) = stack.pop() {
            if self.is_root(decl) {
                let ty = self.provider.decl_type(decl);
                trace!(name = self.provider.decl_name(decl).unwrap_or_default(); "Queued root");
                self.session.pending.push(ty);
            }
            let mut children = self.provider.children(decl);
            children.reverse();
            stack.extend(children);
        }

        info!(roots = self.session.pending.len(); "Root discovery finished");
    }

    fn is_root(&self, decl: P::Decl) -> bool {
        let provider = self.provider;
        let kind = provider.decl_kind(decl);
        matches!(
            kind,
            DeclKind::Struct | DeclKind::Union | DeclKind::Enum | DeclKind::Typedef
        ) && provider
            .annotations(decl)
            .iter()
            .any(|annotation| *annotation == self.config.root_marker)
            && provider.is_definition(decl)
            && provider.decl_name(decl).is_some()
            && provider.size_of(provider.decl_type(decl)).is_ok()
    }

    // ============================================================================
    // Queue Draining
    // ============================================================================

    /// Processes queued types until the queue is exhausted, including types
    /// queued while processing.
    ///
    /// # Errors
    ///
    /// Stops at the first type whose descriptor cannot be built.
    pub fn drain(&mut self) -> Result<(), ExtractError> {
        while let Some(ty) = self.session.pending.next() {
            self.process(ty)?;
        }
        debug!(
            processed = self.session.pending.processed(),
            emitted = self.graph.len();
            "Queue drained"
        );
        Ok(())
    }

    fn process(&mut self, ty: P::Type) -> Result<(), ExtractError> {
        let provider = self.provider;
        let canonical = provider.canonical(ty);
        let Some(decl) = provider.type_declaration(canonical) else {
            return Ok(());
        };
        let Some(name) = provider.decl_name(decl) else {
            return Ok(());
        };
        if provider.size_of(canonical).is_err() {
            debug!(name; "Skipping incomplete type");
            return Ok(());
        }
        if !matches!(
            provider.decl_kind(decl),
            DeclKind::Struct | DeclKind::Union | DeclKind::Enum
        ) {
            return Ok(());
        }

        let id = Id::new(name);
        if !self.session.visited.insert(id) {
            return Ok(());
        }

        debug!(name; "Building descriptor");
        let descriptor = self.build(canonical, decl)?;
        self.graph.insert(id, descriptor, provider.origin(decl));
        Ok(())
    }

    // ============================================================================
    // Descriptors
    // ============================================================================

    /// Builds the descriptor of a record or enum declaration.
    fn build(&mut self, ty: P::Type, decl: P::Decl) -> Result<TypeDescriptor, ExtractError> {
        let layout = self.layout(ty)?;
        let name = self.provider.decl_name(decl).unwrap_or_default().to_string();
        let annotations = self.annotations(decl);

        let kind = match self.provider.decl_kind(decl) {
            DeclKind::Enum => TypeKind::Enum(EnumType {
                name,
                annotations,
                values: self.enum_values(decl),
            }),
            DeclKind::Union => TypeKind::Union(Aggregate {
                members: self.members(decl, &name)?,
                name,
                annotations,
            }),
            _ => TypeKind::Struct(Aggregate {
                members: self.members(decl, &name)?,
                name,
                annotations,
            }),
        };
        Ok(TypeDescriptor::new(layout, kind))
    }

    fn members(&mut self, record: P::Decl, record_name: &str) -> Result<Vec<Member>, ExtractError> {
        let provider = self.provider;
        let mut members = Vec::new();

        for field in provider.fields(record) {
            let name = provider.decl_name(field).unwrap_or_default().to_string();
            let offset_bits =
                provider
                    .field_offset_bits(field)
                    .map_err(|reason| ExtractError::FieldOffset {
                        field: name.clone(),
                        record: display_name(record_name),
                        reason,
                    })?;

            // Qualifiers come from the declared type; resolution works on
            // the canonical one.
            let declared = provider.decl_type(field);
            let ty = self.resolve(declared)?;
            members.push(Member {
                annotations: self.annotations(field),
                name,
                offset: offset_bits / 8,
                ty,
                qualifiers: provider.qualifiers(declared),
            });
        }

        Ok(members)
    }

    fn enum_values(&self, decl: P::Decl) -> Vec<EnumValue> {
        let provider = self.provider;
        provider
            .enumerators(decl)
            .into_iter()
            .map(|enumerator| EnumValue {
                annotations: self.annotations(enumerator),
                name: provider.decl_name(enumerator).unwrap_or_default().to_string(),
                value: provider.enumerator_value(enumerator),
            })
            .collect()
    }

    /// Resolves a field or element type to a reference.
    pub fn resolve(&mut self, ty: P::Type) -> Result<TypeRef, ExtractError> {
        let provider = self.provider;
        let canonical = provider.canonical(ty);

        match provider.type_class(canonical) {
            TypeClass::Builtin(builtin) => self.builtin(canonical, builtin),
            TypeClass::Array => {
                let layout = self.layout(canonical)?;
                let count = provider.array_len(canonical).unwrap_or(0);
                let element = self.resolve_element(canonical)?;
                Ok(TypeRef::inline(TypeDescriptor::new(
                    layout,
                    TypeKind::Array { element, count },
                )))
            }
            TypeClass::IncompleteArray => {
                let alignment = provider
                    .element(canonical)
                    .and_then(|element| provider.align_of(element).ok())
                    .unwrap_or(0);
                let element = self.resolve_element(canonical)?;
                Ok(TypeRef::inline(TypeDescriptor::new(
                    Layout::new(0, alignment),
                    TypeKind::Array { element, count: 0 },
                )))
            }
            TypeClass::Pointer => {
                let layout = self.layout(canonical)?;
                let (pointee, pointee_qualifiers) = match provider.pointee(canonical) {
                    Some(pointee) => {
                        let qualifiers = provider.qualifiers(pointee);
                        let target = if provider.type_class(pointee) == TypeClass::Function {
                            None
                        } else {
                            Some(self.resolve(pointee)?)
                        };
                        (target, qualifiers)
                    }
                    None => (None, Qualifiers::NONE),
                };
                Ok(TypeRef::inline(TypeDescriptor::new(
                    layout,
                    TypeKind::Pointer {
                        pointee,
                        pointee_qualifiers,
                    },
                )))
            }
            TypeClass::Record | TypeClass::Enum => {
                let Some(decl) = provider.type_declaration(canonical) else {
                    return Ok(self.opaque(canonical));
                };
                match provider.decl_name(decl) {
                    None => self.build(canonical, decl).map(TypeRef::inline),
                    Some(name) => {
                        let id = Id::new(name);
                        self.session.enqueue_unseen(id, canonical);
                        Ok(TypeRef::Named(id))
                    }
                }
            }
            TypeClass::Function | TypeClass::Other => Ok(self.opaque(canonical)),
        }
    }

    /// Refers to a built-in by name when the target lays it out like the
    /// host does, otherwise describes it inline with the target's layout.
    ///
    /// Plain `char` always stays shared: it is one byte everywhere, and its
    /// signedness is a rendering setting.
    fn builtin(&self, ty: P::Type, builtin: Builtin) -> Result<TypeRef, ExtractError> {
        if matches!(builtin, Builtin::Void | Builtin::Char) {
            return Ok(TypeRef::Builtin(builtin));
        }
        let host = builtin.descriptor();
        let layout = self.layout(ty)?;
        if layout == host.layout {
            return Ok(TypeRef::Builtin(builtin));
        }
        trace!(builtin:% = builtin, size = layout.size, alignment = layout.alignment; "Target layout differs from host");
        Ok(TypeRef::inline(TypeDescriptor::new(layout, host.kind.clone())))
    }

    fn resolve_element(&mut self, array: P::Type) -> Result<TypeRef, ExtractError> {
        match self.provider.element(array) {
            Some(element) => self.resolve(element),
            None => Ok(self.opaque(array)),
        }
    }

    /// Refers to a type without a descriptor of its own by its spelling.
    fn opaque(&mut self, ty: P::Type) -> TypeRef {
        let spelling = self.provider.type_spelling(ty);
        let id = Id::new(&symbol_name(&spelling));
        if self.session.note_opaque(id) {
            warn!(type_name = spelling; "Type has no descriptor, referencing it by name");
        }
        TypeRef::Named(id)
    }

    fn layout(&self, ty: P::Type) -> Result<Layout, ExtractError> {
        let provider = self.provider;
        let error = |reason: LayoutError| ExtractError::Layout {
            name: provider.type_spelling(ty),
            reason,
        };
        let size = provider.size_of(ty).map_err(error)?;
        let alignment = provider.align_of(ty).map_err(error)?;
        Ok(Layout::new(size, alignment))
    }

    /// Annotations of `decl` without the root marker, in attachment order.
    fn annotations(&self, decl: P::Decl) -> Vec<String> {
        self.provider
            .annotations(decl)
            .into_iter()
            .filter(|annotation| *annotation != self.config.root_marker)
            .collect()
    }
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        "(anonymous)".to_string()
    } else {
        name.to_string()
    }
}

/// Turns a type spelling into an identifier, e.g. `_Complex double` into
/// `_Complex_double`.
fn symbol_name(spelling: &str) -> String {
    spelling
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}


#[cfg(test)]
mod extraction_tests {
    use super::*;

    use typeinfo_parser::{DataModel, TargetConfig, Unit, parse};

    fn unit(source: &str) -> Unit {
        parse(source, "types.h", TargetConfig::new(DataModel::Lp64, true))
            .unwrap_or_else(|err| panic!("{err}"))
    }

    fn extract_source(source: &str) -> TypeGraph {
        extract(&unit(source), &ExtractConfig::default()).unwrap_or_else(|err| panic!("{err}"))
    }

    fn names(graph: &TypeGraph) -> Vec<String> {
        graph.iter().map(|(name, _)| name.to_name()).collect()
    }

    fn aggregate<'a>(graph: &'a TypeGraph, name: &str) -> &'a Aggregate {
        match &graph.get_by_name(name).expect("type in graph").descriptor.kind {
            TypeKind::Struct(aggregate) | TypeKind::Union(aggregate) => aggregate,
            kind => panic!("{name} is not an aggregate: {kind:?}"),
        }
    }

    fn inline(ty: &TypeRef) -> &TypeDescriptor {
        match ty {
            TypeRef::Inline(descriptor) => descriptor,
            other => panic!("expected an inline descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_named_types_are_reached_breadth_first() {
        let graph = extract_source(
            r#"
            typedef struct { long id; } Baz;
            typedef struct { unsigned long x; Baz baz[3]; } Bar;
            typedef struct TI_ROOT {
                const char name[256] TI_ANN(CStr);
                int test;
                Bar* bar;
            } Foo;
            typedef struct { int unused; } Unreferenced;
            "#,
        );

        assert_eq!(names(&graph), ["Foo", "Bar", "Baz"]);

        let foo = graph.get_by_name("Foo").expect("root emitted");
        assert_eq!(foo.descriptor.layout, Layout::new(272, 8));
        assert!(foo.descriptor.annotations().is_empty());
        assert_eq!(foo.origin.as_ref().map(|o| o.line), Some(4));

        let members = &aggregate(&graph, "Foo").members;
        assert_eq!(members[0].annotations, ["CStr"]);
        assert_eq!(members[0].qualifiers, Qualifiers::CONST);
        assert_eq!(
            inline(&members[0].ty).kind,
            TypeKind::Array {
                element: TypeRef::Builtin(Builtin::Char),
                count: 256
            }
        );
        assert_eq!(members[1].offset, 256);
        assert_eq!(members[2].offset, 264);
        assert_eq!(
            inline(&members[2].ty).kind,
            TypeKind::Pointer {
                pointee: Some(TypeRef::Named(Id::new("Bar"))),
                pointee_qualifiers: Qualifiers::NONE,
            }
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let graph = extract_source(
            r#"
            struct TI_ROOT Node {
                int value;
                struct Node* next;
                struct Node* children[2];
            };
            "#,
        );

        assert_eq!(names(&graph), ["Node"]);
        let members = &aggregate(&graph, "Node").members;
        let next = inline(&members[1].ty);
        assert_eq!(next.layout, Layout::new(8, 8));
        assert!(matches!(
            &next.kind,
            TypeKind::Pointer { pointee: Some(TypeRef::Named(name)), .. } if *name == "Node"
        ));
    }

    #[test]
    fn test_mutual_references_emit_each_once() {
        let graph = extract_source(
            r#"
            struct B;
            struct TI_ROOT A { struct B* b; };
            struct TI_ROOT B { struct A* a; struct A value; };
            "#,
        );
        assert_eq!(names(&graph), ["A", "B"]);

        let points_to = |ty: &TypeRef, target: &str| {
            matches!(
                &inline(ty).kind,
                TypeKind::Pointer { pointee: Some(TypeRef::Named(name)), .. } if *name == target
            )
        };
        assert!(points_to(&aggregate(&graph, "A").members[0].ty, "B"));

        let b = &aggregate(&graph, "B").members;
        assert!(points_to(&b[0].ty, "A"));
        assert_eq!(b[1].ty, TypeRef::Named(Id::new("A")));
        assert_eq!(b[1].offset, 8);
    }

    #[test]
    fn test_identical_anonymous_members_stay_separate() {
        let unit = unit(
            r#"
            struct TI_ROOT Twins {
                struct { int x; } left;
                struct { int x; } right;
            };
            "#,
        );
        let config = ExtractConfig::default();
        let mut extractor = Extractor::new(&unit, &config);
        extractor.discover_roots();
        extractor.drain().expect("drains");

        let graph = extractor.graph();
        assert_eq!(names(graph), ["Twins"]);
        let members = &aggregate(graph, "Twins").members;
        let left = inline(&members[0].ty);
        let right = inline(&members[1].ty);
        assert_eq!(left, right);
        assert!(!std::ptr::eq(left, right));
        assert_eq!(members[1].offset, 4);

        assert_eq!(extractor.session().visited.len(), 1);
        assert!(extractor.session().visited.contains(Id::new("Twins")));
    }

    // Host layouts below are those of 64-bit Unix.
    #[cfg(all(target_pointer_width = "64", unix))]
    #[test]
    fn test_builtins_follow_target_layout() {
        let unit = parse(
            "struct TI_ROOT Pair { long a; unsigned long b; char c; int d; long double e; };",
            "types.h",
            TargetConfig::new(DataModel::Ilp32, false),
        )
        .unwrap_or_else(|err| panic!("{err}"));
        let graph = extract(&unit, &ExtractConfig::default()).expect("extracts");

        let pair = graph.get_by_name("Pair").expect("emitted");
        assert_eq!(pair.descriptor.layout, Layout::new(28, 4));

        let members = &aggregate(&graph, "Pair").members;
        let a = inline(&members[0].ty);
        assert_eq!(a.layout, Layout::new(4, 4));
        assert_eq!(a.kind, TypeKind::Integer { is_signed: true });
        assert_eq!(members[1].offset, 4);
        assert_eq!(inline(&members[1].ty).kind, TypeKind::Integer { is_signed: false });

        // Same on both sides, so still shared.
        assert_eq!(members[2].ty, TypeRef::Builtin(Builtin::Char));
        assert_eq!(members[3].ty, TypeRef::Builtin(Builtin::Int));

        let e = inline(&members[4].ty);
        assert_eq!(e.layout, Layout::new(12, 4));
        assert_eq!(e.kind, TypeKind::Float);
    }

    #[test]
    fn test_opaque_and_incomplete_types_are_queued_once() {
        let unit = unit(
            r#"
            typedef struct TI_ROOT {
                FILE* input;
                FILE* output;
                struct Hidden* first;
                struct Hidden* second;
            } Streams;
            "#,
        );
        let config = ExtractConfig::default();
        let mut extractor = Extractor::new(&unit, &config);
        extractor.discover_roots();
        extractor.drain().expect("drains");

        // The root and `Hidden`; `FILE` has nothing to build.
        assert_eq!(extractor.session().pending.len(), 2);
        assert!(extractor.session().queued.contains(Id::new("FILE")));
        assert!(extractor.session().queued.contains(Id::new("Hidden")));
        assert_eq!(names(extractor.graph()), ["Streams"]);
    }

    #[test]
    fn test_anonymous_members_are_inlined() {
        let graph = extract_source(
            r#"
            typedef struct TI_ROOT {
                int before;
                struct {
                    union {
                        int x TI_ANN(X1);
                        int y TI_ANN(Y1);
                    };
                };
                enum { ANON_A, ANON_B } kind;
                int after;
            } Outer;
            "#,
        );

        assert_eq!(names(&graph), ["Outer"]);
        let members = &aggregate(&graph, "Outer").members;
        assert_eq!(members.len(), 4);
        assert_eq!(members[1].name, "");
        assert_eq!(members[1].offset, 4);

        let TypeKind::Struct(wrapper) = &inline(&members[1].ty).kind else {
            panic!("anonymous struct expected");
        };
        assert_eq!(wrapper.name, "");
        let TypeKind::Union(union) = &inline(&wrapper.members[0].ty).kind else {
            panic!("anonymous union expected");
        };
        assert_eq!(union.members[1].annotations, ["Y1"]);

        let TypeKind::Enum(kind) = &inline(&members[2].ty).kind else {
            panic!("anonymous enum expected");
        };
        assert_eq!(kind.values.len(), 2);
        assert_eq!(kind.values[1].value, 1);
        assert_eq!(members[3].offset, 12);
    }

    #[test]
    fn test_enum_root() {
        let graph = extract_source(
            r#"
            typedef enum TI_ROOT TI_ANN(Palette) {
                COLOR_RED TI_ANN(Primary) TI_ANN(Secondary),
                COLOR_GREEN = 5,
                COLOR_ALIAS = COLOR_RED,
            } Color;
            "#,
        );

        let entry = graph.get_by_name("Color").expect("enum root emitted");
        assert_eq!(entry.descriptor.layout, Layout::new(4, 4));
        let TypeKind::Enum(color) = &entry.descriptor.kind else {
            panic!("enum expected");
        };
        assert_eq!(color.annotations, ["Palette"]);
        let values: Vec<(&str, i64)> = color
            .values
            .iter()
            .map(|value| (value.name.as_str(), value.value))
            .collect();
        assert_eq!(values, [("COLOR_RED", 0), ("COLOR_GREEN", 5), ("COLOR_ALIAS", 0)]);
        assert_eq!(color.values[0].annotations, ["Primary", "Secondary"]);
    }

    #[test]
    fn test_qualifiers_come_from_declared_types() {
        let graph = extract_source(
            r#"
            typedef const int cint;
            typedef struct TI_ROOT {
                const int ci;
                volatile int vi;
                const char* cstr;
                char* const fixed;
                cint via_typedef;
                char* restrict unique;
            } Quals;
            "#,
        );

        let members = &aggregate(&graph, "Quals").members;
        let slot: Vec<Qualifiers> = members.iter().map(|member| member.qualifiers).collect();
        assert_eq!(
            slot,
            [
                Qualifiers::CONST,
                Qualifiers::VOLATILE,
                Qualifiers::NONE,
                Qualifiers::CONST,
                Qualifiers::CONST,
                Qualifiers::RESTRICT,
            ]
        );
        assert_eq!(members[4].ty, TypeRef::Builtin(Builtin::Int));

        let TypeKind::Pointer {
            pointee_qualifiers, ..
        } = inline(&members[2].ty).kind
        else {
            panic!("pointer expected");
        };
        assert_eq!(pointee_qualifiers, Qualifiers::CONST);
    }

    #[test]
    fn test_function_pointer_and_flexible_array() {
        let graph = extract_source(
            r#"
            typedef struct TI_ROOT {
                int (*callback)(int, char*);
                unsigned long count;
                double samples[];
            } Packet;
            "#,
        );

        let members = &aggregate(&graph, "Packet").members;
        assert_eq!(
            inline(&members[0].ty).kind,
            TypeKind::Pointer {
                pointee: None,
                pointee_qualifiers: Qualifiers::NONE
            }
        );
        let samples = inline(&members[2].ty);
        assert_eq!(samples.layout, Layout::new(0, 8));
        assert_eq!(
            samples.kind,
            TypeKind::Array {
                element: TypeRef::Builtin(Builtin::Double),
                count: 0
            }
        );
        assert_eq!(members[2].offset, 16);
    }

    #[test]
    fn test_unknown_type_is_referenced_by_name() {
        let graph = extract_source(
            r#"
            typedef struct TI_ROOT {
                FILE* stream;
                struct Hidden* hidden;
            } Handle;
            "#,
        );

        assert_eq!(names(&graph), ["Handle"]);
        let members = &aggregate(&graph, "Handle").members;
        assert!(matches!(
            &inline(&members[0].ty).kind,
            TypeKind::Pointer { pointee: Some(TypeRef::Named(name)), .. } if *name == "FILE"
        ));
        assert!(matches!(
            &inline(&members[1].ty).kind,
            TypeKind::Pointer { pointee: Some(TypeRef::Named(name)), .. } if *name == "Hidden"
        ));
    }

    #[test]
    fn test_non_roots_and_incomplete_roots_are_ignored() {
        let graph = extract_source(
            r#"
            struct TI_ROOT Forward;
            struct Plain { int x; };
            "#,
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_custom_root_marker() {
        let unit = unit(
            r#"
            struct TI_ANN(Reflect) Picked { int x; };
            struct TI_ROOT Skipped { int y; };
            "#,
        );
        let config = ExtractConfig {
            root_marker: "Reflect".to_string(),
        };
        let graph = extract(&unit, &config).expect("extracts");

        assert_eq!(names(&graph), ["Picked"]);
        assert!(graph.get_by_name("Picked").expect("emitted").descriptor.annotations().is_empty());
    }

    #[test]
    fn test_bit_field_aborts_with_field_name() {
        let err = extract(
            &unit(
                r#"
                struct TI_ROOT Flags {
                    int ready;
                    unsigned mode : 3;
                };
                "#,
            ),
            &ExtractConfig::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ExtractError::FieldOffset {
                field: "mode".to_string(),
                record: "Flags".to_string(),
                reason: LayoutError::BitField,
            }
        );
    }

    #[test]
    fn test_session_tracks_work() {
        let unit = unit(
            r#"
            struct Leaf { int v; };
            struct TI_ROOT Root { struct Leaf a; struct Leaf b; };
            "#,
        );
        let config = ExtractConfig::default();
        let mut extractor = Extractor::new(&unit, &config);

        extractor.discover_roots();
        assert_eq!(extractor.session().pending.len(), 1);

        extractor.drain().expect("drains");
        assert_eq!(extractor.session().visited.len(), 2);
        assert_eq!(extractor.session().pending.processed(), extractor.session().pending.len());
        assert_eq!(extractor.graph().len(), 2);
    }
}
