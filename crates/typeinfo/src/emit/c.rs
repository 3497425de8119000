//! C backend.
//!
//! Produces a header declaring one `typeinfo_<Name>` object per named type
//! and a source file defining them. Inline descriptors become compound
//! literals at their point of use; named types are referenced by address, so
//! cycles need no special treatment.

use std::fmt::{self, Write};

use log::debug;

use typeinfo_core::{
    builtin::Builtin,
    descriptor::{Aggregate, EnumType, EnumValue, Member, TypeDescriptor, TypeKind, TypeRef},
    graph::GraphEntry,
    identifier::Id,
    qualifier::Qualifiers,
};

use super::{Emitter, Error, RUNTIME_HEADER_NAME};

const INDENT: usize = 2;

/// Generated header and source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSources {
    pub header: String,
    pub source: String,
}

/// Emits descriptors as C definitions.
///
/// # Examples
///
/// ```
/// use typeinfo::emit::{c::CEmitter, emit_graph};
/// use typeinfo_core::graph::TypeGraph;
///
/// let sources = emit_graph(CEmitter::new("out/types.h"), &TypeGraph::new()).unwrap();
/// assert!(sources.header.starts_with("#ifndef TYPES_H_\n#define TYPES_H_\n"));
/// assert!(sources.source.contains("#include \"types.h\""));
/// ```
#[derive(Debug)]
pub struct CEmitter {
    guard: String,
    header: String,
    source: String,
    types: usize,
}

impl CEmitter {
    /// Creates an emitter for the header at `header_path`, including the
    /// built-in descriptor definitions.
    ///
    /// Only the file name of `header_path` is used: it names the include
    /// guard and the `#include` line of the source.
    pub fn new(header_path: &str) -> Self {
        Self::with_builtin_types(header_path, true)
    }

    /// Creates an emitter that optionally omits the built-in descriptors,
    /// e.g. when they are linked from another generated file.
    pub fn with_builtin_types(header_path: &str, builtin_types: bool) -> Self {
        let basename = header_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(header_path)
            .to_string();
        let guard = include_guard(&basename);

        let mut header = format!("#ifndef {guard}\n#define {guard}\n\n#include \"{RUNTIME_HEADER_NAME}\"\n\n");
        let mut source = format!("#include \"{RUNTIME_HEADER_NAME}\"\n#include \"{basename}\"\n\n");
        if builtin_types {
            write_builtin_declarations(&mut header);
            write_builtin_definitions(&mut source);
        }

        Self {
            guard,
            header,
            source,
            types: 0,
        }
    }

    fn write_type(&mut self, name: &str, entry: &GraphEntry) -> fmt::Result {
        let descriptor = &entry.descriptor;
        let origin = entry
            .origin
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        match &descriptor.kind {
            TypeKind::Struct(aggregate) | TypeKind::Union(aggregate) => {
                let (keyword, c_type, tag) = aggregate_names(descriptor);
                writeln!(self.header, "extern {c_type} typeinfo_{name}; // {origin}")?;

                let out = &mut self.source;
                writeln!(out, "// {keyword} {name}")?;
                writeln!(out, "// {origin}")?;
                writeln!(out, "static Type_Info_Member members_{name}[] = {{")?;
                write_members(out, &aggregate.members, INDENT)?;
                writeln!(out, "}};")?;
                write_object(out, name, c_type, tag, descriptor, &aggregate.annotations, "members")
            }
            TypeKind::Enum(enumeration) => {
                writeln!(self.header, "extern Type_Info_Enum typeinfo_{name}; // {origin}")?;

                let out = &mut self.source;
                writeln!(out, "// enum {name}")?;
                writeln!(out, "// {origin}")?;
                writeln!(out, "static Type_Info_Enum_Value values_{name}[] = {{")?;
                write_values(out, &enumeration.values, INDENT)?;
                writeln!(out, "}};")?;
                write_object(
                    out,
                    name,
                    "Type_Info_Enum",
                    "TYPE_TAG_ENUM",
                    descriptor,
                    &enumeration.annotations,
                    "values",
                )
            }
            _ => Err(fmt::Error),
        }
    }
}

impl Emitter for CEmitter {
    type Output = CSources;

    fn emit_type(&mut self, name: Id, entry: &GraphEntry) -> Result<(), Error> {
        let name = name.to_name();
        self.write_type(&name, entry).map_err(|_| {
            Error::Format(format!(
                "`{name}` has kind `{}` and cannot be a top-level descriptor",
                entry.descriptor.kind_name()
            ))
        })?;
        self.types += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<CSources, Error> {
        self.header.push_str(&format!("\n#endif // {}\n", self.guard));
        debug!(types = self.types; "C sources generated");
        Ok(CSources {
            header: self.header,
            source: self.source,
        })
    }
}

/// `print_types_typeinfo.h` becomes `PRINT_TYPES_TYPEINFO_H_`.
fn include_guard(basename: &str) -> String {
    let mut guard: String = basename
        .chars()
        .map(|c| match c {
            '.' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    guard.push('_');
    guard
}

fn builtin_c_type(builtin: Builtin) -> &'static str {
    match builtin.descriptor().kind {
        TypeKind::Void => "Type_Info_Void",
        TypeKind::Float => "Type_Info_Float",
        _ => "Type_Info_Integer",
    }
}

fn write_builtin_declarations(out: &mut String) {
    for builtin in Builtin::ALL {
        out.push_str(&format!(
            "extern {} typeinfo_{};\n",
            builtin_c_type(builtin),
            builtin.symbol()
        ));
    }
    out.push('\n');
}

/// Definitions measure the types with the compiler that builds them, so the
/// generated file stays correct for that target.
fn write_builtin_definitions(out: &mut String) {
    for builtin in Builtin::ALL {
        let c_name = builtin.c_name();
        let symbol = builtin.symbol();
        let line = match builtin.descriptor().kind {
            TypeKind::Void => format!("Type_Info_Void typeinfo_{symbol} = {{{{ TYPE_TAG_VOID, 0, 0 }}}};"),
            TypeKind::Float => format!(
                "Type_Info_Float typeinfo_{symbol} = {{{{ TYPE_TAG_FLOAT, sizeof({c_name}), TYPEINFO_ALIGNOF({c_name}) }}}};"
            ),
            TypeKind::Integer { is_signed } => {
                let signed = if builtin == Builtin::Char {
                    "(char)-1 < 0"
                } else if is_signed {
                    "1"
                } else {
                    "0"
                };
                format!(
                    "Type_Info_Integer typeinfo_{symbol} = {{{{ TYPE_TAG_INTEGER, sizeof({c_name}), TYPEINFO_ALIGNOF({c_name}) }}, {signed}}};"
                )
            }
            _ => continue,
        };
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
}

fn aggregate_names(descriptor: &TypeDescriptor) -> (&'static str, &'static str, &'static str) {
    match descriptor.kind {
        TypeKind::Union(_) => ("union", "Type_Info_Union", "TYPE_TAG_UNION"),
        _ => ("struct", "Type_Info_Struct", "TYPE_TAG_STRUCT"),
    }
}

fn write_object(
    out: &mut String,
    name: &str,
    c_type: &str,
    tag: &str,
    descriptor: &TypeDescriptor,
    annotations: &[String],
    array: &str,
) -> fmt::Result {
    writeln!(out, "{c_type} typeinfo_{name} = {{")?;
    writeln!(
        out,
        "  {{ {tag}, {}, {} }},",
        descriptor.size(),
        descriptor.alignment()
    )?;
    writeln!(out, "  {},", annotation_list(annotations))?;
    writeln!(out, "  {},", string_literal(name))?;
    writeln!(out, "  {array}_{name},")?;
    writeln!(out, "  sizeof({array}_{name})/sizeof(*{array}_{name})")?;
    writeln!(out, "}};\n")
}

fn write_members(out: &mut String, members: &[Member], indent: usize) -> fmt::Result {
    for member in members {
        write!(
            out,
            "{:indent$}{{ {}, {}, {}, ",
            "",
            annotation_list(&member.annotations),
            string_literal(&member.name),
            member.offset
        )?;
        write_type_ref(out, &member.ty, indent)?;
        writeln!(out, ", {} }},", qualifier_flags(member.qualifiers))?;
    }
    Ok(())
}

fn write_values(out: &mut String, values: &[EnumValue], indent: usize) -> fmt::Result {
    for value in values {
        writeln!(
            out,
            "{:indent$}{{ {}, {}, {} }},",
            "",
            annotation_list(&value.annotations),
            string_literal(&value.name),
            value.value
        )?;
    }
    Ok(())
}

/// Writes a `Type_Info*` expression for `ty`. Nested member lines are
/// indented relative to `indent`, the indentation of the enclosing line.
fn write_type_ref(out: &mut String, ty: &TypeRef, indent: usize) -> fmt::Result {
    match ty {
        TypeRef::Builtin(builtin) => write!(out, "(Type_Info*)&typeinfo_{}", builtin.symbol()),
        TypeRef::Named(name) => write!(out, "(Type_Info*)&typeinfo_{name}"),
        TypeRef::Inline(descriptor) => write_inline(out, descriptor, indent),
    }
}

fn write_inline(out: &mut String, descriptor: &TypeDescriptor, indent: usize) -> fmt::Result {
    let size = descriptor.size();
    let alignment = descriptor.alignment();

    match &descriptor.kind {
        TypeKind::Array { element, count } => {
            write!(
                out,
                "(Type_Info*)&(Type_Info_Array){{{{TYPE_TAG_ARRAY, {size}, {alignment}}}, {count}, "
            )?;
            write_type_ref(out, element, indent)?;
            write!(out, " }}")
        }
        TypeKind::Pointer {
            pointee,
            pointee_qualifiers,
        } => {
            write!(
                out,
                "(Type_Info*)&(Type_Info_Pointer){{{{TYPE_TAG_POINTER, {size}, {alignment}}}, "
            )?;
            match pointee {
                Some(pointee) => write_type_ref(out, pointee, indent)?,
                None => out.push_str("NULL"),
            }
            write!(out, ", {} }}", qualifier_flags(*pointee_qualifiers))
        }
        TypeKind::Struct(Aggregate {
            annotations,
            members,
            ..
        })
        | TypeKind::Union(Aggregate {
            annotations,
            members,
            ..
        }) => {
            let (_, c_type, tag) = aggregate_names(descriptor);
            writeln!(
                out,
                "(Type_Info*)&({c_type}){{{{{tag}, {size}, {alignment}}}, {}, \"\", (Type_Info_Member[]){{",
                annotation_list(annotations)
            )?;
            write_members(out, members, indent + INDENT)?;
            write!(out, "{:indent$}}}, {} }}", "", members.len())
        }
        TypeKind::Enum(EnumType {
            annotations, values, ..
        }) => {
            writeln!(
                out,
                "(Type_Info*)&(Type_Info_Enum){{{{TYPE_TAG_ENUM, {size}, {alignment}}}, {}, \"\", (Type_Info_Enum_Value[]){{",
                annotation_list(annotations)
            )?;
            write_values(out, values, indent + INDENT)?;
            write!(out, "{:indent$}}}, {} }}", "", values.len())
        }
        // A built-in measured for a target other than the host.
        TypeKind::Integer { is_signed } => write!(
            out,
            "(Type_Info*)&(Type_Info_Integer){{{{TYPE_TAG_INTEGER, {size}, {alignment}}}, {} }}",
            u8::from(*is_signed)
        ),
        TypeKind::Float => write!(
            out,
            "(Type_Info*)&(Type_Info_Float){{{{TYPE_TAG_FLOAT, {size}, {alignment}}} }}"
        ),
        TypeKind::Void => out.write_str("(Type_Info*)&typeinfo_void"),
    }
}

/// `(char*[]){ "A", "B", NULL }`
fn annotation_list(annotations: &[String]) -> String {
    let mut list = String::from("(char*[]){ ");
    for annotation in annotations {
        list.push_str(&string_literal(annotation));
        list.push_str(", ");
    }
    list.push_str("NULL }");
    list
}

fn string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\t' => literal.push_str("\\t"),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

fn qualifier_flags(qualifiers: Qualifiers) -> String {
    if qualifiers.is_empty() {
        return "TYPE_INFO_QUALIFIER_NONE".to_string();
    }
    qualifiers
        .keywords()
        .map(|keyword| format!("TYPE_INFO_QUALIFIER_{}", keyword.to_ascii_uppercase()))
        .collect::<Vec<_>>()
        .join(" | ")
}
