//! Generic value renderer.
//!
//! Given an address, a descriptor, and an indentation level, the renderer
//! reconstructs the value's structure from raw memory and prints it as text.
//! It never fails: null descriptors, null addresses, unsupported sizes, and
//! unreadable memory all degrade to placeholder text, so it is safe to point
//! at foreign or corrupted data.
//!
//! # Output format
//!
//! Every rendered value ends with a newline. Nested lines are indented two
//! spaces deeper than their container; the first line of a value is not
//! indented (the caller has already positioned it).
//!
//! ```text
//! struct Foo {
//!   const name = "ciao"
//!   test = 2
//!   bar = 0x5581a2c0 -> struct Bar {
//!     x = 5
//!   }
//! }
//! ```

use std::fmt::{self, Write};

use crate::{
    builtin::{Builtin, CHAR_IS_SIGNED, LONG_DOUBLE_FORMAT, LongDoubleFormat},
    descriptor::{Aggregate, EnumType, Member, TypeDescriptor, TypeKind, TypeRef},
    graph::TypeGraph,
    memory::{MemorySource, read_signed, read_unsigned},
};

/// Annotation that makes a `char*` or `char[]` member render as a quoted
/// string.
pub const DEFAULT_TEXT_ANNOTATION: &str = "CStr";

/// Upper bound on bytes read for a text member without a known length.
pub const MAX_TEXT_LEN: usize = 4096;

/// Number of pointers followed along one chain before only addresses are
/// printed. Self-referential data in live memory would otherwise recurse
/// without end.
pub const MAX_POINTER_DEPTH: usize = 16;

/// Renders values of types described by a [`TypeGraph`].
///
/// # Examples
///
/// ```
/// use typeinfo_core::{
///     builtin::Builtin, descriptor::TypeRef, graph::TypeGraph, memory::ByteImage,
///     render::Renderer,
/// };
///
/// let graph = TypeGraph::new();
/// let image = ByteImage::new(0x1000, 42i32.to_ne_bytes().to_vec());
/// let renderer = Renderer::new(&graph, image);
///
/// let text = renderer.render(0x1000, Some(&TypeRef::Builtin(Builtin::Int)), 0);
/// assert_eq!(text, "42\n");
/// ```
#[derive(Debug)]
pub struct Renderer<'g, M> {
    graph: &'g TypeGraph,
    memory: M,
    text_annotation: String,
    char_signed: bool,
}

impl<'g, M: MemorySource> Renderer<'g, M> {
    /// Creates a renderer resolving by-name references through `graph` and
    /// reading values from `memory`.
    pub fn new(graph: &'g TypeGraph, memory: M) -> Self {
        Self {
            graph,
            memory,
            text_annotation: DEFAULT_TEXT_ANNOTATION.to_string(),
            char_signed: CHAR_IS_SIGNED,
        }
    }

    /// Replaces the annotation that selects text rendering.
    pub fn with_text_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.text_annotation = annotation.into();
        self
    }

    /// Sets whether plain `char` values are read as signed. Defaults to the
    /// host's signedness.
    pub fn with_char_signed(mut self, char_signed: bool) -> Self {
        self.char_signed = char_signed;
        self
    }

    /// Renders the value at `addr` described by `ty`.
    ///
    /// A `None` type, or a by-name reference missing from the graph, renders
    /// as `<null typeinfo>`.
    pub fn render(&self, addr: u64, ty: Option<&TypeRef>, indent: usize) -> String {
        let descriptor = ty.and_then(|ty| self.graph.resolve(ty));
        self.render_optional(addr, descriptor, indent)
    }

    /// Renders the value at `addr` described by `descriptor`.
    pub fn render_descriptor(&self, addr: u64, descriptor: &TypeDescriptor, indent: usize) -> String {
        self.render_optional(addr, Some(descriptor), indent)
    }

    /// Renders the value at `addr` into `out`.
    ///
    /// # Errors
    ///
    /// Only propagates errors returned by `out`.
    pub fn render_to(
        &self,
        out: &mut impl Write,
        addr: u64,
        descriptor: Option<&TypeDescriptor>,
        indent: usize,
    ) -> fmt::Result {
        self.write_value(out, addr, descriptor, indent, 0)
    }

    fn render_optional(&self, addr: u64, descriptor: Option<&TypeDescriptor>, indent: usize) -> String {
        let mut out = String::new();
        // Writing into a String never fails.
        let _ = self.write_value(&mut out, addr, descriptor, indent, 0);
        out
    }

    fn write_value(
        &self,
        out: &mut impl Write,
        addr: u64,
        descriptor: Option<&TypeDescriptor>,
        indent: usize,
        depth: usize,
    ) -> fmt::Result {
        let Some(desc) = descriptor else {
            return writeln!(out, "<null typeinfo>");
        };
        if addr == 0 {
            return writeln!(out, "<null value>");
        }

        match &desc.kind {
            TypeKind::Void => writeln!(out, "void"),
            TypeKind::Integer { .. } if is_plain_char(desc) => {
                self.write_integer(out, addr, desc, self.char_signed)
            }
            TypeKind::Integer { is_signed } => self.write_integer(out, addr, desc, *is_signed),
            TypeKind::Float => self.write_float(out, addr, desc.size()),
            TypeKind::Pointer { pointee, .. } => {
                self.write_pointer(out, addr, desc.size(), pointee.as_ref(), indent, depth)
            }
            TypeKind::Array { element, count } => {
                self.write_array(out, addr, element, *count, indent, depth)
            }
            TypeKind::Struct(aggregate) => self.write_aggregate(out, "struct", addr, aggregate, false, indent, depth),
            TypeKind::Union(aggregate) => self.write_aggregate(out, "union", addr, aggregate, true, indent, depth),
            TypeKind::Enum(enumeration) => self.write_enum(out, addr, desc.size(), enumeration),
        }
    }

    fn write_integer(
        &self,
        out: &mut impl Write,
        addr: u64,
        desc: &TypeDescriptor,
        is_signed: bool,
    ) -> fmt::Result {
        let size = desc.size();
        if !matches!(size, 1 | 2 | 4 | 8) {
            return writeln!(out, "<unknown integer size {size}>");
        }
        if is_signed {
            let Some(value) = read_signed(&self.memory, addr, size) else {
                return unreadable(out, addr);
            };
            write!(out, "{value}")?;
        } else {
            let Some(value) = read_unsigned(&self.memory, addr, size) else {
                return unreadable(out, addr);
            };
            write!(out, "{value}")?;
        }

        if is_plain_char(desc) {
            if let Some(byte) = read_unsigned(&self.memory, addr, 1) {
                let ch = byte as u8;
                if ch.is_ascii_graphic() || ch == b' ' {
                    write!(out, " ('{}')", ch as char)?;
                }
            }
        }
        writeln!(out)
    }

    fn write_float(&self, out: &mut impl Write, addr: u64, size: u64) -> fmt::Result {
        let long_double = Builtin::LongDouble.descriptor().size();
        let width = match usize::try_from(size) {
            Ok(width) if width == 4 || width == 8 || size == long_double => width,
            _ => return writeln!(out, "<unknown float size {size}>"),
        };
        let mut buf = vec![0u8; width];
        if !self.memory.read(addr, &mut buf) {
            return unreadable(out, addr);
        }
        let value = match width {
            4 => f64::from(f32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])),
            8 => f64::from_ne_bytes(first_eight(&buf)),
            _ => decode_long_double(&buf, LONG_DOUBLE_FORMAT),
        };
        writeln!(out, "{}", format_fixed(value))
    }

    fn write_pointer(
        &self,
        out: &mut impl Write,
        addr: u64,
        size: u64,
        pointee: Option<&TypeRef>,
        indent: usize,
        depth: usize,
    ) -> fmt::Result {
        let Some(target) = read_unsigned(&self.memory, addr, size) else {
            return unreadable(out, addr);
        };
        if target == 0 {
            return writeln!(out, "NULL");
        }
        write!(out, "{target:#x}")?;

        let Some(pointee) = pointee.filter(|_| depth < MAX_POINTER_DEPTH) else {
            return writeln!(out);
        };
        match self.graph.resolve(pointee) {
            Some(desc) if desc.is_pointer() => writeln!(out),
            resolved => {
                write!(out, " -> ")?;
                self.write_value(out, target, resolved, indent, depth + 1)
            }
        }
    }

    fn write_array(
        &self,
        out: &mut impl Write,
        addr: u64,
        element: &TypeRef,
        count: u64,
        indent: usize,
        depth: usize,
    ) -> fmt::Result {
        writeln!(out, "[")?;
        let element_desc = self.graph.resolve(element);
        let stride = element_desc.map_or(0, TypeDescriptor::size);
        for index in 0..count {
            let element_addr = addr.wrapping_add(index.wrapping_mul(stride));
            write_indent(out, indent + 2)?;
            self.write_value(out, element_addr, element_desc, indent + 2, depth)?;
        }
        write_indent(out, indent)?;
        writeln!(out, "]")
    }

    fn write_aggregate(
        &self,
        out: &mut impl Write,
        keyword: &str,
        addr: u64,
        aggregate: &Aggregate,
        is_union: bool,
        indent: usize,
        depth: usize,
    ) -> fmt::Result {
        writeln!(out, "{keyword} {} {{", aggregate.name)?;
        for member in &aggregate.members {
            write_indent(out, indent + 2)?;
            for keyword in member.qualifiers.keywords() {
                write!(out, "{keyword} ")?;
            }
            if !member.name.is_empty() {
                write!(out, "{} = ", member.name)?;
            }

            if is_union {
                let desc = self.graph.resolve(&member.ty);
                self.write_value(out, addr, desc, indent + 2, depth)?;
                continue;
            }

            let member_addr = addr.wrapping_add(member.offset);
            if self.is_text_member(member) {
                self.write_text(out, member_addr, &member.ty)?;
            } else {
                let desc = self.graph.resolve(&member.ty);
                self.write_value(out, member_addr, desc, indent + 2, depth)?;
            }
        }
        write_indent(out, indent)?;
        writeln!(out, "}}")
    }

    fn write_enum(&self, out: &mut impl Write, addr: u64, size: u64, enumeration: &EnumType) -> fmt::Result {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return writeln!(out, "<unknown enum size {size}>");
        }
        let Some(value) = read_signed(&self.memory, addr, size) else {
            return unreadable(out, addr);
        };
        match enumeration.values.iter().find(|v| v.value == value) {
            Some(found) => writeln!(out, "enum {} {{ {} ({value}) }}", enumeration.name, found.name),
            None => writeln!(out, "<unknown enum value {value}>"),
        }
    }

    /// Returns `true` if `member` carries the text annotation and its type
    /// is a pointer to, or an array of, plain `char`.
    fn is_text_member(&self, member: &Member) -> bool {
        if !member.annotations.iter().any(|a| *a == self.text_annotation) {
            return false;
        }
        let Some(desc) = self.graph.resolve(&member.ty) else {
            return false;
        };
        let inner = match &desc.kind {
            TypeKind::Pointer { pointee, .. } => pointee.as_ref(),
            TypeKind::Array { element, .. } => Some(element),
            _ => None,
        };
        matches!(inner, Some(TypeRef::Builtin(Builtin::Char)))
    }

    fn write_text(&self, out: &mut impl Write, addr: u64, ty: &TypeRef) -> fmt::Result {
        let Some(desc) = self.graph.resolve(ty) else {
            return writeln!(out, "<null typeinfo>");
        };
        let (start, limit) = match desc.kind {
            TypeKind::Array { count, .. } if count > 0 => {
                (addr, usize::try_from(count).unwrap_or(MAX_TEXT_LEN))
            }
            TypeKind::Array { .. } => (addr, MAX_TEXT_LEN),
            _ => match read_unsigned(&self.memory, addr, desc.size()) {
                Some(0) => return writeln!(out, "NULL"),
                Some(target) => (target, MAX_TEXT_LEN),
                None => return unreadable(out, addr),
            },
        };

        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        for index in 0..limit as u64 {
            let at = start.wrapping_add(index);
            if !self.memory.read(at, &mut byte) {
                if bytes.is_empty() {
                    return unreadable(out, at);
                }
                break;
            }
            if byte[0] == 0 {
                break;
            }
            bytes.push(byte[0]);
        }
        writeln!(out, "\"{}\"", String::from_utf8_lossy(&bytes))
    }
}

// Plain `char` is told apart from `signed char` by identity, never by shape.
fn is_plain_char(desc: &TypeDescriptor) -> bool {
    std::ptr::eq(desc, Builtin::Char.descriptor())
}

fn write_indent(out: &mut impl Write, indent: usize) -> fmt::Result {
    write!(out, "{:indent$}", "")
}

fn unreadable(out: &mut impl Write, addr: u64) -> fmt::Result {
    writeln!(out, "<unreadable memory at {addr:#x}>")
}

fn first_eight(buf: &[u8]) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    bytes
}

/// Formats like C's `%f`: six decimals, `inf`/`nan` spelled in lowercase.
fn format_fixed(value: f64) -> String {
    if value.is_nan() {
        if value.is_sign_negative() { "-nan" } else { "nan" }.to_string()
    } else if value.is_infinite() {
        if value < 0.0 { "-inf" } else { "inf" }.to_string()
    } else {
        format!("{value:.6}")
    }
}

/// Decodes a `long double` slot into the nearest `f64`.
pub(crate) fn decode_long_double(buf: &[u8], format: LongDoubleFormat) -> f64 {
    match format {
        LongDoubleFormat::Double if buf.len() >= 8 => f64::from_ne_bytes(first_eight(buf)),
        LongDoubleFormat::X87Extended if buf.len() >= 10 => decode_x87(buf),
        LongDoubleFormat::Binary128 if buf.len() >= 16 => decode_binary128(buf),
        _ => f64::NAN,
    }
}

fn decode_x87(buf: &[u8]) -> f64 {
    let mantissa = u64::from_le_bytes(first_eight(buf));
    let sign_exponent = u16::from_le_bytes([buf[8], buf[9]]);
    let negative = sign_exponent & 0x8000 != 0;
    let exponent = i32::from(sign_exponent & 0x7FFF);

    let magnitude = if exponent == 0x7FFF {
        if mantissa << 1 == 0 { f64::INFINITY } else { f64::NAN }
    } else {
        // The integer bit is explicit, so the mantissa is a 64-bit
        // fixed-point value with 63 fraction bits.
        let unbiased = if exponent == 0 { 1 - 16383 } else { exponent - 16383 };
        scale(mantissa as f64, unbiased - 63)
    };
    if negative { -magnitude } else { magnitude }
}

fn decode_binary128(buf: &[u8]) -> f64 {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&buf[..16]);
    let bits = u128::from_le_bytes(bytes);
    let negative = bits >> 127 != 0;
    let exponent = ((bits >> 112) & 0x7FFF) as i32;
    let fraction = bits & ((1u128 << 112) - 1);

    let magnitude = if exponent == 0x7FFF {
        if fraction == 0 { f64::INFINITY } else { f64::NAN }
    } else if exponent == 0 {
        scale(fraction as f64, 1 - 16383 - 112)
    } else {
        scale((fraction | (1u128 << 112)) as f64, exponent - 16383 - 112)
    };
    if negative { -magnitude } else { magnitude }
}

/// Computes `value * 2^exp` without intermediate overflow of the power.
fn scale(mut value: f64, mut exp: i32) -> f64 {
    const STEP: i32 = 1000;
    while exp > STEP {
        value *= 2f64.powi(STEP);
        exp -= STEP;
    }
    while exp < -STEP {
        value *= 2f64.powi(-STEP);
        exp += STEP;
    }
    value * 2f64.powi(exp)
}
