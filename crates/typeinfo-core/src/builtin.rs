//! Built-in scalar types.
//!
//! Every built-in has exactly one process-wide descriptor, obtained through
//! [`Builtin::descriptor`]. The descriptors are `static` data: they are never
//! freed and never duplicated, so identity comparison against them is
//! meaningful (the renderer relies on it to recognize the plain `char` type).
//!
//! Sizes, alignments, and the signedness of plain `char` are those of the
//! host C ABI, taken from [`core::ffi`].

use std::{
    ffi::{c_char, c_double, c_float, c_int, c_long, c_longlong, c_short},
    fmt,
    mem::{align_of, size_of},
};

use serde::{Deserialize, Serialize};

use crate::descriptor::{Layout, TypeDescriptor, TypeKind};

/// Catalog of built-in C scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
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
    Float,
    Double,
    LongDouble,
}

/// Storage format of the host's `long double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongDoubleFormat {
    /// Same representation as `double`.
    Double,
    /// x87 80-bit extended precision, padded to the slot size.
    X87Extended,
    /// IEEE 754 binary128.
    Binary128,
}

#[cfg(all(any(target_arch = "x86_64", target_arch = "x86"), not(windows)))]
pub const LONG_DOUBLE_FORMAT: LongDoubleFormat = LongDoubleFormat::X87Extended;
#[cfg(all(target_arch = "aarch64", target_os = "linux"))]
pub const LONG_DOUBLE_FORMAT: LongDoubleFormat = LongDoubleFormat::Binary128;
#[cfg(not(any(
    all(any(target_arch = "x86_64", target_arch = "x86"), not(windows)),
    all(target_arch = "aarch64", target_os = "linux")
)))]
pub const LONG_DOUBLE_FORMAT: LongDoubleFormat = LongDoubleFormat::Double;

#[cfg(all(target_arch = "x86", not(windows)))]
const LONG_DOUBLE_LAYOUT: Layout = Layout::new(12, 4);
#[cfg(any(
    all(target_arch = "x86_64", not(windows)),
    all(target_arch = "aarch64", target_os = "linux")
))]
const LONG_DOUBLE_LAYOUT: Layout = Layout::new(16, 16);
#[cfg(not(any(
    all(any(target_arch = "x86_64", target_arch = "x86"), not(windows)),
    all(target_arch = "aarch64", target_os = "linux")
)))]
const LONG_DOUBLE_LAYOUT: Layout = Layout::new(size_of::<c_double>() as u64, align_of::<c_double>() as u64);

/// Returns `true` if plain `char` is signed on the host.
pub const CHAR_IS_SIGNED: bool = c_char::MIN != 0;

const fn layout_of<T>() -> Layout {
    Layout::new(size_of::<T>() as u64, align_of::<T>() as u64)
}

const fn integer<T>(is_signed: bool) -> TypeDescriptor {
    TypeDescriptor {
        layout: layout_of::<T>(),
        kind: TypeKind::Integer { is_signed },
    }
}

const fn float(layout: Layout) -> TypeDescriptor {
    TypeDescriptor {
        layout,
        kind: TypeKind::Float,
    }
}

// Indexed by `Builtin as usize`.
static DESCRIPTORS: [TypeDescriptor; 16] = [
    TypeDescriptor {
        layout: Layout::new(0, 0),
        kind: TypeKind::Void,
    },
    integer::<bool>(false),
    integer::<c_char>(CHAR_IS_SIGNED),
    integer::<i8>(true),
    integer::<u8>(false),
    integer::<c_short>(true),
    integer::<c_short>(false),
    integer::<c_int>(true),
    integer::<c_int>(false),
    integer::<c_long>(true),
    integer::<c_long>(false),
    integer::<c_longlong>(true),
    integer::<c_longlong>(false),
    float(layout_of::<c_float>()),
    float(layout_of::<c_double>()),
    float(LONG_DOUBLE_LAYOUT),
];

impl Builtin {
    /// All built-ins in catalog order.
    pub const ALL: [Builtin; 16] = [
        Builtin::Void,
        Builtin::Bool,
        Builtin::Char,
        Builtin::SignedChar,
        Builtin::UnsignedChar,
        Builtin::Short,
        Builtin::UnsignedShort,
        Builtin::Int,
        Builtin::UnsignedInt,
        Builtin::Long,
        Builtin::UnsignedLong,
        Builtin::LongLong,
        Builtin::UnsignedLongLong,
        Builtin::Float,
        Builtin::Double,
        Builtin::LongDouble,
    ];

    /// Returns the shared singleton descriptor of this built-in.
    pub fn descriptor(self) -> &'static TypeDescriptor {
        &DESCRIPTORS[self as usize]
    }

    /// Returns the C spelling of the type, e.g. `unsigned long long`.
    pub fn c_name(self) -> &'static str {
        match self {
            Builtin::Void => "void",
            Builtin::Bool => "_Bool",
            Builtin::Char => "char",
            Builtin::SignedChar => "signed char",
            Builtin::UnsignedChar => "unsigned char",
            Builtin::Short => "short",
            Builtin::UnsignedShort => "unsigned short",
            Builtin::Int => "int",
            Builtin::UnsignedInt => "unsigned int",
            Builtin::Long => "long",
            Builtin::UnsignedLong => "unsigned long",
            Builtin::LongLong => "long long",
            Builtin::UnsignedLongLong => "unsigned long long",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::LongDouble => "long double",
        }
    }

    /// Returns the identifier-safe suffix used in generated symbols, e.g.
    /// `unsigned_long_long` for `typeinfo_unsigned_long_long`.
    pub fn symbol(self) -> &'static str {
        match self {
            Builtin::Void => "void",
            Builtin::Bool => "bool",
            Builtin::Char => "char",
            Builtin::SignedChar => "signed_char",
            Builtin::UnsignedChar => "unsigned_char",
            Builtin::Short => "short",
            Builtin::UnsignedShort => "unsigned_short",
            Builtin::Int => "int",
            Builtin::UnsignedInt => "unsigned_int",
            Builtin::Long => "long",
            Builtin::UnsignedLong => "unsigned_long",
            Builtin::LongLong => "long_long",
            Builtin::UnsignedLongLong => "unsigned_long_long",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::LongDouble => "long_double",
        }
    }

    /// Returns `true` for the three character types.
    pub fn is_character(self) -> bool {
        matches!(
            self,
            Builtin::Char | Builtin::SignedChar | Builtin::UnsignedChar
        )
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.c_name())
    }
}
