//! Typedef names predefined by the standard headers.
//!
//! `#include` is not followed, so the fixed-width and size types of
//! `<stdint.h>`, `<stddef.h>`, and `<uchar.h>` are provided here, resolved
//! for the configured data model. A typedef in the unit with the same name
//! takes precedence.

use crate::{parser_types::ScalarSpec, target::DataModel};

/// Underlying type of a predefined typedef name.
pub(crate) fn predefined(name: &str, model: DataModel) -> Option<ScalarSpec> {
    use ScalarSpec as S;

    // The 64-bit and pointer-sized types depend on the width of `long`.
    let (int64, uint64) = match model {
        DataModel::Lp64 => (S::Long, S::UnsignedLong),
        DataModel::Llp64 | DataModel::Ilp32 => (S::LongLong, S::UnsignedLongLong),
    };
    let (intptr, uintptr) = match model {
        DataModel::Lp64 => (S::Long, S::UnsignedLong),
        DataModel::Llp64 => (S::LongLong, S::UnsignedLongLong),
        DataModel::Ilp32 => (S::Int, S::UnsignedInt),
    };

    Some(match name {
        "int8_t" | "int_least8_t" | "int_fast8_t" => S::SignedChar,
        "uint8_t" | "uint_least8_t" | "uint_fast8_t" => S::UnsignedChar,
        "int16_t" | "int_least16_t" => S::Short,
        "uint16_t" | "uint_least16_t" | "char16_t" => S::UnsignedShort,
        "int32_t" | "int_least32_t" => S::Int,
        "uint32_t" | "uint_least32_t" | "char32_t" => S::UnsignedInt,
        "int64_t" | "int_least64_t" | "int_fast64_t" | "intmax_t" => int64,
        "uint64_t" | "uint_least64_t" | "uint_fast64_t" | "uintmax_t" => uint64,
        "intptr_t" | "ptrdiff_t" | "ssize_t" => intptr,
        "uintptr_t" | "size_t" => uintptr,
        "wchar_t" => match model {
            DataModel::Llp64 => S::UnsignedShort,
            DataModel::Lp64 | DataModel::Ilp32 => S::Int,
        },
        _ => return None,
    })
}
