//! Target description used for layout.

use std::{fmt, str::FromStr};

use typeinfo_core::{builtin::CHAR_IS_SIGNED, descriptor::Layout};

use crate::parser_types::ScalarSpec;

/// Widths of the C integer types and pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataModel {
    /// 64-bit Unix: `long` and pointers are 8 bytes.
    Lp64,
    /// 64-bit Windows: `long` stays 4 bytes.
    Llp64,
    /// 32-bit targets.
    Ilp32,
}

impl DataModel {
    /// Data model of the host.
    pub const fn host() -> Self {
        if cfg!(target_pointer_width = "32") {
            DataModel::Ilp32
        } else if cfg!(windows) {
            DataModel::Llp64
        } else {
            DataModel::Lp64
        }
    }

    pub fn pointer(self) -> Layout {
        match self {
            DataModel::Lp64 | DataModel::Llp64 => Layout::new(8, 8),
            DataModel::Ilp32 => Layout::new(4, 4),
        }
    }

    fn long(self) -> Layout {
        match self {
            DataModel::Lp64 => Layout::new(8, 8),
            DataModel::Llp64 | DataModel::Ilp32 => Layout::new(4, 4),
        }
    }

    fn long_long(self) -> Layout {
        match self {
            DataModel::Ilp32 => Layout::new(8, 4),
            DataModel::Lp64 | DataModel::Llp64 => Layout::new(8, 8),
        }
    }

    fn double(self) -> Layout {
        self.long_long()
    }

    fn long_double(self) -> Layout {
        match self {
            DataModel::Lp64 => Layout::new(16, 16),
            DataModel::Llp64 => Layout::new(8, 8),
            DataModel::Ilp32 => Layout::new(12, 4),
        }
    }

    /// Size and alignment of an arithmetic type under this model.
    pub fn scalar_layout(self, scalar: ScalarSpec) -> Layout {
        use ScalarSpec as S;

        match scalar {
            S::Void => Layout::new(0, 0),
            S::Bool | S::Char | S::SignedChar | S::UnsignedChar => Layout::new(1, 1),
            S::Short | S::UnsignedShort => Layout::new(2, 2),
            S::Int | S::UnsignedInt | S::Float => Layout::new(4, 4),
            S::Long | S::UnsignedLong => self.long(),
            S::LongLong | S::UnsignedLongLong => self.long_long(),
            S::Int128 | S::UnsignedInt128 => Layout::new(16, 16),
            S::Double => self.double(),
            S::LongDouble => self.long_double(),
            S::ComplexFloat => Layout::new(8, 4),
            S::ComplexDouble => {
                let double = self.double();
                Layout::new(double.size * 2, double.alignment)
            }
            S::ComplexLongDouble => {
                let long_double = self.long_double();
                Layout::new(long_double.size * 2, long_double.alignment)
            }
        }
    }
}

impl Default for DataModel {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataModel::Lp64 => write!(f, "lp64"),
            DataModel::Llp64 => write!(f, "llp64"),
            DataModel::Ilp32 => write!(f, "ilp32"),
        }
    }
}

impl FromStr for DataModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lp64" => Ok(DataModel::Lp64),
            "llp64" => Ok(DataModel::Llp64),
            "ilp32" => Ok(DataModel::Ilp32),
            _ => Err(format!(
                "unknown data model `{s}`, expected one of `lp64`, `llp64`, `ilp32`"
            )),
        }
    }
}

/// Configuration for elaborating a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetConfig {
    pub data_model: DataModel,
    /// Whether plain `char` is signed.
    pub char_signed: bool,
}

impl TargetConfig {
    pub fn new(data_model: DataModel, char_signed: bool) -> Self {
        Self {
            data_model,
            char_signed,
        }
    }
}

impl Default for TargetConfig {
    /// The host target.
    fn default() -> Self {
        Self::new(DataModel::host(), CHAR_IS_SIGNED)
    }
}
