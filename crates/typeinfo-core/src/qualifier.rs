//! Type qualifiers.
//!
//! A [`Qualifiers`] value is a small bitset over `const`, `volatile`, and
//! `restrict`. It is carried on member slots and on pointer pointees, and is
//! always rendered in that fixed order.

use std::{fmt, ops, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Set of C type qualifiers.
///
/// # Examples
///
/// ```
/// use typeinfo_core::qualifier::Qualifiers;
///
/// let quals = Qualifiers::CONST | Qualifiers::VOLATILE;
/// assert!(quals.contains(Qualifiers::CONST));
/// assert_eq!(quals.to_string(), "const volatile");
/// assert_eq!(Qualifiers::NONE.to_string(), "none");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Qualifiers(u8);

impl Qualifiers {
    pub const NONE: Self = Self(0);
    pub const CONST: Self = Self(1 << 0);
    pub const VOLATILE: Self = Self(1 << 1);
    pub const RESTRICT: Self = Self(1 << 2);

    const ORDERED: [(Self, &'static str); 3] = [
        (Self::CONST, "const"),
        (Self::VOLATILE, "volatile"),
        (Self::RESTRICT, "restrict"),
    ];

    /// Returns `true` if every qualifier in `other` is also in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no qualifier is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Adds the qualifiers of `other` to `self`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Returns the keywords of the set qualifiers in fixed order.
    pub fn keywords(self) -> impl Iterator<Item = &'static str> {
        Self::ORDERED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl ops::BitOr for Qualifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for Qualifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let words: Vec<&str> = self.keywords().collect();
        write!(f, "{}", words.join(" "))
    }
}

impl FromStr for Qualifiers {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut quals = Self::NONE;
        for word in s.split_whitespace() {
            match word {
                "none" => {}
                "const" => quals |= Self::CONST,
                "volatile" => quals |= Self::VOLATILE,
                "restrict" => quals |= Self::RESTRICT,
                other => return Err(format!("unknown qualifier `{other}`")),
            }
        }
        Ok(quals)
    }
}

impl Serialize for Qualifiers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Qualifiers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
