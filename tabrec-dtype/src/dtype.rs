use std::fmt::{Display, Formatter};

use crate::PType;

/// The logical type of a table column.
///
/// Dimension columns are usually [`DType::Utf8`]; their values only ever reach a record as
/// dictionary IDs. Metric columns must be [`DType::Primitive`] so that a fixed-length codec
/// exists for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    /// UTF-8 strings
    Utf8,
    /// Primitive, fixed-width numeric types
    Primitive(PType),
}

impl DType {
    /// Returns the fixed byte width of values of this type, if it has one.
    pub fn byte_width(&self) -> Option<usize> {
        match self {
            DType::Utf8 => None,
            DType::Primitive(ptype) => Some(ptype.byte_width()),
        }
    }

    /// Check if `self` is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, DType::Primitive(_))
    }

    /// Check if `self` is a [`DType::Utf8`]
    pub fn is_utf8(&self) -> bool {
        matches!(self, DType::Utf8)
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Utf8 => write!(f, "utf8"),
            DType::Primitive(ptype) => write!(f, "{ptype}"),
        }
    }
}

impl From<PType> for DType {
    fn from(value: PType) -> Self {
        DType::Primitive(value)
    }
}
