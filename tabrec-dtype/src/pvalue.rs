use std::fmt::{Display, Formatter};

use tabrec_error::{TabrecError, tabrec_err};

use crate::PType;

/// A single primitive value, tagged with its physical type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl PValue {
    pub fn ptype(&self) -> PType {
        match self {
            Self::U8(_) => PType::U8,
            Self::U16(_) => PType::U16,
            Self::U32(_) => PType::U32,
            Self::U64(_) => PType::U64,
            Self::I8(_) => PType::I8,
            Self::I16(_) => PType::I16,
            Self::I32(_) => PType::I32,
            Self::I64(_) => PType::I64,
            Self::F32(_) => PType::F32,
            Self::F64(_) => PType::F64,
        }
    }

    pub fn is_instance_of(&self, ptype: &PType) -> bool {
        &self.ptype() == ptype
    }
}

impl Display for PValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}u8"),
            Self::U16(v) => write!(f, "{v}u16"),
            Self::U32(v) => write!(f, "{v}u32"),
            Self::U64(v) => write!(f, "{v}u64"),
            Self::I8(v) => write!(f, "{v}i8"),
            Self::I16(v) => write!(f, "{v}i16"),
            Self::I32(v) => write!(f, "{v}i32"),
            Self::I64(v) => write!(f, "{v}i64"),
            Self::F32(v) => write!(f, "{v}f32"),
            Self::F64(v) => write!(f, "{v}f64"),
        }
    }
}

macro_rules! pvalue_from {
    ($T:ty, $PT:ident) => {
        impl From<$T> for PValue {
            fn from(value: $T) -> Self {
                PValue::$PT(value)
            }
        }

        impl TryFrom<PValue> for $T {
            type Error = TabrecError;

            fn try_from(value: PValue) -> Result<Self, Self::Error> {
                match value {
                    PValue::$PT(v) => Ok(v),
                    _ => Err(tabrec_err!(MismatchedTypes: PType::$PT, value.ptype())),
                }
            }
        }
    };
}

pvalue_from!(u8, U8);
pvalue_from!(u16, U16);
pvalue_from!(u32, U32);
pvalue_from!(u64, U64);
pvalue_from!(i8, I8);
pvalue_from!(i16, I16);
pvalue_from!(i32, I32);
pvalue_from!(i64, I64);
pvalue_from!(f32, F32);
pvalue_from!(f64, F64);
