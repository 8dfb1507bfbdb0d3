use std::fmt::Debug;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tabrec_dtype::{DType, PType, PValue};
use tabrec_error::{TabrecResult, tabrec_bail, tabrec_err};

/// Encodes and decodes the values of one metric column type to and from a fixed number of
/// bytes.
///
/// Codecs are stateless and shared between every layout that stores the same type.
/// Implementations must validate their input before writing: a failed `encode` leaves `out`
/// untouched.
pub trait FixedLenCodec: Debug + Send + Sync {
    /// The column type this codec stores.
    fn dtype(&self) -> DType;

    /// The encoded width of every value, in bytes.
    fn length(&self) -> usize;

    /// Encode `value` into `out`, which must be exactly [`Self::length`] bytes long.
    fn encode(&self, value: PValue, out: &mut [u8]) -> TabrecResult<()>;

    /// Decode a value from `bytes`, which must be exactly [`Self::length`] bytes long.
    fn decode(&self, bytes: &[u8]) -> TabrecResult<PValue>;
}

pub type FixedLenCodecRef = Arc<dyn FixedLenCodec>;

/// Big-endian encoding of a single primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveCodec(PType);

impl PrimitiveCodec {
    pub const fn new(ptype: PType) -> Self {
        Self(ptype)
    }

    pub const fn ptype(&self) -> PType {
        self.0
    }

    fn check_width(&self, len: usize) -> TabrecResult<()> {
        if len != self.0.byte_width() {
            tabrec_bail!(
                "{} codec expects {} bytes, got {len}",
                self.0,
                self.0.byte_width()
            );
        }
        Ok(())
    }
}

macro_rules! from_be {
    ($T:ty, $bytes:expr) => {
        <$T>::from_be_bytes(
            $bytes
                .try_into()
                .map_err(|_| tabrec_err!("cannot decode {} from {} bytes", stringify!($T), $bytes.len()))?,
        )
    };
}

impl FixedLenCodec for PrimitiveCodec {
    fn dtype(&self) -> DType {
        DType::Primitive(self.0)
    }

    fn length(&self) -> usize {
        self.0.byte_width()
    }

    fn encode(&self, value: PValue, out: &mut [u8]) -> TabrecResult<()> {
        if !value.is_instance_of(&self.0) {
            tabrec_bail!(MismatchedTypes: self.0, value.ptype());
        }
        self.check_width(out.len())?;

        match value {
            PValue::U8(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::U16(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::U32(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::U64(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::I8(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::I16(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::I32(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::I64(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::F32(v) => out.copy_from_slice(&v.to_be_bytes()),
            PValue::F64(v) => out.copy_from_slice(&v.to_be_bytes()),
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> TabrecResult<PValue> {
        self.check_width(bytes.len())?;

        Ok(match self.0 {
            PType::U8 => PValue::U8(from_be!(u8, bytes)),
            PType::U16 => PValue::U16(from_be!(u16, bytes)),
            PType::U32 => PValue::U32(from_be!(u32, bytes)),
            PType::U64 => PValue::U64(from_be!(u64, bytes)),
            PType::I8 => PValue::I8(from_be!(i8, bytes)),
            PType::I16 => PValue::I16(from_be!(i16, bytes)),
            PType::I32 => PValue::I32(from_be!(i32, bytes)),
            PType::I64 => PValue::I64(from_be!(i64, bytes)),
            PType::F32 => PValue::F32(from_be!(f32, bytes)),
            PType::F64 => PValue::F64(from_be!(f64, bytes)),
        })
    }
}

/// Lookup of the fixed-length codec that stores a given column type.
///
/// The default registry knows a [`PrimitiveCodec`] for every [`PType`].
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: FxHashMap<DType, FixedLenCodecRef>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        PType::ALL.into_iter().fold(Self::empty(), |registry, ptype| {
            registry.with_codec(DType::Primitive(ptype), Arc::new(PrimitiveCodec::new(ptype)))
        })
    }
}

impl CodecRegistry {
    /// A registry without any codecs.
    pub fn empty() -> Self {
        Self {
            codecs: FxHashMap::default(),
        }
    }

    /// Register `codec` for `dtype`, replacing any codec previously registered for it.
    pub fn with_codec(mut self, dtype: DType, codec: FixedLenCodecRef) -> Self {
        self.codecs.insert(dtype, codec);
        self
    }

    /// The codec registered for `dtype`.
    pub fn codec(&self, dtype: &DType) -> TabrecResult<FixedLenCodecRef> {
        self.codecs
            .get(dtype)
            .cloned()
            .ok_or_else(|| tabrec_err!(NotFound: "no fixed-length codec registered for type {dtype}"))
    }
}
