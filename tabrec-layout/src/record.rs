use std::fmt::{Debug, Formatter};

use bytes::{Bytes, BytesMut};
use tabrec_dtype::PValue;
use tabrec_error::{TabrecResult, tabrec_bail};

use crate::RecordLayoutDigest;

/// One record of a [`RecordLayoutDigest`]: exactly `byte_width()` bytes, with typed access to
/// each column's slot.
///
/// Dimension slots hold a big-endian dictionary ID, metric slots hold the column codec's
/// encoding of the value. Writes validate their input before touching the record, so a failed
/// write leaves every byte as it was.
#[derive(Clone)]
pub struct RecordView {
    digest: RecordLayoutDigest,
    bytes: BytesMut,
}

impl RecordView {
    /// A zeroed record.
    pub fn new(digest: RecordLayoutDigest) -> Self {
        let bytes = BytesMut::zeroed(digest.byte_width());
        Self { digest, bytes }
    }

    /// A record initialised from `bytes`, which must be exactly one record wide.
    pub fn try_from_bytes(digest: RecordLayoutDigest, bytes: &[u8]) -> TabrecResult<Self> {
        let mut record = Self::new(digest);
        record.load(bytes)?;
        Ok(record)
    }

    /// Overwrite the whole record with `bytes`.
    pub fn load(&mut self, bytes: &[u8]) -> TabrecResult<()> {
        if bytes.len() != self.bytes.len() {
            tabrec_bail!(
                "record is {} bytes wide, cannot load {} bytes",
                self.bytes.len(),
                bytes.len()
            );
        }
        self.bytes.copy_from_slice(bytes);
        Ok(())
    }

    pub fn digest(&self) -> &RecordLayoutDigest {
        &self.digest
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// The raw bytes of column `idx`.
    pub fn raw_bytes(&self, idx: usize) -> TabrecResult<&[u8]> {
        let range = self.digest.column_range(idx)?;
        Ok(&self.bytes[range])
    }

    /// Replace the raw bytes of column `idx`. `value` must be exactly as wide as the column.
    pub fn set_raw_bytes(&mut self, idx: usize, value: &[u8]) -> TabrecResult<()> {
        let range = self.digest.column_range(idx)?;
        if value.len() != range.len() {
            tabrec_bail!(
                "column {idx} is {} bytes wide, cannot store {} bytes",
                range.len(),
                value.len()
            );
        }
        self.bytes[range].copy_from_slice(value);
        Ok(())
    }

    /// Decode the value of metric column `idx`.
    pub fn metric_value(&self, idx: usize) -> TabrecResult<PValue> {
        let codec = self.digest.metric_codec(idx)?;
        let range = self.digest.column_range(idx)?;
        codec.decode(&self.bytes[range])
    }

    /// Encode `value` into metric column `idx`.
    pub fn set_metric_value(&mut self, idx: usize, value: impl Into<PValue>) -> TabrecResult<()> {
        let codec = self.digest.metric_codec(idx)?;
        let range = self.digest.column_range(idx)?;
        codec.encode(value.into(), &mut self.bytes[range])
    }

    /// The dictionary ID stored in dimension column `idx`.
    pub fn dictionary_id(&self, idx: usize) -> TabrecResult<u32> {
        self.digest.check_dimension(idx)?;
        let range = self.digest.column_range(idx)?;
        Ok(self.bytes[range]
            .iter()
            .fold(0u32, |id, byte| (id << 8) | u32::from(*byte)))
    }

    /// Store dictionary ID `id` in dimension column `idx`.
    ///
    /// The ID must fit the column's slot. IDs above the dictionary max ID the layout was built
    /// with are accepted as long as they fit, since the bound dictionary may since have grown.
    pub fn set_dictionary_id(&mut self, idx: usize, id: u32) -> TabrecResult<()> {
        let capacity = self.digest.id_capacity(idx)?;
        if id > capacity {
            tabrec_bail!(
                "id {id} does not fit in the {}-byte slot of column {idx}",
                self.digest.length(idx)
            );
        }
        let range = self.digest.column_range(idx)?;
        let encoded = id.to_be_bytes();
        self.bytes[range.clone()].copy_from_slice(&encoded[encoded.len() - range.len()..]);
        Ok(())
    }

    /// Zero every byte of the record.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes.freeze()
    }
}

impl AsRef<[u8]> for RecordView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for RecordView {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.bytes == other.bytes
    }
}

impl Eq for RecordView {}

impl Debug for RecordView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordView")
            .field("byte_width", &self.digest.byte_width())
            .field("bytes", &self.bytes.as_ref())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use tabrec_dict::test_harness::StringDictionary;
    use tabrec_dtype::{PType, PValue};
    use tabrec_error::TabrecError;

    use crate::{FixedLenCodecRef, PrimitiveCodec, RecordLayoutDigest, RecordView};

    fn codec(ptype: PType) -> Option<FixedLenCodecRef> {
        Some(Arc::new(PrimitiveCodec::new(ptype)))
    }

    /// `[dimension (2 bytes), metric i32, dimension (1 byte), metric f64]`
    #[fixture]
    fn digest() -> RecordLayoutDigest {
        RecordLayoutDigest::try_new(
            &[false, true, false, true],
            &[
                None,
                codec(PType::I32),
                None,
                codec(PType::F64),
            ],
            &[
                Some(StringDictionary::with_max_id(300).into_ref()),
                None,
                Some(StringDictionary::with_max_id(5).into_ref()),
                None,
            ],
        )
        .unwrap()
    }

    #[rstest]
    fn zeroed_on_allocation(digest: RecordLayoutDigest) {
        let record = digest.allocate();
        assert_eq!(record.as_slice(), &[0u8; 15]);
        assert_eq!(record.dictionary_id(0).unwrap(), 0);
        assert_eq!(record.metric_value(1).unwrap(), PValue::I32(0));
    }

    #[rstest]
    fn ids_are_big_endian(digest: RecordLayoutDigest) {
        let mut record = digest.allocate();
        record.set_dictionary_id(0, 300).unwrap();
        record.set_dictionary_id(2, 5).unwrap();
        assert_eq!(record.raw_bytes(0).unwrap(), &[0x01, 0x2C]);
        assert_eq!(record.raw_bytes(2).unwrap(), &[0x05]);
        assert_eq!(record.dictionary_id(0).unwrap(), 300);
        assert_eq!(record.dictionary_id(2).unwrap(), 5);
    }

    #[rstest]
    fn ids_may_exceed_build_time_max(digest: RecordLayoutDigest) {
        let mut record = digest.allocate();
        record.set_dictionary_id(0, 65_535).unwrap();
        assert_eq!(record.dictionary_id(0).unwrap(), 65_535);
    }

    #[rstest]
    fn rejects_ids_beyond_slot(digest: RecordLayoutDigest) {
        let mut record = digest.allocate();
        record.set_dictionary_id(2, 7).unwrap();
        assert!(record.set_dictionary_id(2, 256).is_err());
        assert_eq!(record.dictionary_id(2).unwrap(), 7);
    }

    #[rstest]
    fn metric_values(digest: RecordLayoutDigest) {
        let mut record = digest.allocate();
        record.set_metric_value(1, -42i32).unwrap();
        record.set_metric_value(3, 2.5f64).unwrap();
        assert_eq!(record.metric_value(1).unwrap(), PValue::I32(-42));
        assert_eq!(record.metric_value(3).unwrap(), PValue::F64(2.5));
        assert_eq!(record.raw_bytes(1).unwrap(), &(-42i32).to_be_bytes());

        let before = record.clone();
        let err = record.set_metric_value(1, 7i64).unwrap_err();
        assert!(matches!(err, TabrecError::MismatchedTypes(..)));
        assert_eq!(record, before);
    }

    #[rstest]
    fn column_kind_mismatch(digest: RecordLayoutDigest) {
        let mut record = digest.allocate();
        assert!(record.dictionary_id(1).is_err());
        assert!(record.set_dictionary_id(3, 1).is_err());
        assert!(record.metric_value(0).is_err());
        assert!(record.set_metric_value(2, 1i32).is_err());
        assert!(matches!(
            record.raw_bytes(4).unwrap_err(),
            TabrecError::OutOfBounds(4, 0, 4, _)
        ));
    }

    #[rstest]
    fn raw_bytes_need_exact_width(digest: RecordLayoutDigest) {
        let mut record = digest.allocate();
        record.set_raw_bytes(0, &[0xAB, 0xCD]).unwrap();
        assert!(record.set_raw_bytes(0, &[1]).is_err());
        assert!(record.set_raw_bytes(0, &[1, 2, 3]).is_err());
        assert_eq!(record.dictionary_id(0).unwrap(), 0xABCD);
    }

    #[rstest]
    fn load_and_reset(digest: RecordLayoutDigest) {
        let bytes = (1..=15).collect::<Vec<u8>>();
        let mut record = RecordView::try_from_bytes(digest.clone(), &bytes).unwrap();
        assert_eq!(record.as_ref(), bytes.as_slice());
        assert!(record.load(&bytes[1..]).is_err());
        assert_eq!(record.as_slice(), bytes.as_slice());

        record.reset();
        assert!(record.as_slice().iter().all(|b| *b == 0));
        assert_eq!(record.into_bytes().len(), digest.byte_width());
    }
}
