use std::ops::{Deref, Range};
use std::sync::Arc;

use bytes::{Buf, BufMut};
use itertools::{Itertools, izip};
use tabrec_buffer::{
    encoded_len, read_array, read_bool_array, read_int_array, write_array, write_bool_array,
    write_int_array,
};
use tabrec_dict::{DictionaryRef, id_capacity};
use tabrec_dtype::{DType, PType};
use tabrec_error::{TabrecResult, tabrec_bail, tabrec_err};

use crate::{CodecRegistry, FixedLenCodecRef, RecordView};

/// Widest slot a dimension column may have; IDs are `u32`.
const MAX_ID_WIDTH: usize = size_of::<u32>();

/// Persisted codec tag of a dimension column.
const NO_CODEC: i32 = -1;

/// The byte-level description of a table's record format.
///
/// Each column `i` occupies bytes `offset(i)..offset(i) + length(i)` of a record; columns are
/// packed back to back in table order without padding, so `offset(0) == 0` and the last column
/// ends at `byte_width()`. Metric columns keep the codec for their values. Dimension columns
/// keep only the largest dictionary ID that was in force when the digest was built; the
/// dictionaries themselves stay with the [`RecordLayoutResolver`](crate::RecordLayoutResolver)
/// so that records can be sliced and compared without loading them.
///
/// Digests are immutable and cheap to clone.
#[derive(Debug, Clone)]
pub struct RecordLayoutDigest(Arc<RecordLayoutDigestInner>);

impl Deref for RecordLayoutDigest {
    type Target = RecordLayoutDigestInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct RecordLayoutDigestInner {
    is_metric: Vec<bool>,
    lengths: Vec<usize>,
    offsets: Vec<usize>,
    dict_max_ids: Vec<u32>,
    codecs: Vec<Option<FixedLenCodecRef>>,
    byte_width: usize,
}

impl RecordLayoutDigest {
    /// Build the layout of a table from its per-column sources.
    ///
    /// The three slices are indexed by column. Metric columns take their width from their
    /// codec; dimension columns take theirs from the dictionary's ID size. A metric column
    /// without a codec, or a dimension column without a dictionary, is an error.
    pub fn try_new(
        is_metric: &[bool],
        codecs: &[Option<FixedLenCodecRef>],
        dictionaries: &[Option<DictionaryRef>],
    ) -> TabrecResult<Self> {
        if codecs.len() != is_metric.len() || dictionaries.len() != is_metric.len() {
            tabrec_bail!(
                "layout of {} columns built from {} codecs and {} dictionaries",
                is_metric.len(),
                codecs.len(),
                dictionaries.len()
            );
        }

        let ncols = is_metric.len();
        let mut lengths = Vec::with_capacity(ncols);
        let mut dict_max_ids = Vec::with_capacity(ncols);
        let mut metric_codecs = Vec::with_capacity(ncols);

        for (idx, (metric, codec, dictionary)) in izip!(is_metric, codecs, dictionaries).enumerate()
        {
            if *metric {
                let codec = codec.as_ref().ok_or_else(
                    || tabrec_err!(NotFound: "no fixed-length codec for metric column {idx}"),
                )?;
                if codec.length() == 0 {
                    tabrec_bail!("codec for metric column {idx} has zero length");
                }
                lengths.push(codec.length());
                dict_max_ids.push(0);
                metric_codecs.push(Some(codec.clone()));
            } else {
                let dictionary = dictionary.as_ref().ok_or_else(
                    || tabrec_err!(NotFound: "no dictionary for dimension column {idx}"),
                )?;
                let width = dictionary.size_of_id();
                if !(1..=MAX_ID_WIDTH).contains(&width) {
                    tabrec_bail!(
                        "dictionary of column {idx} needs {width} bytes per id, expected 1 to {MAX_ID_WIDTH}"
                    );
                }
                if dictionary.max_id() > id_capacity(width) {
                    tabrec_bail!(
                        "dictionary of column {idx} has max id {} which does not fit in {width} bytes",
                        dictionary.max_id()
                    );
                }
                lengths.push(width);
                dict_max_ids.push(dictionary.max_id());
                metric_codecs.push(None);
            }
        }

        Self::from_parts(is_metric.to_vec(), lengths, dict_max_ids, metric_codecs)
    }

    fn from_parts(
        is_metric: Vec<bool>,
        lengths: Vec<usize>,
        dict_max_ids: Vec<u32>,
        codecs: Vec<Option<FixedLenCodecRef>>,
    ) -> TabrecResult<Self> {
        let mut offsets = Vec::with_capacity(lengths.len());
        let mut pos = 0usize;
        for length in &lengths {
            offsets.push(pos);
            pos = pos
                .checked_add(*length)
                .ok_or_else(|| tabrec_err!("record width overflows usize"))?;
        }

        log::debug!(
            "Built record layout: {} columns ({} metrics), {} bytes per record",
            lengths.len(),
            is_metric.iter().filter(|m| **m).count(),
            pos
        );

        Ok(Self(Arc::new(RecordLayoutDigestInner {
            is_metric,
            lengths,
            offsets,
            dict_max_ids,
            codecs,
            byte_width: pos,
        })))
    }

    /// Allocate a zeroed record of this layout.
    pub fn allocate(&self) -> RecordView {
        RecordView::new(self.clone())
    }

    /// Number of bytes [`Self::write_to`] produces.
    pub fn serialized_size(&self) -> usize {
        let ncols = self.column_count();
        encoded_len::<i32>(2)
            + encoded_len::<i32>(ncols)
            + encoded_len::<u32>(ncols)
            + encoded_len::<i32>(ncols)
            + encoded_len::<bool>(ncols)
            + encoded_len::<i32>(ncols)
    }

    /// Persist this layout as a sequence of arrays:
    /// `[column count, width]`, offsets, dictionary max IDs, lengths, metric flags and the
    /// physical type of every metric codec (`-1` for dimension columns).
    ///
    /// Nothing is written if the buffer cannot hold the whole layout.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) -> TabrecResult<()> {
        let needed = self.serialized_size();
        if buf.remaining_mut() < needed {
            tabrec_bail!(
                "buffer has {} bytes remaining but the record layout needs {needed}",
                buf.remaining_mut()
            );
        }

        let codec_types = self
            .codecs
            .iter()
            .map(|codec| match codec {
                Some(codec) => {
                    let ptype = PType::try_from(&codec.dtype())?;
                    Ok(i32::from(u8::from(ptype)))
                }
                None => Ok(NO_CODEC),
            })
            .collect::<TabrecResult<Vec<_>>>()?;

        write_int_array(
            &[to_i32(self.column_count())?, to_i32(self.byte_width)?],
            buf,
        )?;
        write_int_array(&to_i32s(&self.offsets)?, buf)?;
        write_array(&self.dict_max_ids, buf)?;
        write_int_array(&to_i32s(&self.lengths)?, buf)?;
        write_bool_array(&self.is_metric, buf)?;
        write_int_array(&codec_types, buf)
    }

    /// Read a layout written by [`Self::write_to`], resolving metric codecs through `codecs`.
    ///
    /// Every invariant of the layout is checked again; persisted bytes that describe an
    /// inconsistent layout are rejected.
    pub fn read_from<B: Buf>(buf: &mut B, codecs: &CodecRegistry) -> TabrecResult<Self> {
        let header = read_int_array(buf)?;
        let [ncols, byte_width] = header[..] else {
            tabrec_bail!(InvalidSerde: "record layout header has {} fields, expected 2", header.len());
        };
        let ncols = from_i32(ncols)?;
        let byte_width = from_i32(byte_width)?;

        let offsets = from_i32s(read_int_array(buf)?)?;
        let dict_max_ids: Vec<u32> = read_array(buf)?;
        let lengths = from_i32s(read_int_array(buf)?)?;
        let is_metric = read_bool_array(buf)?;
        let codec_types = read_int_array(buf)?;

        for (name, len) in [
            ("offsets", offsets.len()),
            ("dictionary max ids", dict_max_ids.len()),
            ("lengths", lengths.len()),
            ("metric flags", is_metric.len()),
            ("codec types", codec_types.len()),
        ] {
            if len != ncols {
                tabrec_bail!(InvalidSerde: "record layout has {ncols} columns but {len} {name}");
            }
        }

        let metric_codecs = izip!(&is_metric, &codec_types, &lengths, &dict_max_ids)
            .enumerate()
            .map(|(idx, (metric, tag, length, max_id))| {
                read_column_codec(idx, *metric, *tag, *length, *max_id, codecs)
            })
            .collect::<TabrecResult<Vec<_>>>()?;

        let digest = Self::from_parts(is_metric, lengths, dict_max_ids, metric_codecs)?;
        if digest.byte_width != byte_width {
            tabrec_bail!(
                InvalidSerde: "record layout width is {byte_width} but its columns add up to {}",
                digest.byte_width
            );
        }
        if let Some((idx, (expected, actual))) = digest
            .offsets
            .iter()
            .zip_eq(&offsets)
            .find_position(|(expected, actual)| expected != actual)
        {
            tabrec_bail!(
                InvalidSerde: "column {idx} is stored at offset {actual} but its predecessors end at {expected}"
            );
        }
        Ok(digest)
    }
}

fn read_column_codec(
    idx: usize,
    is_metric: bool,
    tag: i32,
    length: usize,
    max_id: u32,
    codecs: &CodecRegistry,
) -> TabrecResult<Option<FixedLenCodecRef>> {
    if !is_metric {
        if tag != NO_CODEC {
            tabrec_bail!(InvalidSerde: "dimension column {idx} has codec type {tag}");
        }
        if !(1..=MAX_ID_WIDTH).contains(&length) || max_id > id_capacity(length) {
            tabrec_bail!(
                InvalidSerde: "dimension column {idx} has max id {max_id} in a {length}-byte slot"
            );
        }
        return Ok(None);
    }

    if max_id != 0 {
        tabrec_bail!(InvalidSerde: "metric column {idx} has dictionary max id {max_id}");
    }
    let ptype = u8::try_from(tag)
        .ok()
        .and_then(|tag| PType::try_from(tag).ok())
        .ok_or_else(|| tabrec_err!(InvalidSerde: "metric column {idx} has unknown codec type {tag}"))?;
    let codec = codecs.codec(&DType::Primitive(ptype))?;
    if codec.length() != length {
        tabrec_bail!(
            InvalidSerde: "metric column {idx} is {length} bytes wide but its {ptype} codec needs {}",
            codec.length()
        );
    }
    Ok(Some(codec))
}

fn to_i32(value: usize) -> TabrecResult<i32> {
    i32::try_from(value).map_err(|_| tabrec_err!("{value} does not fit in a persisted record layout"))
}

fn to_i32s(values: &[usize]) -> TabrecResult<Vec<i32>> {
    values.iter().map(|v| to_i32(*v)).collect()
}

fn from_i32(value: i32) -> TabrecResult<usize> {
    usize::try_from(value).map_err(|_| tabrec_err!(InvalidSerde: "negative size {value} in record layout"))
}

fn from_i32s(values: Vec<i32>) -> TabrecResult<Vec<usize>> {
    values.into_iter().map(from_i32).collect()
}

impl RecordLayoutDigestInner {
    pub fn column_count(&self) -> usize {
        self.lengths.len()
    }

    /// Total number of bytes in one record.
    pub fn byte_width(&self) -> usize {
        self.byte_width
    }

    pub fn metric_count(&self) -> usize {
        self.is_metric.iter().filter(|m| **m).count()
    }

    /// ## Panics
    ///
    /// If `idx` is not a column of this layout.
    pub fn is_metric(&self, idx: usize) -> bool {
        self.is_metric[idx]
    }

    /// ## Panics
    ///
    /// If `idx` is not a column of this layout.
    pub fn length(&self, idx: usize) -> usize {
        self.lengths[idx]
    }

    /// ## Panics
    ///
    /// If `idx` is not a column of this layout.
    pub fn offset(&self, idx: usize) -> usize {
        self.offsets[idx]
    }

    /// The dictionary's max ID at build time for a dimension column, `0` for a metric column.
    ///
    /// ## Panics
    ///
    /// If `idx` is not a column of this layout.
    pub fn dict_max_id(&self, idx: usize) -> u32 {
        self.dict_max_ids[idx]
    }

    pub fn is_metrics(&self) -> &[bool] {
        &self.is_metric
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn dict_max_ids(&self) -> &[u32] {
        &self.dict_max_ids
    }

    /// The byte range of column `idx` within a record.
    pub fn column_range(&self, idx: usize) -> TabrecResult<Range<usize>> {
        let ncols = self.column_count();
        if idx >= ncols {
            tabrec_bail!(OutOfBounds: idx, 0, ncols);
        }
        let start = self.offsets[idx];
        Ok(start..start + self.lengths[idx])
    }

    /// The codec of metric column `idx`.
    pub fn metric_codec(&self, idx: usize) -> TabrecResult<&FixedLenCodecRef> {
        let ncols = self.column_count();
        self.codecs
            .get(idx)
            .ok_or_else(|| tabrec_err!(OutOfBounds: idx, 0, ncols))?
            .as_ref()
            .ok_or_else(|| tabrec_err!("column {idx} is a dimension column and has no codec"))
    }

    /// The largest dictionary ID the slot of dimension column `idx` can hold.
    pub fn id_capacity(&self, idx: usize) -> TabrecResult<u32> {
        self.check_dimension(idx)?;
        Ok(id_capacity(self.lengths[idx]))
    }

    pub(crate) fn check_dimension(&self, idx: usize) -> TabrecResult<()> {
        let ncols = self.column_count();
        match self.is_metric.get(idx) {
            None => tabrec_bail!(OutOfBounds: idx, 0, ncols),
            Some(true) => tabrec_bail!("column {idx} is a metric column, not a dimension"),
            Some(false) => Ok(()),
        }
    }
}

impl PartialEq for RecordLayoutDigest {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.byte_width == other.byte_width
            && self.is_metric == other.is_metric
            && self.lengths == other.lengths
            && self.offsets == other.offsets
            && self.dict_max_ids == other.dict_max_ids
            && self.codecs.len() == other.codecs.len()
            && self
                .codecs
                .iter()
                .zip(other.codecs.iter())
                .all(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => a.dtype() == b.dtype() && a.length() == b.length(),
                    (None, None) => true,
                    _ => false,
                })
    }
}

impl Eq for RecordLayoutDigest {}
