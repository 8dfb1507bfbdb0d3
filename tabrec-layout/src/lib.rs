//! Fixed-width binary layouts for the records of a dictionary-encoded table.
//!
//! A table's columns are either dimensions, whose string values are replaced by dictionary
//! IDs, or metrics, stored with a fixed-length codec. Given the dictionaries and codecs, a
//! [`RecordLayoutDigest`] assigns every column a byte range such that all records of the table
//! have the same width, and a [`RecordView`] reads and writes one record through it.
//!
//! The digest only knows about bytes. The [`RecordLayoutResolver`] that builds it also keeps the
//! dictionaries, so code that only moves or compares records never has to load them.
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use tabrec_dict::test_harness::StringDictionary;
//! use tabrec_dtype::{ColumnRef, DType, PType, TableDesc};
//! use tabrec_layout::{RecordLayoutResolver, ResolverOptions};
//!
//! let country = ColumnRef::new("SALES", "COUNTRY", DType::Utf8);
//! let amount = ColumnRef::new("SALES", "AMOUNT", DType::Primitive(PType::I64));
//! let desc = Arc::new(TableDesc::try_new("SALES", [(country.clone(), false), (amount, true)])?);
//!
//! let dictionaries = HashMap::from([(
//!     country,
//!     StringDictionary::from_values(["DE", "FR", "US"]).into_ref(),
//! )]);
//! let resolver =
//!     RecordLayoutResolver::try_with_dictionaries(desc, &dictionaries, &ResolverOptions::default())?;
//! assert_eq!(resolver.digest().byte_width(), 9);
//!
//! let mut record = resolver.create_record();
//! resolver.set_value_string(&mut record, 0, "FR")?;
//! record.set_metric_value(1, 1250i64)?;
//! assert_eq!(record.as_slice(), &[1, 0, 0, 0, 0, 0, 0, 0x04, 0xE2]);
//! # Ok::<(), tabrec_error::TabrecError>(())
//! ```

pub use codec::*;
pub use digest::*;
pub use local::*;
pub use options::*;
pub use record::*;
pub use resolver::*;
pub use segment::*;

mod codec;
mod digest;
mod local;
mod options;
mod record;
mod resolver;
mod segment;
