#![deny(missing_docs)]

//! Compact binary encoding of small primitive arrays.
//!
//! Layout metadata (column offsets, lengths, dictionary ID bounds, metric flags) is persisted
//! as a sequence of length-prefixed arrays:
//!
//! ```text
//! [u32 element count][element 0][element 1]...
//! ```
//!
//! All integers are big-endian. Booleans take one byte each and are not bit-packed: these
//! arrays hold per-column metadata, never bulk data.

pub use array::*;
pub use bytes::{Buf, BufMut, Bytes, BytesMut};

mod array;
