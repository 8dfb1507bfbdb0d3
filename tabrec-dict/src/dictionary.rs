use std::fmt::Debug;
use std::sync::Arc;

use tabrec_error::TabrecResult;

/// A string dictionary mapping every distinct value of a dimension column to a dense ID.
///
/// IDs range over `[0, max_id()]`. Dictionaries are built and owned by an external service;
/// record layouts only read their bounds and, for value-level access, translate between
/// strings and IDs.
pub trait Dictionary: Debug + Send + Sync {
    /// The largest ID in use, `0` for an empty dictionary.
    fn max_id(&self) -> u32;

    /// Number of bytes needed to store any ID in `[0, max_id()]`.
    fn size_of_id(&self) -> usize {
        size_of_id(self.max_id())
    }

    /// The ID assigned to `value`, if the value is part of the dictionary.
    fn id_of(&self, value: &str) -> Option<u32>;

    /// The value behind `id`, if the ID is assigned.
    fn value_of(&self, id: u32) -> Option<&str>;
}

/// A shared handle to a [`Dictionary`].
pub type DictionaryRef = Arc<dyn Dictionary>;

/// Number of bytes needed to represent every ID in `[0, max_id]`. Never less than one.
pub fn size_of_id(max_id: u32) -> usize {
    let mut size = 1;
    while size < size_of::<u32>() && (max_id >> (8 * size)) != 0 {
        size += 1;
    }
    size
}

/// The largest ID that fits in a `width`-byte slot.
pub fn id_capacity(width: usize) -> u32 {
    if width >= size_of::<u32>() {
        u32::MAX
    } else {
        (1u32 << (8 * width)) - 1
    }
}

/// The dictionary service: loads the dictionary stored at a resource path.
pub trait DictionaryProvider: Send + Sync {
    /// Load the dictionary at `path`.
    ///
    /// Returns `Ok(None)` if no dictionary exists at that path, and an error if it exists but
    /// could not be loaded.
    fn dictionary(&self, path: &str) -> TabrecResult<Option<DictionaryRef>>;
}
