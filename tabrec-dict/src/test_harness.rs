//! In-memory dictionaries for tests and benchmarks.

use std::collections::HashMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tabrec_error::TabrecResult;

use crate::{Dictionary, DictionaryProvider, DictionaryRef};

/// An order preserving dictionary over a fixed set of strings.
///
/// Values are sorted and de-duplicated; the i-th smallest value gets ID `i`.
#[derive(Debug, Default)]
pub struct StringDictionary {
    values: Vec<Arc<str>>,
    ids: FxHashMap<Arc<str>, u32>,
}

impl StringDictionary {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values: Vec<Arc<str>> = values.into_iter().map(|v| Arc::from(v.as_ref())).collect();
        values.sort();
        values.dedup();

        let ids = values
            .iter()
            .zip(0u32..)
            .map(|(value, id)| (value.clone(), id))
            .collect();
        Self { values, ids }
    }

    /// A dictionary whose IDs run from `0` to exactly `max_id`, with values `v0`, `v1`, ...
    /// zero-padded so that string order matches ID order.
    pub fn with_max_id(max_id: u32) -> Self {
        let digits = max_id.to_string().len();
        Self::from_values((0..=max_id).map(|i| format!("v{i:0digits$}")))
    }

    pub fn into_ref(self) -> DictionaryRef {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Dictionary for StringDictionary {
    fn max_id(&self) -> u32 {
        u32::try_from(self.values.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    fn id_of(&self, value: &str) -> Option<u32> {
        self.ids.get(value).copied()
    }

    fn value_of(&self, id: u32) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.values.get(idx))
            .map(|v| v.as_ref())
    }
}

/// A dictionary service backed by a map from resource path to dictionary.
#[derive(Debug, Default)]
pub struct MemoryDictionaryProvider {
    dictionaries: HashMap<String, DictionaryRef>,
}

impl MemoryDictionaryProvider {
    pub fn with_dictionary(mut self, path: impl Into<String>, dictionary: DictionaryRef) -> Self {
        self.dictionaries.insert(path.into(), dictionary);
        self
    }
}

impl DictionaryProvider for MemoryDictionaryProvider {
    fn dictionary(&self, path: &str) -> TabrecResult<Option<DictionaryRef>> {
        Ok(self.dictionaries.get(path).cloned())
    }
}
