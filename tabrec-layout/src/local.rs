use std::fmt::Debug;

use tabrec_dtype::TableDesc;

/// Chooses the dimension columns whose dictionaries are private to one segment.
///
/// [`RecordLayoutResolver::update_local_dictionaries`](crate::RecordLayoutResolver::update_local_dictionaries)
/// rebinds exactly these columns, in the order returned.
pub trait LocalDictionaryPolicy: Debug + Send + Sync {
    fn local_dictionary_columns(&self, desc: &TableDesc) -> Vec<usize>;
}

/// Every dictionary is global; no column is rebound locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocalDictionaries;

impl LocalDictionaryPolicy for NoLocalDictionaries {
    fn local_dictionary_columns(&self, _desc: &TableDesc) -> Vec<usize> {
        Vec::new()
    }
}
