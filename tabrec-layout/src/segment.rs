use std::fmt::Debug;
use std::sync::Arc;

use tabrec_dtype::{ColumnRef, TableDesc};

/// A stored slice of a table's data that a resolver can be bound to.
///
/// The segment owns the table descriptor and knows where each dimension column's dictionary
/// lives; the dictionaries themselves are loaded through a
/// [`DictionaryProvider`](tabrec_dict::DictionaryProvider).
pub trait Segment: Debug + Send + Sync {
    /// A stable identifier. Two resolvers bound to segments with the same ID are equal.
    fn id(&self) -> &str;

    fn desc(&self) -> &Arc<TableDesc>;

    /// The resource path of the dictionary for `column`, or `None` if the segment has none.
    fn dictionary_path(&self, column: &ColumnRef) -> Option<String>;
}

pub type SegmentRef = Arc<dyn Segment>;
