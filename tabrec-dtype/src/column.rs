use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::DType;

/// A reference to a column of a source table.
///
/// A column is identified by its originating table and its name; the dtype is carried along
/// but does not take part in equality or hashing.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnRef {
    table: Arc<str>,
    name: Arc<str>,
    dtype: DType,
}

impl ColumnRef {
    /// Create a new column reference.
    pub fn new(table: impl Into<Arc<str>>, name: impl Into<Arc<str>>, dtype: DType) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            dtype,
        }
    }

    /// The name of the table this column originates from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The logical type of the column's values.
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Whether this column is `column` of `table`.
    ///
    /// Table names are compared exactly, column names ignoring ASCII case.
    pub fn is_same_as(&self, table: &str, column: &str) -> bool {
        self.table.as_ref() == table && self.name.eq_ignore_ascii_case(column)
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.name == other.name
    }
}

impl Eq for ColumnRef {}

impl Hash for ColumnRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.name.hash(state);
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::{ColumnRef, DType, PType};

    #[test]
    fn identity_ignores_dtype() {
        let a = ColumnRef::new("FACT", "PRICE", DType::Primitive(PType::F64));
        let b = ColumnRef::new("FACT", "PRICE", DType::Utf8);
        assert_eq!(a, b);
        assert_eq!(HashSet::from([a, b]).len(), 1);
    }

    #[test]
    fn same_as_ignores_column_case() {
        let col = ColumnRef::new("FACT", "SELLER_ID", DType::Utf8);
        assert!(col.is_same_as("FACT", "seller_id"));
        assert!(!col.is_same_as("fact", "SELLER_ID"));
        assert!(!col.is_same_as("FACT", "SELLER"));
        assert_eq!(col.to_string(), "FACT.SELLER_ID");
    }
}
