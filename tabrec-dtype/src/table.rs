use std::collections::HashSet;
use std::sync::Arc;

use tabrec_error::{TabrecResult, tabrec_bail};

use crate::ColumnRef;

/// The ordered column set of one logical table, as stored in an index segment.
///
/// Column order is the canonical order used by every record layout built on top of this
/// descriptor; it is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableDesc {
    fact_table: Arc<str>,
    columns: Arc<[ColumnRef]>,
    metrics: Arc<[bool]>,
    timestamp_column: Option<usize>,
}

impl TableDesc {
    /// Create a new descriptor from `(column, is_metric)` pairs in column order.
    ///
    /// Fails if a column appears twice or if a metric column is not of a primitive type.
    pub fn try_new(
        fact_table: impl Into<Arc<str>>,
        columns: impl IntoIterator<Item = (ColumnRef, bool)>,
    ) -> TabrecResult<Self> {
        let (columns, metrics): (Vec<ColumnRef>, Vec<bool>) = columns.into_iter().unzip();

        let mut seen = HashSet::with_capacity(columns.len());
        for (column, is_metric) in columns.iter().zip(metrics.iter()) {
            if !seen.insert(column) {
                tabrec_bail!("duplicate column {column} in table descriptor");
            }
            if *is_metric && !column.dtype().is_primitive() {
                tabrec_bail!(
                    "metric column {column} must have a primitive type, found {}",
                    column.dtype()
                );
            }
        }

        Ok(Self {
            fact_table: fact_table.into(),
            columns: columns.into(),
            metrics: metrics.into(),
            timestamp_column: None,
        })
    }

    /// Designate the column at `index` as the table's timestamp column.
    pub fn with_timestamp_column(mut self, index: usize) -> TabrecResult<Self> {
        if index >= self.columns.len() {
            tabrec_bail!(OutOfBounds: index, 0, self.columns.len());
        }
        self.timestamp_column = Some(index);
        Ok(self)
    }

    pub fn fact_table(&self) -> &str {
        &self.fact_table
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnRef> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns whether the column at `index` is a metric. Out of range indices are not metrics.
    pub fn is_metric(&self, index: usize) -> bool {
        self.metrics.get(index).copied().unwrap_or(false)
    }

    pub fn metric_flags(&self) -> &[bool] {
        &self.metrics
    }

    /// Find the position of a column.
    /// Returns `None` if the column is not part of this table.
    pub fn find_column(&self, column: &ColumnRef) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn timestamp_column(&self) -> Option<usize> {
        self.timestamp_column
    }
}
