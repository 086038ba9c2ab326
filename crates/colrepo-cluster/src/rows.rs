use std::sync::Arc;

use colrepo_types::{CqlType, CqlValue};

use crate::error::{ClusterError, ClusterResult};

/// One result row. Values are positional; names resolve through the
/// column list shared by every row of the same [`RowSet`].
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Option<CqlValue>>,
}

impl Row {
    /// Value of a named column, `None` when the column is absent or null.
    pub fn get(&self, column: &str) -> Option<&CqlValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.get_index(idx)
    }

    /// Value at a column position, `None` when out of range or null.
    pub fn get_index(&self, idx: usize) -> Option<&CqlValue> {
        self.values.get(idx).and_then(|v| v.as_ref())
    }

    /// Text value of a named column.
    pub fn get_text(&self, column: &str) -> ClusterResult<&str> {
        let value = self
            .get(column)
            .ok_or_else(|| ClusterError::MissingColumn(column.to_string()))?;
        value
            .as_text()
            .ok_or_else(|| ClusterError::UnexpectedColumnType {
                column: column.to_string(),
                expected: CqlType::Text,
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows returned by one statement execution, in the store's native order.
#[derive(Clone, Debug, PartialEq)]
pub struct RowSet {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl RowSet {
    /// Build a row set from column names and positional values.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<CqlValue>>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| Row {
                columns: Arc::clone(&columns),
                values,
            })
            .collect();
        Self { columns, rows }
    }

    /// The result of a statement that returns no rows.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl IntoIterator for RowSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
