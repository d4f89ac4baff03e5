//! Source rows.

use serde_json::{Map, Value};

/// One table row: column name to value.
///
/// A JSON `null` (or an absent column) means the value is missing. Empty
/// strings, `false` and `0` are present values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Map<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    /// The value of a column, or `None` if it is absent or null.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column).filter(|value| !value.is_null())
    }

    /// Consume the row, keeping only columns with a present value.
    pub fn into_present(self) -> impl Iterator<Item = (String, Value)> {
        self.columns.into_iter().filter(|(_, value)| !value.is_null())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(columns: Map<String, Value>) -> Self {
        Self { columns }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
