//! Caller-supplied rows with no fixed schema.

use serde_json::{Map, Value};

use crate::IoError;

/// A single cell value, resolved explicitly from whatever the caller sent.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// A string, possibly numeric (`"3.5"`), possibly not (`"abc"`, `""`).
    Text(String),
    /// A JSON number or boolean.
    Number(f64),
    /// `null`, or a key absent from the row.
    Missing,
}

impl CellValue {
    /// Resolve a JSON value into a cell.
    ///
    /// Booleans count as `1`/`0`; arrays and objects become their JSON text,
    /// which later fails numeric coercion.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Missing,
            Value::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64().map_or(CellValue::Missing, CellValue::Number),
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// One caller-supplied row: column name → JSON value.
///
/// The original values are kept so responses can echo the row back.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Wrap a JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Return the cell under `column`; absent keys are [`CellValue::Missing`].
    #[must_use]
    pub fn cell(&self, column: &str) -> CellValue {
        self.0.get(column).map_or(CellValue::Missing, CellValue::from_json)
    }

    /// Return `true` if the row has a key named `column`.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Return the underlying JSON object.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record, returning the underlying JSON object.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// An ordered table of raw records.
///
/// The table's column set is the union of the keys of all its rows.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    rows: Vec<RawRecord>,
}

impl RawTable {
    /// Create a table from rows.
    #[must_use]
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    /// Parse a table from a JSON array of objects.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidTable`] when `value` is not an array or one
    /// of its elements is not an object.
    pub fn from_json(value: &Value) -> Result<Self, IoError> {
        let Value::Array(items) = value else {
            return Err(IoError::InvalidTable {
                reason: "expected an array of row objects".into(),
            });
        };
        let rows = items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(RawRecord::new(map.clone())),
                _ => Err(IoError::InvalidTable {
                    reason: format!("row {i} is not an object"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Return `true` if any row has a key named `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.contains(column))
    }

    /// Return the rows in order.
    #[must_use]
    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    /// Consume the table, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<RawRecord> {
        self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
