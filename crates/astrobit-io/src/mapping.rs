//! Alignment of caller columns onto the model's feature schema.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::record::{CellValue, RawTable};
use crate::schema::FeatureSchema;
use crate::IoError;

/// Canonical feature name → caller column name.
///
/// Need not cover every feature, and two features may name the same column.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<String, String>);

impl ColumnMapping {
    /// Wrap an explicit mapping.
    #[must_use]
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Map every schema feature to a column of the same name.
    #[must_use]
    pub fn identity(schema: &FeatureSchema) -> Self {
        Self(
            schema
                .names()
                .iter()
                .map(|n| (n.clone(), n.clone()))
                .collect(),
        )
    }

    /// Parse a mapping from a JSON object of strings.
    ///
    /// `null` values leave the feature unmapped.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidMapping`] when `value` is not an object or a
    /// value is neither a string nor `null`.
    pub fn from_json(value: &Value) -> Result<Self, IoError> {
        let Value::Object(map) = value else {
            return Err(IoError::InvalidMapping {
                reason: "expected an object of feature → column names".into(),
            });
        };
        let mut entries = BTreeMap::new();
        for (feature, column) in map {
            match column {
                Value::String(c) => {
                    entries.insert(feature.clone(), c.clone());
                }
                Value::Null => {}
                other => {
                    return Err(IoError::InvalidMapping {
                        reason: format!("feature \"{feature}\" maps to non-string {other}"),
                    });
                }
            }
        }
        Ok(Self(entries))
    }

    /// Return the caller column mapped to a canonical feature.
    #[must_use]
    pub fn source_for(&self, feature: &str) -> Option<&str> {
        self.0.get(feature).map(String::as_str)
    }

    /// Return the number of mapping entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` if the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Records reshaped to the schema: `rows[i][j]` is feature `j` of row `i`.
#[derive(Debug, Clone)]
pub struct MappedTable {
    n_features: usize,
    rows: Vec<Vec<CellValue>>,
}

impl MappedTable {
    /// Return the mapped rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Return the number of feature columns (always the schema length).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Copy each mapped column into schema order.
///
/// A feature whose mapping is absent, or names a column no row has, yields
/// an all-[`CellValue::Missing`] column. Mapping keys that are not schema
/// features are ignored.
#[must_use]
pub fn resolve(table: &RawTable, mapping: &ColumnMapping, schema: &FeatureSchema) -> MappedTable {
    let sources: Vec<Option<&str>> = schema
        .names()
        .iter()
        .map(|feature| mapping.source_for(feature).filter(|col| table.has_column(col)))
        .collect();

    let unmapped: Vec<&str> = schema
        .names()
        .iter()
        .zip(&sources)
        .filter(|(_, src)| src.is_none())
        .map(|(name, _)| name.as_str())
        .collect();
    debug!(
        n_rows = table.len(),
        n_mapped = schema.len() - unmapped.len(),
        ?unmapped,
        "columns resolved"
    );

    let rows = table
        .rows()
        .iter()
        .map(|record| {
            sources
                .iter()
                .map(|src| src.map_or(CellValue::Missing, |col| record.cell(col)))
                .collect()
        })
        .collect();

    MappedTable {
        n_features: schema.len(),
        rows,
    }
}
