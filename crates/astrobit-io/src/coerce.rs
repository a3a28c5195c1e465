//! Numeric coercion of mapped cells and default-value imputation.

use serde::Serialize;
use tracing::debug;

use crate::mapping::MappedTable;
use crate::matrix::ProcessedMatrix;
use crate::record::CellValue;
use crate::IoError;

/// Value written into every cell that is missing or fails to parse.
pub const DEFAULT_FILL: f64 = 0.0;

/// Parse a cell to a finite number.
///
/// Text is trimmed before parsing. Anything unparseable, empty, or
/// non-finite (`"NaN"`, `"inf"`) is `None`.
#[must_use]
pub fn to_number(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Missing => return None,
    };
    value.is_finite().then_some(value)
}

/// How many cells were replaced by [`DEFAULT_FILL`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImputationReport {
    /// Imputed cell count per feature column.
    pub per_feature: Vec<usize>,
    /// Total imputed cells.
    pub total: usize,
}

/// Coerce every mapped cell and impute the failures.
///
/// # Errors
///
/// Only fails if the mapped table itself is ragged, which [`resolve`]
/// never produces.
///
/// [`resolve`]: crate::resolve
pub fn coerce_and_impute(
    table: &MappedTable,
) -> Result<(ProcessedMatrix, ImputationReport), IoError> {
    let n_features = table.n_features();
    let mut report = ImputationReport {
        per_feature: vec![0; n_features],
        total: 0,
    };

    let rows = table
        .rows()
        .iter()
        .map(|cells| {
            cells
                .iter()
                .enumerate()
                .map(|(j, cell)| {
                    to_number(cell).unwrap_or_else(|| {
                        report.per_feature[j] += 1;
                        report.total += 1;
                        DEFAULT_FILL
                    })
                })
                .collect()
        })
        .collect();

    debug!(
        n_rows = table.n_rows(),
        imputed = report.total,
        "coerced mapped cells"
    );
    let matrix = ProcessedMatrix::new(n_features, rows)?;
    Ok((matrix, report))
}
