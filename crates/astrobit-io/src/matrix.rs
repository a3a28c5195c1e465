//! Dense row-major feature matrices.
//!
//! [`ProcessedMatrix`] holds imputed raw values; [`ScaledMatrix`] can only be
//! produced by [`StandardScaler::transform`](crate::StandardScaler::transform),
//! so unscaled data never reaches the forest.

use crate::IoError;

/// A fully populated matrix: every row has `n_features` finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMatrix {
    n_features: usize,
    rows: Vec<Vec<f64>>,
}

impl ProcessedMatrix {
    /// Create a matrix, validating row width and finiteness.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`IoError::RowWidth`] | a row does not have `n_features` values |
    /// | [`IoError::NonFiniteValue`] | a cell is NaN or infinite |
    pub fn new(n_features: usize, rows: Vec<Vec<f64>>) -> Result<Self, IoError> {
        check_rows(n_features, &rows)?;
        Ok(Self { n_features, rows })
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of columns.
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

/// Standardized features, ready for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledMatrix {
    n_features: usize,
    rows: Vec<Vec<f64>>,
}

impl ScaledMatrix {
    /// Values that overflowed to infinity during scaling are rejected here.
    pub(crate) fn from_scaled(n_features: usize, rows: Vec<Vec<f64>>) -> Result<Self, IoError> {
        check_rows(n_features, &rows)?;
        Ok(Self { n_features, rows })
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Consume the matrix, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }
}

fn check_rows(n_features: usize, rows: &[Vec<f64>]) -> Result<(), IoError> {
    for (row_index, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(IoError::RowWidth {
                row_index,
                expected: n_features,
                got: row.len(),
            });
        }
        if let Some(col_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(IoError::NonFiniteValue {
                row_index,
                col_index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_rejected() {
        let err = ProcessedMatrix::new(2, vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            IoError::RowWidth {
                row_index: 1,
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn nan_rejected() {
        let err = ProcessedMatrix::new(2, vec![vec![1.0, f64::NAN]]).unwrap_err();
        assert!(matches!(
            err,
            IoError::NonFiniteValue {
                row_index: 0,
                col_index: 1
            }
        ));
    }

    #[test]
    fn empty_matrix_is_valid() {
        let m = ProcessedMatrix::new(7, vec![]).unwrap();
        assert_eq!(m.n_rows(), 0);
        assert_eq!(m.n_features(), 7);
    }
}
