//! Persisted per-feature standardization.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::matrix::{ProcessedMatrix, ScaledMatrix};
use crate::IoError;

/// A fitted standard scaler: `(x - mean) / scale`, column by column.
///
/// Parameters are only ever loaded; there is no `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Create a scaler from per-feature parameters.
    ///
    /// A `scale` of exactly zero marks a constant feature and is stored as 1.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidScaler`] when the vectors are empty, differ
    /// in length, or contain non-finite values.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, IoError> {
        if mean.is_empty() {
            return Err(IoError::InvalidScaler {
                reason: "no features".into(),
            });
        }
        if mean.len() != scale.len() {
            return Err(IoError::InvalidScaler {
                reason: format!("{} means but {} scales", mean.len(), scale.len()),
            });
        }
        if let Some(j) = mean
            .iter()
            .chain(&scale)
            .position(|v| !v.is_finite())
        {
            return Err(IoError::InvalidScaler {
                reason: format!("non-finite parameter at position {}", j % mean.len()),
            });
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }

    /// Load scaler parameters from a JSON file `{"mean": [..], "scale": [..]}`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | the file cannot be read |
    /// | [`IoError::JsonParse`] | the file is not valid scaler JSON |
    /// | [`IoError::InvalidScaler`] | the parameters are unusable |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        let raw: StandardScaler =
            serde_json::from_str(&text).map_err(|e| IoError::JsonParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        let scaler = Self::new(raw.mean, raw.scale)?;
        info!(n_features = scaler.n_features(), "scaler loaded");
        Ok(scaler)
    }

    /// Apply the transform to every row.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`IoError::ScalerDimensionMismatch`] | the matrix width differs from the fitted features |
    /// | [`IoError::NonFiniteValue`] | a finite input overflowed during scaling |
    pub fn transform(&self, matrix: &ProcessedMatrix) -> Result<ScaledMatrix, IoError> {
        if matrix.n_features() != self.n_features() {
            return Err(IoError::ScalerDimensionMismatch {
                expected: self.n_features(),
                got: matrix.n_features(),
            });
        }
        let rows = matrix
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect()
            })
            .collect();
        ScaledMatrix::from_scaled(self.n_features(), rows)
    }

    /// Return the number of fitted features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Return the per-feature means.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Return the per-feature scales (zeros already replaced by 1).
    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}
