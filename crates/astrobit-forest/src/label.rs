use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument};

use crate::error::ForestError;

/// Bijection between class indices used inside the trees and class names.
///
/// Loaded from `{"classes": ["CANDIDATE", "CONFIRMED", ...]}`; position in
/// the list is the class index.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

#[derive(serde::Deserialize)]
struct LabelEncoderFile {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Create an encoder from class names in index order.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyLabelEncoder`] | `classes` is empty |
    /// | [`ForestError::DuplicateClassLabel`] | a name appears twice |
    pub fn new(classes: Vec<String>) -> Result<Self, ForestError> {
        if classes.is_empty() {
            return Err(ForestError::EmptyLabelEncoder);
        }
        let mut seen = HashSet::with_capacity(classes.len());
        for label in &classes {
            if !seen.insert(label.as_str()) {
                return Err(ForestError::DuplicateClassLabel {
                    label: label.clone(),
                });
            }
        }
        Ok(Self { classes })
    }

    /// Load an encoder from a JSON artifact.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadArtifact`] | file read failed |
    /// | [`ForestError::ParseJson`] | not a `{"classes": [...]}` document |
    /// | [`ForestError::EmptyLabelEncoder`] / [`ForestError::DuplicateClassLabel`] | not a bijection |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadArtifact {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: LabelEncoderFile =
            serde_json::from_slice(&bytes).map_err(|e| ForestError::ParseJson {
                path: path.to_path_buf(),
                source: e,
            })?;
        let encoder = Self::new(file.classes)?;
        info!(n_classes = encoder.len(), "label encoder loaded");
        Ok(encoder)
    }

    /// Return the class name for an index.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::UnknownClassIndex`] when `index >= len()`.
    pub fn decode(&self, index: usize) -> Result<&str, ForestError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(ForestError::UnknownClassIndex {
                index,
                n_classes: self.classes.len(),
            })
    }

    /// Return all class names in index order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Return the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always `false`: an encoder has at least one class.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
