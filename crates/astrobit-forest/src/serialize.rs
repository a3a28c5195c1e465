//! Compiled ensemble serialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the forest.
    n_trees: usize,
    /// Number of features the model was trained on.
    n_features: usize,
    /// Number of classes.
    n_classes: usize,
    /// The serialized forest.
    forest: RandomForest,
}

impl RandomForest {
    /// Save the model to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope for
    /// forward-compatibility checking.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            forest: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| ForestError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ForestError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// Checks the format version and re-validates every tree, so a
    /// hand-edited or truncated file cannot produce a non-terminating
    /// traversal.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadArtifact`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ForestError::InvalidTree`] | a decoded tree is structurally invalid |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadArtifact {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope = bincode::deserialize(&bytes).map_err(|e| {
            ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            "model loaded"
        );

        let RandomForest {
            trees,
            n_features,
            n_classes,
            feature_names,
        } = envelope.forest;
        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(tree, t)| {
                crate::DecisionTree::new(t.nodes, t.n_features, t.n_classes).map_err(|e| {
                    ForestError::InvalidTree {
                        tree,
                        source: Box::new(e),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(trees, n_features, n_classes, feature_names)
    }

    /// Load an ensemble, picking the format from the file extension.
    ///
    /// `.json` files are read as exported node arrays
    /// ([`RandomForest::load_json`]); anything else as a bincode envelope
    /// ([`RandomForest::load`]).
    ///
    /// # Errors
    ///
    /// Propagates the error of the selected loader.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::load_json(path),
            _ => Self::load(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::forest::tests::sample_forest;
    use crate::forest::RandomForest;
    use crate::predict::VotingPolicy;

    #[test]
    fn round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("test_model.bin");

        let forest = sample_forest();
        forest.save(&model_path).unwrap();
        let loaded = RandomForest::load(&model_path).unwrap();

        let test_samples = vec![vec![0.5, -1.0], vec![5.0, 1.0], vec![1.0, 0.0]];
        for sample in &test_samples {
            let orig = forest.predict(sample, VotingPolicy::Majority).unwrap();
            let restored = loaded.predict(sample, VotingPolicy::Majority).unwrap();
            assert_eq!(orig, restored, "predictions differ for sample {sample:?}");
            assert_eq!(
                forest.trace(0, sample).unwrap().path,
                loaded.trace(0, sample).unwrap().path
            );
        }
        assert_eq!(loaded.feature_names(), forest.feature_names());
    }

    #[test]
    fn open_dispatches_on_extension() {
        let dir = TempDir::new().unwrap();
        let bin_path = dir.path().join("model.bin");
        sample_forest().save(&bin_path).unwrap();
        assert_eq!(RandomForest::open(&bin_path).unwrap().n_trees(), 3);

        let json_path = dir.path().join("model.JSON");
        std::fs::write(&json_path, b"{}").unwrap();
        let err = RandomForest::open(&json_path).unwrap_err();
        assert!(matches!(err, crate::ForestError::ParseJson { .. }));
    }

    #[test]
    fn load_nonexistent_file_error() {
        let err = RandomForest::load("/tmp/nonexistent_model_abc123.bin").unwrap_err();
        assert!(matches!(err, crate::ForestError::ReadArtifact { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, crate::ForestError::DeserializeModel { .. }));
    }
}
