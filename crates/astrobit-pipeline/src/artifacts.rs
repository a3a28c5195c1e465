//! The read-only bundle of loaded model artifacts.

use std::path::{Path, PathBuf};

use astrobit_forest::{LabelEncoder, RandomForest, VotingPolicy};
use astrobit_io::{FeatureSchema, StandardScaler};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::PipelineError;

/// Where to find each artifact on disk.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Ensemble: `.json` exported arrays or `.bin` envelope.
    pub model: PathBuf,
    /// Scaler parameters JSON.
    pub scaler: PathBuf,
    /// Label encoder JSON.
    pub labels: PathBuf,
    /// Evaluation metrics JSON; optional.
    pub metrics: Option<PathBuf>,
}

/// Everything inference needs, loaded once and never mutated.
///
/// Metrics are the exception: when they come from a file, that file is read
/// on every [`ModelArtifacts::metrics`] call.
#[derive(Debug)]
pub struct ModelArtifacts {
    schema: FeatureSchema,
    scaler: StandardScaler,
    forest: RandomForest,
    labels: LabelEncoder,
    metrics: Option<Value>,
    metrics_path: Option<PathBuf>,
    voting: VotingPolicy,
}

impl ModelArtifacts {
    /// Bundle artifacts after checking they agree with each other.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigMismatch`] when the scaler, forest,
    /// label encoder, and schema disagree on feature or class counts, or the
    /// forest's recorded feature names differ from the schema.
    pub fn new(
        schema: FeatureSchema,
        scaler: StandardScaler,
        forest: RandomForest,
        labels: LabelEncoder,
    ) -> Result<Self, PipelineError> {
        let n = schema.len();
        if scaler.n_features() != n {
            return Err(mismatch(format!(
                "scaler has {} features, schema has {n}",
                scaler.n_features()
            )));
        }
        if forest.n_features() != n {
            return Err(mismatch(format!(
                "forest has {} features, schema has {n}",
                forest.n_features()
            )));
        }
        if !forest.feature_names().is_empty() && forest.feature_names() != schema.names() {
            return Err(mismatch(format!(
                "forest feature names {:?} differ from schema {:?}",
                forest.feature_names(),
                schema.names()
            )));
        }
        if labels.len() != forest.n_classes() {
            return Err(mismatch(format!(
                "label encoder has {} classes, forest has {}",
                labels.len(),
                forest.n_classes()
            )));
        }
        Ok(Self {
            schema,
            scaler,
            forest,
            labels,
            metrics: None,
            metrics_path: None,
            voting: VotingPolicy::default(),
        })
    }

    /// Attach evaluation metrics held in memory instead of a file.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Value) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Serve metrics from a file, read afresh on every [`ModelArtifacts::metrics`] call.
    #[must_use]
    pub fn with_metrics_file(mut self, path: PathBuf) -> Self {
        self.metrics_path = Some(path);
        self
    }

    /// Choose how tree votes are combined.
    #[must_use]
    pub fn with_voting(mut self, voting: VotingPolicy) -> Self {
        self.voting = voting;
        self
    }

    /// Load every artifact for the exoplanet schema.
    ///
    /// Only the path of the metrics file is recorded here. Its absence is
    /// logged, and a bad metrics file never fails the load.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`PipelineError::ArtifactMissing`] | model, scaler, or labels file absent |
    /// | [`PipelineError::CorruptArtifact`] | an artifact cannot be parsed or validated |
    /// | [`PipelineError::ConfigMismatch`] | the artifacts disagree |
    #[instrument(skip_all, fields(model = %paths.model.display()))]
    pub fn load(paths: &ArtifactPaths) -> Result<Self, PipelineError> {
        let forest = RandomForest::open(&paths.model).map_err(|e| {
            PipelineError::artifact("model", paths.model.clone(), e.is_not_found(), e)
        })?;
        let scaler = StandardScaler::load(&paths.scaler).map_err(|e| {
            PipelineError::artifact("scaler", paths.scaler.clone(), e.is_not_found(), e)
        })?;
        let labels = LabelEncoder::load(&paths.labels).map_err(|e| {
            PipelineError::artifact("labels", paths.labels.clone(), e.is_not_found(), e)
        })?;

        let mut artifacts = Self::new(FeatureSchema::exoplanet(), scaler, forest, labels)?;
        if let Some(path) = &paths.metrics {
            if !path.exists() {
                warn!(path = %path.display(), "metrics file not found, /model_metrics will return 404");
            }
            artifacts = artifacts.with_metrics_file(path.clone());
        }

        info!(
            n_trees = artifacts.forest.n_trees(),
            n_features = artifacts.schema.len(),
            n_classes = artifacts.labels.len(),
            has_metrics = artifacts.metrics_path.is_some(),
            "model artifacts loaded"
        );
        Ok(artifacts)
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the scaler.
    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Return the ensemble.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the label encoder.
    #[must_use]
    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Return the voting policy.
    #[must_use]
    pub fn voting(&self) -> VotingPolicy {
        self.voting
    }

    /// Return the evaluation metrics, re-reading the metrics file if one is configured.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`PipelineError::ArtifactMissing`] | no metrics attached, or the file is absent |
    /// | [`PipelineError::CorruptArtifact`] | the file is unreadable or not JSON |
    pub fn metrics(&self) -> Result<Value, PipelineError> {
        if let Some(metrics) = &self.metrics {
            return Ok(metrics.clone());
        }
        match &self.metrics_path {
            Some(path) => load_metrics(path),
            None => Err(PipelineError::ArtifactMissing {
                artifact: "metrics",
                path: PathBuf::new(),
            }),
        }
    }

    /// Describe the loaded model.
    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        let trees = self.forest.trees();
        ModelSummary {
            n_trees: trees.len(),
            n_features: self.schema.len(),
            n_classes: self.labels.len(),
            classes: self.labels.classes().to_vec(),
            feature_names: self.schema.names().to_vec(),
            voting: self.voting,
            total_nodes: trees.iter().map(|t| t.n_nodes()).sum(),
            total_leaves: trees.iter().map(|t| t.n_leaves()).sum(),
            max_depth: trees.iter().map(|t| t.depth()).max().unwrap_or(0),
        }
    }
}

/// Shape of the loaded model, for `/health` and `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Features per sample.
    pub n_features: usize,
    /// Output classes.
    pub n_classes: usize,
    /// Class names in index order.
    pub classes: Vec<String>,
    /// Feature names in column order.
    pub feature_names: Vec<String>,
    /// Voting policy in use.
    pub voting: VotingPolicy,
    /// Node count summed over all trees.
    pub total_nodes: usize,
    /// Leaf count summed over all trees.
    pub total_leaves: usize,
    /// Depth of the deepest tree.
    pub max_depth: usize,
}

/// Read a metrics JSON document.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`PipelineError::ArtifactMissing`] | the file does not exist |
/// | [`PipelineError::CorruptArtifact`] | the file is unreadable or not JSON |
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_metrics(path: &Path) -> Result<Value, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        let not_found = e.kind() == std::io::ErrorKind::NotFound;
        PipelineError::artifact("metrics", path.to_path_buf(), not_found, e)
    })?;
    serde_json::from_str(&text)
        .map_err(|e| PipelineError::artifact("metrics", path.to_path_buf(), false, e))
}

fn mismatch(reason: String) -> PipelineError {
    PipelineError::ConfigMismatch { reason }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::tests::{sample_artifacts, write_artifacts};

    #[test]
    fn load_from_files() {
        let dir = TempDir::new().unwrap();
        let paths = write_artifacts(dir.path(), true);
        let artifacts = ModelArtifacts::load(&paths).unwrap();
        assert_eq!(artifacts.forest().n_trees(), 3);
        assert_eq!(artifacts.labels().classes().len(), 3);
        assert!(artifacts.metrics().is_ok());
    }

    #[test]
    fn missing_required_artifact() {
        let dir = TempDir::new().unwrap();
        let paths = write_artifacts(dir.path(), false);
        fs::remove_file(&paths.scaler).unwrap();
        let err = ModelArtifacts::load(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactMissing { artifact: "scaler", .. }));
    }

    #[test]
    fn missing_metrics_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let mut paths = write_artifacts(dir.path(), false);
        paths.metrics = Some(dir.path().join("absent.json"));
        let artifacts = ModelArtifacts::load(&paths).unwrap();
        let err = artifacts.metrics().unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn corrupt_metrics_only_fails_metrics() {
        let dir = TempDir::new().unwrap();
        let paths = write_artifacts(dir.path(), true);
        let metrics = paths.metrics.clone().unwrap();
        fs::write(&metrics, "{truncated").unwrap();

        let artifacts = ModelArtifacts::load(&paths).unwrap();
        let err = artifacts.metrics().unwrap_err();
        assert!(matches!(err, PipelineError::CorruptArtifact { artifact: "metrics", .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn metrics_written_after_load_are_served() {
        let dir = TempDir::new().unwrap();
        let mut paths = write_artifacts(dir.path(), false);
        let metrics = dir.path().join("late.json");
        paths.metrics = Some(metrics.clone());
        let artifacts = ModelArtifacts::load(&paths).unwrap();
        assert_eq!(artifacts.metrics().unwrap_err().status_code(), 404);

        fs::write(&metrics, r#"{"accuracy": 0.88}"#).unwrap();
        assert_eq!(artifacts.metrics().unwrap()["accuracy"], 0.88);
    }

    #[test]
    fn corrupt_labels_rejected() {
        let dir = TempDir::new().unwrap();
        let paths = write_artifacts(dir.path(), false);
        fs::write(&paths.labels, "{not json").unwrap();
        let err = ModelArtifacts::load(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptArtifact { artifact: "labels", .. }));
    }

    #[test]
    fn class_count_mismatch_rejected() {
        let a = sample_artifacts();
        let labels = LabelEncoder::new(vec!["A".into(), "B".into()]).unwrap();
        let err = ModelArtifacts::new(
            a.schema().clone(),
            a.scaler().clone(),
            a.forest().clone(),
            labels,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigMismatch { .. }));
    }

    #[test]
    fn scaler_width_mismatch_rejected() {
        let a = sample_artifacts();
        let scaler = StandardScaler::new(vec![0.0; 6], vec![1.0; 6]).unwrap();
        let err = ModelArtifacts::new(
            a.schema().clone(),
            scaler,
            a.forest().clone(),
            a.labels().clone(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigMismatch { reason } if reason.contains("scaler")));
    }

    #[test]
    fn summary_reports_shape() {
        let s = sample_artifacts().summary();
        assert_eq!(s.n_trees, 3);
        assert_eq!(s.n_features, 7);
        assert_eq!(s.classes, vec!["CANDIDATE", "CONFIRMED", "FALSE POSITIVE"]);
        assert_eq!(s.voting, VotingPolicy::Majority);
        assert_eq!(s.total_nodes, 9);
        assert_eq!(s.total_leaves, 6);
        assert_eq!(s.max_depth, 2);
    }
}
