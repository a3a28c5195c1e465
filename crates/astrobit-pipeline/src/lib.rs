//! Artifact loading and the classify / explain entry points shared by the CLI and HTTP server.

mod artifacts;
mod classify;
mod error;
mod explain;

pub use artifacts::{load_metrics, ArtifactPaths, ModelArtifacts, ModelSummary};
pub use classify::{classify, classify_json, Classified, ClassifyRequest, CLASSIFICATION_FIELD};
pub use error::{PipelineError, RENDER_FAILURE_MESSAGE};
pub use explain::{
    decision_path_image, random_tree_image, trace_image, trace_row, tree_image, RowTrace,
    TreeImage, DEFAULT_TREE, OVERVIEW_DEPTH,
};

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::Path;

    use astrobit_forest::{ExportedForest, ExportedTree, LabelEncoder, RandomForest};
    use astrobit_io::{FeatureSchema, StandardScaler, EXOPLANET_FEATURES};
    use serde_json::json;

    use super::*;

    fn leaf_arrays(n: usize) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<f64>) {
        (vec![-1; n], vec![-1; n], vec![-2; n], vec![-2.0; n])
    }

    /// Three trees over the seven exoplanet features and three classes.
    ///
    /// - tree 0: `orbital_period <= 1.0` → CANDIDATE, else
    ///   `planet_radius <= 2.0` → CONFIRMED / FALSE POSITIVE
    /// - tree 1: `orbital_period <= 1.0` → CANDIDATE / CONFIRMED
    /// - tree 2: a single leaf leaning CONFIRMED
    pub(crate) fn sample_export() -> ExportedForest {
        let t0 = ExportedTree {
            children_left: vec![1, -1, 3, -1, -1],
            children_right: vec![2, -1, 4, -1, -1],
            feature: vec![0, -2, 3, -2, -2],
            threshold: vec![1.0, -2.0, 2.0, -2.0, -2.0],
            impurity: vec![0.66, 0.0, 0.5, 0.0, 0.0],
            n_node_samples: vec![30, 10, 20, 10, 10],
            value: vec![
                vec![10.0, 10.0, 10.0],
                vec![10.0, 0.0, 0.0],
                vec![0.0, 10.0, 10.0],
                vec![0.0, 10.0, 0.0],
                vec![0.0, 0.0, 10.0],
            ],
        };
        let t1 = ExportedTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![1.0, -2.0, -2.0],
            impurity: vec![0.5, 0.0, 0.0],
            n_node_samples: vec![20, 10, 10],
            value: vec![vec![1.0, 1.0, 0.0], vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
        };
        let (children_left, children_right, feature, threshold) = leaf_arrays(1);
        let t2 = ExportedTree {
            children_left,
            children_right,
            feature,
            threshold,
            impurity: vec![0.62],
            n_node_samples: vec![10],
            value: vec![vec![0.2, 0.5, 0.3]],
        };
        ExportedForest {
            n_features: 7,
            n_classes: 3,
            feature_names: EXOPLANET_FEATURES.iter().map(|s| (*s).to_string()).collect(),
            trees: vec![t0, t1, t2],
        }
    }

    fn sample_scaler() -> StandardScaler {
        let mut mean = vec![0.0; 7];
        let mut scale = vec![1.0; 7];
        mean[0] = 1.0;
        scale[0] = 2.0;
        StandardScaler::new(mean, scale).unwrap()
    }

    fn class_names() -> Vec<String> {
        vec!["CANDIDATE".into(), "CONFIRMED".into(), "FALSE POSITIVE".into()]
    }

    /// Scaled `orbital_period` is `(P - 1) / 2`; every other feature passes through.
    pub(crate) fn sample_artifacts() -> ModelArtifacts {
        ModelArtifacts::new(
            FeatureSchema::exoplanet(),
            sample_scaler(),
            RandomForest::from_export(sample_export()).unwrap(),
            LabelEncoder::new(class_names()).unwrap(),
        )
        .unwrap()
    }

    /// Write the sample artifacts as files and return their paths.
    pub(crate) fn write_artifacts(dir: &Path, with_metrics: bool) -> ArtifactPaths {
        let model = dir.join("model.json");
        let scaler = dir.join("scaler.json");
        let labels = dir.join("labels.json");
        fs::write(&model, serde_json::to_string(&sample_export()).unwrap()).unwrap();
        fs::write(&scaler, serde_json::to_string(&sample_scaler()).unwrap()).unwrap();
        fs::write(&labels, json!({"classes": class_names()}).to_string()).unwrap();
        let metrics = with_metrics.then(|| {
            let path = dir.join("metrics.json");
            let body = json!({"accuracy": 0.91, "classification_report": {"weighted avg": {"f1-score": 0.9}}});
            fs::write(&path, body.to_string()).unwrap();
            path
        });
        ArtifactPaths {
            model,
            scaler,
            labels,
            metrics,
        }
    }
}
