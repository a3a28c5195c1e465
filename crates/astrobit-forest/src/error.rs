use std::path::PathBuf;

/// Errors from loading and evaluating a tree ensemble.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when an ensemble contains no trees.
    #[error("ensemble has no trees")]
    EmptyForest,

    /// Returned when a tree or ensemble declares zero feature columns.
    #[error("model declares zero feature columns")]
    ZeroFeatures,

    /// Returned when a tree or ensemble declares zero classes.
    #[error("model declares zero classes")]
    ZeroClasses,

    /// Returned when a tree has no nodes.
    #[error("tree has no nodes")]
    EmptyTree,

    /// Returned when a node violates a structural invariant of the arena.
    #[error("malformed node {node}: {reason}")]
    MalformedNode {
        /// Arena index of the offending node.
        node: usize,
        /// Human-readable description of the violated invariant.
        reason: String,
    },

    /// Returned when one tree of an ensemble fails validation.
    #[error("tree {tree} is invalid")]
    InvalidTree {
        /// Zero-based position of the tree in the ensemble.
        tree: usize,
        /// The validation error for that tree.
        #[source]
        source: Box<ForestError>,
    },

    /// Returned when a tree disagrees with the ensemble on its input or output shape.
    #[error("tree {tree} has {got_features} features / {got_classes} classes, ensemble expects {n_features} / {n_classes}")]
    TreeShapeMismatch {
        /// Zero-based position of the tree in the ensemble.
        tree: usize,
        /// Feature count declared by the ensemble.
        n_features: usize,
        /// Class count declared by the ensemble.
        n_classes: usize,
        /// Feature count of the tree.
        got_features: usize,
        /// Class count of the tree.
        got_classes: usize,
    },

    /// Returned when the number of feature names differs from the feature count.
    #[error("ensemble has {got} feature names, expected {expected}")]
    FeatureNameCount {
        /// The ensemble's feature count.
        expected: usize,
        /// The number of names supplied.
        got: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a tree index outside the ensemble is requested.
    #[error("tree index {index} out of range for ensemble of {n_trees} trees")]
    TreeIndexOutOfRange {
        /// The requested tree index.
        index: usize,
        /// Number of trees in the ensemble.
        n_trees: usize,
    },

    /// Returned when parallel arrays of an exported tree differ in length.
    #[error("exported tree array `{field}` has length {got}, expected {expected}")]
    ExportArrayLength {
        /// Name of the mismatched array.
        field: &'static str,
        /// Length of the `children_left` array.
        expected: usize,
        /// Actual length of the array.
        got: usize,
    },

    /// Returned when a label encoder carries no classes.
    #[error("label encoder has no classes")]
    EmptyLabelEncoder,

    /// Returned when a label encoder maps two indices to the same name.
    #[error("label encoder lists class \"{label}\" more than once")]
    DuplicateClassLabel {
        /// The repeated class name.
        label: String,
    },

    /// Returned when a class index has no name in the label encoder.
    #[error("class index {index} is outside the label encoder's {n_classes} classes")]
    UnknownClassIndex {
        /// The class index that could not be decoded.
        index: usize,
        /// Number of classes known to the encoder.
        n_classes: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a JSON artifact cannot be parsed.
    #[error("failed to parse JSON artifact {path}")]
    ParseJson {
        /// Path to the artifact.
        path: PathBuf,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading an artifact file fails.
    #[error("failed to read artifact from {path}")]
    ReadArtifact {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}

impl ForestError {
    /// Return `true` when the error means an artifact file could not be found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ForestError::ReadArtifact { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
