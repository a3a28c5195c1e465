//! Import of ensembles exported as parallel node arrays.
//!
//! The exporting side dumps each fitted tree's internal arrays verbatim:
//!
//! ```json
//! {
//!   "n_features": 7,
//!   "n_classes": 3,
//!   "feature_names": ["orbital_period", "..."],
//!   "trees": [{
//!     "children_left":  [1, -1, -1],
//!     "children_right": [2, -1, -1],
//!     "feature":        [0, -2, -2],
//!     "threshold":      [0.25, -2.0, -2.0],
//!     "impurity":       [0.5, 0.0, 0.0],
//!     "n_node_samples": [10, 6, 4],
//!     "value":          [[5, 5], [6, 0], [0, 4]]
//!   }]
//! }
//! ```
//!
//! A child id of `-1` marks a leaf. `value` rows may be raw class counts or
//! fractions; they are normalized on import. Node ids are kept as-is.

use std::path::Path;

use tracing::{info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::node::{argmax, FeatureIndex, Impurity, Node, NodeIndex};
use crate::tree::DecisionTree;

/// Child id marking a leaf in exported arrays.
const LEAF_CHILD: i64 = -1;

/// An ensemble in exported-array form.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedForest {
    /// Number of input features.
    pub n_features: usize,
    /// Number of classes.
    pub n_classes: usize,
    /// Feature names in column order (optional).
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Trees in ensemble order.
    pub trees: Vec<ExportedTree>,
}

/// One tree in exported-array form. All arrays are indexed by node id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedTree {
    /// Left child id per node, `-1` for leaves.
    pub children_left: Vec<i64>,
    /// Right child id per node, `-1` for leaves.
    pub children_right: Vec<i64>,
    /// Split feature per node (ignored for leaves).
    pub feature: Vec<i64>,
    /// Split threshold per node (ignored for leaves).
    pub threshold: Vec<f64>,
    /// Impurity per node; zeros when omitted.
    #[serde(default)]
    pub impurity: Vec<f64>,
    /// Training sample count per node; zeros when omitted.
    #[serde(default)]
    pub n_node_samples: Vec<usize>,
    /// Class weights per node.
    pub value: Vec<Vec<f64>>,
}

impl ExportedTree {
    /// Convert into a validated arena tree.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::ExportArrayLength`] | parallel arrays differ in length |
    /// | [`ForestError::MalformedNode`] | a node has a negative child/feature id or only one child |
    /// | any [`DecisionTree::new`] error | the arena is structurally invalid |
    pub fn into_tree(self, n_features: usize, n_classes: usize) -> Result<DecisionTree, ForestError> {
        let n_nodes = self.children_left.len();
        let check = |field: &'static str, got: usize, optional: bool| {
            if got == n_nodes || (optional && got == 0) {
                Ok(())
            } else {
                Err(ForestError::ExportArrayLength {
                    field,
                    expected: n_nodes,
                    got,
                })
            }
        };
        check("children_right", self.children_right.len(), false)?;
        check("feature", self.feature.len(), false)?;
        check("threshold", self.threshold.len(), false)?;
        check("value", self.value.len(), false)?;
        check("impurity", self.impurity.len(), true)?;
        check("n_node_samples", self.n_node_samples.len(), true)?;

        let mut nodes = Vec::with_capacity(n_nodes);
        for idx in 0..n_nodes {
            let malformed = |reason: &str| ForestError::MalformedNode {
                node: idx,
                reason: reason.to_string(),
            };

            let distribution = normalize(&self.value[idx]);
            let impurity = Impurity::new(self.impurity.get(idx).copied().unwrap_or(0.0));
            let n_samples = self.n_node_samples.get(idx).copied().unwrap_or(0);
            let (left, right) = (self.children_left[idx], self.children_right[idx]);

            let node = match (left == LEAF_CHILD, right == LEAF_CHILD) {
                (true, true) => Node::Leaf {
                    prediction: argmax(&distribution),
                    distribution,
                    impurity,
                    n_samples,
                },
                (false, false) => {
                    let to_index = |id: i64| {
                        usize::try_from(id).map_err(|_| malformed("negative child id"))
                    };
                    let feature = usize::try_from(self.feature[idx])
                        .map_err(|_| malformed("split node has a negative feature id"))?;
                    Node::Split {
                        feature: FeatureIndex::new(feature),
                        threshold: self.threshold[idx],
                        left: NodeIndex::new(to_index(left)?),
                        right: NodeIndex::new(to_index(right)?),
                        impurity,
                        n_samples,
                        distribution,
                    }
                }
                _ => return Err(malformed("node has exactly one child")),
            };
            nodes.push(node);
        }

        DecisionTree::new(nodes, n_features, n_classes)
    }
}

/// Scale class weights to sum to 1; all-zero rows are left as zeros.
fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter().map(|w| w / total).collect()
    } else {
        weights.to_vec()
    }
}

impl RandomForest {
    /// Build an ensemble from its exported-array form.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTree`] wrapping the first tree that
    /// fails conversion, or any [`RandomForest::new`] error.
    pub fn from_export(export: ExportedForest) -> Result<Self, ForestError> {
        let ExportedForest {
            n_features,
            n_classes,
            feature_names,
            trees,
        } = export;

        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(tree, t)| {
                t.into_tree(n_features, n_classes)
                    .map_err(|e| ForestError::InvalidTree {
                        tree,
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(trees, n_features, n_classes, feature_names)
    }

    /// Load an ensemble from an exported-array JSON file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadArtifact`] | file read failed |
    /// | [`ForestError::ParseJson`] | JSON does not match [`ExportedForest`] |
    /// | any [`RandomForest::from_export`] error | trees are invalid |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadArtifact {
            path: path.to_path_buf(),
            source: e,
        })?;
        let export: ExportedForest =
            serde_json::from_slice(&bytes).map_err(|e| ForestError::ParseJson {
                path: path.to_path_buf(),
                source: e,
            })?;
        let forest = Self::from_export(export)?;
        info!(
            n_trees = forest.n_trees(),
            n_features = forest.n_features(),
            n_classes = forest.n_classes(),
            "exported ensemble imported"
        );
        Ok(forest)
    }
}
