//! The tree ensemble and its structural validation.

use tracing::debug;

use crate::error::ForestError;
use crate::tree::DecisionTree;

/// A pre-built Random Forest ensemble.
///
/// Immutable once constructed; shared read-only between requests.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

impl RandomForest {
    /// Assemble an ensemble from already-validated trees.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyForest`] | `trees` is empty |
    /// | [`ForestError::FeatureNameCount`] | `feature_names` is non-empty and its length differs from `n_features` |
    /// | [`ForestError::TreeShapeMismatch`] | a tree disagrees on feature or class count |
    pub fn new(
        trees: Vec<DecisionTree>,
        n_features: usize,
        n_classes: usize,
        feature_names: Vec<String>,
    ) -> Result<Self, ForestError> {
        if trees.is_empty() {
            return Err(ForestError::EmptyForest);
        }
        if !feature_names.is_empty() && feature_names.len() != n_features {
            return Err(ForestError::FeatureNameCount {
                expected: n_features,
                got: feature_names.len(),
            });
        }
        for (tree, t) in trees.iter().enumerate() {
            if t.n_features != n_features || t.n_classes != n_classes {
                return Err(ForestError::TreeShapeMismatch {
                    tree,
                    n_features,
                    n_classes,
                    got_features: t.n_features,
                    got_classes: t.n_classes,
                });
            }
        }

        debug!(n_trees = trees.len(), n_features, n_classes, "ensemble assembled");

        Ok(Self {
            trees,
            n_features,
            n_classes,
            feature_names,
        })
    }

    /// Return the tree at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::TreeIndexOutOfRange`] when `index >= n_trees`.
    pub fn tree(&self, index: usize) -> Result<&DecisionTree, ForestError> {
        self.trees.get(index).ok_or(ForestError::TreeIndexOutOfRange {
            index,
            n_trees: self.trees.len(),
        })
    }

    /// Return all trees in ensemble order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names recorded with the model (may be empty).
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tree::tests::{leaf, sample_tree, split};

    /// Three trees over two features and two classes.
    ///
    /// Tree 0 is the shared sample tree; tree 1 splits on feature 1 only;
    /// tree 2 always votes class 0.
    pub(crate) fn sample_forest() -> RandomForest {
        let t1 = DecisionTree::new(
            vec![split(1, 2.0, 1, 2), leaf(vec![0.0, 1.0]), leaf(vec![1.0, 0.0])],
            2,
            2,
        )
        .unwrap();
        let t2 = DecisionTree::new(vec![leaf(vec![0.9, 0.1])], 2, 2).unwrap();
        RandomForest::new(
            vec![sample_tree(), t1, t2],
            2,
            2,
            vec!["x".into(), "y".into()],
        )
        .unwrap()
    }

    #[test]
    fn accessors() {
        let forest = sample_forest();
        assert_eq!(forest.n_trees(), 3);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.n_classes(), 2);
        assert_eq!(forest.feature_names(), &["x", "y"]);
    }

    #[test]
    fn empty_forest_rejected() {
        let err = RandomForest::new(vec![], 2, 2, vec![]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyForest));
    }

    #[test]
    fn tree_shape_mismatch_rejected() {
        let narrow = DecisionTree::new(vec![leaf(vec![1.0, 0.0])], 1, 2).unwrap();
        let err = RandomForest::new(vec![sample_tree(), narrow], 2, 2, vec![]).unwrap_err();
        assert!(matches!(err, ForestError::TreeShapeMismatch { tree: 1, .. }));
    }

    #[test]
    fn feature_name_count_checked() {
        let err = RandomForest::new(vec![sample_tree()], 2, 2, vec!["x".into()]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureNameCount { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn tree_index_out_of_range() {
        let forest = sample_forest();
        assert!(forest.tree(2).is_ok());
        let err = forest.tree(3).unwrap_err();
        assert!(matches!(
            err,
            ForestError::TreeIndexOutOfRange { index: 3, n_trees: 3 }
        ));
    }
}
