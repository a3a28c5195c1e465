//! Root-to-leaf decision paths for a single sample.

use crate::ForestError;
use crate::node::NodeIndex;
use crate::tree::DecisionTree;

/// The ordered node ids a sample visits in one tree, from the root to a leaf.
///
/// Only [`DecisionTree::decision_path`] builds a path, so a path is never
/// empty and always ends at the leaf the sample lands in.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DecisionPath(Vec<NodeIndex>);

impl DecisionPath {
    /// Return the visited node ids, root first.
    #[must_use]
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.0
    }

    /// Return the leaf the sample landed in (the last path element).
    #[must_use]
    pub fn leaf(&self) -> NodeIndex {
        self.0[self.0.len() - 1]
    }

    /// Return the split nodes on the path, excluding the leaf.
    #[must_use]
    pub fn splits(&self) -> &[NodeIndex] {
        &self.0[..self.0.len() - 1]
    }

    /// Return the number of nodes on the path (always at least 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Return `true` if `node` lies on this path.
    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.0.contains(&node)
    }
}

impl<'a> IntoIterator for &'a DecisionPath {
    type Item = &'a NodeIndex;
    type IntoIter = std::slice::Iter<'a, NodeIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl DecisionTree {
    /// Trace the nodes a single sample visits from the root to its leaf.
    ///
    /// Each split node is appended before its branch is taken; the leaf is
    /// appended last. The traversal is the same one used by
    /// [`DecisionTree::predict`], so `path.leaf()` always equals
    /// [`DecisionTree::apply`] for the same sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn decision_path(&self, sample: &[f64]) -> Result<DecisionPath, ForestError> {
        self.check_dimensions(sample)?;
        let mut visited = Vec::new();
        let leaf = self.walk(sample, |node| visited.push(node));
        visited.push(leaf);
        Ok(DecisionPath(visited))
    }
}
