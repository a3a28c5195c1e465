use crate::{
    ForestError,
    node::{Branch, Node, NodeIndex},
};

/// A fitted decision tree, loaded from a pre-built artifact.
///
/// Stored as an arena-based `Vec<Node>` with index references. The
/// constructor validates the arena so that every traversal from the root
/// terminates at a leaf.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Build a tree from a node arena, validating its structure.
    ///
    /// Node 0 is the root. Every split's children must lie inside the arena
    /// and have a strictly larger index than the split itself, which rules
    /// out cycles.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyTree`] | `nodes` is empty |
    /// | [`ForestError::ZeroFeatures`] | `n_features == 0` |
    /// | [`ForestError::ZeroClasses`] | `n_classes == 0` |
    /// | [`ForestError::MalformedNode`] | a node breaks an arena invariant |
    pub fn new(nodes: Vec<Node>, n_features: usize, n_classes: usize) -> Result<Self, ForestError> {
        if nodes.is_empty() {
            return Err(ForestError::EmptyTree);
        }
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        if n_classes == 0 {
            return Err(ForestError::ZeroClasses);
        }

        let n_nodes = nodes.len();
        for (idx, node) in nodes.iter().enumerate() {
            let malformed = |reason: String| ForestError::MalformedNode { node: idx, reason };

            let distribution = node.distribution();
            if distribution.len() != n_classes {
                return Err(malformed(format!(
                    "distribution has {} entries, expected {n_classes}",
                    distribution.len()
                )));
            }
            if distribution.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(malformed("distribution has a negative or non-finite weight".into()));
            }

            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= n_features {
                        return Err(malformed(format!(
                            "split feature {feature} outside {n_features} features"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(malformed("threshold is not finite".into()));
                    }
                    for child in [left, right] {
                        if child.index() >= n_nodes {
                            return Err(malformed(format!(
                                "child {child} outside arena of {n_nodes} nodes"
                            )));
                        }
                        if child.index() <= idx {
                            return Err(malformed(format!(
                                "child {child} does not come after its parent"
                            )));
                        }
                    }
                    if left == right {
                        return Err(malformed("left and right child are the same node".into()));
                    }
                }
                Node::Leaf { prediction, .. } => {
                    if *prediction >= n_classes {
                        return Err(malformed(format!(
                            "leaf predicts class {prediction} outside {n_classes} classes"
                        )));
                    }
                }
            }
        }

        Ok(Self {
            nodes,
            n_features,
            n_classes,
        })
    }

    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        let leaf = self.apply(sample)?;
        Ok(self.nodes[leaf.index()].majority_class())
    }

    /// Return the class distribution of the leaf reached by a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], ForestError> {
        let leaf = self.apply(sample)?;
        Ok(self.nodes[leaf.index()].distribution())
    }

    /// Return the id of the leaf a single sample lands in.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn apply(&self, sample: &[f64]) -> Result<NodeIndex, ForestError> {
        self.check_dimensions(sample)?;
        Ok(self.walk(sample, |_| {}))
    }

    /// Return the node stored at `index`, if any.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index())
    }

    /// Return the full node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of features the tree splits on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes in the leaf distributions.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    /// Uses an iterative BFS approach.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((NodeIndex::ROOT, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match self.nodes[node_idx.index()].children() {
                None => max_depth = max_depth.max(d),
                Some((left, right)) => {
                    queue.push_back((left, d + 1));
                    queue.push_back((right, d + 1));
                }
            }
        }

        max_depth
    }

    pub(crate) fn check_dimensions(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Walk from the root to a leaf, reporting every split node visited.
    ///
    /// Returns the leaf id. `visit` is called for each split node before
    /// moving to its child; the leaf itself is not passed to `visit`.
    /// Callers must have checked the sample's dimensions.
    pub(crate) fn walk(&self, sample: &[f64], mut visit: impl FnMut(NodeIndex)) -> NodeIndex {
        let mut current = NodeIndex::ROOT;
        loop {
            match &self.nodes[current.index()] {
                Node::Leaf { .. } => return current,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    visit(current);
                    current = match Node::branch(sample[feature.index()], *threshold) {
                        Branch::Left => *left,
                        Branch::Right => *right,
                    };
                }
            }
        }
    }
}
