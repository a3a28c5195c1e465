//! Nodes drawn in highlight colours.

use astrobit_forest::{DecisionPath, DecisionTree, NodeIndex};

use crate::RenderError;

/// Fill for split nodes on the highlighted path.
pub const PATH_FILL: &str = "#facc15";
/// Fill for the highlighted leaf.
pub const LEAF_FILL: &str = "#38bdf8";

/// A root-to-leaf path to emphasize in a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    nodes: Vec<NodeIndex>,
}

impl Highlight {
    /// Highlight an explicit node sequence; the last node is treated as the leaf.
    ///
    /// Returns `None` for an empty sequence.
    #[must_use]
    pub fn new(nodes: Vec<NodeIndex>) -> Option<Self> {
        (!nodes.is_empty()).then_some(Self { nodes })
    }

    /// Return the highlighted leaf.
    #[must_use]
    pub fn leaf(&self) -> NodeIndex {
        // non-empty by construction
        self.nodes[self.nodes.len() - 1]
    }

    /// Return `true` if `node` is a highlighted split (not the leaf).
    #[must_use]
    pub fn on_path(&self, node: NodeIndex) -> bool {
        self.nodes[..self.nodes.len() - 1].contains(&node)
    }

    /// Return `true` if `node` is highlighted at all.
    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.contains(&node)
    }

    /// Return the highlighted node ids, root first.
    #[must_use]
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    /// Check every node exists in `tree` and each step goes parent → child.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RenderError::UnknownHighlightNode`] | a node id is outside the arena |
    /// | [`RenderError::BrokenHighlightPath`] | the sequence is not a root-to-leaf walk |
    pub fn validate(&self, tree: &DecisionTree) -> Result<(), RenderError> {
        let n_nodes = tree.n_nodes();
        if let Some(bad) = self.nodes.iter().find(|n| n.index() >= n_nodes) {
            return Err(RenderError::UnknownHighlightNode {
                node: bad.index(),
                n_nodes,
            });
        }
        if self.nodes[0] != NodeIndex::ROOT {
            return Err(RenderError::BrokenHighlightPath {
                parent: NodeIndex::ROOT.index(),
                node: self.nodes[0].index(),
            });
        }
        for pair in self.nodes.windows(2) {
            let is_child = tree
                .node(pair[0])
                .and_then(|n| n.children())
                .is_some_and(|(l, r)| pair[1] == l || pair[1] == r);
            if !is_child {
                return Err(RenderError::BrokenHighlightPath {
                    parent: pair[0].index(),
                    node: pair[1].index(),
                });
            }
        }
        Ok(())
    }
}

impl From<&DecisionPath> for Highlight {
    fn from(path: &DecisionPath) -> Self {
        Self {
            nodes: path.nodes().to_vec(),
        }
    }
}
