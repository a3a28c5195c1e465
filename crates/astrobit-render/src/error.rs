//! Error types for astrobit-render.

/// Errors raised while drawing a tree.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Returned when a highlighted node id is not in the tree.
    #[error("highlighted node {node} does not exist (tree has {n_nodes} nodes)")]
    UnknownHighlightNode {
        /// The offending node id.
        node: usize,
        /// Number of nodes in the tree.
        n_nodes: usize,
    },

    /// Returned when a highlight path does not start at the root or skips a level.
    #[error("highlight is not a root-to-leaf path: node {node} is not a child of node {parent}")]
    BrokenHighlightPath {
        /// Parent node id in the path.
        parent: usize,
        /// Node id that does not follow it.
        node: usize,
    },

    /// Returned when the number of feature names differs from the tree's features.
    #[error("{got} feature names given for a tree with {expected} features")]
    FeatureNameCount {
        /// Features the tree splits on.
        expected: usize,
        /// Names supplied.
        got: usize,
    },

    /// Returned when the number of class names differs from the tree's classes.
    #[error("{got} class names given for a tree with {expected} classes")]
    ClassNameCount {
        /// Classes the tree predicts.
        expected: usize,
        /// Names supplied.
        got: usize,
    },

    /// Returned when the tree references a node outside its arena.
    #[error("node {node} is referenced but missing from the tree")]
    MissingNode {
        /// The missing node id.
        node: usize,
    },
}
