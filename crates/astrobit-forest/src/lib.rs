//! Pre-built Random Forest ensembles: loading, inference, and decision paths.
//!
//! Trees are arena-allocated and loaded from exported node arrays or a
//! versioned bincode envelope. Prediction and decision-path tracing share
//! one traversal, so a traced path always ends at the leaf used for the
//! prediction.

mod error;
mod export;
mod forest;
mod label;
mod node;
mod path;
mod predict;
mod serialize;
mod tree;

pub use error::ForestError;
pub use export::{ExportedForest, ExportedTree};
pub use forest::RandomForest;
pub use label::LabelEncoder;
pub use node::{Branch, FeatureIndex, Impurity, Node, NodeIndex};
pub use path::DecisionPath;
pub use predict::{ClassDistribution, TreeTrace, VotingPolicy};
pub use tree::DecisionTree;
