//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::node::{argmax, NodeIndex};
use crate::path::DecisionPath;

/// How per-tree results are combined into one ensemble class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingPolicy {
    /// Every tree votes for its leaf's majority class; the most-voted class wins.
    #[default]
    Majority,
    /// Leaf distributions are averaged; the most probable class wins.
    ///
    /// This is how scikit-learn forests predict, so exported models reproduce
    /// their original labels only under this policy.
    SoftProbability,
}

impl std::str::FromStr for VotingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "majority" => Ok(VotingPolicy::Majority),
            "soft" => Ok(VotingPolicy::SoftProbability),
            other => Err(format!("unknown voting policy: {other} (expected majority or soft)")),
        }
    }
}

impl std::fmt::Display for VotingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingPolicy::Majority => f.write_str("majority"),
            VotingPolicy::SoftProbability => f.write_str("soft"),
        }
    }
}

/// Per-class weights produced by the ensemble for one sample.
///
/// Under [`VotingPolicy::Majority`] the weights are vote fractions; under
/// [`VotingPolicy::SoftProbability`] they are averaged leaf probabilities.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Create a new class distribution.
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class (argmax, lowest class index on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        argmax(&self.probs)
    }

    /// Return the distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

/// Result of following one sample through one specific tree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TreeTrace {
    /// Position of the tree in the ensemble.
    pub tree: usize,
    /// Visited node ids, root first, leaf last.
    pub path: DecisionPath,
    /// The leaf the sample landed in; equal to `path.leaf()`.
    pub leaf: NodeIndex,
    /// Class voted by that leaf.
    pub class: usize,
}

impl RandomForest {
    /// Predict the class for a single sample under the given voting policy.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64], policy: VotingPolicy) -> Result<usize, ForestError> {
        let dist = match policy {
            VotingPolicy::Majority => self.votes(sample)?,
            VotingPolicy::SoftProbability => self.predict_proba(sample)?,
        };
        Ok(dist.predicted_class())
    }

    /// Return the fraction of trees voting for each class.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn votes(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        self.check_dimensions(sample)?;

        let mut counts = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            counts[tree.predict(sample)?] += 1.0;
        }
        let n = self.trees.len() as f64;
        counts.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(counts))
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// Averages the leaf distributions from all trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        self.check_dimensions(sample)?;

        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(sample)?;
            for (i, p) in proba.iter().enumerate() {
                avg[i] += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(avg))
    }

    /// Predict classes for a batch of samples in parallel.
    ///
    /// Output order matches input order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(
        &self,
        features: &[Vec<f64>],
        policy: VotingPolicy,
    ) -> Result<Vec<usize>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample, policy))
            .collect()
    }

    /// Follow one sample through the tree at `tree_index`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::TreeIndexOutOfRange`] | `tree_index >= n_trees` |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features` |
    pub fn trace(&self, tree_index: usize, sample: &[f64]) -> Result<TreeTrace, ForestError> {
        let tree = self.tree(tree_index)?;
        let path = tree.decision_path(sample)?;
        let leaf = path.leaf();
        let class = tree
            .node(leaf)
            .map(crate::Node::majority_class)
            .ok_or_else(|| ForestError::MalformedNode {
                node: leaf.index(),
                reason: "path ends outside the arena".into(),
            })?;
        Ok(TreeTrace {
            tree: tree_index,
            path,
            leaf,
            class,
        })
    }

    fn check_dimensions(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::tests::sample_forest;
    use crate::tree::tests::leaf;
    use crate::tree::DecisionTree;

    #[test]
    fn majority_vote() {
        let forest = sample_forest();
        // t0 -> class 0, t1 (y=-1 <= 2) -> class 1, t2 -> class 0
        let votes = forest.votes(&[0.5, -1.0]).unwrap();
        assert_eq!(votes.as_slice(), &[2.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(forest.predict(&[0.5, -1.0], VotingPolicy::Majority).unwrap(), 0);
    }

    #[test]
    fn soft_probability_averages_leaves() {
        let forest = sample_forest();
        // t0 -> [0, 1], t1 (y=1 <= 2) -> [0, 1], t2 -> [0.9, 0.1]
        let sample = [5.0, 1.0];
        assert_eq!(forest.predict(&sample, VotingPolicy::Majority).unwrap(), 1);
        let proba = forest.predict_proba(&sample).unwrap();
        assert!((proba.as_slice()[1] - 2.1 / 3.0).abs() < 1e-12);
        assert_eq!(forest.predict(&sample, VotingPolicy::SoftProbability).unwrap(), 1);
    }

    #[test]
    fn vote_tie_goes_to_lowest_class() {
        let t0 = DecisionTree::new(vec![leaf(vec![0.0, 0.0, 1.0])], 1, 3).unwrap();
        let t1 = DecisionTree::new(vec![leaf(vec![0.0, 1.0, 0.0])], 1, 3).unwrap();
        let forest = RandomForest::new(vec![t0, t1], 1, 3, vec![]).unwrap();
        assert_eq!(forest.predict(&[0.0], VotingPolicy::Majority).unwrap(), 1);
    }

    #[test]
    fn batch_preserves_order() {
        let forest = sample_forest();
        let batch = vec![vec![0.5, -1.0], vec![5.0, 1.0], vec![0.5, -1.0]];
        let out = forest.predict_batch(&batch, VotingPolicy::Majority).unwrap();
        assert_eq!(out, vec![0, 1, 0]);
    }

    #[test]
    fn batch_reports_dimension_mismatch() {
        let forest = sample_forest();
        let batch = vec![vec![0.5, -1.0], vec![5.0]];
        let err = forest.predict_batch(&batch, VotingPolicy::Majority).unwrap_err();
        assert!(matches!(err, ForestError::PredictionFeatureMismatch { .. }));
    }

    #[test]
    fn trace_specific_tree() {
        let forest = sample_forest();
        let trace = forest.trace(1, &[0.0, 3.0]).unwrap();
        assert_eq!(trace.tree, 1);
        assert_eq!(trace.leaf, NodeIndex::new(2));
        assert_eq!(trace.path.leaf(), trace.leaf);
        assert_eq!(trace.class, 0);
    }

    #[test]
    fn trace_out_of_range_tree() {
        let forest = sample_forest();
        let err = forest.trace(9, &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ForestError::TreeIndexOutOfRange { .. }));
    }

    #[test]
    fn distribution_tie_picks_lowest_class() {
        let dist = ClassDistribution::new(vec![0.4, 0.4, 0.2]);
        assert_eq!(dist.predicted_class(), 0);
    }

    #[test]
    fn voting_policy_parses() {
        assert_eq!("majority".parse::<VotingPolicy>().unwrap(), VotingPolicy::Majority);
        assert_eq!("soft".parse::<VotingPolicy>().unwrap(), VotingPolicy::SoftProbability);
        assert!("hard".parse::<VotingPolicy>().is_err());
        assert_eq!(VotingPolicy::SoftProbability.to_string(), "soft");
    }
}
