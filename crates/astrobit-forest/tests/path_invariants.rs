//! Decision-path invariants over randomly shaped ensembles.
//!
//! Trees are generated from a fixed seed so failures are reproducible.

use astrobit_forest::{
    DecisionTree, FeatureIndex, Impurity, Node, NodeIndex, RandomForest, VotingPolicy,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const N_FEATURES: usize = 7;
const N_CLASSES: usize = 3;

// ---------------------------------------------------------------------------
// Helper: random but structurally valid trees
// ---------------------------------------------------------------------------

/// Grow a random tree in preorder so every child id exceeds its parent's.
fn grow(rng: &mut ChaCha8Rng, depth: usize, max_depth: usize, arena: &mut Vec<Node>) -> usize {
    let idx = arena.len();
    let mut distribution: Vec<f64> = (0..N_CLASSES).map(|_| rng.r#gen::<f64>()).collect();
    let total: f64 = distribution.iter().sum();
    distribution.iter_mut().for_each(|w| *w /= total);

    if depth == max_depth || (depth > 0 && rng.r#gen::<f64>() < 0.25) {
        let prediction = distribution
            .iter()
            .enumerate()
            .fold(0, |best, (i, w)| if *w > distribution[best] { i } else { best });
        arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity: Impurity::new(0.0),
            n_samples: 1,
        });
        return idx;
    }

    // Placeholder, patched once children are known.
    arena.push(Node::Leaf {
        prediction: 0,
        distribution: distribution.clone(),
        impurity: Impurity::new(0.0),
        n_samples: 0,
    });
    let feature = rng.gen_range(0..N_FEATURES);
    // Coarse thresholds make exact ties with the coarse samples below likely.
    let threshold = f64::from(rng.gen_range(-4i32..=4)) * 0.5;
    let left = grow(rng, depth + 1, max_depth, arena);
    let right = grow(rng, depth + 1, max_depth, arena);
    arena[idx] = Node::Split {
        feature: FeatureIndex::new(feature),
        threshold,
        left: NodeIndex::new(left),
        right: NodeIndex::new(right),
        impurity: Impurity::new(0.5),
        n_samples: 2,
        distribution,
    };
    idx
}

fn make_forest(seed: u64, n_trees: usize) -> RandomForest {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let trees = (0..n_trees)
        .map(|_| {
            let mut arena = Vec::new();
            grow(&mut rng, 0, 6, &mut arena);
            DecisionTree::new(arena, N_FEATURES, N_CLASSES).unwrap()
        })
        .collect();
    RandomForest::new(trees, N_FEATURES, N_CLASSES, vec![]).unwrap()
}

fn make_samples(seed: u64, n: usize) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            (0..N_FEATURES)
                .map(|_| f64::from(rng.gen_range(-5i32..=5)) * 0.5)
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn path_ends_at_the_predicted_leaf() {
    let forest = make_forest(42, 20);
    for sample in make_samples(7, 200) {
        for (t, tree) in forest.trees().iter().enumerate() {
            let path = tree.decision_path(&sample).unwrap();
            assert_eq!(path.nodes()[0], NodeIndex::ROOT, "tree {t}");
            assert_eq!(path.leaf(), tree.apply(&sample).unwrap(), "tree {t}");
            assert!(tree.node(path.leaf()).unwrap().is_leaf(), "tree {t}");
        }
    }
}

#[test]
fn every_step_follows_the_branch_rule() {
    let forest = make_forest(43, 20);
    for sample in make_samples(8, 200) {
        for tree in forest.trees() {
            let path = tree.decision_path(&sample).unwrap();
            for pair in path.nodes().windows(2) {
                let Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                }) = tree.node(pair[0])
                else {
                    panic!("interior path node {} is not a split", pair[0]);
                };
                let expected = if sample[feature.index()] <= *threshold {
                    *left
                } else {
                    *right
                };
                assert_eq!(pair[1], expected);
            }
            for split in path.splits() {
                assert!(!tree.node(*split).unwrap().is_leaf());
            }
        }
    }
}

#[test]
fn tracing_is_idempotent() {
    let forest = make_forest(44, 10);
    let samples = make_samples(9, 50);
    let first: Vec<_> = samples
        .iter()
        .map(|s| forest.trace(3, s).unwrap().path)
        .collect();
    let second: Vec<_> = samples
        .iter()
        .map(|s| forest.trace(3, s).unwrap().path)
        .collect();
    assert_eq!(first, second);

    let a = forest.predict_batch(&samples, VotingPolicy::Majority).unwrap();
    let b = forest.predict_batch(&samples, VotingPolicy::Majority).unwrap();
    assert_eq!(a, b);
}

#[test]
fn trace_class_matches_single_tree_prediction() {
    let forest = make_forest(45, 5);
    for sample in make_samples(10, 100) {
        for t in 0..forest.n_trees() {
            let trace = forest.trace(t, &sample).unwrap();
            assert_eq!(trace.class, forest.trees()[t].predict(&sample).unwrap());
            assert_eq!(trace.leaf, trace.path.leaf());
        }
    }
}
