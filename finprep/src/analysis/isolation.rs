//! Isolation-forest anomaly scoring.
//!
//! Each tree isolates a random subsample by splitting on a random feature at a
//! uniformly drawn threshold. Anomalies sit on short paths. The anomaly score
//! is `2^(-E[h(x)] / c(psi))`; rows whose negated score falls below the
//! contamination quantile of the training scores are flagged.

use super::descriptive::{quantile_sorted, sorted};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Default number of trees.
pub const DEFAULT_N_ESTIMATORS: usize = 100;
/// Upper bound on the per-tree subsample.
pub const MAX_SAMPLES: usize = 256;
/// Default random seed.
pub const DEFAULT_SEED: u64 = 42;

/// Average path length of an unsuccessful binary-search-tree lookup among `n` points.
#[allow(clippy::cast_precision_loss)]
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    #[allow(clippy::cast_precision_loss)]
    fn path_length(&self, row: &[f64], depth: usize) -> f64 {
        match self {
            Self::Leaf { size } => depth as f64 + average_path_length(*size),
            Self::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] < *threshold {
                    left.path_length(row, depth + 1)
                } else {
                    right.path_length(row, depth + 1)
                }
            }
        }
    }
}

/// Builder-style configuration and fitted ensemble.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    contamination: f64,
    seed: u64,
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Creates an unfitted forest.
    #[must_use]
    pub fn new(contamination: f64) -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            contamination,
            seed: DEFAULT_SEED,
            trees: Vec::new(),
            sample_size: 0,
            offset: 0.0,
        }
    }

    /// Sets the number of trees.
    #[must_use]
    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators.max(1);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fits the ensemble on complete rows and sets the decision offset.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn fit(&mut self, rows: &[Vec<f64>]) {
        self.trees.clear();
        if rows.is_empty() {
            return;
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.sample_size = rows.len().min(MAX_SAMPLES);
        let max_depth = (self.sample_size as f64).log2().ceil().max(0.0) as usize;

        for _ in 0..self.n_estimators {
            let picked = index::sample(&mut rng, rows.len(), self.sample_size).into_vec();
            let tree = build(rows, picked, 0, max_depth, &mut rng);
            self.trees.push(tree);
        }

        let scores: Vec<f64> = rows.iter().map(|r| -self.anomaly_score(r)).collect();
        self.offset = quantile_sorted(&sorted(&scores), self.contamination).unwrap_or(0.0);
    }

    /// Anomaly score in `(0, 1]`; higher is more anomalous.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn anomaly_score(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let mean_depth = self
            .trees
            .iter()
            .map(|t| t.path_length(row, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let normaliser = average_path_length(self.sample_size);
        if normaliser == 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_depth / normaliser)
    }

    /// Flags rows whose negated score is below the contamination offset.
    #[must_use]
    pub fn predict_outliers(&self, rows: &[Vec<f64>]) -> Vec<bool> {
        rows.iter()
            .map(|r| -self.anomaly_score(r) < self.offset)
            .collect()
    }

    /// Fits on the rows and flags them in one call.
    pub fn fit_predict(&mut self, rows: &[Vec<f64>]) -> Vec<bool> {
        self.fit(rows);
        self.predict_outliers(rows)
    }
}

fn build(
    rows: &[Vec<f64>],
    members: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || members.len() <= 1 {
        return Node::Leaf {
            size: members.len(),
        };
    }

    let n_features = rows[members[0]].len();
    let spans: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|feature| {
            let (lo, hi) = members.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &m| (lo.min(rows[m][feature]), hi.max(rows[m][feature])),
            );
            (lo.is_finite() && hi.is_finite() && hi > lo).then_some((feature, lo, hi))
        })
        .collect();

    if spans.is_empty() {
        return Node::Leaf {
            size: members.len(),
        };
    }

    let (feature, lo, hi) = spans[rng.gen_range(0..spans.len())];
    // Halved bounds keep `hi - lo` finite near f64::MAX.
    let threshold = 2.0 * (lo / 2.0 + rng.gen::<f64>() * (hi / 2.0 - lo / 2.0));
    let (left, right): (Vec<usize>, Vec<usize>) =
        members.into_iter().partition(|&m| rows[m][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(build(rows, right, depth + 1, max_depth, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let x = f64::from(i % 6);
                let y = f64::from(i / 6);
                vec![10.0 + x * 0.1, 20.0 + y * 0.1]
            })
            .collect();
        rows.push(vec![100.0, -50.0]);
        rows
    }

    #[test]
    fn test_average_path_length() {
        assert!((average_path_length(1) - 0.0).abs() < f64::EPSILON);
        assert!((average_path_length(2) - 1.0).abs() < f64::EPSILON);
        assert!(average_path_length(256) > 9.0);
    }

    #[test]
    fn test_isolated_point_scores_highest() {
        let rows = cluster_with_outlier();
        let mut forest = IsolationForest::new(0.1);
        forest.fit(&rows);

        let outlier_score = forest.anomaly_score(&rows[30]);
        let max_inlier = rows[..30]
            .iter()
            .map(|r| forest.anomaly_score(r))
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(outlier_score > max_inlier);
    }

    #[test]
    fn test_fit_predict_flags_outlier() {
        let rows = cluster_with_outlier();
        let flags = IsolationForest::new(0.1).fit_predict(&rows);

        assert!(flags[30]);
        let flagged = flags.iter().filter(|f| **f).count();
        assert!(flagged <= 4, "flagged {flagged}");
    }

    #[test]
    fn test_seed_makes_results_reproducible() {
        let rows = cluster_with_outlier();
        let a = IsolationForest::new(0.1).with_seed(7).fit_predict(&rows);
        let b = IsolationForest::new(0.1).with_seed(7).fit_predict(&rows);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_data_does_not_panic() {
        let rows = vec![vec![1.0, 1.0]; 10];
        let flags = IsolationForest::new(0.1).with_estimators(5).fit_predict(&rows);
        assert_eq!(flags.len(), 10);
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_extreme_spans_do_not_panic() {
        let rows = vec![vec![-1.5e308], vec![1.5e308], vec![0.0], vec![1.0]];
        let flags = IsolationForest::new(0.1).with_estimators(20).fit_predict(&rows);
        assert_eq!(flags.len(), 4);
    }

    #[test]
    fn test_infinite_values_do_not_panic() {
        let mut rows = cluster_with_outlier();
        rows.push(vec![f64::INFINITY, 20.0]);
        rows.push(vec![f64::NEG_INFINITY, f64::INFINITY]);

        let mut forest = IsolationForest::new(0.1);
        let flags = forest.fit_predict(&rows);

        assert_eq!(flags.len(), rows.len());
        assert!(rows.iter().all(|r| forest.anomaly_score(r).is_finite()));
    }

    #[test]
    fn test_empty_input() {
        let flags = IsolationForest::new(0.1).fit_predict(&[]);
        assert!(flags.is_empty());
    }
}
