use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Bagged regression trees with variance-reduction splits. Trees are grown in
/// parallel, each from its own bootstrap sample, and predictions average the
/// ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    trees: Vec<Node>,
}

impl RandomForestRegressor {
    pub fn new(
        n_estimators: usize,
        max_depth: usize,
        min_samples_split: usize,
        min_samples_leaf: usize,
        seed: u64,
    ) -> Self {
        Self {
            n_estimators,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn fit(&mut self, rows: &[Vec<f32>], targets: &[f32]) {
        if rows.is_empty() || rows.len() != targets.len() {
            return;
        }

        let seed = self.seed;
        let max_depth = self.max_depth;
        let min_samples_split = self.min_samples_split;
        let min_samples_leaf = self.min_samples_leaf;

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng =
                    rand::rngs::StdRng::seed_from_u64(seed.wrapping_add(tree_index as u64));
                let indices: Vec<usize> = (0..rows.len())
                    .map(|_| rng.gen_range(0..rows.len()))
                    .collect();
                Self::grow(
                    rows,
                    targets,
                    &indices,
                    0,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                )
            })
            .collect();
    }

    /// Ensemble mean for a single row. An unfit forest returns 0.
    pub fn predict(&self, row: &[f32]) -> f32 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.trees.iter().map(|tree| Self::descend(tree, row)).sum();
        sum / self.trees.len() as f32
    }

    fn descend(node: &Node, row: &[f32]) -> f32 {
        match node {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let value = row.get(*feature).copied().unwrap_or(0.0);
                if value <= *threshold {
                    Self::descend(left, row)
                } else {
                    Self::descend(right, row)
                }
            }
        }
    }

    fn grow(
        rows: &[Vec<f32>],
        targets: &[f32],
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        min_samples_split: usize,
        min_samples_leaf: usize,
    ) -> Node {
        let mean = Self::mean(targets, indices);

        if depth >= max_depth || indices.len() < min_samples_split {
            return Node::Leaf(mean);
        }

        let Some((feature, threshold)) =
            Self::best_split(rows, targets, indices, min_samples_leaf)
        else {
            return Node::Leaf(mean);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Self::grow(
                rows,
                targets,
                &left_idx,
                depth + 1,
                max_depth,
                min_samples_split,
                min_samples_leaf,
            )),
            right: Box::new(Self::grow(
                rows,
                targets,
                &right_idx,
                depth + 1,
                max_depth,
                min_samples_split,
                min_samples_leaf,
            )),
        }
    }

    /// Picks the split minimizing weighted child variance over all features
    /// and midpoint thresholds. None when no split leaves both children with
    /// at least `min_samples_leaf` rows or reduces variance at all.
    fn best_split(
        rows: &[Vec<f32>],
        targets: &[f32],
        indices: &[usize],
        min_samples_leaf: usize,
    ) -> Option<(usize, f32)> {
        let dim = rows[indices[0]].len();
        let parent_variance = Self::variance(targets, indices);
        if parent_variance <= f32::EPSILON {
            return None;
        }

        let mut best: Option<(usize, f32, f32)> = None;

        for feature in 0..dim {
            let mut values: Vec<f32> = indices.iter().map(|&i| rows[i][feature]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| rows[i][feature] <= threshold);

                if left.len() < min_samples_leaf || right.len() < min_samples_leaf {
                    continue;
                }

                let n = indices.len() as f32;
                let weighted = Self::variance(targets, &left) * left.len() as f32 / n
                    + Self::variance(targets, &right) * right.len() as f32 / n;

                if weighted < parent_variance
                    && best.map_or(true, |(_, _, score)| weighted < score)
                {
                    best = Some((feature, threshold, weighted));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn mean(targets: &[f32], indices: &[usize]) -> f32 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| targets[i]).sum::<f32>() / indices.len() as f32
    }

    fn variance(targets: &[f32], indices: &[usize]) -> f32 {
        if indices.is_empty() {
            return 0.0;
        }
        let mean = Self::mean(targets, indices);
        indices
            .iter()
            .map(|&i| {
                let d = targets[i] - mean;
                d * d
            })
            .sum::<f32>()
            / indices.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f32>>, Vec<f32>) {
        // Target is high when the first feature is high.
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..30 {
            let x = i as f32 / 10.0;
            rows.push(vec![x, 1.0]);
            targets.push(if x < 1.5 { 1.0 } else { 5.0 });
        }
        (rows, targets)
    }

    #[test]
    fn test_learns_step_function() {
        let (rows, targets) = step_data();
        let mut forest = RandomForestRegressor::new(25, 5, 2, 1, 42);
        forest.fit(&rows, &targets);
        assert!(forest.is_fitted());

        assert!(forest.predict(&[0.5, 1.0]) < 2.5);
        assert!(forest.predict(&[2.5, 1.0]) > 3.5);
    }

    #[test]
    fn test_constant_targets_predict_constant() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let targets = vec![3.0, 3.0, 3.0, 3.0];
        let mut forest = RandomForestRegressor::new(10, 5, 2, 1, 7);
        forest.fit(&rows, &targets);
        assert!((forest.predict(&[2.5]) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_unfit_forest_predicts_zero() {
        let forest = RandomForestRegressor::new(10, 5, 2, 1, 0);
        assert!(!forest.is_fitted());
        assert_eq!(forest.predict(&[1.0]), 0.0);
    }

    #[test]
    fn test_serialization_round_trip() {
        let (rows, targets) = step_data();
        let mut forest = RandomForestRegressor::new(5, 4, 2, 1, 42);
        forest.fit(&rows, &targets);

        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForestRegressor = serde_json::from_str(&json).unwrap();
        assert_eq!(forest.predict(&[0.5, 1.0]), restored.predict(&[0.5, 1.0]));
    }
}
