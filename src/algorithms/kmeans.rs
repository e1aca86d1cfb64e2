use nalgebra::DVector;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Plain k-means with k-means++ seeding, restarted `n_init` times and keeping
/// the lowest-inertia run. Inputs are expected to be standardized already.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub k: usize,
    pub max_iter: usize,
    pub n_init: usize,
    pub seed: u64,
    centroids: Vec<Vec<f32>>,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            max_iter: 200,
            n_init: 10,
            seed,
            centroids: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.centroids.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Fits on the given rows. When there are fewer rows than k the model
    /// fits with k reduced to the row count rather than failing.
    pub fn fit(&mut self, rows: &[Vec<f32>]) {
        if rows.is_empty() {
            return;
        }

        let k = self.k.min(rows.len());
        let points: Vec<DVector<f32>> = rows
            .iter()
            .map(|r| DVector::from_vec(r.clone()))
            .collect();

        let mut best_centroids: Vec<DVector<f32>> = Vec::new();
        let mut best_inertia = f32::INFINITY;
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);

        for _ in 0..self.n_init.max(1) {
            let mut centroids = Self::plus_plus_init(&points, k, &mut rng);

            for _ in 0..self.max_iter {
                let assignments: Vec<usize> = points
                    .iter()
                    .map(|p| Self::nearest(&centroids, p).0)
                    .collect();

                let mut sums = vec![DVector::zeros(points[0].len()); k];
                let mut counts = vec![0usize; k];
                for (p, &a) in points.iter().zip(assignments.iter()) {
                    sums[a] += p;
                    counts[a] += 1;
                }

                let mut moved = false;
                for (i, (sum, &count)) in sums.iter().zip(counts.iter()).enumerate() {
                    if count == 0 {
                        // Empty cluster: reseed from a random point.
                        centroids[i] = points.choose(&mut rng).cloned().unwrap_or_else(|| {
                            DVector::zeros(points[0].len())
                        });
                        moved = true;
                        continue;
                    }
                    let new_centroid = sum / count as f32;
                    if (&new_centroid - &centroids[i]).norm() > 1e-6 {
                        moved = true;
                    }
                    centroids[i] = new_centroid;
                }

                if !moved {
                    break;
                }
            }

            let inertia: f32 = points
                .iter()
                .map(|p| Self::nearest(&centroids, p).1)
                .sum();

            if inertia < best_inertia {
                best_inertia = inertia;
                best_centroids = centroids;
            }
        }

        self.centroids = best_centroids
            .into_iter()
            .map(|c| c.as_slice().to_vec())
            .collect();
    }

    /// Label of the closest centroid. Returns 0 when the model was never fit,
    /// so the caller's cluster feature stays total.
    pub fn predict(&self, row: &[f32]) -> usize {
        if self.centroids.is_empty() {
            return 0;
        }
        let point = DVector::from_vec(row.to_vec());
        let centroids: Vec<DVector<f32>> = self
            .centroids
            .iter()
            .map(|c| DVector::from_vec(c.clone()))
            .collect();
        Self::nearest(&centroids, &point).0
    }

    fn nearest(centroids: &[DVector<f32>], point: &DVector<f32>) -> (usize, f32) {
        let mut best = (0usize, f32::INFINITY);
        for (i, c) in centroids.iter().enumerate() {
            let dist = (point - c).norm_squared();
            if dist < best.1 {
                best = (i, dist);
            }
        }
        best
    }

    fn plus_plus_init(
        points: &[DVector<f32>],
        k: usize,
        rng: &mut impl Rng,
    ) -> Vec<DVector<f32>> {
        let mut centroids = Vec::with_capacity(k);
        let first = points[rng.gen_range(0..points.len())].clone();
        centroids.push(first);

        while centroids.len() < k {
            let distances: Vec<f32> = points
                .iter()
                .map(|p| Self::nearest(&centroids, p).1)
                .collect();
            let total: f32 = distances.iter().sum();

            if total <= f32::EPSILON {
                // All points coincide with existing centroids.
                centroids.push(points[rng.gen_range(0..points.len())].clone());
                continue;
            }

            let mut target = rng.gen::<f32>() * total;
            let mut chosen = points.len() - 1;
            for (i, &d) in distances.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            centroids.push(points[chosen].clone());
        }

        centroids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separates_obvious_clusters() {
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(vec![0.0 + i as f32 * 0.01, 0.0]);
            rows.push(vec![10.0 + i as f32 * 0.01, 10.0]);
        }

        let mut model = KMeans::new(2, 42);
        model.fit(&rows);
        assert!(model.is_fitted());

        let a = model.predict(&[0.05, 0.0]);
        let b = model.predict(&[10.05, 10.0]);
        assert_ne!(a, b);

        // Nearby points share a label.
        assert_eq!(a, model.predict(&[0.02, 0.1]));
    }

    #[test]
    fn test_fewer_points_than_k() {
        let rows = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        let mut model = KMeans::new(5, 42);
        model.fit(&rows);
        assert!(model.is_fitted());
        assert!(model.cluster_count() <= 2);
        assert!(model.predict(&[1.0, 1.0]) < model.cluster_count());
    }

    #[test]
    fn test_unfit_model_predicts_zero() {
        let model = KMeans::new(3, 1);
        assert!(!model.is_fitted());
        assert_eq!(model.predict(&[1.0, 2.0]), 0);
    }
}
