use serde::{Deserialize, Serialize};

/// Column-wise standardization: (x - mean) / std. Fitted state is explicit
/// so callers can tell an unfit scaler apart from one fit on degenerate data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f32>,
    stds: Vec<f32>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.means.is_empty()
    }

    pub fn fit(&mut self, rows: &[Vec<f32>]) {
        if rows.is_empty() {
            return;
        }

        let dim = rows[0].len();
        let n = rows.len() as f32;

        let mut means = vec![0.0f32; dim];
        for row in rows {
            for (i, &v) in row.iter().enumerate() {
                means[i] += v;
            }
        }
        for m in means.iter_mut() {
            *m /= n;
        }

        let mut stds = vec![0.0f32; dim];
        for row in rows {
            for (i, &v) in row.iter().enumerate() {
                let d = v - means[i];
                stds[i] += d * d;
            }
        }
        for s in stds.iter_mut() {
            *s = (*s / n).sqrt();
            // Constant columns pass through unscaled.
            if *s < 1e-8 {
                *s = 1.0;
            }
        }

        self.means = means;
        self.stds = stds;
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .enumerate()
            .map(|(i, &v)| {
                let mean = self.means.get(i).copied().unwrap_or(0.0);
                let std = self.stds.get(i).copied().unwrap_or(1.0);
                (v - mean) / std
            })
            .collect()
    }

    pub fn fit_transform(&mut self, rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        self.fit(rows);
        rows.iter().map(|r| self.transform(r)).collect()
    }
}
