use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub recommendation: RecommendationConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("invalid server host/port in config")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub activities_path: PathBuf,
    pub interactions_path: PathBuf,
    pub ratings_db_path: PathBuf,
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Default number of cards returned.
    pub top_n: usize,
    /// Per-source candidate pool handed to the hybrid aggregator.
    pub candidate_pool: usize,
    /// TF-IDF vocabulary cap.
    pub max_vocabulary: usize,
    /// Upper bound of the heuristic scorer's uniform jitter.
    pub jitter_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Real-only training kicks in at this many feedback rows.
    pub real_regime_threshold: usize,
    /// Hybrid training kicks in at this many feedback rows.
    pub hybrid_regime_threshold: usize,
    /// New feedback rows since the last training run that trigger a retrain.
    pub retrain_threshold: usize,
    /// A regime that produces fewer rows than this falls through to the
    /// enhanced-synthetic path.
    pub min_training_rows: usize,
    /// Hybrid training pads with synthetic rows up to this floor.
    pub synthetic_floor: usize,
    /// Activities sampled per interaction in the enhanced-synthetic regime.
    pub samples_per_interaction: usize,
    pub cluster_count: usize,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Gaussian noise injected when the training labels are near-constant.
    pub label_noise_std: f32,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                workers: num_cpus::get(),
            },
            data: DataConfig {
                activities_path: PathBuf::from("data/activities.csv"),
                interactions_path: PathBuf::from("data/interactions.csv"),
                ratings_db_path: PathBuf::from("data/user_ratings.db"),
                model_dir: PathBuf::from("models"),
            },
            recommendation: RecommendationConfig {
                top_n: 5,
                candidate_pool: 8,
                max_vocabulary: 500,
                jitter_max: 8.0,
            },
            training: TrainingConfig {
                real_regime_threshold: 50,
                hybrid_regime_threshold: 10,
                retrain_threshold: 10,
                min_training_rows: 20,
                synthetic_floor: 50,
                samples_per_interaction: 15,
                cluster_count: 5,
                n_estimators: 200,
                max_depth: 15,
                min_samples_split: 5,
                min_samples_leaf: 2,
                label_noise_std: 0.3,
                seed: 42,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("WELLREC"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
