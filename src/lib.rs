pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::RecommendError;
pub use models::*;

use anyhow::Result;
use services::catalog::ActivityCatalog;
use services::feedback::FeedbackStore;
use services::recommendation::RecommendationService;
use services::training::TrainingService;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<ActivityCatalog>,
    pub feedback_store: Arc<FeedbackStore>,
    pub training_service: Arc<TrainingService>,
    pub recommendation_service: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let catalog = Arc::new(ActivityCatalog::load(&config.data.activities_path));
        let interactions = ActivityCatalog::load_interactions(&config.data.interactions_path);
        let feedback_store = Arc::new(FeedbackStore::open(&config.data.ratings_db_path)?);

        let training_service = Arc::new(TrainingService::new(
            config.training.clone(),
            config.data.model_dir.clone(),
            interactions,
        ));

        // Train at startup when no persisted artifact exists, so the learned
        // path is available from the first request.
        if training_service.artifact().is_none() {
            let regime = training_service.train(&feedback_store, &catalog)?;
            info!(regime = %regime, "trained initial model artifact");
        }
        feedback_store.log_learning_insights(&catalog);

        let recommendation_service = Arc::new(RecommendationService::new(
            catalog.clone(),
            training_service.clone(),
            config.recommendation.clone(),
        ));

        Ok(Self {
            config,
            catalog,
            feedback_store,
            training_service,
            recommendation_service,
        })
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
