use thiserror::Error;

/// Failure taxonomy for the recommender core.
///
/// The recommend path treats most of these as degradation signals and keeps
/// going (availability over strictness); the feedback write path surfaces
/// `InvalidFeedback` and `Persistence` to the caller rather than storing
/// garbage or silently dropping a rating.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("no usable data: {0}")]
    DataUnavailable(String),

    #[error("model not fitted: {0}")]
    ModelNotFitted(&'static str),

    #[error("prediction failed: {0}")]
    PredictionFailed(String),

    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("artifact io failure: {0}")]
    ArtifactIo(#[from] std::io::Error),

    #[error("artifact encoding failure: {0}")]
    ArtifactEncoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
