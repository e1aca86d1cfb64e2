use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use wellrec::models::{
    ActivitySummary, FeedbackRequest, FeedbackResponse, RecommendationRequest,
    RecommendationResponse, ScoreMethod,
};
use wellrec::utils::validation;
use wellrec::{init_tracing, AppState, Config, RecommendError};

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

async fn health_check(
    State(state): State<AppState>,
) -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "wellrec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    status.insert("activities".to_string(), state.catalog.len().to_string());
    status.insert(
        "model_ready".to_string(),
        state.training_service.artifact().is_some().to_string(),
    );

    Json(ApiResponse::success(status))
}

fn recommend_with(
    state: &AppState,
    request: RecommendationRequest,
    method: ScoreMethod,
) -> Result<RecommendationResponse, (StatusCode, String)> {
    let profile = state.recommendation_service.resolve_profile(&request);
    validation::validate_profile(&profile)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let top_n = request.top_n.unwrap_or(state.config.recommendation.top_n);
    validation::validate_top_n(top_n).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut rng = rand::thread_rng();
    let (method, recommendations) =
        state
            .recommendation_service
            .recommend(&profile, method, top_n, &mut rng);

    let next_available_user_id = state.feedback_store.next_user_id().map_err(|e| {
        error!(error = %e, "failed to read next user id");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    })?;

    Ok(RecommendationResponse {
        assessment_scores: profile,
        recommendations_count: recommendations.len(),
        recommendations,
        method,
        next_available_user_id,
    })
}

async fn recommend_handler(
    state: AppState,
    request: RecommendationRequest,
    default_method: ScoreMethod,
) -> Result<Json<ApiResponse<RecommendationResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let method = request.method.unwrap_or(default_method);
    match recommend_with(&state, request, method) {
        Ok(response) => Ok(Json(ApiResponse::success(response))),
        Err((status, message)) => Err((status, Json(ApiResponse::error(message)))),
    }
}

/// Main assessment endpoint; hybrid scoring unless the request asks
/// otherwise.
async fn assess(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    recommend_handler(state, request, ScoreMethod::Hybrid).await
}

async fn content_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    recommend_handler(state, request, ScoreMethod::Content).await
}

async fn heuristic_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    recommend_handler(state, request, ScoreMethod::Heuristic).await
}

async fn learned_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    recommend_handler(state, request, ScoreMethod::Learned).await
}

async fn hybrid_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    recommend_handler(state, request, ScoreMethod::Hybrid).await
}

/// Stores a rating and kicks the retrain check onto a blocking worker so
/// the response never waits on a training run.
async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<FeedbackResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    if let Err(e) = validation::validate_feedback(&request) {
        return Err((StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))));
    }

    let profile = request.profile();
    let mood = request.mood_description.clone().unwrap_or_default();

    let user_id = state
        .feedback_store
        .upsert(request.user_id, request.activity_id, request.rating, &profile, &mood)
        .map_err(|e| {
            error!(error = %e, "failed to store feedback");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(match e {
                    RecommendError::Persistence(_) => "could not persist rating".to_string(),
                    other => other.to_string(),
                })),
            )
        })?;

    let retrain_state = state.clone();
    tokio::task::spawn_blocking(move || {
        match retrain_state
            .training_service
            .maybe_retrain(&retrain_state.feedback_store, &retrain_state.catalog)
        {
            Ok(true) => retrain_state
                .feedback_store
                .log_learning_insights(&retrain_state.catalog),
            Ok(false) => {}
            Err(e) => error!(error = %e, "background retrain failed"),
        }
    });

    Ok(Json(ApiResponse::success(FeedbackResponse {
        user_id,
        timestamp: chrono::Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
struct ActivitiesQuery {
    limit: Option<usize>,
}

async fn list_activities(
    State(state): State<AppState>,
    Query(params): Query<ActivitiesQuery>,
) -> Json<ApiResponse<Vec<ActivitySummary>>> {
    let limit = params.limit.unwrap_or(10);
    Json(ApiResponse::success(state.catalog.summaries(limit)))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/assess", post(assess))
        .route("/recommend", post(content_recommend))
        .route("/heuristic-recommend", post(heuristic_recommend))
        .route("/learned-recommend", post(learned_recommend))
        .route("/hybrid-recommend", post(hybrid_recommend))
        .route("/activity-feedback", post(submit_feedback))
        .route("/activities", get(list_activities))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match Config::from_file("config/default") {
        Ok(config) => config,
        Err(_) => Config::default(),
    };
    info!("Starting wellness recommendation server with config: {:?}", config.server);

    let state = AppState::new(config.clone())?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!("Server listening on {}", config.server.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
