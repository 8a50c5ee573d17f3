//! REST surface

use crate::service::ReputationService;
use crate::store::HistoryRange;
use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use circulus_common::{NewEvent, ReputationError, Trigger};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReputationService>,
    pub registry: Registry,
}

/// Error returned by handlers
pub struct ApiError(ReputationError);

impl From<ReputationError> for ApiError {
    fn from(e: ReputationError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ReputationError::NotFound(_) => StatusCode::NOT_FOUND,
            ReputationError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            ReputationError::UnresolvedRole { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ReputationError::DataUnavailable(_) | ReputationError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct RecomputeQuery {
    /// Queue the job instead of waiting for the score
    #[serde(default)]
    queue: bool,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/entities/:entity_id/score", get(get_score))
        .route("/api/v1/entities/:entity_id/history", get(get_history))
        .route("/api/v1/entities/:entity_id/recompute", post(recompute))
        .route("/api/v1/events", post(ingest_event))
        .route("/api/v1/worker/status", get(worker_status))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let worker = state.service.worker_status();
    Json(serde_json::json!({
        "status": "healthy",
        "version": circulus_common::VERSION,
        "worker": worker.status,
        "params_version": state.service.engine().params().version,
    }))
}

async fn get_score(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let score = state.service.engine().latest_score(&entity_id).await?;
    Ok(Json(score))
}

async fn get_history(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(range): Query<HistoryRange>,
) -> ApiResult<impl IntoResponse> {
    let history = state
        .service
        .engine()
        .score_history(&entity_id, &range)
        .await?;
    Ok(Json(history))
}

async fn recompute(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(query): Query<RecomputeQuery>,
) -> ApiResult<Response> {
    if query.queue {
        let job_id = state
            .service
            .request_recompute(&entity_id, Trigger::Manual)
            .await?;
        let body = Json(serde_json::json!({ "job_id": job_id, "entity_id": entity_id }));
        return Ok((StatusCode::ACCEPTED, body).into_response());
    }

    let score = state
        .service
        .engine()
        .recompute(&entity_id, Trigger::Manual)
        .await?;
    Ok(Json(score).into_response())
}

async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<NewEvent>,
) -> ApiResult<Response> {
    let receipt = state.service.ingest(event).await?;
    let status = if receipt.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)).into_response())
}

async fn worker_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.worker_status())
}

async fn metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|e| ReputationError::Internal(format!("metrics encoding failed: {}", e)))?;
    Ok((
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        buffer,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::TracingAlertSink;
    use crate::engine::{EnginePorts, ReputationEngine};
    use crate::scoring::ScoringParams;
    use crate::sources::{InMemoryDirectory, InMemoryEventLog, InMemoryMetricsSource};
    use crate::store::InMemoryScoreStore;
    use crate::telemetry::ReputationMetrics;
    use crate::worker::{RecomputeWorker, WorkerConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use circulus_common::Role;
    use tower::ServiceExt;

    fn app() -> Router {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.register("sup-1", Role::Supplier);

        let registry = Registry::new();
        let telemetry = Arc::new(ReputationMetrics::new().unwrap());
        telemetry.register(&registry).unwrap();

        let engine = Arc::new(
            ReputationEngine::new(
                ScoringParams::default(),
                EnginePorts {
                    metrics: Arc::new(InMemoryMetricsSource::new()),
                    events: Arc::new(InMemoryEventLog::new()),
                    directory,
                    store: Arc::new(InMemoryScoreStore::new()),
                    alerts: Arc::new(TracingAlertSink),
                },
            )
            .unwrap()
            .with_telemetry(telemetry),
        );
        let (worker, _join) = RecomputeWorker::spawn(engine.clone(), WorkerConfig::default());
        let service = Arc::new(ReputationService::new(engine, worker, false));
        router(AppState { service, registry })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_score_lifecycle() {
        let app = app();

        let (status, _) = send(&app, "GET", "/api/v1/entities/sup-1/score", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, score) = send(&app, "POST", "/api/v1/entities/sup-1/recompute", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(score["overall_score"], 45);
        assert_eq!(score["version"], 1);

        let (status, latest) = send(&app, "GET", "/api/v1/entities/sup-1/score", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["entity_type"], "supplier");

        let (_, history) = send(&app, "GET", "/api/v1/entities/sup-1/history", None).await;
        assert_eq!(history.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_unprocessable() {
        let app = app();
        let (status, body) = send(&app, "POST", "/api/v1/entities/ghost/recompute", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], 422);
    }

    #[tokio::test]
    async fn test_event_ingest() {
        let app = app();
        let event = serde_json::json!({
            "entity_id": "sup-1",
            "event_type": "delivery",
            "impact_score": 0.7,
            "weight": 1.0,
            "timestamp": "2026-01-15T10:00:00Z",
        });

        let (status, receipt) = send(&app, "POST", "/api/v1/events", Some(event.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["duplicate"], false);

        let (status, again) = send(&app, "POST", "/api/v1/events", Some(event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["duplicate"], true);

        let bad = serde_json::json!({
            "entity_id": "sup-1",
            "event_type": "quality",
            "impact_score": 1.5,
            "weight": 1.0,
            "timestamp": "2026-01-15T10:00:00Z",
        });
        let (status, _) = send(&app, "POST", "/api/v1/events", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_and_worker_status() {
        let app = app();
        send(&app, "POST", "/api/v1/entities/sup-1/recompute", None).await;

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
        assert!(text.contains("circulus_reputation_recomputations_total"));

        let (status, worker) = send(&app, "GET", "/api/v1/worker/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(worker["status"], "healthy");
    }
}
