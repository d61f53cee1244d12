mod collect;
mod collection_runs;
mod locations;
mod sources;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use estatepulse_sentiment::{PipelineContext, SentimentError};
use serde::Serialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId};

/// Shared handler state. The pipeline context owns the HTTP client and the
/// classifier cache, so it is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub pipeline: Arc<PipelineContext>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &estatepulse_db::DbError) -> ApiError {
    if matches!(error, estatepulse_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Pipeline failures: a bad location is the caller's fault, anything else
/// is reported with the recovery hint.
pub(super) fn map_pipeline_error(request_id: String, error: &SentimentError) -> ApiError {
    match error {
        SentimentError::Location(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        SentimentError::RateLimited { .. } => {
            ApiError::new(request_id, "rate_limited", format!("{error}; {}", error.hint()))
        }
        _ => {
            tracing::error!(error = %error, "sentiment pipeline failed");
            ApiError::new(request_id, "upstream_error", format!("{error}; {}", error.hint()))
        }
    }
}

/// Trimmed path location, rejecting blank values.
pub(super) fn require_location(request_id: &str, raw: &str) -> Result<String, ApiError> {
    let location = raw.trim();
    if location.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "location must not be empty",
        ));
    }
    Ok(location.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/sources", get(sources::list_sources))
        .route("/api/v1/localities", get(sources::list_localities))
        .route("/api/v1/locations", get(locations::list_locations))
        .route(
            "/api/v1/locations/{location}/mentions",
            get(locations::list_location_mentions),
        )
        .route(
            "/api/v1/locations/{location}/summary",
            get(locations::get_location_summary),
        )
        .route(
            "/api/v1/locations/{location}/timeline",
            get(locations::get_location_timeline),
        )
        .route(
            "/api/v1/locations/{location}/report",
            get(locations::get_location_report),
        )
        .route(
            "/api/v1/locations/{location}/collect",
            post(collect::collect_location),
        )
        .route(
            "/api/v1/collection-runs",
            get(collection_runs::list_collection_runs),
        )
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .merge(api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match estatepulse_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use estatepulse_core::{AppConfig, Environment, RegionProfile, SourceCredentials};
    use estatepulse_sentiment::{Endpoints, PipelineContext};
    use tower::ServiceExt;

    use super::{build_app, AppState};

    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            env: Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("valid socket addr"),
            log_level: "debug".to_string(),
            region_path: PathBuf::from("config/region.yaml"),
            db_max_connections: 1,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            request_timeout_secs: 5,
            user_agent: "estatepulse-test/0.1".to_string(),
            max_retries: 0,
            retry_backoff_base_ms: 0,
            inter_request_delay_ms: 0,
            default_limit: 50,
            min_text_len: 20,
            max_text_len: 2000,
            classifier_batch_size: 10,
            claude_model: "claude-test".to_string(),
            claude_max_tokens: 1000,
            credentials: SourceCredentials {
                reddit_user_agent: "estatepulse-test".to_string(),
                ..SourceCredentials::default()
            },
        }
    }

    /// App with no credentials whose providers all point at `base`.
    pub(crate) fn app_with_base(pool: sqlx::SqlitePool, base: &str) -> Router {
        app_with_config(pool, base, test_config())
    }

    /// Like [`app_with_base`] with a Claude key configured.
    pub(crate) fn app_with_claude(pool: sqlx::SqlitePool, base: &str) -> Router {
        let mut config = test_config();
        config.credentials.claude_api_key = Some("sk-ant-test-key-0001".to_string());
        app_with_config(pool, base, config)
    }

    fn app_with_config(pool: sqlx::SqlitePool, base: &str, config: AppConfig) -> Router {
        let pipeline = PipelineContext::new(config, RegionProfile::default())
            .expect("pipeline context")
            .with_endpoints(Endpoints::with_base(base))
            .expect("endpoints");
        build_app(AppState {
            pool,
            pipeline: Arc::new(pipeline),
        })
    }

    /// Providers point at a closed local port, so nothing leaves the machine.
    pub(crate) fn test_app(pool: sqlx::SqlitePool) -> Router {
        app_with_base(pool, "http://127.0.0.1:9")
    }

    pub(crate) async fn send(
        app: Router,
        method: Method,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    pub(crate) async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        send(app, Method::GET, uri).await
    }
}
