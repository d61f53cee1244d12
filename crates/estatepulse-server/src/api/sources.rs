use axum::{extract::State, Extension, Json};
use estatepulse_core::{configuration_guide, Readiness, SourceKind};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct SourceStatusItem {
    source: SourceKind,
    name: &'static str,
    readiness: Readiness,
    hint: Option<String>,
    env_vars: &'static [&'static str],
    /// Setup instructions, only present for sources that are not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_steps: Option<&'static [&'static str]>,
}

#[derive(Debug, Serialize)]
pub(super) struct SourcesData {
    fully_configured: bool,
    sources: Vec<SourceStatusItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct LocalitiesData {
    region: String,
    localities: Vec<String>,
}

pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SourcesData>> {
    let credentials = &state.pipeline.config.credentials;

    let sources = SourceKind::ALL
        .into_iter()
        .map(|kind| {
            let readiness = credentials.readiness(kind);
            let guide = configuration_guide(kind);
            SourceStatusItem {
                source: kind,
                name: kind.display_name(),
                hint: readiness.hint(),
                setup_steps: (!readiness.is_ready()).then_some(guide.steps),
                readiness,
                env_vars: guide.env_vars,
            }
        })
        .collect();

    Json(ApiResponse::new(
        SourcesData {
            fully_configured: credentials.is_fully_configured(),
            sources,
        },
        req_id.0,
    ))
}

pub(super) async fn list_localities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<LocalitiesData>> {
    let region = &state.pipeline.region;
    Json(ApiResponse::new(
        LocalitiesData {
            region: region.name.clone(),
            localities: region.localities.clone(),
        },
        req_id.0,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::{get_json, test_app};

    #[sqlx::test(migrations = "../../migrations")]
    async fn sources_report_every_provider_with_hints(pool: sqlx::SqlitePool) {
        let (status, json) = get_json(test_app(pool), "/api/v1/sources").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["fully_configured"], false);
        let sources = json["data"]["sources"].as_array().expect("sources array");
        assert_eq!(sources.len(), 6);

        let news = sources
            .iter()
            .find(|s| s["source"] == "news")
            .expect("news entry");
        assert_eq!(news["readiness"]["state"], "ready");
        assert!(news.get("setup_steps").is_none());

        let claude = sources
            .iter()
            .find(|s| s["source"] == "claude")
            .expect("claude entry");
        assert_eq!(claude["readiness"]["state"], "missing");
        assert!(claude["hint"]
            .as_str()
            .expect("hint string")
            .contains("CLAUDE_API_KEY"));
        assert!(claude["setup_steps"].is_array());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn localities_list_the_default_region(pool: sqlx::SqlitePool) {
        let (status, json) = get_json(test_app(pool), "/api/v1/localities").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["region"], "Hyderabad");
        let localities = json["data"]["localities"].as_array().expect("localities");
        assert!(localities.iter().any(|l| l == "Gachibowli"));
    }
}
