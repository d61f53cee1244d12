use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use estatepulse_core::SourceKind;
use estatepulse_sentiment::{run_location_sentiment, SentimentReport, SourceReport};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, map_pipeline_error, ApiError, ApiResponse, AppState};

const MAX_COLLECT_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub(super) struct CollectQuery {
    /// Comma-separated source names; all sources when absent.
    pub sources: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectData {
    collection_run_id: Uuid,
    location: String,
    inserted: usize,
    duplicates: usize,
    outcomes: Vec<SourceReport>,
    report: SentimentReport,
}

/// Run the pipeline for one location and store what it classified.
///
/// The work is tracked as an `api` collection run. Unavailable sources show
/// up in `outcomes` with a hint; only a bad location or a storage failure
/// fails the request.
pub(super) async fn collect_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(location): Path<String>,
    Query(query): Query<CollectQuery>,
) -> Result<Json<ApiResponse<CollectData>>, ApiError> {
    let ctx = state.pipeline.as_ref();
    let location = ctx
        .region
        .canonical_location(&location)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let sources = parse_sources(&req_id.0, query.sources.as_deref())?;
    let limit = query
        .limit
        .unwrap_or(ctx.config.default_limit)
        .clamp(1, MAX_COLLECT_LIMIT);

    let run = estatepulse_db::create_collection_run(&state.pool, &location, "api")
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if let Err(e) = estatepulse_db::start_collection_run(&state.pool, run.id).await {
        fail_run_best_effort(&state.pool, run.id, &e.to_string()).await;
        return Err(map_db_error(req_id.0, &e));
    }

    let result = match run_location_sentiment(ctx, &location, &sources, limit).await {
        Ok(result) => result,
        Err(e) => {
            fail_run_best_effort(&state.pool, run.id, &e.to_string()).await;
            return Err(map_pipeline_error(req_id.0, &e));
        }
    };

    let summary = match estatepulse_db::insert_mentions(&state.pool, &result.mentions).await {
        Ok(summary) => summary,
        Err(e) => {
            fail_run_best_effort(&state.pool, run.id, &e.to_string()).await;
            return Err(map_db_error(req_id.0, &e));
        }
    };

    let inserted = i64::try_from(summary.inserted).unwrap_or(i64::MAX);
    if let Err(e) = estatepulse_db::complete_collection_run(&state.pool, run.id, inserted).await {
        fail_run_best_effort(&state.pool, run.id, &e.to_string()).await;
        return Err(map_db_error(req_id.0, &e));
    }

    tracing::info!(
        location = %location,
        run_id = run.id,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "api collection run complete"
    );

    Ok(Json(ApiResponse::new(
        CollectData {
            collection_run_id: run.public_id,
            location: result.location,
            inserted: summary.inserted,
            duplicates: summary.duplicates,
            outcomes: result.outcomes,
            report: result.report,
        },
        req_id.0,
    )))
}

fn parse_sources(request_id: &str, raw: Option<&str>) -> Result<Vec<SourceKind>, ApiError> {
    let mut sources = Vec::new();
    for name in raw.unwrap_or_default().split(',').map(str::trim) {
        if name.is_empty() {
            continue;
        }
        let kind: SourceKind = name.parse().map_err(|e| {
            ApiError::new(request_id, "validation_error", format!("invalid source: {e}"))
        })?;
        if !sources.contains(&kind) {
            sources.push(kind);
        }
    }

    if sources.is_empty() {
        return Ok(SourceKind::ALL.to_vec());
    }
    Ok(sources)
}

async fn fail_run_best_effort(pool: &SqlitePool, run_id: i64, message: &str) {
    if let Err(mark_err) = estatepulse_db::fail_collection_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark collection run as failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::test_support::{app_with_base, get_json, send, test_app};

    const NEWS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title>
<item>
  <title>Kokapet land prices hit record high as demand surges</title>
  <link>https://news.example.com/kokapet-prices</link>
  <pubDate>Wed, 01 May 2024 10:00:00 GMT</pubDate>
  <description>Buyers see great growth and value near the Financial District</description>
</item>
<item>
  <title>Water shortage worries Kokapet apartment owners</title>
  <link>https://news.example.com/kokapet-water</link>
  <description>Residents call the tanker costs terrible and the traffic awful</description>
</item>
</channel></rss>"#;

    async fn news_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NEWS_FEED))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn parse_sources_defaults_dedups_and_validates() {
        assert_eq!(
            parse_sources("req-1", None).expect("default"),
            SourceKind::ALL.to_vec()
        );
        assert_eq!(
            parse_sources("req-1", Some("news, x,news")).expect("list"),
            vec![SourceKind::News, SourceKind::Twitter]
        );
        let err = parse_sources("req-1", Some("news,fax")).expect_err("unknown source");
        assert_eq!(err.error.code, "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn collect_stores_mentions_and_tracks_the_run(pool: sqlx::SqlitePool) {
        let server = news_server().await;
        let app = app_with_base(pool.clone(), &server.uri());

        let (status, json) = send(
            app.clone(),
            Method::POST,
            "/api/v1/locations/kokapet/collect?sources=news&limit=10",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &json["data"];
        assert_eq!(data["location"], "Kokapet");
        assert_eq!(data["inserted"], 2);
        assert_eq!(data["duplicates"], 0);
        assert_eq!(data["outcomes"][0]["source"], "news");
        assert_eq!(data["outcomes"][0]["status"], "collected");
        assert_eq!(data["outcomes"][0]["count"], 2);
        assert_eq!(data["report"]["total"], 2);

        let (_, again) = send(
            app.clone(),
            Method::POST,
            "/api/v1/locations/Kokapet/collect?sources=news",
        )
        .await;
        assert_eq!(again["data"]["inserted"], 0);
        assert_eq!(again["data"]["duplicates"], 2);

        let (status, runs) = get_json(app, "/api/v1/collection-runs").await;
        assert_eq!(status, StatusCode::OK);
        let runs = runs["data"].as_array().expect("runs array");
        assert_eq!(runs.len(), 2);
        assert!(runs
            .iter()
            .all(|r| r["status"] == "succeeded" && r["trigger_source"] == "api"));
        assert_eq!(runs[1]["records_processed"], 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn collect_with_unconfigured_sources_still_succeeds(pool: sqlx::SqlitePool) {
        let (status, json) = send(
            test_app(pool),
            Method::POST,
            "/api/v1/locations/Gachibowli/collect?sources=reddit,youtube",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let outcomes = json["data"]["outcomes"].as_array().expect("outcomes");
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o["status"] == "skipped"));
        assert_eq!(json["data"]["inserted"], 0);
        assert_eq!(json["data"]["report"]["overall"], "neutral");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn collect_rejects_unknown_source_before_creating_a_run(pool: sqlx::SqlitePool) {
        let (status, json) = send(
            test_app(pool.clone()),
            Method::POST,
            "/api/v1/locations/Kokapet/collect?sources=myspace",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
        let runs = estatepulse_db::list_collection_runs(&pool, 10)
            .await
            .expect("list runs");
        assert!(runs.is_empty());
    }
}
