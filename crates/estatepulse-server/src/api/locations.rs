use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use estatepulse_core::{Mention, SentimentLabel, SourceKind};
use estatepulse_db::MentionFilter;
use estatepulse_sentiment::{analyze_market, build_report, MarketAnalysis, SentimentReport};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, require_location, ApiError, ApiResponse, AppState};

const DEFAULT_TIMELINE_DAYS: i64 = 30;
/// Upper bound on stored mentions folded into one report.
const REPORT_MENTION_LIMIT: i64 = 5_000;

#[derive(Debug, Serialize)]
pub(super) struct LocationItem {
    location: String,
    mention_count: i64,
    last_collected_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MentionsQuery {
    pub source: Option<String>,
    pub sentiment: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct MentionItem {
    id: i64,
    source: String,
    external_id: String,
    location: String,
    author: Option<String>,
    url: Option<String>,
    text: String,
    likes: Option<i64>,
    comments: Option<i64>,
    shares: Option<i64>,
    published_at: Option<DateTime<Utc>>,
    collected_at: DateTime<Utc>,
    sentiment: String,
    score: f64,
    confidence: f64,
    reason: String,
    method: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SourceSummaryItem {
    source: String,
    count: i64,
    average_score: f64,
    positive_ratio: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct LocationSummaryData {
    location: String,
    total: i64,
    positive: i64,
    negative: i64,
    neutral: i64,
    average_score: Option<f64>,
    average_confidence: Option<f64>,
    overall: SentimentLabel,
    last_collected_at: Option<DateTime<Utc>>,
    by_source: Vec<SourceSummaryItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TimelineQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct TimelineItem {
    day: String,
    total: i64,
    positive: i64,
    negative: i64,
    neutral: i64,
    average_score: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct LocationReportData {
    #[serde(flatten)]
    report: SentimentReport,
    analysis: MarketAnalysis,
    markdown: String,
}

pub(super) async fn list_locations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<LocationItem>>>, ApiError> {
    let rows = estatepulse_db::list_locations(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| LocationItem {
            location: row.location,
            mention_count: row.mention_count,
            last_collected_at: row.last_collected_at,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn list_location_mentions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(location): Path<String>,
    Query(query): Query<MentionsQuery>,
) -> Result<Json<ApiResponse<Vec<MentionItem>>>, ApiError> {
    let location = require_location(&req_id.0, &location)?;
    let filter = MentionFilter {
        source: parse_filter::<SourceKind>(&req_id.0, "source", query.source.as_deref())?,
        sentiment: parse_filter::<SentimentLabel>(
            &req_id.0,
            "sentiment",
            query.sentiment.as_deref(),
        )?,
        limit: normalize_limit(query.limit),
    };

    let rows = estatepulse_db::list_mentions_by_location(&state.pool, &location, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| MentionItem {
            id: row.id,
            source: row.source,
            external_id: row.external_id,
            location: row.location,
            author: row.author,
            url: row.url,
            text: row.raw_text,
            likes: row.likes,
            comments: row.comments,
            shares: row.shares,
            published_at: row.published_at,
            collected_at: row.collected_at,
            sentiment: row.sentiment,
            score: row.score,
            confidence: row.confidence,
            reason: row.reason,
            method: row.method,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_location_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(location): Path<String>,
) -> Result<Json<ApiResponse<LocationSummaryData>>, ApiError> {
    let location = require_location(&req_id.0, &location)?;
    let summary = estatepulse_db::sentiment_summary(&state.pool, &location)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let totals = summary.totals;
    let by_source = summary
        .by_source
        .into_iter()
        .map(|row| SourceSummaryItem {
            positive_ratio: ratio(row.positive, row.count),
            source: row.source,
            count: row.count,
            average_score: row.avg_score,
        })
        .collect();

    let data = LocationSummaryData {
        location: summary.location,
        total: totals.total,
        positive: totals.positive,
        negative: totals.negative,
        neutral: totals.neutral,
        overall: SentimentLabel::from_score(totals.avg_score.unwrap_or(0.0)),
        average_score: totals.avg_score,
        average_confidence: totals.avg_confidence,
        last_collected_at: totals.last_collected_at,
        by_source,
    };

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_location_timeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(location): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<ApiResponse<Vec<TimelineItem>>>, ApiError> {
    let location = require_location(&req_id.0, &location)?;
    let days = normalize_days(query.days);

    let rows = estatepulse_db::daily_sentiment(&state.pool, &location, days)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TimelineItem {
            day: row.day,
            total: row.total,
            positive: row.positive,
            negative: row.negative,
            neutral: row.neutral,
            average_score: row.avg_score,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// Aggregate report and market analysis over every stored mention for the
/// location. Rows that no longer decode are logged and left out.
pub(super) async fn get_location_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(location): Path<String>,
) -> Result<Json<ApiResponse<LocationReportData>>, ApiError> {
    let location = state
        .pipeline
        .region
        .canonical_location(&location)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let filter = MentionFilter {
        limit: REPORT_MENTION_LIMIT,
        ..MentionFilter::default()
    };
    let rows = estatepulse_db::list_mentions_by_location(&state.pool, &location, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mentions: Vec<Mention> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            row.into_mention()
                .map_err(|e| tracing::warn!(id, error = %e, "skipping undecodable mention"))
                .ok()
        })
        .collect();

    let report = build_report(&location, &mentions);
    let analysis = analyze_market(&state.pipeline, &report).await;
    let markdown = format!("{}{}", report.to_markdown(), analysis.to_markdown());

    Ok(Json(ApiResponse::new(
        LocationReportData {
            report,
            analysis,
            markdown,
        },
        req_id.0,
    )))
}

fn parse_filter<T: std::str::FromStr>(
    request_id: &str,
    name: &str,
    raw: Option<&str>,
) -> Result<Option<T>, ApiError>
where
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|e: T::Err| {
            ApiError::new(request_id, "validation_error", format!("invalid {name}: {e}"))
        }),
    }
}

fn normalize_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_TIMELINE_DAYS).clamp(1, estatepulse_db::MAX_TIMELINE_DAYS)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
