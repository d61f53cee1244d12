//! Aggregate read queries over `mentions`: per-location summary, daily
//! timeline, and the list of locations with stored data.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::{location_pattern, DbError};

/// Longest timeline window, in days.
pub const MAX_TIMELINE_DAYS: i64 = 365;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Label distribution and averages for one location.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SentimentTotalsRow {
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    /// `None` when the location has no mentions.
    pub avg_score: Option<f64>,
    pub avg_confidence: Option<f64>,
    pub last_collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SourceBreakdownRow {
    pub source: String,
    pub count: i64,
    pub avg_score: f64,
    pub positive: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentSummary {
    pub location: String,
    pub totals: SentimentTotalsRow,
    pub by_source: Vec<SourceBreakdownRow>,
}

/// One day of the sentiment timeline.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DailySentimentRow {
    /// `YYYY-MM-DD` (UTC).
    pub day: String,
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LocationRow {
    pub location: String,
    pub mention_count: i64,
    pub last_collected_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Totals, label distribution, and per-source breakdown for every mention
/// whose location contains `location` (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn sentiment_summary(
    pool: &SqlitePool,
    location: &str,
) -> Result<SentimentSummary, DbError> {
    let pattern = location_pattern(location);

    let totals = sqlx::query_as::<_, SentimentTotalsRow>(
        "SELECT COUNT(*) AS total, \
                COALESCE(SUM(sentiment = 'positive'), 0) AS positive, \
                COALESCE(SUM(sentiment = 'negative'), 0) AS negative, \
                COALESCE(SUM(sentiment = 'neutral'), 0) AS neutral, \
                AVG(score) AS avg_score, \
                AVG(confidence) AS avg_confidence, \
                MAX(collected_at) AS last_collected_at \
         FROM mentions \
         WHERE location LIKE $1 ESCAPE '\\'",
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let by_source = sqlx::query_as::<_, SourceBreakdownRow>(
        "SELECT source, \
                COUNT(*) AS count, \
                AVG(score) AS avg_score, \
                SUM(sentiment = 'positive') AS positive \
         FROM mentions \
         WHERE location LIKE $1 ESCAPE '\\' \
         GROUP BY source \
         ORDER BY count DESC, source ASC",
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    Ok(SentimentSummary {
        location: location.trim().to_string(),
        totals,
        by_source,
    })
}

/// Per-day counts and mean score over the last `days` days, oldest first.
///
/// `days` is clamped to `1..=MAX_TIMELINE_DAYS`. Days without mentions are
/// omitted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn daily_sentiment(
    pool: &SqlitePool,
    location: &str,
    days: i64,
) -> Result<Vec<DailySentimentRow>, DbError> {
    let since = Utc::now() - Duration::days(days.clamp(1, MAX_TIMELINE_DAYS));

    let rows = sqlx::query_as::<_, DailySentimentRow>(
        "SELECT substr(collected_at, 1, 10) AS day, \
                COUNT(*) AS total, \
                SUM(sentiment = 'positive') AS positive, \
                SUM(sentiment = 'negative') AS negative, \
                SUM(sentiment = 'neutral') AS neutral, \
                AVG(score) AS avg_score \
         FROM mentions \
         WHERE location LIKE $1 ESCAPE '\\' \
           AND collected_at >= $2 \
         GROUP BY day \
         ORDER BY day ASC",
    )
    .bind(location_pattern(location))
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every stored location with its mention count and latest collection time,
/// most recently collected first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_locations(pool: &SqlitePool) -> Result<Vec<LocationRow>, DbError> {
    let rows = sqlx::query_as::<_, LocationRow>(
        "SELECT location, \
                COUNT(*) AS mention_count, \
                MAX(collected_at) AS last_collected_at \
         FROM mentions \
         GROUP BY location \
         ORDER BY last_collected_at DESC, location ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
