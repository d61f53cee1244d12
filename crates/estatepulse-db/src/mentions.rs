//! Database operations for the append-only `mentions` table.

use chrono::{DateTime, Utc};
use estatepulse_core::{
    Classification, ClassificationMethod, CoreError, Engagement, Mention, SentimentLabel,
    SourceKind,
};
use sqlx::query::QueryScalar;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};

use crate::{location_pattern, DbError};

const MENTION_COLUMNS: &str = "id, source, external_id, location, author, url, raw_text, \
     clean_text, likes, comments, shares, published_at, collected_at, \
     sentiment, score, confidence, reason, method";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub id: i64,
    pub source: String,
    pub external_id: String,
    pub location: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub raw_text: String,
    pub clean_text: String,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub sentiment: String,
    pub score: f64,
    pub confidence: f64,
    pub reason: String,
    pub method: String,
}

impl MentionRow {
    /// Convert the stored row back into the domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if `source`, `sentiment`, or `method` hold
    /// a value the domain enums do not recognise.
    pub fn into_mention(self) -> Result<Mention, DbError> {
        let source: SourceKind = self
            .source
            .parse()
            .map_err(decode_error)?;
        let label: SentimentLabel = self
            .sentiment
            .parse()
            .map_err(decode_error)?;
        let method: ClassificationMethod = self
            .method
            .parse()
            .map_err(decode_error)?;

        Ok(Mention {
            source,
            external_id: self.external_id,
            location: self.location,
            author: self.author,
            url: self.url,
            raw_text: self.raw_text,
            clean_text: self.clean_text,
            engagement: Engagement {
                likes: self.likes,
                comments: self.comments,
                shares: self.shares,
            },
            published_at: self.published_at,
            collected_at: self.collected_at,
            classification: Classification {
                label,
                score: self.score,
                confidence: self.confidence,
                reason: self.reason,
                method,
            },
        })
    }
}

fn decode_error(e: CoreError) -> DbError {
    DbError::Decode(e.to_string())
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Optional filters for [`list_mentions_by_location`].
#[derive(Debug, Clone, Default)]
pub struct MentionFilter {
    pub source: Option<SourceKind>,
    pub sentiment: Option<SentimentLabel>,
    pub limit: i64,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

const INSERT_MENTION_SQL: &str = "INSERT INTO mentions \
         (source, external_id, location, author, url, raw_text, clean_text, \
          likes, comments, shares, published_at, collected_at, \
          sentiment, score, confidence, reason, method) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
     ON CONFLICT (source, external_id) DO NOTHING \
     RETURNING id";

fn insert_query(mention: &Mention) -> QueryScalar<'_, Sqlite, i64, SqliteArguments<'_>> {
    sqlx::query_scalar::<_, i64>(INSERT_MENTION_SQL)
        .bind(mention.source.as_str())
        .bind(&mention.external_id)
        .bind(&mention.location)
        .bind(mention.author.as_deref())
        .bind(mention.url.as_deref())
        .bind(&mention.raw_text)
        .bind(&mention.clean_text)
        .bind(mention.engagement.likes)
        .bind(mention.engagement.comments)
        .bind(mention.engagement.shares)
        .bind(mention.published_at)
        .bind(mention.collected_at)
        .bind(mention.classification.label.as_str())
        .bind(mention.classification.score)
        .bind(mention.classification.confidence)
        .bind(&mention.classification.reason)
        .bind(mention.classification.method.as_str())
}

/// Insert one mention. Returns the new row id, or `None` when a mention with
/// the same `(source, external_id)` is already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_mention(pool: &SqlitePool, mention: &Mention) -> Result<Option<i64>, DbError> {
    let id = insert_query(mention).fetch_optional(pool).await?;
    Ok(id)
}

/// Insert a batch of mentions in one transaction, skipping duplicates.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the whole batch is rolled back.
pub async fn insert_mentions(
    pool: &SqlitePool,
    mentions: &[Mention],
) -> Result<InsertSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = InsertSummary::default();

    for mention in mentions {
        match insert_query(mention).fetch_optional(&mut *tx).await? {
            Some(_) => summary.inserted += 1,
            None => summary.duplicates += 1,
        }
    }

    tx.commit().await?;
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetch one mention by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_mention(pool: &SqlitePool, id: i64) -> Result<MentionRow, DbError> {
    let sql = format!("SELECT {MENTION_COLUMNS} FROM mentions WHERE id = $1");
    let row = sqlx::query_as::<_, MentionRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// List mentions whose location contains `location` (case-insensitive),
/// newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mentions_by_location(
    pool: &SqlitePool,
    location: &str,
    filter: &MentionFilter,
) -> Result<Vec<MentionRow>, DbError> {
    let sql = format!(
        "SELECT {MENTION_COLUMNS} FROM mentions \
         WHERE location LIKE $1 ESCAPE '\\' \
           AND ($2 IS NULL OR source = $2) \
           AND ($3 IS NULL OR sentiment = $3) \
         ORDER BY collected_at DESC, id DESC \
         LIMIT $4"
    );
    let rows = sqlx::query_as::<_, MentionRow>(&sql)
        .bind(location_pattern(location))
        .bind(filter.source.map(SourceKind::as_str))
        .bind(filter.sentiment.map(SentimentLabel::as_str))
        .bind(filter.limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
