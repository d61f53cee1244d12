//! Source collectors and the fan-out that runs them.

mod claude_research;
mod instagram;
mod news_rss;
mod reddit;
mod reddit_helpers;
mod rss_helpers;
mod twitter;
mod youtube;

use std::collections::HashSet;

use estatepulse_core::{CollectedMention, Readiness, SourceKind};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{decode_json, ensure_success, SentimentError};
use crate::pipeline::PipelineContext;
use crate::retry::retry_with_backoff;

pub(crate) use claude_research::fetch_claude_research;
pub(crate) use instagram::fetch_instagram;
pub(crate) use news_rss::fetch_google_news;
pub(crate) use reddit::fetch_reddit;
pub(crate) use twitter::fetch_twitter;
pub(crate) use youtube::fetch_youtube;

/// Base URLs for every provider. Override with [`Endpoints::with_base`] to
/// point all collectors at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub reddit_auth: String,
    pub reddit_api: String,
    pub youtube: String,
    pub instagram: String,
    pub twitter: String,
    pub news: String,
    pub claude: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            reddit_auth: "https://www.reddit.com".to_string(),
            reddit_api: "https://oauth.reddit.com".to_string(),
            youtube: "https://www.googleapis.com/youtube/v3".to_string(),
            instagram: "https://graph.facebook.com/v18.0".to_string(),
            twitter: "https://api.twitter.com/2".to_string(),
            news: "https://news.google.com".to_string(),
            claude: "https://api.anthropic.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Every provider served from one base URL (paths unchanged).
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            reddit_auth: base.clone(),
            reddit_api: base.clone(),
            youtube: base.clone(),
            instagram: base.clone(),
            twitter: base.clone(),
            news: base.clone(),
            claude: base,
        }
    }
}

/// What happened to one source during a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Collected { count: usize },
    /// Credentials missing or invalid; the source was not called.
    Skipped { hint: String },
    Failed { error: String, hint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

/// Run the requested collectors concurrently for `location`.
///
/// A failing or unconfigured source never aborts the others: it is logged
/// and reported through its [`SourceOutcome`]. Mentions are deduplicated by
/// `(source, external_id)` and each source contributes at most `limit`.
pub async fn collect_mentions(
    ctx: &PipelineContext,
    location: &str,
    sources: &[SourceKind],
    limit: usize,
) -> (Vec<CollectedMention>, Vec<SourceReport>) {
    let mut requested: Vec<SourceKind> = Vec::new();
    for kind in sources {
        if !requested.contains(kind) {
            requested.push(*kind);
        }
    }

    let runs = requested
        .iter()
        .map(|&kind| async move { (kind, collect_one(ctx, kind, location, limit).await) });
    let results = futures::future::join_all(runs).await;

    let mut seen: HashSet<(SourceKind, String)> = HashSet::new();
    let mut mentions = Vec::new();
    let mut reports = Vec::with_capacity(results.len());

    for (source, result) in results {
        let outcome = match result {
            Ok(collected) => {
                let before = mentions.len();
                for mention in collected {
                    if mentions.len() - before >= limit {
                        break;
                    }
                    if seen.insert((mention.source, mention.external_id.clone())) {
                        mentions.push(mention);
                    }
                }
                let count = mentions.len() - before;
                tracing::info!(location, source = %source, count, "collected mentions");
                SourceOutcome::Collected { count }
            }
            Err(CollectError::Skipped(hint)) => {
                tracing::info!(location, source = %source, hint = %hint, "source not configured; skipping");
                SourceOutcome::Skipped { hint }
            }
            Err(CollectError::Failed(e)) => {
                tracing::warn!(location, source = %source, error = %e, "source collection failed");
                SourceOutcome::Failed {
                    error: e.to_string(),
                    hint: e.hint(),
                }
            }
        };
        reports.push(SourceReport { source, outcome });
    }

    (mentions, reports)
}

enum CollectError {
    Skipped(String),
    Failed(SentimentError),
}

impl From<SentimentError> for CollectError {
    fn from(e: SentimentError) -> Self {
        CollectError::Failed(e)
    }
}

async fn collect_one(
    ctx: &PipelineContext,
    kind: SourceKind,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, CollectError> {
    let creds = &ctx.config.credentials;
    let readiness = creds.readiness(kind);
    if !readiness.is_ready() {
        return Err(CollectError::Skipped(skip_hint(kind, &readiness)));
    }

    let missing = || CollectError::Skipped(skip_hint(kind, &readiness));
    let mentions = match kind {
        SourceKind::Reddit => {
            let id = creds.reddit_client_id.as_deref().ok_or_else(missing)?;
            let secret = creds.reddit_client_secret.as_deref().ok_or_else(missing)?;
            fetch_reddit(ctx, id, secret, location, limit).await?
        }
        SourceKind::Youtube => {
            let key = creds.youtube_api_key.as_deref().ok_or_else(missing)?;
            fetch_youtube(ctx, key, location, limit).await?
        }
        SourceKind::Instagram => {
            let token = creds.instagram_access_token.as_deref().ok_or_else(missing)?;
            let user_id = creds.instagram_user_id.as_deref().ok_or_else(missing)?;
            fetch_instagram(ctx, token, user_id, location, limit).await?
        }
        SourceKind::Twitter => {
            let token = creds.twitter_bearer_token.as_deref().ok_or_else(missing)?;
            fetch_twitter(ctx, token, location, limit).await?
        }
        SourceKind::News => fetch_google_news(ctx, location, limit).await?,
        SourceKind::Claude => {
            let key = creds.claude_api_key.as_deref().ok_or_else(missing)?;
            fetch_claude_research(ctx, key, location, limit).await?
        }
    };
    Ok(mentions)
}

fn skip_hint(kind: SourceKind, readiness: &Readiness) -> String {
    match readiness.hint() {
        Some(hint) => format!("{} not configured: {hint}", kind.display_name()),
        None => format!("{} not configured", kind.display_name()),
    }
}

/// Send the request built by `build` (rebuilt on every attempt), retrying
/// transient failures, and decode the JSON body.
pub(super) async fn send_json<T, F>(
    ctx: &PipelineContext,
    provider: &'static str,
    env_var: Option<&'static str>,
    context: &str,
    build: F,
) -> Result<T, SentimentError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let body = send_text(ctx, provider, env_var, build).await?;
    decode_json(&body, context)
}

/// Like [`send_json`] but returns the raw body.
pub(super) async fn send_text<F>(
    ctx: &PipelineContext,
    provider: &'static str,
    env_var: Option<&'static str>,
    build: F,
) -> Result<String, SentimentError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let build = &build;
    retry_with_backoff(
        ctx.config.max_retries,
        ctx.config.retry_backoff_base_ms,
        move || async move {
            let response = build().send().await?;
            let response = ensure_success(provider, env_var, response).await?;
            Ok(response.text().await?)
        },
    )
    .await
}

/// Whether an error should stop a collector rather than be skipped for one
/// sub-query (one subreddit, one video, one hashtag). A 403 on a single
/// sub-query usually means that resource is private or closed.
pub(super) fn is_fatal(err: &SentimentError) -> bool {
    matches!(
        err,
        SentimentError::Unauthorized { status: 401, .. } | SentimentError::RateLimited { .. }
    )
}
