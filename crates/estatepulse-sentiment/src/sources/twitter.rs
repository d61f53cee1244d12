//! Twitter/X API v2 recent-search collector (app bearer token).

use chrono::{DateTime, Utc};
use estatepulse_core::{CollectedMention, Engagement, SourceKind};
use serde::Deserialize;

use crate::error::SentimentError;
use crate::pipeline::PipelineContext;

use super::send_json;

const PROVIDER: &str = "Twitter/X";
const ENV_VAR: &str = "TWITTER_BEARER_TOKEN";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    reply_count: Option<i64>,
    #[serde(default)]
    retweet_count: Option<i64>,
}

fn search_query(location: &str, region: &str) -> String {
    format!("{location} {region} real estate (property OR flat OR apartment)")
}

/// Recent tweets about `location`, at most `limit` (the API accepts 10..=100
/// per request).
///
/// # Errors
///
/// Returns [`SentimentError::Unauthorized`] on 401/403 and
/// [`SentimentError::RateLimited`] on 429.
pub(crate) async fn fetch_twitter(
    ctx: &PipelineContext,
    bearer_token: &str,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, SentimentError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let url = format!("{}/tweets/search/recent", ctx.endpoints.twitter);
    let query = search_query(location, &ctx.region.name);
    let max_results = limit.clamp(10, 100).to_string();

    let response: SearchResponse = send_json(ctx, PROVIDER, Some(ENV_VAR), "twitter recent search", || {
        ctx.http.get(&url).bearer_auth(bearer_token).query(&[
            ("query", query.as_str()),
            ("max_results", max_results.as_str()),
            ("tweet.fields", "created_at,public_metrics,author_id"),
            ("expansions", "author_id"),
            ("user.fields", "username"),
        ])
    })
    .await?;

    let users = response.includes.map(|i| i.users).unwrap_or_default();
    let mentions: Vec<CollectedMention> = response
        .data
        .into_iter()
        .take(limit)
        .map(|tweet| {
            let username = tweet
                .author_id
                .as_deref()
                .and_then(|id| users.iter().find(|u| u.id == id))
                .map(|u| u.username.clone());
            let url = match &username {
                Some(name) => format!("https://twitter.com/{name}/status/{}", tweet.id),
                None => format!("https://twitter.com/i/web/status/{}", tweet.id),
            };
            let metrics = tweet.public_metrics;
            CollectedMention {
                source: SourceKind::Twitter,
                external_id: tweet.id,
                author: username,
                url: Some(url),
                text: tweet.text,
                engagement: Engagement {
                    likes: metrics.as_ref().and_then(|m| m.like_count),
                    comments: metrics.as_ref().and_then(|m| m.reply_count),
                    shares: metrics.as_ref().and_then(|m| m.retweet_count),
                },
                published_at: tweet.created_at,
            }
        })
        .collect();

    tracing::debug!(location, count = mentions.len(), "collected Twitter mentions");
    Ok(mentions)
}
