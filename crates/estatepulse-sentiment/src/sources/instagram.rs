//! Instagram Graph API collector: recent public media for location hashtags.

use chrono::{DateTime, Utc};
use estatepulse_core::{CollectedMention, Engagement, RegionProfile, SourceKind};
use serde::Deserialize;

use crate::error::SentimentError;
use crate::pipeline::PipelineContext;

use super::{is_fatal, send_json};

const PROVIDER: &str = "Instagram";
const ENV_VAR: &str = "INSTAGRAM_ACCESS_TOKEN";
/// The Graph API allows 30 unique hashtag searches per week per account.
const MAX_HASHTAGS: usize = 3;
const MEDIA_FIELDS: &str = "id,caption,permalink,timestamp,like_count,comments_count";

#[derive(Debug, Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HashtagNode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: String,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    comments_count: Option<i64>,
}

/// Graph API reports expired or revoked tokens as HTTP 400 with an
/// `OAuthException` body.
fn map_oauth_error(err: SentimentError) -> SentimentError {
    match err {
        SentimentError::Api {
            status: 400,
            ref message,
            ..
        } if message.contains("OAuthException") => SentimentError::Unauthorized {
            provider: PROVIDER,
            status: 400,
            env_var: ENV_VAR,
        },
        other => other,
    }
}

/// Graph timestamps look like `2024-05-01T10:00:00+0000`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Keep captions that name the location, or that are about real estate in
/// the region.
fn is_relevant(region: &RegionProfile, location: &str, caption: &str) -> bool {
    let lower = caption.to_lowercase();
    let compact: String = location
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    lower.contains(&location.to_lowercase())
        || (!compact.is_empty() && lower.contains(&compact))
        || (region.is_on_topic(caption) && region.is_region_related(caption))
}

/// Recent media for the location's first hashtags, at most `limit`.
///
/// # Errors
///
/// Returns [`SentimentError::Unauthorized`] when the token is rejected
/// (including `OAuthException` 400s) and [`SentimentError::RateLimited`] on
/// 429. Other per-hashtag failures are skipped.
pub(crate) async fn fetch_instagram(
    ctx: &PipelineContext,
    access_token: &str,
    user_id: &str,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, SentimentError> {
    let hashtags = ctx.region.hashtags_for(location);
    if hashtags.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let limit_param = limit.min(50).to_string();
    let mut mentions: Vec<CollectedMention> = Vec::new();

    for tag in hashtags.iter().take(MAX_HASHTAGS) {
        let media = match hashtag_media(ctx, access_token, user_id, tag, &limit_param).await {
            Ok(media) => media,
            Err(e) if is_fatal(&e) || matches!(e, SentimentError::Unauthorized { .. }) => {
                return Err(e)
            }
            Err(e) => {
                tracing::debug!(hashtag = %tag, error = %e, "Instagram hashtag lookup failed");
                continue;
            }
        };

        for item in media {
            let Some(caption) = item.caption.as_deref().map(str::trim) else {
                continue;
            };
            if caption.is_empty() || !is_relevant(&ctx.region, location, caption) {
                continue;
            }
            if mentions.iter().any(|m| m.external_id == item.id) {
                continue;
            }
            mentions.push(CollectedMention {
                source: SourceKind::Instagram,
                text: caption.to_string(),
                external_id: item.id,
                author: None,
                url: item.permalink,
                engagement: Engagement {
                    likes: item.like_count,
                    comments: item.comments_count,
                    shares: None,
                },
                published_at: item.timestamp.as_deref().and_then(parse_timestamp),
            });
        }

        if mentions.len() >= limit {
            break;
        }
    }

    mentions.truncate(limit);
    tracing::debug!(location, count = mentions.len(), "collected Instagram mentions");
    Ok(mentions)
}

async fn hashtag_media(
    ctx: &PipelineContext,
    access_token: &str,
    user_id: &str,
    tag: &str,
    limit: &str,
) -> Result<Vec<Media>, SentimentError> {
    let search_url = format!("{}/ig_hashtag_search", ctx.endpoints.instagram);
    let found: DataList<HashtagNode> =
        send_json(ctx, PROVIDER, Some(ENV_VAR), "instagram hashtag search", || {
            ctx.http.get(&search_url).query(&[
                ("user_id", user_id),
                ("q", tag),
                ("access_token", access_token),
            ])
        })
        .await
        .map_err(map_oauth_error)?;

    let Some(node) = found.data.into_iter().next() else {
        return Ok(Vec::new());
    };

    let media_url = format!("{}/{}/recent_media", ctx.endpoints.instagram, node.id);
    let media: DataList<Media> =
        send_json(ctx, PROVIDER, Some(ENV_VAR), "instagram recent media", || {
            ctx.http.get(&media_url).query(&[
                ("user_id", user_id),
                ("fields", MEDIA_FIELDS),
                ("limit", limit),
                ("access_token", access_token),
            ])
        })
        .await
        .map_err(map_oauth_error)?;

    Ok(media.data)
}
