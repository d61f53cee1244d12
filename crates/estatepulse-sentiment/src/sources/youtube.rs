//! YouTube Data API v3 collector: comments on videos about the location.

use chrono::{DateTime, Utc};
use estatepulse_core::{CollectedMention, Engagement, SourceKind};
use serde::Deserialize;

use crate::error::SentimentError;
use crate::pipeline::PipelineContext;

use super::{is_fatal, send_json};

const PROVIDER: &str = "YouTube";
const ENV_VAR: &str = "YOUTUBE_API_KEY";
const MAX_VIDEOS: usize = 10;
const MAX_COMMENTS_PER_VIDEO: usize = 20;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
    #[serde(default)]
    total_reply_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: String,
    #[serde(default)]
    author_display_name: Option<String>,
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Comment threads fetched per video: `limit / 10`, between 1 and 20.
fn comments_per_video(limit: usize) -> usize {
    (limit / 10).clamp(1, MAX_COMMENTS_PER_VIDEO)
}

/// Search up to ten videos about `location` and collect their most relevant
/// top-level comments, at most `limit` in total.
///
/// # Errors
///
/// Returns an error if the video search fails, or a fatal error (401, 429)
/// from a comment fetch. Other per-video failures, such as comments being
/// disabled, are skipped.
pub(crate) async fn fetch_youtube(
    ctx: &PipelineContext,
    api_key: &str,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, SentimentError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let query = format!("{location} {} real estate property", ctx.region.name);
    let search_url = format!("{}/search", ctx.endpoints.youtube);
    let max_results = MAX_VIDEOS.to_string();
    let search: SearchResponse = send_json(ctx, PROVIDER, Some(ENV_VAR), "youtube search", || {
        ctx.http.get(&search_url).query(&[
            ("part", "snippet"),
            ("q", query.as_str()),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("key", api_key),
        ])
    })
    .await?;

    let per_video = comments_per_video(limit).to_string();
    let threads_url = format!("{}/commentThreads", ctx.endpoints.youtube);
    let mut mentions = Vec::new();

    for video_id in search.items.into_iter().filter_map(|item| item.id.video_id) {
        let result: Result<CommentThreadsResponse, _> =
            send_json(ctx, PROVIDER, Some(ENV_VAR), "youtube comment threads", || {
                ctx.http.get(&threads_url).query(&[
                    ("part", "snippet"),
                    ("videoId", video_id.as_str()),
                    ("maxResults", per_video.as_str()),
                    ("order", "relevance"),
                    ("textFormat", "plainText"),
                    ("key", api_key),
                ])
            })
            .await;

        let threads = match result {
            Ok(threads) => threads,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                tracing::debug!(video = %video_id, error = %e, "YouTube comments unavailable");
                continue;
            }
        };

        mentions.extend(
            threads
                .items
                .into_iter()
                .filter_map(|thread| thread_to_mention(&video_id, thread)),
        );
        if mentions.len() >= limit {
            break;
        }
    }

    mentions.truncate(limit);
    tracing::debug!(location, count = mentions.len(), "collected YouTube mentions");
    Ok(mentions)
}

fn thread_to_mention(video_id: &str, thread: CommentThread) -> Option<CollectedMention> {
    let replies = thread.snippet.total_reply_count;
    let comment = thread.snippet.top_level_comment;
    let text = comment.snippet.text_display.trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some(CollectedMention {
        source: SourceKind::Youtube,
        url: Some(format!(
            "https://www.youtube.com/watch?v={video_id}&lc={}",
            comment.id
        )),
        external_id: comment.id,
        author: comment.snippet.author_display_name,
        text,
        engagement: Engagement {
            likes: comment.snippet.like_count,
            comments: replies,
            shares: None,
        },
        published_at: comment.snippet.published_at,
    })
}
