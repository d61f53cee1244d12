//! Reddit collector (client-credentials OAuth).
//!
//! Searches each configured subreddit for the location and turns every post,
//! plus its top comments, into a mention.

use estatepulse_core::CollectedMention;
use serde::Deserialize;

use crate::error::SentimentError;
use crate::pipeline::PipelineContext;

use super::reddit_helpers::{comment_to_mention, post_to_mention, search_query};
use super::{is_fatal, send_json};

const PROVIDER: &str = "Reddit";
const ENV_VAR: &str = "REDDIT_CLIENT_ID";
const TOP_COMMENTS: usize = 5;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct Listing {
    pub(super) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListingData {
    #[serde(default)]
    pub(super) children: Vec<Thing>,
}

/// A listing child. Comment listings also contain `more` stubs, whose data
/// lacks a body and is skipped.
#[derive(Debug, Deserialize)]
pub(super) struct Thing {
    pub(super) kind: String,
    pub(super) data: ThingData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ThingData {
    pub(super) id: String,
    pub(super) name: Option<String>,
    pub(super) title: Option<String>,
    pub(super) selftext: Option<String>,
    pub(super) body: Option<String>,
    pub(super) author: Option<String>,
    pub(super) permalink: Option<String>,
    pub(super) score: Option<i64>,
    pub(super) num_comments: Option<i64>,
    pub(super) created_utc: Option<f64>,
}

/// Collect posts and top comments about `location` from the region's
/// subreddits, at most `limit` in total.
///
/// A subreddit that fails is logged and skipped unless the failure is an
/// auth or rate-limit error, which ends the collection.
///
/// # Errors
///
/// Returns [`SentimentError::Unauthorized`] if the token exchange is
/// rejected, or any fatal error from a search.
pub(crate) async fn fetch_reddit(
    ctx: &PipelineContext,
    client_id: &str,
    client_secret: &str,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, SentimentError> {
    let subreddits = &ctx.region.subreddits;
    if subreddits.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let token = fetch_token(ctx, client_id, client_secret).await?;
    let per_subreddit = (limit / subreddits.len()).max(1);
    let query = search_query(location);
    let mut mentions = Vec::new();

    for subreddit in subreddits {
        let listing = match search_subreddit(ctx, &token, subreddit, &query, per_subreddit).await {
            Ok(listing) => listing,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                tracing::warn!(subreddit = %subreddit, error = %e, "Reddit subreddit search failed");
                continue;
            }
        };

        for post in listing.data.children.into_iter().filter(|t| t.kind == "t3") {
            let Some(mention) = post_to_mention(&post.data) else {
                continue;
            };
            let permalink = mention.url.clone();
            mentions.push(mention);

            match fetch_top_comments(ctx, &token, &post.data.id).await {
                Ok(comments) => mentions.extend(
                    comments
                        .iter()
                        .filter_map(|c| comment_to_mention(c, permalink.as_deref()))
                        .take(TOP_COMMENTS),
                ),
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    tracing::debug!(post = %post.data.id, error = %e, "Reddit comments fetch failed");
                }
            }
        }

        if mentions.len() >= limit {
            break;
        }
    }

    mentions.truncate(limit);
    tracing::debug!(location, count = mentions.len(), "collected Reddit mentions");
    Ok(mentions)
}

async fn fetch_token(
    ctx: &PipelineContext,
    client_id: &str,
    client_secret: &str,
) -> Result<String, SentimentError> {
    let url = format!("{}/api/v1/access_token", ctx.endpoints.reddit_auth);
    let user_agent = &ctx.config.credentials.reddit_user_agent;
    let token: TokenResponse = send_json(ctx, PROVIDER, Some(ENV_VAR), "reddit token response", || {
        ctx.http
            .post(&url)
            .header("User-Agent", user_agent)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
    })
    .await?;
    Ok(token.access_token)
}

async fn search_subreddit(
    ctx: &PipelineContext,
    token: &str,
    subreddit: &str,
    query: &str,
    limit: usize,
) -> Result<Listing, SentimentError> {
    let url = format!("{}/r/{subreddit}/search", ctx.endpoints.reddit_api);
    let limit = limit.to_string();
    send_json(ctx, PROVIDER, Some(ENV_VAR), "reddit search listing", || {
        ctx.http
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", &ctx.config.credentials.reddit_user_agent)
            .query(&[
                ("q", query),
                ("restrict_sr", "true"),
                ("sort", "relevance"),
                ("limit", limit.as_str()),
                ("raw_json", "1"),
            ])
    })
    .await
}

/// Top-level comments of a post, best first.
async fn fetch_top_comments(
    ctx: &PipelineContext,
    token: &str,
    post_id: &str,
) -> Result<Vec<ThingData>, SentimentError> {
    let url = format!("{}/comments/{post_id}", ctx.endpoints.reddit_api);
    let listings: Vec<Listing> = send_json(ctx, PROVIDER, Some(ENV_VAR), "reddit comment listing", || {
        ctx.http
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", &ctx.config.credentials.reddit_user_agent)
            .query(&[
                ("sort", "top"),
                ("depth", "1"),
                ("limit", "20"),
                ("raw_json", "1"),
            ])
    })
    .await?;

    // [0] is the post itself, [1] its comments.
    Ok(listings
        .into_iter()
        .nth(1)
        .map(|listing| {
            listing
                .data
                .children
                .into_iter()
                .filter(|t| t.kind == "t1")
                .map(|t| t.data)
                .collect()
        })
        .unwrap_or_default())
}
