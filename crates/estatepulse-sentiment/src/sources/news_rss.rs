//! Google News RSS collector (India edition).

use estatepulse_core::{CollectedMention, Engagement, SourceKind};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::SentimentError;
use crate::pipeline::PipelineContext;
use crate::sha256_hex;

use super::rss_helpers::parse_rss_items;
use super::send_text;

const PROVIDER: &str = "Google News";

/// Fetch up to `limit` news items for `"{location} {region} real estate news"`.
///
/// Each item's title and description become one mention; the id is the
/// SHA-256 of the article link.
///
/// # Errors
///
/// Returns [`SentimentError::Http`] on network failure or
/// [`SentimentError::Xml`] on malformed RSS.
pub(crate) async fn fetch_google_news(
    ctx: &PipelineContext,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, SentimentError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let query = format!("{location} {} real estate news", ctx.region.name);
    let encoded = utf8_percent_encode(&query, NON_ALPHANUMERIC).to_string();
    let url = format!(
        "{}/rss/search?q={encoded}&hl=en-IN&gl=IN&ceid=IN:en",
        ctx.endpoints.news
    );

    let body = send_text(ctx, PROVIDER, None, || ctx.http.get(&url)).await?;
    let items = parse_rss_items(&body, limit)?;

    let mentions: Vec<CollectedMention> = items
        .into_iter()
        .map(|item| CollectedMention {
            source: SourceKind::News,
            external_id: sha256_hex(&item.link),
            text: item.text(),
            author: item.source,
            url: Some(item.link),
            engagement: Engagement::default(),
            published_at: item.published_at,
        })
        .collect();

    tracing::debug!(location, count = mentions.len(), "collected news mentions");
    Ok(mentions)
}
