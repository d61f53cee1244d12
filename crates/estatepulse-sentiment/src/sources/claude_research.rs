//! Market research "search" through Claude: a fixed set of analyst prompts
//! about the location, each answer stored as one mention.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use estatepulse_core::{CollectedMention, Engagement, SourceKind};

use crate::error::SentimentError;
use crate::pipeline::PipelineContext;
use crate::preprocess::truncate_chars;
use crate::sha256_hex;

use super::is_fatal;

const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.3;
const MIN_RESPONSE_CHARS: usize = 150;
const DEDUP_PREFIX_CHARS: usize = 200;

/// `(topic, question)`; `{location}` and `{region}` are substituted.
const RESEARCH_PROMPTS: &[(&str, &str)] = &[
    (
        "market overview",
        "Provide an analysis of the real estate market in {location}, {region}: average \
         prices per square foot for apartments and houses, whether prices are rising, falling \
         or stable, buyer confidence, and recent transaction activity.",
    ),
    (
        "investment sentiment",
        "Analyze the investment prospects and market sentiment for real estate in {location}, \
         {region}: rental yields, capital appreciation, investor confidence, and the main risks \
         investors mention.",
    ),
    (
        "recent developments",
        "Summarize recent news and developments affecting property values in {location}, \
         {region}: infrastructure projects, metro or road work, IT parks, and policy changes.",
    ),
    (
        "comparative",
        "Compare real estate in {location}, {region} with its neighbouring localities on \
         price, connectivity, amenities, and growth potential. Where does {location} stand?",
    ),
    (
        "pricing",
        "Give detailed price and trend information for {location}, {region}: price ranges for \
         2BHK and 3BHK apartments, villas and plots, and how prices moved over the last two years.",
    ),
    (
        "forecast",
        "What is the outlook for the real estate market in {location}, {region} over the next \
         one to three years? Include expected price direction and the factors behind it.",
    ),
    (
        "builders and projects",
        "Which builders and residential projects are active in {location}, {region}? Describe \
         their reputation, delivery track record, and how buyers perceive them.",
    ),
];

fn analyst_prompt(question: &str, location: &str, region: &str) -> String {
    let question = question
        .replace("{location}", location)
        .replace("{region}", region);
    format!(
        "You are a real estate market analyst. Provide detailed, factual information about \
         real estate markets, prices, trends, and sentiment, with specific data points where \
         you have them.\n\nQuery: {question}\n\nFocus on actionable insights for the \
         {location}, {region} real estate market, covering both opportunities and risk factors."
    )
}

/// Run the research prompts for `location`, at most `limit` of them.
///
/// Answers of 150 characters or fewer are dropped, as are answers whose first
/// 200 characters (case-insensitive) repeat an earlier one.
///
/// # Errors
///
/// Returns an auth or rate-limit error immediately. Other failures skip that
/// prompt; if every prompt fails the last error is returned.
pub(crate) async fn fetch_claude_research(
    ctx: &PipelineContext,
    api_key: &str,
    location: &str,
    limit: usize,
) -> Result<Vec<CollectedMention>, SentimentError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let claude = ctx.claude_client(api_key)?;
    let delay = Duration::from_millis(ctx.config.inter_request_delay_ms);
    let mut seen: HashSet<String> = HashSet::new();
    let mut mentions = Vec::new();
    let mut last_error = None;

    for (i, (topic, question)) in RESEARCH_PROMPTS.iter().take(limit).enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let prompt = analyst_prompt(question, location, &ctx.region.name);
        let answer = match claude
            .complete_with_temperature(&prompt, MAX_TOKENS, Some(TEMPERATURE))
            .await
        {
            Ok(answer) => answer,
            Err(e) if is_fatal(&e) || matches!(e, SentimentError::Unauthorized { .. }) => {
                return Err(e)
            }
            Err(e) => {
                tracing::warn!(location, topic, error = %e, "Claude research prompt failed");
                last_error = Some(e);
                continue;
            }
        };

        let text = answer.trim();
        if text.chars().count() <= MIN_RESPONSE_CHARS {
            continue;
        }
        let fingerprint = truncate_chars(text, DEDUP_PREFIX_CHARS).to_lowercase();
        if !seen.insert(fingerprint.trim().to_string()) {
            continue;
        }

        mentions.push(CollectedMention {
            source: SourceKind::Claude,
            external_id: sha256_hex(text),
            author: Some(format!("Claude ({topic})")),
            url: None,
            text: text.to_string(),
            engagement: Engagement::default(),
            published_at: Some(Utc::now()),
        });
    }

    match last_error {
        Some(e) if mentions.is_empty() => Err(e),
        _ => {
            tracing::debug!(location, count = mentions.len(), "collected Claude research");
            Ok(mentions)
        }
    }
}
