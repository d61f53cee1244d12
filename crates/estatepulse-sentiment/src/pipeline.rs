//! Sentiment pipeline orchestration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use estatepulse_core::{AppConfig, Mention, RegionProfile, SourceKind};

use crate::classifier::Classifier;
use crate::claude::ClaudeClient;
use crate::error::SentimentError;
use crate::preprocess::prepare;
use crate::report::{build_report, SentimentReport};
use crate::sources::{collect_mentions, Endpoints, SourceReport};

/// Everything a pipeline run needs: configuration, the region catalog,
/// provider endpoints, one shared HTTP client, and the classifier (whose
/// cache lives as long as the context).
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub config: AppConfig,
    pub region: RegionProfile,
    pub endpoints: Endpoints,
    pub(crate) http: reqwest::Client,
    classifier: Arc<Classifier>,
}

impl PipelineContext {
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn new(config: AppConfig, region: RegionProfile) -> Result<Self, SentimentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;
        let endpoints = Endpoints::default();
        let classifier = Arc::new(build_classifier(&config, &endpoints)?);
        Ok(Self {
            config,
            region,
            endpoints,
            http,
            classifier,
        })
    }

    /// Point every collector and the classifier at `endpoints`.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::InvalidBaseUrl`] if the Claude endpoint does
    /// not parse.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Result<Self, SentimentError> {
        self.classifier = Arc::new(build_classifier(&self.config, &endpoints)?);
        self.endpoints = endpoints;
        Ok(self)
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// A Claude client for `api_key` using the configured model, timeout,
    /// retry policy, and endpoint.
    pub(crate) fn claude_client(&self, api_key: &str) -> Result<ClaudeClient, SentimentError> {
        claude_client(&self.config, &self.endpoints, api_key)
    }
}

fn claude_client(
    config: &AppConfig,
    endpoints: &Endpoints,
    api_key: &str,
) -> Result<ClaudeClient, SentimentError> {
    Ok(ClaudeClient::with_base_url(
        api_key,
        &config.claude_model,
        config.request_timeout_secs,
        &endpoints.claude,
    )?
    .with_retry(config.max_retries, config.retry_backoff_base_ms))
}

/// Claude is used only when its credential passes validation.
fn build_classifier(
    config: &AppConfig,
    endpoints: &Endpoints,
) -> Result<Classifier, SentimentError> {
    let claude = match config.credentials.claude_api_key.as_deref() {
        Some(key) if config.credentials.readiness(SourceKind::Claude).is_ready() => {
            Some(claude_client(config, endpoints, key)?)
        }
        _ => {
            tracing::info!("Claude not configured; sentiment falls back to the keyword lexicon");
            None
        }
    };
    Ok(Classifier::new(
        claude,
        config.classifier_batch_size,
        config.claude_max_tokens,
        config.inter_request_delay_ms,
    ))
}

/// Result of one pipeline run for a location.
#[derive(Debug, Clone)]
pub struct LocationRun {
    /// Canonical location tag.
    pub location: String,
    pub mentions: Vec<Mention>,
    pub outcomes: Vec<SourceReport>,
    pub report: SentimentReport,
}

/// Run the full sentiment pipeline for one location query.
///
/// 1. Canonicalise the query against the region catalog.
/// 2. Collect mentions from every requested source (failures become outcomes).
/// 3. Drop short texts, truncate long ones, and clean each text.
/// 4. Classify in batches (Claude, falling back to the lexicon).
/// 5. Build the classified mentions and the aggregate report.
///
/// Zero collected mentions produce an empty, neutral report.
///
/// # Errors
///
/// Returns [`SentimentError::Location`] if the query is blank. Source and
/// classifier failures degrade the result instead of failing it.
pub async fn run_location_sentiment(
    ctx: &PipelineContext,
    query: &str,
    sources: &[SourceKind],
    limit: usize,
) -> Result<LocationRun, SentimentError> {
    let location = ctx.region.canonical_location(query)?;
    tracing::info!(
        location = %location,
        sources = sources.len(),
        limit,
        "starting sentiment run"
    );

    let (collected, outcomes) = collect_mentions(ctx, &location, sources, limit).await;
    let prepared = prepare(collected, ctx.config.min_text_len, ctx.config.max_text_len);

    let texts: Vec<String> = prepared.iter().map(|p| p.mention.text.clone()).collect();
    let classifications = ctx.classifier.classify_batch(&texts, &location).await;

    let collected_at = Utc::now();
    let mentions: Vec<Mention> = prepared
        .into_iter()
        .zip(classifications)
        .map(|(p, classification)| Mention {
            source: p.mention.source,
            external_id: p.mention.external_id,
            location: location.clone(),
            author: p.mention.author,
            url: p.mention.url,
            raw_text: p.mention.text,
            clean_text: p.clean_text,
            engagement: p.mention.engagement,
            published_at: p.mention.published_at,
            collected_at,
            classification,
        })
        .collect();

    if mentions.is_empty() {
        tracing::info!(location = %location, "no mentions collected; returning empty report");
    }

    let report = build_report(&location, &mentions);
    tracing::info!(
        location = %location,
        mentions = mentions.len(),
        overall = %report.overall,
        average_score = report.average_score,
        "sentiment run complete"
    );

    Ok(LocationRun {
        location,
        mentions,
        outcomes,
        report,
    })
}
