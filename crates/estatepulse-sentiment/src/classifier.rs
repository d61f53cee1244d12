//! Sentiment classification through Claude with a lexicon fallback.
//!
//! Texts are sent in batches as a single prompt asking for a JSON array.
//! When the batch reply does not parse, each text is classified on its own.
//! When Claude is missing or failing, the keyword lexicon takes over, so
//! [`Classifier::classify_batch`] always returns exactly one
//! [`Classification`] per input text, in input order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use estatepulse_core::{Classification, ClassificationMethod, SentimentLabel};
use serde::Deserialize;

use crate::claude::ClaudeClient;
use crate::error::SentimentError;
use crate::preprocess::truncate_chars;
use crate::scorer::lexicon_classify;
use crate::sha256_hex;

/// Characters of each text included in the batch prompt.
const PROMPT_TEXT_CHARS: usize = 500;
const SINGLE_MAX_TOKENS: u32 = 1000;
/// Cached Claude results kept per classifier; the oldest entries go first.
const CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Deserialize)]
struct BatchItem {
    #[serde(default)]
    text_index: Option<usize>,
    #[serde(default)]
    overall_sentiment: Option<String>,
    #[serde(default)]
    sentiment_score: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    key_factors: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SingleReply {
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

/// Claude results keyed by `(location, text)` hash, evicted oldest-first.
#[derive(Debug)]
struct ResultCache {
    entries: HashMap<String, Classification>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ResultCache {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, key: &str) -> Option<&Classification> {
        self.entries.get(key)
    }

    /// Lexicon results are never stored.
    fn insert(&mut self, key: String, classification: &Classification) {
        if classification.method == ClassificationMethod::Lexicon
            || self.entries.contains_key(&key)
        {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, classification.clone());
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct Classifier {
    claude: Option<ClaudeClient>,
    batch_size: usize,
    max_tokens: u32,
    batch_delay: Duration,
    /// Set after Claude rejects the credentials; later batches go straight to
    /// the lexicon.
    claude_disabled: AtomicBool,
    cache: Mutex<ResultCache>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("claude", &self.claude)
            .field("batch_size", &self.batch_size)
            .field("max_tokens", &self.max_tokens)
            .field("batch_delay", &self.batch_delay)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    #[must_use]
    pub fn new(
        claude: Option<ClaudeClient>,
        batch_size: usize,
        max_tokens: u32,
        batch_delay_ms: u64,
    ) -> Self {
        Self {
            claude,
            batch_size: batch_size.max(1),
            max_tokens,
            batch_delay: Duration::from_millis(batch_delay_ms),
            claude_disabled: AtomicBool::new(false),
            cache: Mutex::new(ResultCache::with_capacity(CACHE_CAPACITY)),
        }
    }

    /// A classifier that never calls out and always uses the lexicon.
    #[must_use]
    pub fn lexicon_only() -> Self {
        Self::new(None, 10, 0, 0)
    }

    #[must_use]
    pub fn uses_claude(&self) -> bool {
        self.claude.is_some() && !self.claude_disabled.load(Ordering::Relaxed)
    }

    /// Classify `texts` about `location`, returning one result per text in
    /// the same order.
    pub async fn classify_batch(&self, texts: &[String], location: &str) -> Vec<Classification> {
        let keys: Vec<String> = texts
            .iter()
            .map(|text| sha256_hex(&format!("{location}\u{0}{text}")))
            .collect();

        let mut results: Vec<Option<Classification>> = {
            let cache = self.lock_cache();
            keys.iter().map(|key| cache.get(key).cloned()).collect()
        };

        let mut pending: Vec<usize> = Vec::new();
        for (idx, text) in texts.iter().enumerate() {
            if results[idx].is_some() {
                continue;
            }
            if text.trim().is_empty() {
                results[idx] = Some(lexicon_classify(text));
            } else {
                pending.push(idx);
            }
        }

        let chunks: Vec<&[usize]> = pending.chunks(self.batch_size).collect();
        for (chunk_no, chunk) in chunks.iter().enumerate() {
            if chunk_no > 0 && self.uses_claude() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            let batch: Vec<&str> = chunk.iter().map(|&i| texts[i].as_str()).collect();
            let classified = self.classify_chunk(&batch, location).await;
            for (&idx, classification) in chunk.iter().zip(classified) {
                results[idx] = Some(classification);
            }
        }

        let results: Vec<Classification> = results
            .into_iter()
            .zip(texts)
            .map(|(result, text)| result.unwrap_or_else(|| lexicon_classify(text)))
            .collect();

        let mut cache = self.lock_cache();
        for (key, classification) in keys.into_iter().zip(&results) {
            cache.insert(key, classification);
        }
        drop(cache);

        results
    }

    /// Number of cached Claude results.
    #[must_use]
    pub fn cached_results(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ResultCache> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn classify_chunk(&self, texts: &[&str], location: &str) -> Vec<Classification> {
        let Some(claude) = self.claude.as_ref().filter(|_| self.uses_claude()) else {
            return texts.iter().map(|t| lexicon_classify(t)).collect();
        };

        let prompt = batch_prompt(texts, location);
        let reply = match claude.complete(&prompt, self.max_tokens).await {
            Ok(reply) => reply,
            Err(e) => {
                self.note_failure(&e);
                tracing::warn!(
                    location,
                    batch = texts.len(),
                    error = %e,
                    "Claude batch classification failed; using lexicon"
                );
                return texts.iter().map(|t| lexicon_classify(t)).collect();
            }
        };

        if let Some(items) = parse_batch_reply(&reply) {
            return assign_batch_items(texts, items);
        }

        tracing::debug!(
            location,
            "batch reply was not a JSON array; classifying texts individually"
        );
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.classify_single(claude, text, location).await);
        }
        out
    }

    async fn classify_single(
        &self,
        claude: &ClaudeClient,
        text: &str,
        location: &str,
    ) -> Classification {
        if !self.uses_claude() {
            return lexicon_classify(text);
        }
        match claude
            .complete(&single_prompt(text, location), SINGLE_MAX_TOKENS)
            .await
        {
            Ok(reply) => parse_single_reply(&reply),
            Err(e) => {
                self.note_failure(&e);
                tracing::warn!(location, error = %e, "Claude classification failed; using lexicon");
                lexicon_classify(text)
            }
        }
    }

    /// The Claude client while it is configured and has not been rejected.
    pub(crate) fn active_claude(&self) -> Option<&ClaudeClient> {
        self.claude
            .as_ref()
            .filter(|_| !self.claude_disabled.load(Ordering::Relaxed))
    }

    pub(crate) fn note_failure(&self, err: &SentimentError) {
        if matches!(err, SentimentError::Unauthorized { .. }) {
            self.claude_disabled.store(true, Ordering::Relaxed);
        }
    }
}

fn batch_prompt(texts: &[&str], location: &str) -> String {
    let mut prompt = format!(
        "You are an expert real estate sentiment analyst. Analyze the sentiment of the \
         following social media posts, comments and articles about real estate in {location}.\n\n\
         For each text consider the overall emotional tone, real estate market sentiment \
         (bullish or bearish), price sentiment and investment confidence.\n\n\
         Texts to analyze:\n"
    );
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!(
            "\n{}. {}",
            i + 1,
            truncate_chars(text, PROMPT_TEXT_CHARS)
        ));
    }
    prompt.push_str(
        "\n\nRespond with only a JSON array containing one object per text:\n\
         [{\"text_index\": 1, \"overall_sentiment\": \"Positive|Negative|Neutral\", \
         \"sentiment_score\": 0.0, \"confidence\": 0.0, \
         \"key_factors\": [\"factor\"], \"reason\": \"brief explanation\"}]\n\
         sentiment_score is between -1.0 and 1.0, confidence between 0.0 and 1.0.",
    );
    prompt
}

fn single_prompt(text: &str, location: &str) -> String {
    format!(
        "Analyze the sentiment of this real estate related text about {location}.\n\n\
         Text: \"{text}\"\n\n\
         Respond with only a JSON object:\n\
         {{\"sentiment\": \"Positive|Negative|Neutral\", \"score\": 0.0, \
         \"confidence\": 0.0, \"reason\": \"brief explanation\"}}\n\
         score is between -1.0 and 1.0, confidence between 0.0 and 1.0."
    )
}

/// The slice between the first `open` and the last `close`, which strips
/// markdown fences and prose around a JSON payload.
pub(crate) fn json_span(reply: &str, open: char, close: char) -> Option<&str> {
    let start = reply.find(open)?;
    let end = reply.rfind(close)?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_batch_reply(reply: &str) -> Option<Vec<BatchItem>> {
    serde_json::from_str(json_span(reply, '[', ']')?).ok()
}

/// Place each batch item at its `text_index` (1-based), falling back to its
/// position in the array. Texts with no usable item get the lexicon result.
fn assign_batch_items(texts: &[&str], items: Vec<BatchItem>) -> Vec<Classification> {
    let mut slots: Vec<Option<Classification>> = vec![None; texts.len()];
    for (position, item) in items.into_iter().enumerate() {
        let idx = item
            .text_index
            .and_then(|i| i.checked_sub(1))
            .filter(|&i| i < texts.len())
            .unwrap_or(position);
        if idx < slots.len() && slots[idx].is_none() {
            slots[idx] = Some(item.into_classification());
        }
    }

    slots
        .into_iter()
        .zip(texts)
        .map(|(slot, text)| slot.unwrap_or_else(|| lexicon_classify(text)))
        .collect()
}

impl BatchItem {
    fn into_classification(self) -> Classification {
        let score = self.sentiment_score.unwrap_or(0.0);
        let label = resolve_label(self.overall_sentiment.as_deref(), score);
        let mut reason = self
            .reason
            .unwrap_or_else(|| "Analyzed with Claude".to_string());
        if !self.key_factors.is_empty() {
            reason = format!("{reason} (factors: {})", self.key_factors.join(", "));
        }
        Classification::new(
            label,
            score,
            self.confidence.unwrap_or(0.5),
            reason,
            ClassificationMethod::Claude,
        )
    }
}

fn parse_single_reply(reply: &str) -> Classification {
    if let Some(parsed) =
        json_span(reply, '{', '}').and_then(|s| serde_json::from_str::<SingleReply>(s).ok())
    {
        let score = parsed.score.unwrap_or(0.0);
        return Classification::new(
            resolve_label(parsed.sentiment.as_deref(), score),
            score,
            parsed.confidence.unwrap_or(0.5),
            parsed
                .reason
                .unwrap_or_else(|| "Analyzed with Claude".to_string()),
            ClassificationMethod::Claude,
        );
    }

    let lowered = reply.to_lowercase();
    let (label, score) = if lowered.contains("positive") {
        (SentimentLabel::Positive, 0.6)
    } else if lowered.contains("negative") {
        (SentimentLabel::Negative, -0.6)
    } else {
        (SentimentLabel::Neutral, 0.0)
    };
    Classification::new(
        label,
        score,
        0.7,
        truncate_chars(reply.trim(), 200),
        ClassificationMethod::ClaudeText,
    )
}

/// Claude's label when it names one, otherwise the label implied by `score`.
fn resolve_label(label: Option<&str>, score: f64) -> SentimentLabel {
    label
        .and_then(|l| l.parse().ok())
        .unwrap_or_else(|| SentimentLabel::from_score(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claude_result(score: f64) -> Classification {
        Classification::new(
            SentimentLabel::from_score(score),
            score,
            0.9,
            "model",
            ClassificationMethod::Claude,
        )
    }

    #[test]
    fn result_cache_skips_lexicon_results() {
        let mut cache = ResultCache::with_capacity(4);
        cache.insert("a".to_string(), &lexicon_classify("great growth here"));
        cache.insert("b".to_string(), &claude_result(0.5));

        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").map(|c| c.method), Some(ClassificationMethod::Claude));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn result_cache_evicts_oldest_entry_at_capacity() {
        let mut cache = ResultCache::with_capacity(2);
        cache.insert("first".to_string(), &claude_result(0.2));
        cache.insert("second".to_string(), &claude_result(0.3));
        cache.insert("third".to_string(), &claude_result(0.4));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn batch_prompt_numbers_and_truncates_texts() {
        let long = "x".repeat(900);
        let prompt = batch_prompt(&["first text", &long], "Gachibowli");
        assert!(prompt.contains("real estate in Gachibowli"));
        assert!(prompt.contains("\n1. first text"));
        assert!(prompt.contains(&format!("\n2. {}", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
        assert!(prompt.contains("text_index"));
    }

    #[test]
    fn json_span_strips_fences() {
        let reply = "Here you go:\n```json\n[{\"text_index\": 1}]\n```";
        assert_eq!(json_span(reply, '[', ']'), Some("[{\"text_index\": 1}]"));
        assert_eq!(json_span("no json", '[', ']'), None);
    }

    #[test]
    fn batch_items_placed_by_text_index() {
        let reply = r#"[
            {"text_index": 2, "overall_sentiment": "Negative", "sentiment_score": -0.7,
             "confidence": 0.9, "key_factors": ["traffic"], "reason": "congestion"},
            {"text_index": 1, "overall_sentiment": "Positive", "sentiment_score": 0.8,
             "confidence": 0.85, "reason": "growth"}
        ]"#;
        let items = parse_batch_reply(reply).unwrap();
        let out = assign_batch_items(&["a", "b"], items);

        assert_eq!(out[0].label, SentimentLabel::Positive);
        assert_eq!(out[0].reason, "growth");
        assert_eq!(out[1].label, SentimentLabel::Negative);
        assert_eq!(out[1].reason, "congestion (factors: traffic)");
        assert!(out.iter().all(|c| c.method == ClassificationMethod::Claude));
    }

    #[test]
    fn short_array_is_padded_with_lexicon() {
        let items = parse_batch_reply(r#"[{"overall_sentiment": "Neutral"}]"#).unwrap();
        let out = assign_batch_items(&["one", "avoid this scam"], items);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].method, ClassificationMethod::Claude);
        assert_eq!(out[0].confidence, 0.5);
        assert_eq!(out[1].method, ClassificationMethod::Lexicon);
        assert_eq!(out[1].label, SentimentLabel::Negative);
    }

    #[test]
    fn extra_and_out_of_range_items_are_ignored() {
        let items = parse_batch_reply(
            r#"[{"text_index": 1, "sentiment_score": 0.5},
                {"text_index": 1, "sentiment_score": -0.5},
                {"text_index": 9, "sentiment_score": -0.9}]"#,
        )
        .unwrap();
        let out = assign_batch_items(&["only"], items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, SentimentLabel::Positive);
    }

    #[test]
    fn unknown_label_falls_back_to_score() {
        assert_eq!(resolve_label(Some("Bullish"), -0.4), SentimentLabel::Negative);
        assert_eq!(resolve_label(Some("positive"), -0.4), SentimentLabel::Positive);
        assert_eq!(resolve_label(None, 0.05), SentimentLabel::Neutral);
    }

    #[test]
    fn single_reply_json_and_prose() {
        let c = parse_single_reply(
            r#"{"sentiment": "Negative", "score": -0.4, "confidence": 0.8, "reason": "price drop"}"#,
        );
        assert_eq!(c.label, SentimentLabel::Negative);
        assert_eq!(c.method, ClassificationMethod::Claude);

        let c = parse_single_reply("Overall this reads as positive about the area.");
        assert_eq!(c.label, SentimentLabel::Positive);
        assert_eq!(c.score, 0.6);
        assert_eq!(c.confidence, 0.7);
        assert_eq!(c.method, ClassificationMethod::ClaudeText);

        let c = parse_single_reply("Mostly negative.");
        assert_eq!(c.score, -0.6);

        let c = parse_single_reply("Hard to say.");
        assert_eq!(c.label, SentimentLabel::Neutral);
        assert_eq!(c.reason, "Hard to say.");
    }

    #[tokio::test]
    async fn lexicon_only_returns_one_result_per_text() {
        let classifier = Classifier::lexicon_only();
        let texts = vec![
            "great investment opportunity".to_string(),
            String::new(),
            "overpriced and risky".to_string(),
        ];
        let out = classifier.classify_batch(&texts, "Kokapet").await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].label, SentimentLabel::Positive);
        assert_eq!(out[1].label, SentimentLabel::Neutral);
        assert_eq!(out[2].label, SentimentLabel::Negative);
        assert!(!classifier.uses_claude());
    }

    #[tokio::test]
    async fn empty_input_returns_empty() {
        let out = Classifier::lexicon_only().classify_batch(&[], "Kokapet").await;
        assert!(out.is_empty());
    }
}
