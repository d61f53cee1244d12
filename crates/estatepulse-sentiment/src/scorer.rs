//! Keyword lexicon classifier for real-estate sentiment.
//!
//! Used whenever Claude is unavailable, so every mention always carries a
//! classification.

use std::collections::HashSet;

use estatepulse_core::{Classification, ClassificationMethod, SentimentLabel};

pub(crate) const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "fantastic",
    "wonderful",
    "buy",
    "invest",
    "opportunity",
    "profitable",
    "growth",
    "rising",
    "affordable",
    "value",
    "deal",
    "recommended",
    "bullish",
    "optimistic",
    "beautiful",
    "spacious",
    "convenient",
    "prime",
    "luxury",
    "modern",
];

pub(crate) const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "horrible",
    "disappointing",
    "overpriced",
    "expensive",
    "risky",
    "avoid",
    "falling",
    "crash",
    "bubble",
    "bearish",
    "pessimistic",
    "declining",
    "loss",
    "fraud",
    "scam",
    "small",
    "cramped",
    "noisy",
    "traffic",
    "pollution",
    "old",
];

/// Classify `text` by counting distinct positive and negative keywords.
///
/// Words match whole (case-insensitive), so "gold" never counts as "old".
/// With `p` positive and `n` negative hits:
///
/// - `p > n`: positive, score `min(0.8, 0.3 + 0.1p)`
/// - `n > p`: negative, score `max(-0.8, -0.3 - 0.1n)`
/// - otherwise neutral, score `0.0`
///
/// Confidence is `min(0.6, 0.15 * |p - n|)`.
#[must_use]
pub fn lexicon_classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();
    let words: HashSet<&str> = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    let positive = POSITIVE_WORDS.iter().filter(|w| words.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| words.contains(*w)).count();

    #[allow(clippy::cast_precision_loss)]
    let (p, n) = (positive as f64, negative as f64);

    let (label, score) = if positive > negative {
        (SentimentLabel::Positive, (0.3 + 0.1 * p).min(0.8))
    } else if negative > positive {
        (SentimentLabel::Negative, (-0.3 - 0.1 * n).max(-0.8))
    } else {
        (SentimentLabel::Neutral, 0.0)
    };
    let confidence = (0.15 * (p - n).abs()).min(0.6);

    Classification::new(
        label,
        score,
        confidence,
        format!("Keyword-based analysis (P:{positive}, N:{negative})"),
        ClassificationMethod::Lexicon,
    )
}
