//! Domain types shared by the collectors, the classifier, storage, and the API.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Polarity thresholds: a score above `POSITIVE_THRESHOLD` is positive, below
/// `NEGATIVE_THRESHOLD` negative, anything in between neutral.
pub const POSITIVE_THRESHOLD: f64 = 0.1;
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Reddit,
    Youtube,
    Instagram,
    Twitter,
    News,
    Claude,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Reddit,
        SourceKind::Youtube,
        SourceKind::Instagram,
        SourceKind::Twitter,
        SourceKind::News,
        SourceKind::Claude,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Reddit => "reddit",
            SourceKind::Youtube => "youtube",
            SourceKind::Instagram => "instagram",
            SourceKind::Twitter => "twitter",
            SourceKind::News => "news",
            SourceKind::Claude => "claude",
        }
    }

    /// Human-facing provider name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Reddit => "Reddit",
            SourceKind::Youtube => "YouTube",
            SourceKind::Instagram => "Instagram",
            SourceKind::Twitter => "Twitter/X",
            SourceKind::News => "Google News",
            SourceKind::Claude => "Claude market research",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(SourceKind::Reddit),
            "youtube" => Ok(SourceKind::Youtube),
            "instagram" => Ok(SourceKind::Instagram),
            "twitter" | "x" => Ok(SourceKind::Twitter),
            "news" => Ok(SourceKind::News),
            "claude" => Ok(SourceKind::Claude),
            _ => Err(CoreError::UnknownSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            _ => Err(CoreError::UnknownSentiment(s.to_string())),
        }
    }
}

/// How a classification was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Structured JSON reply from Claude.
    Claude,
    /// Claude replied in prose; the label was read from keywords.
    ClaudeText,
    /// Local keyword lexicon, used when Claude is unavailable.
    Lexicon,
}

impl ClassificationMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationMethod::Claude => "claude",
            ClassificationMethod::ClaudeText => "claude_text",
            ClassificationMethod::Lexicon => "lexicon",
        }
    }
}

impl std::fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(ClassificationMethod::Claude),
            "claude_text" => Ok(ClassificationMethod::ClaudeText),
            "lexicon" => Ok(ClassificationMethod::Lexicon),
            _ => Err(CoreError::UnknownMethod(s.to_string())),
        }
    }
}

/// Output of the sentiment classifier for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: SentimentLabel,
    /// Polarity in `[-1.0, 1.0]`.
    pub score: f64,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    pub reason: String,
    pub method: ClassificationMethod,
}

impl Classification {
    /// Build a classification, clamping `score` and `confidence` into range.
    /// Non-finite inputs collapse to `0.0`.
    #[must_use]
    pub fn new(
        label: SentimentLabel,
        score: f64,
        confidence: f64,
        reason: impl Into<String>,
        method: ClassificationMethod,
    ) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            label,
            score: finite(score).clamp(-1.0, 1.0),
            confidence: finite(confidence).clamp(0.0, 1.0),
            reason: reason.into(),
            method,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
}

/// A mention as returned by a collector, before cleaning and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedMention {
    pub source: SourceKind,
    /// Provider id, or a content hash for sources without stable ids.
    pub external_id: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub text: String,
    pub engagement: Engagement,
    pub published_at: Option<DateTime<Utc>>,
}

/// A classified mention, ready to store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub source: SourceKind,
    pub external_id: String,
    pub location: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub raw_text: String,
    pub clean_text: String,
    pub engagement: Engagement,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub classification: Classification,
}
