//! Aggregation of classified mentions into a per-location report.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use estatepulse_core::{Mention, SentimentLabel, SourceKind};
use serde::Serialize;

use crate::preprocess::truncate_chars;

const TOP_KEYWORDS: usize = 10;
const HIGHLIGHTS: usize = 3;
const HIGHLIGHT_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl LabelCounts {
    fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LabelRatios {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBreakdown {
    pub source: SourceKind,
    pub count: usize,
    pub average_score: f64,
    pub distribution: LabelCounts,
    pub positive_ratio: f64,
}

/// A short excerpt of one of the most polar mentions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub source: SourceKind,
    pub score: f64,
    pub excerpt: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub location: String,
    pub total: usize,
    pub distribution: LabelCounts,
    pub ratios: LabelRatios,
    pub average_score: f64,
    pub average_confidence: f64,
    pub overall: SentimentLabel,
    pub by_source: Vec<SourceBreakdown>,
    /// Most frequent words (longer than three letters) across cleaned texts.
    pub top_keywords: Vec<String>,
    pub most_positive: Vec<Highlight>,
    pub most_negative: Vec<Highlight>,
    pub generated_at: DateTime<Utc>,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Build a report over `mentions`. An empty slice yields a neutral report
/// with zero counts.
#[must_use]
pub fn build_report(location: &str, mentions: &[Mention]) -> SentimentReport {
    let mut distribution = LabelCounts::default();
    for m in mentions {
        distribution.add(m.classification.label);
    }
    let total = mentions.len();
    let average_score = mean(mentions.iter().map(|m| m.classification.score));

    let mut per_source: BTreeMap<SourceKind, Vec<&Mention>> = BTreeMap::new();
    for m in mentions {
        per_source.entry(m.source).or_default().push(m);
    }
    let by_source = per_source
        .into_iter()
        .map(|(source, group)| {
            let mut counts = LabelCounts::default();
            for m in &group {
                counts.add(m.classification.label);
            }
            SourceBreakdown {
                source,
                count: group.len(),
                average_score: mean(group.iter().map(|m| m.classification.score)),
                positive_ratio: ratio(counts.positive, group.len()),
                distribution: counts,
            }
        })
        .collect();

    let mut by_score: Vec<&Mention> = mentions.iter().collect();
    by_score.sort_by(|a, b| b.classification.score.total_cmp(&a.classification.score));
    let most_positive = by_score
        .iter()
        .filter(|m| m.classification.label == SentimentLabel::Positive)
        .take(HIGHLIGHTS)
        .map(|m| highlight(m))
        .collect();
    let most_negative = by_score
        .iter()
        .rev()
        .filter(|m| m.classification.label == SentimentLabel::Negative)
        .take(HIGHLIGHTS)
        .map(|m| highlight(m))
        .collect();

    SentimentReport {
        location: location.to_string(),
        total,
        distribution,
        ratios: LabelRatios {
            positive: ratio(distribution.positive, total),
            negative: ratio(distribution.negative, total),
            neutral: ratio(distribution.neutral, total),
        },
        average_score,
        average_confidence: mean(mentions.iter().map(|m| m.classification.confidence)),
        overall: SentimentLabel::from_score(average_score),
        by_source,
        top_keywords: top_keywords(mentions),
        most_positive,
        most_negative,
        generated_at: Utc::now(),
    }
}

fn highlight(m: &Mention) -> Highlight {
    let excerpt = truncate_chars(m.raw_text.trim(), HIGHLIGHT_CHARS);
    Highlight {
        source: m.source,
        score: m.classification.score,
        excerpt: excerpt.split_whitespace().collect::<Vec<_>>().join(" "),
        url: m.url.clone(),
    }
}

fn top_keywords(mentions: &[Mention]) -> Vec<String> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for word in mentions
        .iter()
        .flat_map(|m| m.clean_text.split_whitespace())
        .filter(|w| w.len() > 3)
    {
        *freq.entry(word).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(w, _)| w.to_string())
        .collect()
}

impl SentimentReport {
    /// Render as a markdown document for terminal output or export.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Real estate sentiment: {}\n", self.location);
        let _ = writeln!(
            out,
            "Generated {} from {} mentions.\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.total
        );

        if self.total == 0 {
            out.push_str("No mentions collected yet.\n");
            return out;
        }

        let _ = writeln!(
            out,
            "**Overall: {}** (average score {:+.2}, confidence {:.2})\n",
            self.overall, self.average_score, self.average_confidence
        );
        out.push_str("| sentiment | count | share |\n|---|---:|---:|\n");
        for (label, count, share) in [
            ("positive", self.distribution.positive, self.ratios.positive),
            ("negative", self.distribution.negative, self.ratios.negative),
            ("neutral", self.distribution.neutral, self.ratios.neutral),
        ] {
            let _ = writeln!(out, "| {label} | {count} | {:.1}% |", share * 100.0);
        }

        out.push_str("\n## By source\n\n");
        out.push_str("| source | mentions | avg score | positive |\n|---|---:|---:|---:|\n");
        for s in &self.by_source {
            let _ = writeln!(
                out,
                "| {} | {} | {:+.2} | {:.1}% |",
                s.source.display_name(),
                s.count,
                s.average_score,
                s.positive_ratio * 100.0
            );
        }

        if !self.top_keywords.is_empty() {
            let _ = writeln!(out, "\n## Key topics\n\n{}", self.top_keywords.join(", "));
        }

        for (title, items) in [
            ("Most positive", &self.most_positive),
            ("Most negative", &self.most_negative),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n## {title}\n");
            for h in items {
                let _ = writeln!(
                    out,
                    "- ({}, {:+.2}) {}",
                    h.source.as_str(),
                    h.score,
                    h.excerpt
                );
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use estatepulse_core::{Classification, ClassificationMethod, Engagement};

    use super::*;

    fn mention(source: SourceKind, id: &str, label: SentimentLabel, score: f64) -> Mention {
        Mention {
            source,
            external_id: id.to_string(),
            location: "Gachibowli".to_string(),
            author: None,
            url: None,
            raw_text: format!("text {id}"),
            clean_text: "metro connectivity prices".to_string(),
            engagement: Engagement::default(),
            published_at: None,
            collected_at: Utc::now(),
            classification: Classification::new(
                label,
                score,
                0.8,
                "r",
                ClassificationMethod::Claude,
            ),
        }
    }

    #[test]
    fn empty_report_is_neutral() {
        let report = build_report("Gachibowli", &[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.overall, SentimentLabel::Neutral);
        assert_eq!(report.ratios, LabelRatios::default());
        assert!(report.by_source.is_empty());
        assert!(report.to_markdown().contains("No mentions collected yet."));
    }

    #[test]
    fn counts_ratios_and_overall() {
        let mentions = vec![
            mention(SourceKind::Reddit, "1", SentimentLabel::Positive, 0.8),
            mention(SourceKind::Reddit, "2", SentimentLabel::Negative, -0.4),
            mention(SourceKind::News, "3", SentimentLabel::Positive, 0.6),
            mention(SourceKind::News, "4", SentimentLabel::Neutral, 0.0),
        ];
        let report = build_report("Gachibowli", &mentions);

        assert_eq!(report.total, 4);
        assert_eq!(report.distribution.positive, 2);
        assert_eq!(report.distribution.total(), 4);
        assert!((report.ratios.positive - 0.5).abs() < 1e-9);
        assert!((report.average_score - 0.25).abs() < 1e-9);
        assert!((report.average_confidence - 0.8).abs() < 1e-9);
        assert_eq!(report.overall, SentimentLabel::Positive);

        assert_eq!(report.by_source.len(), 2);
        let reddit = &report.by_source[0];
        assert_eq!(reddit.source, SourceKind::Reddit);
        assert_eq!(reddit.count, 2);
        assert!((reddit.average_score - 0.2).abs() < 1e-9);
        assert!((reddit.positive_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn highlights_pick_most_polar_mentions() {
        let mentions = vec![
            mention(SourceKind::Reddit, "a", SentimentLabel::Positive, 0.3),
            mention(SourceKind::Reddit, "b", SentimentLabel::Positive, 0.9),
            mention(SourceKind::Twitter, "c", SentimentLabel::Negative, -0.7),
            mention(SourceKind::Twitter, "d", SentimentLabel::Negative, -0.2),
        ];
        let report = build_report("Gachibowli", &mentions);
        assert_eq!(report.most_positive[0].excerpt, "text b");
        assert_eq!(report.most_negative[0].excerpt, "text c");
        assert_eq!(report.most_negative.len(), 2);
    }

    #[test]
    fn keywords_ranked_by_frequency() {
        let mut a = mention(SourceKind::News, "1", SentimentLabel::Neutral, 0.0);
        a.clean_text = "metro metro flyover villa".to_string();
        let b = mention(SourceKind::News, "2", SentimentLabel::Neutral, 0.0);
        let report = build_report("Gachibowli", &[a, b]);
        assert_eq!(
            report.top_keywords,
            vec!["metro", "connectivity", "flyover", "prices", "villa"]
        );
    }

    #[test]
    fn markdown_includes_sources() {
        let mentions = vec![mention(SourceKind::Youtube, "1", SentimentLabel::Positive, 0.5)];
        let md = build_report("Gachibowli", &mentions).to_markdown();
        assert!(md.starts_with("# Real estate sentiment: Gachibowli"));
        assert!(md.contains("| YouTube | 1 | +0.50 | 100.0% |"));
        assert!(md.contains("**Overall: positive**"));
    }
}
