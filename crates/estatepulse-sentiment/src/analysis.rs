//! Investment-oriented market analysis on top of a [`SentimentReport`].
//!
//! With Claude available the aggregate numbers and sample excerpts are sent
//! for a written analysis. Without it, or when the reply cannot be used, a
//! deterministic analysis is derived from the average score.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use estatepulse_core::SourceKind;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::classifier::json_span;
use crate::pipeline::PipelineContext;
use crate::preprocess::truncate_chars;
use crate::report::SentimentReport;

const ANALYSIS_MAX_TOKENS: u32 = 2000;
/// Average score beyond which the basic analysis leans buy or wait.
const RECOMMENDATION_THRESHOLD: f64 = 0.2;
const LIST_ITEM_CHARS: usize = 100;
const MAX_LIST_ITEMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
    Wait,
}

impl Recommendation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Hold => "hold",
            Self::Sell => "sell",
            Self::Wait => "wait",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = String;

    /// Reads the first word, so "Hold - monitor closely" parses as `Hold`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s
            .split(|c: char| !c.is_ascii_alphabetic())
            .find(|w| !w.is_empty())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match word.as_str() {
            "buy" => Ok(Self::Buy),
            "hold" => Ok(Self::Hold),
            "sell" => Ok(Self::Sell),
            "wait" => Ok(Self::Wait),
            _ => Err(format!("unknown recommendation: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    Claude,
    Basic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAnalysis {
    pub executive_summary: String,
    pub assessment: String,
    pub recommendation: Recommendation,
    /// One-line advice that goes with `recommendation`.
    pub advice: String,
    pub key_insights: Vec<String>,
    pub risk_factors: Vec<String>,
    pub opportunities: Vec<String>,
    pub most_positive_source: Option<SourceKind>,
    pub least_positive_source: Option<SourceKind>,
    pub method: AnalysisMethod,
}

#[derive(Debug, Default, Deserialize)]
struct ClaudeAnalysis {
    #[serde(default)]
    executive_summary: Option<String>,
    #[serde(default)]
    market_sentiment_assessment: Option<String>,
    #[serde(default)]
    key_insights: Vec<String>,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    opportunities: Vec<String>,
    #[serde(default)]
    investment_recommendation: Option<String>,
}

/// Analysis of `report`, written by Claude when the pipeline has a working
/// Claude client and the report has mentions, otherwise [`basic_analysis`].
pub async fn analyze_market(ctx: &PipelineContext, report: &SentimentReport) -> MarketAnalysis {
    let basic = basic_analysis(report);
    if report.total == 0 {
        return basic;
    }
    let Some(claude) = ctx.classifier().active_claude() else {
        return basic;
    };

    match claude
        .complete(&analysis_prompt(report), ANALYSIS_MAX_TOKENS)
        .await
    {
        Ok(reply) => match parse_analysis_reply(&reply) {
            Some(parsed) => merge_claude_analysis(parsed, basic),
            None => {
                tracing::warn!(
                    location = %report.location,
                    "market analysis reply was not JSON; using basic analysis"
                );
                basic
            }
        },
        Err(e) => {
            tracing::warn!(
                location = %report.location,
                error = %e,
                hint = %e.hint(),
                "market analysis failed; using basic analysis"
            );
            ctx.classifier().note_failure(&e);
            basic
        }
    }
}

/// Deterministic analysis from the aggregate numbers alone.
#[must_use]
pub fn basic_analysis(report: &SentimentReport) -> MarketAnalysis {
    let (assessment, recommendation, advice) = if report.average_score > RECOMMENDATION_THRESHOLD
    {
        (
            "Positive market sentiment detected",
            Recommendation::Buy,
            "Consider buying opportunities",
        )
    } else if report.average_score < -RECOMMENDATION_THRESHOLD {
        (
            "Negative market sentiment detected",
            Recommendation::Wait,
            "Exercise caution, wait for better timing",
        )
    } else {
        (
            "Neutral market sentiment",
            Recommendation::Hold,
            "Monitor market closely",
        )
    };

    let (most_positive_source, least_positive_source) = source_extremes(report);
    let mut key_insights = vec![
        format!("Overall sentiment score: {:+.2}", report.average_score),
        format!(
            "Positive mentions: {} ({:.1}%)",
            report.distribution.positive,
            report.ratios.positive * 100.0
        ),
    ];
    if let Some(source) = most_positive_source {
        key_insights.push(format!("Most positive source: {}", source.display_name()));
    }

    let mut risk_factors: Vec<String> = report
        .most_negative
        .iter()
        .map(|h| truncate_chars(&h.excerpt, LIST_ITEM_CHARS))
        .collect();
    if risk_factors.is_empty() {
        risk_factors.push("Standard market risks apply".to_string());
    }
    let opportunities = report
        .most_positive
        .iter()
        .map(|h| truncate_chars(&h.excerpt, LIST_ITEM_CHARS))
        .collect();

    MarketAnalysis {
        executive_summary: format!(
            "Analysis of {} items shows {}",
            report.total,
            assessment.to_lowercase()
        ),
        assessment: assessment.to_string(),
        recommendation,
        advice: advice.to_string(),
        key_insights,
        risk_factors,
        opportunities,
        most_positive_source,
        least_positive_source,
        method: AnalysisMethod::Basic,
    }
}

/// Sources with the highest and lowest average score. Ties keep the source
/// listed first in the report.
fn source_extremes(report: &SentimentReport) -> (Option<SourceKind>, Option<SourceKind>) {
    let mut best: Option<(SourceKind, f64)> = None;
    let mut worst: Option<(SourceKind, f64)> = None;
    for s in &report.by_source {
        if best.is_none_or(|(_, score)| s.average_score > score) {
            best = Some((s.source, s.average_score));
        }
        if worst.is_none_or(|(_, score)| s.average_score < score) {
            worst = Some((s.source, s.average_score));
        }
    }
    (best.map(|b| b.0), worst.map(|w| w.0))
}

fn analysis_prompt(report: &SentimentReport) -> String {
    let by_source: Vec<_> = report
        .by_source
        .iter()
        .map(|s| {
            json!({
                "source": s.source.as_str(),
                "mentions": s.count,
                "average_score": s.average_score,
                "positive_ratio": s.positive_ratio,
            })
        })
        .collect();
    let summary = json!({
        "total_items": report.total,
        "average_score": report.average_score,
        "sentiment_distribution": report.distribution,
        "source_breakdown": by_source,
        "top_keywords": report.top_keywords,
    });
    let samples = |items: &[crate::report::Highlight]| {
        items
            .iter()
            .map(|h| h.excerpt.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "As a real estate market analyst, write an analysis report for {location} based on \
         this sentiment data.\n\nData summary:\n{summary:#}\n\n\
         Sample positive mentions: {positive}\n\
         Sample negative mentions: {negative}\n\n\
         Respond with only a JSON object:\n\
         {{\"executive_summary\": \"brief overview\", \
         \"market_sentiment_assessment\": \"detailed assessment\", \
         \"key_insights\": [\"insight\"], \"risk_factors\": [\"risk\"], \
         \"opportunities\": [\"opportunity\"], \
         \"investment_recommendation\": \"Buy|Hold|Sell|Wait\"}}",
        location = report.location,
        positive = samples(&report.most_positive),
        negative = samples(&report.most_negative),
    )
}

fn parse_analysis_reply(reply: &str) -> Option<ClaudeAnalysis> {
    serde_json::from_str(json_span(reply, '{', '}')?).ok()
}

/// Claude's text where it gave some; the basic analysis fills the gaps.
/// Source extremes always come from the report itself.
fn merge_claude_analysis(parsed: ClaudeAnalysis, basic: MarketAnalysis) -> MarketAnalysis {
    let recommendation = parsed
        .investment_recommendation
        .as_deref()
        .and_then(|r| r.parse().ok());
    let non_empty = |items: Vec<String>, fallback: Vec<String>| {
        let items: Vec<String> = items
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .take(MAX_LIST_ITEMS)
            .collect();
        if items.is_empty() {
            fallback
        } else {
            items
        }
    };

    MarketAnalysis {
        executive_summary: parsed
            .executive_summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(basic.executive_summary),
        assessment: parsed
            .market_sentiment_assessment
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(basic.assessment),
        advice: match recommendation {
            Some(r) if r != basic.recommendation => advice_for(r).to_string(),
            _ => basic.advice,
        },
        recommendation: recommendation.unwrap_or(basic.recommendation),
        key_insights: non_empty(parsed.key_insights, basic.key_insights),
        risk_factors: non_empty(parsed.risk_factors, basic.risk_factors),
        opportunities: non_empty(parsed.opportunities, basic.opportunities),
        most_positive_source: basic.most_positive_source,
        least_positive_source: basic.least_positive_source,
        method: AnalysisMethod::Claude,
    }
}

fn advice_for(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::Buy => "Consider buying opportunities",
        Recommendation::Hold => "Monitor market closely",
        Recommendation::Sell => "Consider reducing exposure",
        Recommendation::Wait => "Exercise caution, wait for better timing",
    }
}

impl MarketAnalysis {
    /// Markdown section meant to follow [`SentimentReport::to_markdown`].
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("\n## Market analysis\n\n");
        let _ = writeln!(
            out,
            "**Recommendation: {}** ({})\n",
            self.recommendation, self.advice
        );
        let _ = writeln!(out, "{}\n", self.executive_summary);
        if self.assessment != self.executive_summary {
            let _ = writeln!(out, "{}\n", self.assessment);
        }

        for (title, items) in [
            ("Key insights", &self.key_insights),
            ("Risk factors", &self.risk_factors),
            ("Opportunities", &self.opportunities),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "### {title}\n");
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
            out.push('\n');
        }

        if let (Some(best), Some(worst)) = (self.most_positive_source, self.least_positive_source) {
            let _ = writeln!(
                out,
                "Most positive source: {}. Least positive source: {}.\n",
                best.display_name(),
                worst.display_name()
            );
        }
        let _ = writeln!(
            out,
            "_Analysis: {}_",
            match self.method {
                AnalysisMethod::Claude => "Claude",
                AnalysisMethod::Basic => "basic (Claude not configured or unavailable)",
            }
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use estatepulse_core::{
        Classification, ClassificationMethod, Engagement, Mention, SentimentLabel,
    };

    use super::*;
    use crate::report::build_report;

    fn mention(source: SourceKind, id: &str, label: SentimentLabel, score: f64) -> Mention {
        Mention {
            source,
            external_id: id.to_string(),
            location: "Kokapet".to_string(),
            author: None,
            url: None,
            raw_text: format!("mention {id} about Kokapet flats"),
            clean_text: "kokapet flat".to_string(),
            engagement: Engagement::default(),
            published_at: None,
            collected_at: Utc::now(),
            classification: Classification::new(
                label,
                score,
                0.8,
                "r",
                ClassificationMethod::Lexicon,
            ),
        }
    }

    #[test]
    fn basic_analysis_thresholds() {
        let cases = [
            (0.5, Recommendation::Buy, "Consider buying opportunities"),
            (0.2, Recommendation::Hold, "Monitor market closely"),
            (0.0, Recommendation::Hold, "Monitor market closely"),
            (-0.2, Recommendation::Hold, "Monitor market closely"),
            (
                -0.5,
                Recommendation::Wait,
                "Exercise caution, wait for better timing",
            ),
        ];
        for (score, expected, advice) in cases {
            let label = SentimentLabel::from_score(score);
            let report = build_report("Kokapet", &[mention(SourceKind::News, "1", label, score)]);
            let analysis = basic_analysis(&report);
            assert_eq!(analysis.recommendation, expected, "score {score}");
            assert_eq!(analysis.advice, advice, "score {score}");
            assert_eq!(analysis.method, AnalysisMethod::Basic);
        }
    }

    #[test]
    fn basic_analysis_names_source_extremes_and_risks() {
        let mentions = vec![
            mention(SourceKind::Reddit, "1", SentimentLabel::Positive, 0.9),
            mention(SourceKind::Twitter, "2", SentimentLabel::Negative, -0.6),
            mention(SourceKind::News, "3", SentimentLabel::Neutral, 0.0),
        ];
        let analysis = basic_analysis(&build_report("Kokapet", &mentions));

        assert_eq!(analysis.most_positive_source, Some(SourceKind::Reddit));
        assert_eq!(analysis.least_positive_source, Some(SourceKind::Twitter));
        assert_eq!(analysis.executive_summary, "Analysis of 3 items shows neutral market sentiment");
        assert_eq!(analysis.risk_factors, vec!["mention 2 about Kokapet flats"]);
        assert_eq!(analysis.opportunities, vec!["mention 1 about Kokapet flats"]);
        assert!(analysis
            .key_insights
            .contains(&"Most positive source: Reddit".to_string()));
    }

    #[test]
    fn empty_report_gets_standard_risk() {
        let analysis = basic_analysis(&build_report("Kokapet", &[]));
        assert_eq!(analysis.recommendation, Recommendation::Hold);
        assert_eq!(analysis.risk_factors, vec!["Standard market risks apply"]);
        assert!(analysis.opportunities.is_empty());
        assert_eq!(analysis.most_positive_source, None);
    }

    #[test]
    fn recommendation_reads_first_word() {
        assert_eq!("Buy".parse::<Recommendation>(), Ok(Recommendation::Buy));
        assert_eq!(
            "hold - monitor closely".parse::<Recommendation>(),
            Ok(Recommendation::Hold)
        );
        assert_eq!(" WAIT".parse::<Recommendation>(), Ok(Recommendation::Wait));
        assert!("Buy/Hold/Sell/Wait maybe".parse::<Recommendation>().is_ok());
        assert!("accumulate".parse::<Recommendation>().is_err());
    }

    #[test]
    fn claude_reply_fills_gaps_from_basic() {
        let report = build_report(
            "Kokapet",
            &[mention(SourceKind::News, "1", SentimentLabel::Positive, 0.7)],
        );
        let reply = "```json\n{\"executive_summary\": \"Demand is strong.\", \
                     \"risk_factors\": [\"  \", \"Water supply\"], \
                     \"investment_recommendation\": \"Sell\"}\n```";
        let parsed = parse_analysis_reply(reply).expect("json reply");
        let analysis = merge_claude_analysis(parsed, basic_analysis(&report));

        assert_eq!(analysis.method, AnalysisMethod::Claude);
        assert_eq!(analysis.executive_summary, "Demand is strong.");
        assert_eq!(analysis.assessment, "Positive market sentiment detected");
        assert_eq!(analysis.recommendation, Recommendation::Sell);
        assert_eq!(analysis.advice, "Consider reducing exposure");
        assert_eq!(analysis.risk_factors, vec!["Water supply"]);
        assert_eq!(analysis.most_positive_source, Some(SourceKind::News));
    }

    #[test]
    fn prose_reply_does_not_parse() {
        assert!(parse_analysis_reply("The market looks fine overall.").is_none());
    }

    #[test]
    fn markdown_lists_recommendation_and_sources() {
        let mentions = vec![
            mention(SourceKind::Reddit, "1", SentimentLabel::Positive, 0.9),
            mention(SourceKind::Youtube, "2", SentimentLabel::Positive, 0.5),
        ];
        let md = basic_analysis(&build_report("Kokapet", &mentions)).to_markdown();
        assert!(md.contains("## Market analysis"));
        assert!(md.contains("**Recommendation: buy** (Consider buying opportunities)"));
        assert!(md.contains("### Risk factors\n\n- Standard market risks apply"));
        assert!(md.contains("Most positive source: Reddit. Least positive source: YouTube."));
    }
}
