//! Real estate sentiment pipeline.
//!
//! Collects location mentions from Reddit, YouTube, Instagram, Twitter/X,
//! Google News RSS and Claude market research, cleans the text, classifies
//! each mention with Claude (falling back to a keyword lexicon), and
//! aggregates the results into a per-location report with a market analysis.

pub mod analysis;
pub mod classifier;
pub mod claude;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod scorer;

mod retry;
mod sources;

use sha2::{Digest, Sha256};

pub use analysis::{
    analyze_market, basic_analysis, AnalysisMethod, MarketAnalysis, Recommendation,
};
pub use classifier::Classifier;
pub use claude::ClaudeClient;
pub use error::SentimentError;
pub use pipeline::{run_location_sentiment, LocationRun, PipelineContext};
pub use preprocess::{clean_text, prepare, PreparedMention};
pub use report::{
    build_report, Highlight, LabelCounts, LabelRatios, SentimentReport, SourceBreakdown,
};
pub use scorer::lexicon_classify;
pub use sources::{collect_mentions, Endpoints, SourceOutcome, SourceReport};

/// Lowercase hex SHA-256 of `input`. Used for content-derived ids and cache keys.
pub(crate) fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::sha256_hex;

    #[test]
    fn sha256_hex_is_stable_lowercase_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(sha256_hex("").len(), 64);
    }
}
