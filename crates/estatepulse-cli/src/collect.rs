//! `collect`: run the sentiment pipeline for one location and store the
//! classified mentions under a tracked collection run.

use estatepulse_core::{AppConfig, RegionProfile, SourceKind};
use estatepulse_sentiment::{
    analyze_market, run_location_sentiment, LocationRun, PipelineContext, SourceOutcome,
    SourceReport,
};

use crate::fail_run_best_effort;

/// Collect, classify, and persist mentions for `query`.
///
/// The run row moves `queued -> running -> succeeded`; a database failure
/// after the run starts marks it `failed`. Sources that fail or are not
/// configured are reported but never fail the run.
///
/// # Errors
///
/// Returns an error if the location is blank or a database write fails.
pub(crate) async fn run_collect(
    pool: &sqlx::SqlitePool,
    config: AppConfig,
    region: RegionProfile,
    query: &str,
    sources: &[SourceKind],
    limit: usize,
) -> anyhow::Result<()> {
    let location = region.canonical_location(query)?;
    let ctx = PipelineContext::new(config, region)?;

    let run = estatepulse_db::create_collection_run(pool, &location, "cli").await?;
    if let Err(e) = estatepulse_db::start_collection_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }

    let result = match run_location_sentiment(&ctx, &location, sources, limit).await {
        Ok(result) => result,
        Err(e) => {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    let summary = match estatepulse_db::insert_mentions(pool, &result.mentions).await {
        Ok(summary) => summary,
        Err(e) => {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    let inserted = i64::try_from(summary.inserted).unwrap_or(i64::MAX);
    if let Err(e) = estatepulse_db::complete_collection_run(pool, run.id, inserted).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }

    tracing::info!(
        location = %location,
        run_id = run.id,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "collection run complete"
    );

    print_outcomes(&result.outcomes);
    println!(
        "stored {} new mentions for {} ({} already stored)\n",
        summary.inserted, location, summary.duplicates
    );
    let analysis = analyze_market(&ctx, &result.report).await;
    println!("{}{}", result.report.to_markdown(), analysis.to_markdown());
    Ok(())
}

/// Run the pipeline and print what would be stored, without a database.
///
/// # Errors
///
/// Returns an error if the location is blank or the HTTP client cannot be built.
pub(crate) async fn run_collect_dry(
    config: AppConfig,
    region: RegionProfile,
    query: &str,
    sources: &[SourceKind],
    limit: usize,
) -> anyhow::Result<()> {
    let ctx = PipelineContext::new(config, region)?;
    let LocationRun {
        location,
        mentions,
        outcomes,
        report,
    } = run_location_sentiment(&ctx, query, sources, limit).await?;

    print_outcomes(&outcomes);
    println!(
        "dry-run: would store {} mentions for {location}\n",
        mentions.len()
    );
    let analysis = analyze_market(&ctx, &report).await;
    println!("{}{}", report.to_markdown(), analysis.to_markdown());
    Ok(())
}

fn print_outcomes(outcomes: &[SourceReport]) {
    println!("{:<24}{:<12}DETAIL", "SOURCE", "STATUS");
    for report in outcomes {
        println!("{}", outcome_line(report));
    }
    println!();
}

fn outcome_line(report: &SourceReport) -> String {
    let name = report.source.display_name();
    match &report.outcome {
        SourceOutcome::Collected { count } => {
            format!("{name:<24}{:<12}{count} mentions", "ok")
        }
        SourceOutcome::Skipped { hint } => format!("{name:<24}{:<12}{hint}", "skipped"),
        SourceOutcome::Failed { error, hint } => {
            format!("{name:<24}{:<12}{error} ({hint})", "failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_line_shows_counts_and_hints() {
        let collected = SourceReport {
            source: SourceKind::News,
            outcome: SourceOutcome::Collected { count: 12 },
        };
        assert_eq!(
            outcome_line(&collected),
            format!("{:<24}{:<12}12 mentions", "Google News", "ok")
        );

        let failed = SourceReport {
            source: SourceKind::Youtube,
            outcome: SourceOutcome::Failed {
                error: "YouTube rejected the credentials (HTTP 401)".to_string(),
                hint: "check YOUTUBE_API_KEY".to_string(),
            },
        };
        let line = outcome_line(&failed);
        assert!(line.starts_with("YouTube"));
        assert!(line.ends_with("(check YOUTUBE_API_KEY)"));
    }
}
