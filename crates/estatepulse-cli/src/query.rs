//! Read-only handlers over stored mentions.

use estatepulse_core::Mention;
use estatepulse_db::MentionFilter;
use estatepulse_sentiment::{analyze_market, build_report, PipelineContext};

/// Upper bound on mentions folded into a stored-data report.
const REPORT_MENTION_LIMIT: i64 = 5_000;
const TEXT_PREVIEW_CHARS: usize = 80;

/// Print the markdown report and market analysis for `query`.
///
/// # Errors
///
/// Returns an error if the location is blank or the query fails.
pub(crate) async fn run_report(
    pool: &sqlx::SqlitePool,
    ctx: &PipelineContext,
    query: &str,
) -> anyhow::Result<()> {
    match report_markdown(pool, ctx, query).await? {
        Some(markdown) => println!("{markdown}"),
        None => {
            let location = ctx.region.canonical_location(query)?;
            println!("no stored mentions for {location}; run `estatepulse collect --location \"{location}\"` first");
        }
    }
    Ok(())
}

/// Report plus market analysis over every stored mention matching `query`,
/// or `None` when nothing is stored. Rows that fail to decode are logged and
/// skipped.
///
/// # Errors
///
/// Returns an error if the location is blank or the query fails.
pub(crate) async fn report_markdown(
    pool: &sqlx::SqlitePool,
    ctx: &PipelineContext,
    query: &str,
) -> anyhow::Result<Option<String>> {
    let location = ctx.region.canonical_location(query)?;
    let filter = MentionFilter {
        limit: REPORT_MENTION_LIMIT,
        ..MentionFilter::default()
    };
    let rows = estatepulse_db::list_mentions_by_location(pool, &location, &filter).await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mentions: Vec<Mention> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            row.into_mention()
                .map_err(|e| tracing::warn!(id, error = %e, "skipping undecodable mention"))
                .ok()
        })
        .collect();

    let report = build_report(&location, &mentions);
    let analysis = analyze_market(ctx, &report).await;
    Ok(Some(format!(
        "{}{}",
        report.to_markdown(),
        analysis.to_markdown()
    )))
}

/// Print the per-day timeline for the last `days` days.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_history(
    pool: &sqlx::SqlitePool,
    location: &str,
    days: i64,
) -> anyhow::Result<()> {
    let rows = estatepulse_db::daily_sentiment(pool, location, days).await?;

    if rows.is_empty() {
        println!("no mentions for '{location}' in the last {days} days");
        return Ok(());
    }

    println!(
        "{:<12}{:>7}{:>10}{:>10}{:>9}{:>9}",
        "DAY", "TOTAL", "POSITIVE", "NEGATIVE", "NEUTRAL", "SCORE"
    );
    for row in &rows {
        println!(
            "{:<12}{:>7}{:>10}{:>10}{:>9}{:>+9.2}",
            row.day, row.total, row.positive, row.negative, row.neutral, row.avg_score
        );
    }
    Ok(())
}

/// List stored mentions, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_mentions(
    pool: &sqlx::SqlitePool,
    location: &str,
    filter: &MentionFilter,
) -> anyhow::Result<()> {
    let rows = estatepulse_db::list_mentions_by_location(pool, location, filter).await?;

    if rows.is_empty() {
        println!("no stored mentions match '{location}'");
        return Ok(());
    }

    println!(
        "{:<18}{:<11}{:<10}{:>7}  TEXT",
        "COLLECTED", "SOURCE", "SENTIMENT", "SCORE"
    );
    for row in &rows {
        println!(
            "{:<18}{:<11}{:<10}{:>+7.2}  {}",
            row.collected_at.format("%Y-%m-%d %H:%M"),
            row.source,
            row.sentiment,
            row.score,
            preview(&row.raw_text)
        );
    }
    Ok(())
}

/// First line of `text`, cut to a fixed width with an ellipsis.
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= TEXT_PREVIEW_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(TEXT_PREVIEW_CHARS - 3).collect();
    format!("{cut}...")
}
