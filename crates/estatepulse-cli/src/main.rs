mod collect;
mod query;
mod status;

use clap::{Parser, Subcommand};
use estatepulse_core::{SentimentLabel, SourceKind};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "estatepulse")]
#[command(about = "Real estate sentiment from social media, news, and market research")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect and classify mentions for a location, then store them
    Collect {
        /// Locality to analyze (spelling variants are accepted)
        #[arg(long)]
        location: String,

        /// Restrict collection to these sources (repeatable); defaults to all
        #[arg(long = "source")]
        sources: Vec<SourceKind>,

        /// Maximum mentions per source (defaults to `ESTATEPULSE_DEFAULT_LIMIT`)
        #[arg(long)]
        limit: Option<usize>,

        /// Run the pipeline and print the report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a markdown sentiment report built from stored mentions
    Report {
        #[arg(long)]
        location: String,
    },
    /// Show the daily sentiment timeline for a location
    History {
        #[arg(long)]
        location: String,

        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// List stored mentions for a location, newest first
    Mentions {
        #[arg(long)]
        location: String,

        #[arg(long)]
        source: Option<SourceKind>,

        #[arg(long)]
        sentiment: Option<SentimentLabel>,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show which sources are configured and how to set up the rest
    Status,
    /// List the localities of the configured region
    Localities,
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = estatepulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let region = estatepulse_core::load_region_or_default(&config.region_path)?;

    match cli.command {
        Some(Commands::Collect {
            location,
            sources,
            limit,
            dry_run,
        }) => {
            let limit = limit.unwrap_or(config.default_limit);
            let sources = if sources.is_empty() {
                SourceKind::ALL.to_vec()
            } else {
                sources
            };
            if dry_run {
                collect::run_collect_dry(config, region, &location, &sources, limit).await?;
            } else {
                let pool = connect(&config).await?;
                collect::run_collect(&pool, config, region, &location, &sources, limit).await?;
            }
        }
        Some(Commands::Report { location }) => {
            let pool = connect(&config).await?;
            let ctx = estatepulse_sentiment::PipelineContext::new(config, region)?;
            query::run_report(&pool, &ctx, &location).await?;
        }
        Some(Commands::History { location, days }) => {
            let pool = connect(&config).await?;
            query::run_history(&pool, &location, days).await?;
        }
        Some(Commands::Mentions {
            location,
            source,
            sentiment,
            limit,
        }) => {
            let pool = connect(&config).await?;
            let filter = estatepulse_db::MentionFilter {
                source,
                sentiment,
                limit: limit.clamp(1, 500),
            };
            query::run_mentions(&pool, &location, &filter).await?;
        }
        Some(Commands::Status) => status::run_status(&config.credentials),
        Some(Commands::Localities) => status::run_localities(&region),
        Some(Commands::Db { command }) => {
            let pool_config = estatepulse_db::PoolConfig::from_app_config(&config);
            let pool = estatepulse_db::connect_pool(&config.database_url, pool_config).await?;
            match command {
                DbCommands::Ping => {
                    estatepulse_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = estatepulse_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        None => println!("estatepulse ready; run with --help to see commands"),
    }

    Ok(())
}

/// Connect and apply pending migrations so a fresh database file is usable.
async fn connect(config: &estatepulse_core::AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool_config = estatepulse_db::PoolConfig::from_app_config(config);
    let pool = estatepulse_db::connect_pool(&config.database_url, pool_config).await?;
    estatepulse_db::run_migrations(&pool).await?;
    Ok(pool)
}

async fn fail_run_best_effort(pool: &sqlx::SqlitePool, run_id: i64, message: String) {
    if let Err(mark_err) = estatepulse_db::fail_collection_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark collection run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
