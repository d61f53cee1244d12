mod api;
mod middleware;

use std::sync::Arc;

use estatepulse_sentiment::PipelineContext;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = estatepulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let region = estatepulse_core::load_region_or_default(&config.region_path)?;

    let pool_config = estatepulse_db::PoolConfig::from_app_config(&config);
    let pool = estatepulse_db::connect_pool(&config.database_url, pool_config).await?;
    estatepulse_db::run_migrations(&pool).await?;

    for (kind, readiness) in config.credentials.missing_configuration() {
        tracing::warn!(
            source = %kind,
            hint = %readiness.hint().unwrap_or_default(),
            "source not configured; it will be skipped"
        );
    }

    let bind_addr = config.bind_addr;
    let pipeline = Arc::new(PipelineContext::new(config, region)?);
    let app = build_app(AppState { pool, pipeline });

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "estatepulse server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
