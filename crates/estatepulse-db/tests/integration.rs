//! Offline unit tests for estatepulse-db pool configuration and row types.
//! These tests do not require a database connection.

use estatepulse_core::{AppConfig, Environment, SourceCredentials};
use estatepulse_db::{CollectionRunRow, MentionRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8501),
        log_level: "info".to_string(),
        region_path: PathBuf::from("./config/region.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        request_timeout_secs: 30,
        user_agent: "ua".to_string(),
        max_retries: 3,
        retry_backoff_base_ms: 2000,
        inter_request_delay_ms: 500,
        default_limit: 50,
        min_text_len: 20,
        max_text_len: 1000,
        classifier_batch_size: 10,
        claude_model: "claude-3-5-sonnet-20241022".to_string(),
        claude_max_tokens: 2000,
        credentials: SourceCredentials::default(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CollectionRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn collection_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CollectionRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        location: "Kondapur".to_string(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        records_processed: 0_i64,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.location, "Kondapur");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert_eq!(row.records_processed, 0);
}

#[test]
fn mention_row_with_unknown_source_fails_to_decode() {
    use chrono::Utc;

    let row = MentionRow {
        id: 1,
        source: "myspace".to_string(),
        external_id: "abc".to_string(),
        location: "Kondapur".to_string(),
        author: None,
        url: None,
        raw_text: "raw".to_string(),
        clean_text: "raw".to_string(),
        likes: None,
        comments: None,
        shares: None,
        published_at: None,
        collected_at: Utc::now(),
        sentiment: "positive".to_string(),
        score: 0.5,
        confidence: 0.9,
        reason: "r".to_string(),
        method: "claude".to_string(),
    };

    let err = row.into_mention().expect_err("unknown source should not decode");
    assert!(
        matches!(err, estatepulse_db::DbError::Decode(ref msg) if msg.contains("myspace")),
        "got {err:?}"
    );
}
