//! Shared fixtures for the wiremock-backed integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use estatepulse_core::{AppConfig, Environment, RegionProfile, SourceCredentials};
use estatepulse_sentiment::{Endpoints, PipelineContext};
use wiremock::MockServer;

pub fn test_config(credentials: SourceCredentials) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        env: Environment::Test,
        bind_addr: "127.0.0.1:0".parse().expect("valid socket addr"),
        log_level: "debug".to_string(),
        region_path: PathBuf::from("config/region.yaml"),
        db_max_connections: 1,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        request_timeout_secs: 5,
        user_agent: "estatepulse-test/0.1".to_string(),
        max_retries: 0,
        retry_backoff_base_ms: 0,
        inter_request_delay_ms: 0,
        default_limit: 50,
        min_text_len: 20,
        max_text_len: 2000,
        classifier_batch_size: 10,
        claude_model: "claude-test".to_string(),
        claude_max_tokens: 1000,
        credentials,
    }
}

/// Credentials that pass every format check.
pub fn full_credentials() -> SourceCredentials {
    SourceCredentials {
        claude_api_key: Some("sk-ant-test-key-0001".to_string()),
        reddit_client_id: Some("reddit-client-id-01".to_string()),
        reddit_client_secret: Some("reddit-secret".to_string()),
        reddit_user_agent: "estatepulse-test".to_string(),
        youtube_api_key: Some(format!("AIza{}", "x".repeat(35))),
        instagram_access_token: Some("ig-access-token-01".to_string()),
        instagram_user_id: Some("17841400000000000".to_string()),
        twitter_bearer_token: Some("twitter-bearer-token-0001".to_string()),
    }
}

/// Only the keyless news feed is usable; classification uses the lexicon.
pub fn news_only_credentials() -> SourceCredentials {
    SourceCredentials {
        reddit_user_agent: "estatepulse-test".to_string(),
        ..SourceCredentials::default()
    }
}

pub fn context(server: &MockServer, credentials: SourceCredentials) -> PipelineContext {
    PipelineContext::new(test_config(credentials), RegionProfile::default())
        .expect("context construction should not fail")
        .with_endpoints(Endpoints::with_base(&server.uri()))
        .expect("mock endpoints should parse")
}

/// A Messages API response carrying one text block.
pub fn claude_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-test",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn"
    })
}

pub const NEWS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title>
<item>
  <title>Kokapet land prices hit record high as demand surges</title>
  <link>https://news.example.com/kokapet-prices</link>
  <pubDate>Wed, 01 May 2024 10:00:00 GMT</pubDate>
  <description>Buyers see great growth and value near the Financial District</description>
  <source url="https://www.thehindu.com">The Hindu</source>
</item>
<item>
  <title>Water shortage worries Kokapet apartment owners</title>
  <link>https://news.example.com/kokapet-water</link>
  <description>Residents call the tanker costs terrible and the traffic awful</description>
</item>
</channel></rss>"#;

pub const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title></channel></rss>"#;
