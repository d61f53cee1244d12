use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Provider credentials. Every field is optional; a source whose credentials
/// are absent is skipped with a setup hint rather than failing the run.
#[derive(Clone, Default)]
pub struct SourceCredentials {
    pub claude_api_key: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub youtube_api_key: Option<String>,
    pub instagram_access_token: Option<String>,
    pub instagram_user_id: Option<String>,
    pub twitter_bearer_token: Option<String>,
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "[redacted]")
}

impl std::fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("claude_api_key", &redact(self.claude_api_key.as_ref()))
            .field("reddit_client_id", &redact(self.reddit_client_id.as_ref()))
            .field(
                "reddit_client_secret",
                &redact(self.reddit_client_secret.as_ref()),
            )
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("youtube_api_key", &redact(self.youtube_api_key.as_ref()))
            .field(
                "instagram_access_token",
                &redact(self.instagram_access_token.as_ref()),
            )
            .field("instagram_user_id", &self.instagram_user_id)
            .field(
                "twitter_bearer_token",
                &redact(self.twitter_bearer_token.as_ref()),
            )
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub region_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub inter_request_delay_ms: u64,
    pub default_limit: usize,
    pub min_text_len: usize,
    pub max_text_len: usize,
    pub classifier_batch_size: usize,
    pub claude_model: String,
    pub claude_max_tokens: u32,
    pub credentials: SourceCredentials,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("region_path", &self.region_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("default_limit", &self.default_limit)
            .field("min_text_len", &self.min_text_len)
            .field("max_text_len", &self.max_text_len)
            .field("classifier_batch_size", &self.classifier_batch_size)
            .field("claude_model", &self.claude_model)
            .field("claude_max_tokens", &self.claude_max_tokens)
            .field("credentials", &self.credentials)
            .finish()
    }
}
