use crate::app_config::{AppConfig, Environment, SourceCredentials};
use crate::ConfigError;

pub(crate) const DEFAULT_DATABASE_URL: &str = "sqlite://estatepulse.db?mode=rwc";
pub(crate) const DEFAULT_REDDIT_USER_AGENT: &str = "RealEstateSentimentBot/1.0";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so an empty `KEY=` line in `.env` does not
    // register as a configured credential.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = parse_usize(var, default)?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let database_url = or_default("DATABASE_URL", DEFAULT_DATABASE_URL);
    let env = parse_environment(&or_default("ESTATEPULSE_ENV", "development"))?;

    let bind_addr = parse_addr("ESTATEPULSE_BIND_ADDR", "127.0.0.1:8501")?;
    let log_level = or_default("ESTATEPULSE_LOG_LEVEL", "info");
    let region_path = PathBuf::from(or_default(
        "ESTATEPULSE_REGION_PATH",
        "./config/region.yaml",
    ));

    let db_max_connections = parse_u32("ESTATEPULSE_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("ESTATEPULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ESTATEPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("ESTATEPULSE_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "ESTATEPULSE_USER_AGENT",
        "estatepulse/0.1 (real-estate-sentiment)",
    );
    let max_retries = parse_u32("ESTATEPULSE_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("ESTATEPULSE_RETRY_BACKOFF_BASE_MS", "2000")?;
    let inter_request_delay_ms = parse_u64("ESTATEPULSE_INTER_REQUEST_DELAY_MS", "500")?;

    let default_limit = parse_positive("ESTATEPULSE_DEFAULT_LIMIT", "50")?;
    let min_text_len = parse_usize("ESTATEPULSE_MIN_TEXT_LEN", "20")?;
    let max_text_len = parse_positive("ESTATEPULSE_MAX_TEXT_LEN", "1000")?;
    if min_text_len > max_text_len {
        return Err(invalid(
            "ESTATEPULSE_MIN_TEXT_LEN",
            format!("must not exceed ESTATEPULSE_MAX_TEXT_LEN ({max_text_len})"),
        ));
    }

    let classifier_batch_size = parse_positive("ESTATEPULSE_CLASSIFIER_BATCH_SIZE", "10")?;
    let claude_model = or_default("ESTATEPULSE_CLAUDE_MODEL", "claude-3-5-sonnet-20241022");
    let claude_max_tokens = parse_u32("ESTATEPULSE_CLAUDE_MAX_TOKENS", "2000")?;

    let credentials = SourceCredentials {
        claude_api_key: optional("CLAUDE_API_KEY"),
        reddit_client_id: optional("REDDIT_CLIENT_ID"),
        reddit_client_secret: optional("REDDIT_CLIENT_SECRET"),
        reddit_user_agent: optional("REDDIT_USER_AGENT")
            .unwrap_or_else(|| DEFAULT_REDDIT_USER_AGENT.to_string()),
        youtube_api_key: optional("YOUTUBE_API_KEY"),
        instagram_access_token: optional("INSTAGRAM_ACCESS_TOKEN"),
        instagram_user_id: optional("INSTAGRAM_USER_ID"),
        twitter_bearer_token: optional("TWITTER_BEARER_TOKEN"),
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        region_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        inter_request_delay_ms,
        default_limit,
        min_text_len,
        max_text_len,
        classifier_batch_size,
        claude_model,
        claude_max_tokens,
        credentials,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ESTATEPULSE_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
