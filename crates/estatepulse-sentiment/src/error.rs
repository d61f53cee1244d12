use estatepulse_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// 401/403 (or a provider-specific auth failure). Never retried.
    #[error("{provider} rejected the credentials (HTTP {status})")]
    Unauthorized {
        provider: &'static str,
        status: u16,
        env_var: &'static str,
    },

    /// 401/403 from a source that takes no credential.
    #[error("{provider} blocked the request (HTTP {status})")]
    Blocked { provider: &'static str, status: u16 },

    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: &'static str },

    #[error("{provider} API error (HTTP {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    Location(#[from] CoreError),
}

impl SentimentError {
    /// Short instruction for the user on how to recover from this error.
    #[must_use]
    pub fn hint(&self) -> String {
        match self {
            SentimentError::Http(e) if e.is_timeout() => {
                "request timed out; check network connectivity or raise \
                 ESTATEPULSE_REQUEST_TIMEOUT_SECS"
                    .to_string()
            }
            SentimentError::Http(e) if e.status().is_some_and(|s| s.is_server_error()) => {
                "the provider is having trouble; try again later".to_string()
            }
            SentimentError::Http(_) => "check network connectivity".to_string(),
            SentimentError::Unauthorized { env_var, .. } => format!("check {env_var}"),
            SentimentError::Blocked { provider, .. } => format!(
                "{provider} needs no credentials; check network connectivity or proxy \
                 settings and try again later"
            ),
            SentimentError::RateLimited { .. } => {
                "rate limit reached; wait a few minutes and retry".to_string()
            }
            SentimentError::Api { status, .. } if *status >= 500 => {
                "the provider is having trouble; try again later".to_string()
            }
            SentimentError::Api { provider, .. } => {
                format!("{provider} refused the request; check the query and account limits")
            }
            SentimentError::Xml(_) | SentimentError::Deserialize { .. } => {
                "the provider returned an unexpected response; try again later".to_string()
            }
            SentimentError::InvalidBaseUrl { .. } => {
                "check the configured endpoint URL".to_string()
            }
            SentimentError::Location(_) => "provide a non-empty location".to_string(),
        }
    }
}

/// Turn a non-2xx response into the matching [`SentimentError`].
///
/// 401/403 become `Unauthorized` naming `env_var` (or `Blocked` for a keyless
/// source), 429 becomes `RateLimited`, everything else `Api` with the first
/// 200 characters of the body.
pub(crate) async fn ensure_success(
    provider: &'static str,
    env_var: Option<&'static str>,
    response: reqwest::Response,
) -> Result<reqwest::Response, SentimentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 | 403 => match env_var {
            Some(env_var) => Err(SentimentError::Unauthorized {
                provider,
                status: status.as_u16(),
                env_var,
            }),
            None => Err(SentimentError::Blocked {
                provider,
                status: status.as_u16(),
            }),
        },
        429 => Err(SentimentError::RateLimited { provider }),
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(SentimentError::Api {
                provider,
                status: code,
                message: body.chars().take(200).collect(),
            })
        }
    }
}

/// Decode a JSON body, tagging failures with `context`.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    body: &str,
    context: impl Into<String>,
) -> Result<T, SentimentError> {
    serde_json::from_str(body).map_err(|e| SentimentError::Deserialize {
        context: context.into(),
        source: e,
    })
}
