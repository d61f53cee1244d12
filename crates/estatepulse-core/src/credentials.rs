//! Credential readiness checks and per-source setup guidance.

use serde::Serialize;

use crate::app_config::SourceCredentials;
use crate::mention::SourceKind;

const MIN_KEY_LEN: usize = 10;

const PLACEHOLDER_KEYS: &[&str] = &[
    "your_api_key",
    "api_key_here",
    "replace_with_your_key",
    "none",
    "null",
    "undefined",
    "todo",
    "changeme",
];

/// Whether a source can be called with the current credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Missing { vars: Vec<&'static str> },
    Invalid { reason: String },
}

impl Readiness {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// One-line, user-facing description of what to fix.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Readiness::Ready => None,
            Readiness::Missing { vars } => Some(format!("set {}", vars.join(", "))),
            Readiness::Invalid { reason } => Some(reason.clone()),
        }
    }
}

/// Static format check for an API key.
///
/// Rejects short keys and well-known placeholder values; `YouTube` keys must
/// start with `AIza` and be 39 characters, Reddit ids at least 14, Twitter
/// tokens at least 20.
///
/// # Errors
///
/// Returns a human-readable reason when the key fails a check.
pub fn validate_api_key(kind: SourceKind, key: &str) -> Result<(), String> {
    let key = key.trim();
    let name = kind.display_name();

    if key.chars().count() < MIN_KEY_LEN {
        return Err(format!("{name} API key is too short"));
    }

    if PLACEHOLDER_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
        return Err(format!("{name} API key is a placeholder value"));
    }

    let well_formed = match kind {
        SourceKind::Youtube => key.starts_with("AIza") && key.len() == 39,
        SourceKind::Reddit => key.len() >= 14,
        SourceKind::Twitter => key.len() >= 20,
        SourceKind::Instagram | SourceKind::News | SourceKind::Claude => true,
    };

    if well_formed {
        Ok(())
    } else {
        Err(format!("{name} API key has an invalid format"))
    }
}

impl SourceCredentials {
    /// Readiness of one source against the configured credentials.
    #[must_use]
    pub fn readiness(&self, kind: SourceKind) -> Readiness {
        let required: Vec<(&'static str, Option<&String>)> = match kind {
            SourceKind::News => return Readiness::Ready,
            SourceKind::Claude => vec![("CLAUDE_API_KEY", self.claude_api_key.as_ref())],
            SourceKind::Reddit => vec![
                ("REDDIT_CLIENT_ID", self.reddit_client_id.as_ref()),
                ("REDDIT_CLIENT_SECRET", self.reddit_client_secret.as_ref()),
            ],
            SourceKind::Youtube => vec![("YOUTUBE_API_KEY", self.youtube_api_key.as_ref())],
            SourceKind::Instagram => vec![
                ("INSTAGRAM_ACCESS_TOKEN", self.instagram_access_token.as_ref()),
                ("INSTAGRAM_USER_ID", self.instagram_user_id.as_ref()),
            ],
            SourceKind::Twitter => vec![(
                "TWITTER_BEARER_TOKEN",
                self.twitter_bearer_token.as_ref(),
            )],
        };

        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(var, _)| *var)
            .collect();
        if !missing.is_empty() {
            return Readiness::Missing { vars: missing };
        }

        // The first variable of each source is its primary key.
        if let Some((_, Some(key))) = required.first() {
            if let Err(reason) = validate_api_key(kind, key) {
                return Readiness::Invalid { reason };
            }
        }

        Readiness::Ready
    }

    /// Claude is available and at least one social scraper is ready.
    #[must_use]
    pub fn is_fully_configured(&self) -> bool {
        self.readiness(SourceKind::Claude).is_ready()
            && [
                SourceKind::Reddit,
                SourceKind::Youtube,
                SourceKind::Instagram,
                SourceKind::Twitter,
            ]
            .into_iter()
            .any(|kind| self.readiness(kind).is_ready())
    }

    /// Sources that are not ready, with their readiness state.
    #[must_use]
    pub fn missing_configuration(&self) -> Vec<(SourceKind, Readiness)> {
        SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.readiness(kind)))
            .filter(|(_, readiness)| !readiness.is_ready())
            .collect()
    }
}

/// Steps to obtain credentials for a source.
#[derive(Debug, Clone, Serialize)]
pub struct SetupGuide {
    pub source: SourceKind,
    pub description: &'static str,
    pub steps: &'static [&'static str],
    pub env_vars: &'static [&'static str],
}

#[must_use]
pub fn configuration_guide(kind: SourceKind) -> SetupGuide {
    let (description, steps, env_vars): (&'static str, &'static [&'static str], &'static [&'static str]) =
        match kind {
            SourceKind::Claude => (
                "Sentiment classification and market research",
                &[
                    "Create an account at console.anthropic.com",
                    "Generate an API key under Settings > API Keys",
                    "Add CLAUDE_API_KEY to .env",
                ],
                &["CLAUDE_API_KEY"],
            ),
            SourceKind::Reddit => (
                "Posts and comments from city and investing subreddits",
                &[
                    "Open reddit.com/prefs/apps and create a 'script' app",
                    "Copy the client id shown under the app name",
                    "Copy the client secret",
                    "Add REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET to .env",
                ],
                &["REDDIT_CLIENT_ID", "REDDIT_CLIENT_SECRET", "REDDIT_USER_AGENT"],
            ),
            SourceKind::Youtube => (
                "Comments on local real-estate videos",
                &[
                    "Create a project in the Google Cloud console",
                    "Enable the YouTube Data API v3",
                    "Create an API key under Credentials",
                    "Add YOUTUBE_API_KEY to .env",
                ],
                &["YOUTUBE_API_KEY"],
            ),
            SourceKind::Instagram => (
                "Captions from real-estate hashtags",
                &[
                    "Create a Meta developer app with the Instagram Graph API product",
                    "Link an Instagram business account to a Facebook page",
                    "Generate a long-lived access token",
                    "Add INSTAGRAM_ACCESS_TOKEN and INSTAGRAM_USER_ID to .env",
                ],
                &["INSTAGRAM_ACCESS_TOKEN", "INSTAGRAM_USER_ID"],
            ),
            SourceKind::Twitter => (
                "Recent tweets about local property",
                &[
                    "Create a project at developer.x.com",
                    "Generate an app bearer token",
                    "Add TWITTER_BEARER_TOKEN to .env",
                ],
                &["TWITTER_BEARER_TOKEN"],
            ),
            SourceKind::News => (
                "Google News RSS headlines; no credentials required",
                &[],
                &[],
            ),
        };

    SetupGuide {
        source: kind,
        description,
        steps,
        env_vars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn youtube_key() -> String {
        format!("AIza{}", "x".repeat(35))
    }

    #[test]
    fn short_key_is_rejected() {
        let err = validate_api_key(SourceKind::Claude, "abc").unwrap_err();
        assert!(err.contains("too short"), "{err}");
    }

    #[test]
    fn placeholder_key_is_rejected_case_insensitively() {
        let err = validate_api_key(SourceKind::Claude, "YOUR_API_KEY").unwrap_err();
        assert!(err.contains("placeholder"), "{err}");
    }

    #[test]
    fn youtube_key_requires_prefix_and_length() {
        assert!(validate_api_key(SourceKind::Youtube, &youtube_key()).is_ok());
        assert!(validate_api_key(SourceKind::Youtube, "BIza-not-a-youtube-key-000000000000000").is_err());
        assert!(validate_api_key(SourceKind::Youtube, "AIza-too-short-key").is_err());
    }

    #[test]
    fn reddit_and_twitter_minimum_lengths() {
        assert!(validate_api_key(SourceKind::Reddit, "abcdefghijklm").is_err());
        assert!(validate_api_key(SourceKind::Reddit, "abcdefghijklmn").is_ok());
        assert!(validate_api_key(SourceKind::Twitter, "abcdefghijklmnopqrs").is_err());
        assert!(validate_api_key(SourceKind::Twitter, "abcdefghijklmnopqrst").is_ok());
    }

    #[test]
    fn news_is_always_ready() {
        let creds = SourceCredentials::default();
        assert_eq!(creds.readiness(SourceKind::News), Readiness::Ready);
    }

    #[test]
    fn missing_vars_are_listed() {
        let creds = SourceCredentials {
            reddit_client_id: Some("abcdefghijklmn".to_string()),
            ..SourceCredentials::default()
        };
        assert_eq!(
            creds.readiness(SourceKind::Reddit),
            Readiness::Missing {
                vars: vec!["REDDIT_CLIENT_SECRET"]
            }
        );
        assert_eq!(
            creds.readiness(SourceKind::Reddit).hint().as_deref(),
            Some("set REDDIT_CLIENT_SECRET")
        );
    }

    #[test]
    fn invalid_key_surfaces_reason() {
        let creds = SourceCredentials {
            youtube_api_key: Some("changeme-but-long-enough".to_string()),
            ..SourceCredentials::default()
        };
        assert!(matches!(
            creds.readiness(SourceKind::Youtube),
            Readiness::Invalid { .. }
        ));
    }

    #[test]
    fn fully_configured_needs_claude_and_one_social_source() {
        let mut creds = SourceCredentials {
            claude_api_key: Some("sk-ant-0123456789".to_string()),
            ..SourceCredentials::default()
        };
        assert!(!creds.is_fully_configured());

        creds.youtube_api_key = Some(youtube_key());
        assert!(creds.is_fully_configured());

        creds.claude_api_key = None;
        assert!(!creds.is_fully_configured());
    }

    #[test]
    fn missing_configuration_skips_ready_sources() {
        let creds = SourceCredentials::default();
        let missing = creds.missing_configuration();
        assert!(missing.iter().all(|(kind, _)| *kind != SourceKind::News));
        assert_eq!(missing.len(), SourceKind::ALL.len() - 1);
    }

    #[test]
    fn every_source_has_a_guide() {
        for kind in SourceKind::ALL {
            let guide = configuration_guide(kind);
            assert_eq!(guide.source, kind);
            assert!(!guide.description.is_empty());
        }
        assert!(configuration_guide(SourceKind::News).env_vars.is_empty());
    }
}
