use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

const DEFAULT_REGION_YAML: &str = include_str!("../../../config/region.yaml");

/// The city being tracked: its localities, spelling variants, and the search
/// hints each collector uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionProfile {
    pub name: String,
    pub localities: Vec<String>,
    /// Lowercase alias -> canonical locality name.
    #[serde(default)]
    pub variants: BTreeMap<String, String>,
    /// Lowercase terms that tie a text to the region.
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Lowercase real-estate terms used to filter loosely-targeted feeds.
    #[serde(default)]
    pub topic_keywords: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
    /// Hashtag patterns; `{location}` is replaced with the compacted locality.
    #[serde(default)]
    pub hashtag_templates: Vec<String>,
}

impl Default for RegionProfile {
    /// The built-in Hyderabad profile.
    fn default() -> Self {
        // The bundled file is checked by `default_profile_is_valid`.
        serde_yaml::from_str(DEFAULT_REGION_YAML).unwrap_or_else(|_| RegionProfile {
            name: "Hyderabad".to_string(),
            localities: Vec::new(),
            variants: BTreeMap::new(),
            indicators: vec!["hyderabad".to_string()],
            topic_keywords: Vec::new(),
            subreddits: vec!["hyderabad".to_string()],
            hashtag_templates: Vec::new(),
        })
    }
}

/// Load and validate a region profile from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_region(path: &Path) -> Result<RegionProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RegionFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let region: RegionProfile =
        serde_yaml::from_str(&content).map_err(ConfigError::RegionFileParse)?;

    validate_region(&region)?;

    Ok(region)
}

/// Load the region file if it exists, otherwise fall back to the built-in profile.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but is unreadable or invalid.
pub fn load_region_or_default(path: &Path) -> Result<RegionProfile, ConfigError> {
    if path.exists() {
        load_region(path)
    } else {
        Ok(RegionProfile::default())
    }
}

fn validate_region(region: &RegionProfile) -> Result<(), ConfigError> {
    if region.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "region name must be non-empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for locality in &region.localities {
        if locality.trim().is_empty() {
            return Err(ConfigError::Validation(
                "locality names must be non-empty".to_string(),
            ));
        }
        if !seen.insert(locality.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate locality: '{locality}'"
            )));
        }
    }

    for (alias, target) in &region.variants {
        if !seen.contains(&target.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "variant '{alias}' points at unknown locality '{target}'"
            )));
        }
    }

    for template in &region.hashtag_templates {
        if !template.contains("{location}") {
            return Err(ConfigError::Validation(format!(
                "hashtag template '{template}' has no {{location}} placeholder"
            )));
        }
    }

    Ok(())
}

impl RegionProfile {
    /// Resolve a user query to a canonical locality name.
    ///
    /// Matches a locality exactly (case-insensitive, whitespace-collapsed),
    /// then a known variant. Returns `None` for anything else.
    #[must_use]
    pub fn normalize_location(&self, query: &str) -> Option<String> {
        let needle = collapse_whitespace(query).to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(locality) = self
            .localities
            .iter()
            .find(|l| l.to_lowercase() == needle)
        {
            return Some(locality.clone());
        }

        self.variants
            .iter()
            .find(|(alias, _)| alias.to_lowercase() == needle)
            .and_then(|(_, target)| self.canonical_locality(target))
    }

    /// Canonical location tag for storage.
    ///
    /// Known localities and variants map to their canonical name; anything
    /// else is whitespace-collapsed and title-cased so the same free-form
    /// query always lands under one tag.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyLocation`] for blank input.
    pub fn canonical_location(&self, query: &str) -> Result<String, CoreError> {
        if let Some(known) = self.normalize_location(query) {
            return Ok(known);
        }
        let collapsed = collapse_whitespace(query);
        if collapsed.is_empty() {
            return Err(CoreError::EmptyLocation);
        }
        Ok(title_case(&collapsed))
    }

    /// Find the first locality (or variant) mentioned anywhere in `text`.
    #[must_use]
    pub fn extract_location(&self, text: &str) -> Option<String> {
        let haystack = format!(" {} ", normalize_for_match(text));
        let contains = |term: &str| {
            let term = normalize_for_match(term);
            !term.is_empty() && haystack.contains(&format!(" {term} "))
        };

        if let Some(locality) = self.localities.iter().find(|l| contains(l)) {
            return Some(locality.clone());
        }

        self.variants
            .iter()
            .find(|(alias, _)| contains(alias))
            .and_then(|(_, target)| self.canonical_locality(target))
    }

    /// Whether `text` mentions the region at all.
    #[must_use]
    pub fn is_region_related(&self, text: &str) -> bool {
        let haystack = format!(" {} ", normalize_for_match(text));
        self.indicators.iter().any(|indicator| {
            let term = normalize_for_match(indicator);
            !term.is_empty() && haystack.contains(&format!(" {term} "))
        })
    }

    /// Whether `text` mentions any real-estate topic keyword.
    #[must_use]
    pub fn is_on_topic(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.topic_keywords.iter().any(|kw| lower.contains(kw.as_str()))
    }

    /// Hashtags to search for a location, in template order, without duplicates.
    #[must_use]
    pub fn hashtags_for(&self, location: &str) -> Vec<String> {
        let compact: String = location
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase();
        if compact.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        self.hashtag_templates
            .iter()
            .map(|t| t.replace("{location}", &compact))
            .filter(|tag| seen.insert(tag.clone()))
            .collect()
    }

    fn canonical_locality(&self, name: &str) -> Option<String> {
        let lower = name.to_lowercase();
        self.localities
            .iter()
            .find(|l| l.to_lowercase() == lower)
            .cloned()
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_for_match(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(input: &str) -> String {
    input
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "region_test.rs"]
mod tests;
