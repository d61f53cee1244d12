use std::path::Path;

use super::*;

fn small_region() -> RegionProfile {
    RegionProfile {
        name: "Testville".to_string(),
        localities: vec!["Hitech City".to_string(), "Kondapur".to_string()],
        variants: BTreeMap::from([("hitec".to_string(), "Hitech City".to_string())]),
        indicators: vec!["testville".to_string()],
        topic_keywords: vec!["apartment".to_string(), "real estate".to_string()],
        subreddits: vec!["testville".to_string()],
        hashtag_templates: vec![
            "{location}realestate".to_string(),
            "{location}homes".to_string(),
            "{location}homes".to_string(),
        ],
    }
}

#[test]
fn default_profile_is_valid() {
    let region: RegionProfile =
        serde_yaml::from_str(DEFAULT_REGION_YAML).expect("bundled region.yaml parses");
    validate_region(&region).expect("bundled region.yaml validates");
    assert_eq!(region.name, "Hyderabad");
    assert_eq!(region.localities.len(), 50);
}

#[test]
fn load_region_from_real_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("region.yaml");
    let region = load_region(&path).expect("failed to load region.yaml");
    assert!(region.localities.iter().any(|l| l == "Gachibowli"));
    assert!(!region.subreddits.is_empty());
}

#[test]
fn load_region_missing_file_is_io_error() {
    let err = load_region(Path::new("/nonexistent/region.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::RegionFileIo { .. }), "{err:?}");
}

#[test]
fn load_region_or_default_falls_back_when_absent() {
    let region = load_region_or_default(Path::new("/nonexistent/region.yaml")).unwrap();
    assert_eq!(region.name, "Hyderabad");
}

#[test]
fn validate_rejects_empty_name() {
    let mut region = small_region();
    region.name = "  ".to_string();
    assert!(matches!(
        validate_region(&region),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn validate_rejects_duplicate_locality_ignoring_case() {
    let mut region = small_region();
    region.localities.push("KONDAPUR".to_string());
    let err = validate_region(&region).unwrap_err();
    assert!(err.to_string().contains("duplicate locality"), "{err}");
}

#[test]
fn validate_rejects_variant_to_unknown_locality() {
    let mut region = small_region();
    region
        .variants
        .insert("gachi".to_string(), "Gachibowli".to_string());
    let err = validate_region(&region).unwrap_err();
    assert!(err.to_string().contains("gachi"), "{err}");
}

#[test]
fn validate_rejects_template_without_placeholder() {
    let mut region = small_region();
    region.hashtag_templates.push("realestate".to_string());
    assert!(validate_region(&region).is_err());
}

#[test]
fn normalize_matches_locality_case_insensitively() {
    let region = small_region();
    assert_eq!(
        region.normalize_location("  hitech   CITY "),
        Some("Hitech City".to_string())
    );
}

#[test]
fn normalize_resolves_variants() {
    let region = small_region();
    assert_eq!(
        region.normalize_location("Hitec"),
        Some("Hitech City".to_string())
    );
}

#[test]
fn normalize_unknown_is_none() {
    let region = small_region();
    assert_eq!(region.normalize_location("Whitefield"), None);
    assert_eq!(region.normalize_location("   "), None);
}

#[test]
fn canonical_location_title_cases_unknown_queries() {
    let region = small_region();
    assert_eq!(
        region.canonical_location("  whitefield   east ").unwrap(),
        "Whitefield East"
    );
    assert_eq!(region.canonical_location("kondapur").unwrap(), "Kondapur");
}

#[test]
fn canonical_location_rejects_blank() {
    let region = small_region();
    assert_eq!(
        region.canonical_location(" \t "),
        Err(CoreError::EmptyLocation)
    );
}

#[test]
fn extract_location_finds_locality_on_word_boundaries() {
    let region = small_region();
    assert_eq!(
        region.extract_location("New 3BHK launch near Kondapur, ready by March"),
        Some("Kondapur".to_string())
    );
    assert_eq!(region.extract_location("Kondapurs are nice"), None);
}

#[test]
fn extract_location_falls_back_to_variants() {
    let region = small_region();
    assert_eq!(
        region.extract_location("Offices in hitec are filling up"),
        Some("Hitech City".to_string())
    );
}

#[test]
fn hyphenated_variant_matches_in_text() {
    let region = RegionProfile::default();
    assert_eq!(
        region.extract_location("Rents near Hi-Tech City keep climbing"),
        Some("Hitech City".to_string())
    );
}

#[test]
fn region_related_uses_indicators() {
    let region = small_region();
    assert!(region.is_region_related("Prices in TESTVILLE are up"));
    assert!(!region.is_region_related("Prices elsewhere are up"));
}

#[test]
fn on_topic_checks_keywords() {
    let region = small_region();
    assert!(region.is_on_topic("Looking for an Apartment"));
    assert!(!region.is_on_topic("Great biryani place"));
}

#[test]
fn hashtags_are_compacted_and_deduplicated() {
    let region = small_region();
    assert_eq!(
        region.hashtags_for("Hitech City"),
        vec!["hitechcityrealestate".to_string(), "hitechcityhomes".to_string()]
    );
    assert!(region.hashtags_for("--").is_empty());
}
