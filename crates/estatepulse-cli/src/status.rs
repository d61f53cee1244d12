//! Offline commands: credential status and the region catalog.

use estatepulse_core::{configuration_guide, Readiness, RegionProfile, SourceCredentials, SourceKind};

pub(crate) fn run_status(credentials: &SourceCredentials) {
    println!("{:<24}{:<10}DETAIL", "SOURCE", "STATE");
    for kind in SourceKind::ALL {
        let readiness = credentials.readiness(kind);
        println!(
            "{:<24}{:<10}{}",
            kind.display_name(),
            state_label(&readiness),
            readiness.hint().unwrap_or_default()
        );
    }

    let missing = credentials.missing_configuration();
    if missing.is_empty() {
        println!("\nall sources configured");
        return;
    }

    if !credentials.is_fully_configured() {
        println!(
            "\nClaude and at least one social source are needed for full coverage; \
             classification falls back to the keyword lexicon without Claude."
        );
    }

    for (kind, _) in missing {
        let guide = configuration_guide(kind);
        println!("\n{}: {}", kind.display_name(), guide.description);
        for (i, step) in guide.steps.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    }
}

fn state_label(readiness: &Readiness) -> &'static str {
    match readiness {
        Readiness::Ready => "ready",
        Readiness::Missing { .. } => "missing",
        Readiness::Invalid { .. } => "invalid",
    }
}

pub(crate) fn run_localities(region: &RegionProfile) {
    println!("{} ({} localities)", region.name, region.localities.len());
    for locality in &region.localities {
        println!("  {locality}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_labels() {
        assert_eq!(state_label(&Readiness::Ready), "ready");
        assert_eq!(
            state_label(&Readiness::Missing {
                vars: vec!["CLAUDE_API_KEY"]
            }),
            "missing"
        );
        assert_eq!(
            state_label(&Readiness::Invalid {
                reason: "too short".to_string()
            }),
            "invalid"
        );
    }
}
