use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["estatepulse", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["estatepulse", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["estatepulse"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn collect_defaults_to_all_sources() {
    let cli = Cli::try_parse_from(["estatepulse", "collect", "--location", "Kokapet"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            ref location,
            ref sources,
            limit: None,
            dry_run: false,
        }) if location == "Kokapet" && sources.is_empty()
    ));
}

#[test]
fn collect_accepts_repeated_sources_and_limit() {
    let cli = Cli::try_parse_from([
        "estatepulse",
        "collect",
        "--location",
        "Gachibowli",
        "--source",
        "reddit",
        "--source",
        "news",
        "--limit",
        "25",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            ref sources,
            limit: Some(25),
            dry_run: true,
            ..
        }) if sources == &[SourceKind::Reddit, SourceKind::News]
    ));
}

#[test]
fn collect_rejects_unknown_source() {
    let result = Cli::try_parse_from([
        "estatepulse",
        "collect",
        "--location",
        "Kokapet",
        "--source",
        "myspace",
    ]);
    assert!(result.is_err());
}

#[test]
fn collect_requires_location() {
    assert!(Cli::try_parse_from(["estatepulse", "collect"]).is_err());
}

#[test]
fn history_defaults_to_thirty_days() {
    let cli = Cli::try_parse_from(["estatepulse", "history", "--location", "Miyapur"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::History { days: 30, ref location }) if location == "Miyapur"
    ));
}

#[test]
fn mentions_parses_filters() {
    let cli = Cli::try_parse_from([
        "estatepulse",
        "mentions",
        "--location",
        "Kondapur",
        "--source",
        "x",
        "--sentiment",
        "Negative",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Mentions {
            source: Some(SourceKind::Twitter),
            sentiment: Some(SentimentLabel::Negative),
            limit: 20,
            ..
        })
    ));
}

#[test]
fn parses_report_status_and_localities() {
    let report = Cli::try_parse_from(["estatepulse", "report", "--location", "Kokapet"]).unwrap();
    assert!(matches!(report.command, Some(Commands::Report { .. })));

    let status = Cli::try_parse_from(["estatepulse", "status"]).unwrap();
    assert!(matches!(status.command, Some(Commands::Status)));

    let localities = Cli::try_parse_from(["estatepulse", "localities"]).unwrap();
    assert!(matches!(localities.command, Some(Commands::Localities)));
}
