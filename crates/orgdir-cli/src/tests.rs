use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["orgdir", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["orgdir", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_command() {
    let cli = Cli::try_parse_from(["orgdir", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["orgdir"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn activities_add_defaults_to_root() {
    let cli = Cli::try_parse_from(["orgdir", "activities", "add", "Еда"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Activities {
            command: ActivityCommands::Add {
                ref name,
                parent: None
            }
        }) if name == "Еда"
    ));
}

#[test]
fn activities_add_with_parent() {
    let cli =
        Cli::try_parse_from(["orgdir", "activities", "add", "Сыры", "--parent", "4"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Activities {
            command: ActivityCommands::Add {
                parent: Some(4),
                ..
            }
        })
    ));
}

#[test]
fn activities_move_requires_parent_or_root() {
    let result = Cli::try_parse_from(["orgdir", "activities", "move", "3"]);
    assert!(result.is_err(), "expected missing destination to fail");
}

#[test]
fn activities_move_to_root() {
    let cli = Cli::try_parse_from(["orgdir", "activities", "move", "3", "--root"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Activities {
            command: ActivityCommands::Move {
                id: 3,
                parent: None,
                root: true
            }
        })
    ));
}

#[test]
fn activities_move_rejects_parent_and_root_together() {
    let result = Cli::try_parse_from([
        "orgdir", "activities", "move", "3", "--parent", "1", "--root",
    ]);
    assert!(result.is_err(), "expected conflicting flags to fail");
}

#[test]
fn activities_subtree_include_self_flag() {
    let cli =
        Cli::try_parse_from(["orgdir", "activities", "subtree", "1", "--include-self"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Activities {
            command: ActivityCommands::Subtree {
                id: 1,
                include_self: true
            }
        })
    ));
}

#[test]
fn buildings_add_accepts_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "orgdir",
        "buildings",
        "add",
        "1 Main St",
        "--lat",
        "-33.8688",
        "--lon",
        "-151.2093",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Buildings {
            command: BuildingCommands::Add { lat, lon, .. }
        }) if lat < 0.0 && lon < 0.0
    ));
}

#[test]
fn orgs_add_collects_repeated_flags() {
    let cli = Cli::try_parse_from([
        "orgdir",
        "orgs",
        "add",
        "Рога и Копыта",
        "--building",
        "2",
        "--phone",
        "2-222-222",
        "--phone",
        "3-333-333",
        "--activity",
        "3",
        "--activity",
        "4",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::Add {
                building: 2,
                ref phones,
                ref activities,
                ..
            }
        }) if phones.len() == 2 && activities == &[3, 4]
    ));
}

#[test]
fn orgs_by_activity_descendants_flag() {
    let cli = Cli::try_parse_from([
        "orgdir",
        "orgs",
        "by-activity",
        "1",
        "--include-descendants",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::ByActivity {
                activity_id: 1,
                include_descendants: true
            }
        })
    ));
}

#[test]
fn orgs_search_limit_is_optional() {
    let cli = Cli::try_parse_from(["orgdir", "orgs", "search", "молоч"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::Search { limit: None, .. }
        })
    ));

    let cli = Cli::try_parse_from(["orgdir", "orgs", "search", "молоч", "--limit", "5"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::Search { limit: Some(5), .. }
        })
    ));
}

#[test]
fn orgs_near_requires_radius() {
    let result = Cli::try_parse_from([
        "orgdir", "orgs", "near", "--lat", "55.75", "--lon", "37.61",
    ]);
    assert!(result.is_err(), "expected missing --radius to fail");
}

#[test]
fn orgs_bbox_parses_all_bounds() {
    let cli = Cli::try_parse_from([
        "orgdir",
        "orgs",
        "bbox",
        "--min-lat",
        "55.0",
        "--max-lat",
        "56.5",
        "--min-lon",
        "-10",
        "--max-lon",
        "50",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::Bbox {
                min_lon,
                limit: None,
                ..
            }
        }) if (min_lon + 10.0).abs() < f64::EPSILON
    ));
}

#[test]
fn orgs_tag_parses_ids() {
    let cli = Cli::try_parse_from(["orgdir", "orgs", "tag", "7", "1"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::Tag {
                id: 7,
                activity_id: 1
            }
        })
    ));
}

#[test]
fn orgs_near_passes_negative_radius_through() {
    let cli = Cli::try_parse_from([
        "orgdir", "orgs", "near", "--lat", "55", "--lon", "37", "--radius", "-5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orgs {
            command: OrgCommands::Near { radius, .. }
        }) if radius < 0.0
    ));
}

#[test]
fn buildings_near_passes_negative_radius_through() {
    let cli = Cli::try_parse_from([
        "orgdir",
        "buildings",
        "near",
        "--lat",
        "-33.8",
        "--lon",
        "151.2",
        "--radius",
        "-5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Buildings {
            command: BuildingCommands::Near { radius, lat, .. }
        }) if radius < 0.0 && lat < 0.0
    ));
}
