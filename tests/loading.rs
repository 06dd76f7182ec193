use std::fs;
use std::path::PathBuf;

use fixture_features::config::PipelineConfig;
use fixture_features::error::PipelineError;
use fixture_features::load::{self, InputPaths};
use fixture_features::pipeline::Assembler;
use fixture_features::tables::{MATCH_CENTRIC_COLUMNS, TEAM_CENTRIC_COLUMNS};

fn fixture_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("serie_a");
    path
}

#[test]
fn loads_every_fixture_table() {
    let (tables, report) = load::load_inputs(&InputPaths::in_dir(&fixture_dir())).unwrap();
    assert_eq!(tables.stats.len(), 12);
    assert_eq!(tables.schedule.len(), 6);
    assert_eq!(tables.roster.len(), 26);
    assert_eq!(tables.roster.iter().filter(|r| r.is_starter).count(), 25);
    assert_eq!(tables.players.len(), 10);
    assert_eq!(tables.valuations.len(), 11);
    let odds = tables.odds.unwrap();
    assert_eq!(odds.rows.len(), 5);
    assert!(odds.column("AvgH").is_some());
    assert_eq!(report.stats.skipped, 0);
    assert_eq!(report.roster.skipped, 0);
}

#[test]
fn missing_file_is_reported_by_table() {
    let mut paths = InputPaths::in_dir(&fixture_dir());
    paths.schedule = fixture_dir().join("no_such_schedule.csv");
    let err = load::load_inputs(&paths).unwrap_err();
    match err {
        PipelineError::MissingInput { table, .. } => assert_eq!(table, "schedule"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn odds_table_needs_fixture_columns() {
    let data = "Date,HomeTeam,AwayTeam,B365H,B365D,B365A\n19/08/2023,Inter,Milan,1.9,3.6,4.2\n";
    let err = load::read_odds(data.as_bytes()).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { table: "odds", .. }));
}

#[test]
fn team_centric_output_has_fixed_columns() {
    let (tables, _) = load::load_inputs(&InputPaths::in_dir(&fixture_dir())).unwrap();
    let assembly = Assembler::new(PipelineConfig::default())
        .assemble(&tables)
        .unwrap();

    let mut buf = Vec::new();
    load::write_team_rows(&mut buf, &assembly.team_rows).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), TEAM_CENTRIC_COLUMNS.join(","));
    let first: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(first.len(), TEAM_CENTRIC_COLUMNS.len());
    assert_eq!(&first[..7], &["2023-08-19", "2023-08-19 Inter-Milan", "1", "1", "Inter", "Milan", "W"]);
    assert_eq!(lines.count(), 11);
}

#[test]
fn writes_into_a_new_directory() {
    let dir = std::env::temp_dir().join(format!("fixture_features_out_{}", std::process::id()));
    let path = dir.join("nested").join("features.csv");
    let file = load::create_output(&path).unwrap();
    load::write_match_rows(file, &[]).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().next(), Some(MATCH_CENTRIC_COLUMNS.join(",").as_str()));
    fs::remove_dir_all(&dir).unwrap();
}
