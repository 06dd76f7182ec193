use std::path::PathBuf;

use chrono::NaiveDate;

use fixture_features::config::PipelineConfig;
use fixture_features::duality::{split_match_rows, to_match_centric, value_ratio};
use fixture_features::load::{InputPaths, load_inputs};
use fixture_features::pipeline::{Assembler, Assembly};
use fixture_features::tables::{InputTables, MatchFeatureRow, Target, ValuationRecord};

fn fixture_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("serie_a");
    path
}

fn inputs() -> InputTables {
    let (tables, _) = load_inputs(&InputPaths::in_dir(&fixture_dir())).expect("fixture tables load");
    tables
}

fn assemble(inputs: &InputTables) -> Assembly {
    assemble_with(inputs, PipelineConfig::default())
}

fn assemble_with(inputs: &InputTables, cfg: PipelineConfig) -> Assembly {
    Assembler::new(cfg).assemble(inputs).expect("assembly succeeds")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn match_row<'a>(assembly: &'a Assembly, game: &str) -> &'a MatchFeatureRow {
    assembly
        .match_rows
        .iter()
        .find(|m| m.game == game)
        .expect("fixture present")
}

fn rows_before(rows: &[MatchFeatureRow], cutoff: NaiveDate) -> Vec<MatchFeatureRow> {
    rows.iter().filter(|m| m.date < cutoff).cloned().collect()
}

#[test]
fn assembles_one_row_per_fixture_from_the_home_side() {
    let assembly = assemble(&inputs());
    assert_eq!(assembly.team_rows.len(), 12);
    assert_eq!(assembly.match_rows.len(), 6);

    let games: Vec<&str> = assembly.match_rows.iter().map(|m| m.game.as_str()).collect();
    assert_eq!(
        games,
        vec![
            "2023-08-19 Inter-Milan",
            "2023-08-19 Roma-Lazio",
            "2023-08-26 Lazio-Inter",
            "2023-08-26 Milan-Roma",
            "2023-09-02 Inter-Roma",
            "2023-09-02 Milan-Lazio",
        ]
    );

    // Schedule says "Internazionale"; the stats say "Inter".
    let opener = match_row(&assembly, "2023-08-19 Inter-Milan");
    assert_eq!(opener.home_team, "Inter");
    assert_eq!(opener.away_team, "Milan");
    assert_eq!(opener.target, Target::HomeWin);
    assert_eq!(opener.matchweek, 1);

    let away_win = match_row(&assembly, "2023-08-26 Lazio-Inter");
    assert_eq!(away_win.home_team, "Lazio");
    assert_eq!(away_win.target, Target::AwayWin);
    assert_eq!(away_win.target.as_index(), 2);
    assert_eq!(away_win.matchweek, 2);

    assert_eq!(assembly.report.home.without_schedule, 0);
    assert_eq!(assembly.report.fold.without_home_row, 0);
}

#[test]
fn first_round_has_neutral_form_and_no_strength_ratio() {
    let assembly = assemble(&inputs());
    for m in assembly.match_rows.iter().filter(|m| m.date == day(2023, 8, 19)) {
        assert_eq!(m.home.attack_form, 0.0);
        assert_eq!(m.away.defense_form, 0.0);
        // Undefined, not zero.
        assert_eq!(m.home.lineup_ratio, None);
        assert_eq!(m.away.lineup_ratio, None);
        assert!(m.home.xi_value.is_some());
    }
    assert!(assembly.report.form.attack.without_history >= 4);
}

#[test]
fn lineup_values_use_valuations_as_of_the_fixture() {
    let assembly = assemble(&inputs());

    let opener = match_row(&assembly, "2023-08-19 Inter-Milan");
    assert_eq!(opener.home.xi_value, Some(155_000_000.0));
    assert_eq!(opener.away.xi_value, Some(125_000_000.0));
    let ratio = opener.value_ratio_vs_opponent.unwrap();
    assert!((ratio - 155_000_000.0 / 125_000_001.0).abs() < 1e-12);

    // Lautaro was revalued on 2023-08-30, between rounds two and three.
    let second = match_row(&assembly, "2023-08-26 Lazio-Inter");
    assert_eq!(second.away.xi_value, Some(155_000_000.0));
    let third = match_row(&assembly, "2023-09-02 Inter-Roma");
    assert_eq!(third.home.xi_value, Some(180_000_000.0));
    let lineup = third.home.lineup_ratio.unwrap();
    assert!((lineup - 180.0 / 155.0).abs() < 1e-12);
}

#[test]
fn unresolved_starters_add_nothing() {
    let assembly = assemble(&inputs());
    let roster = &assembly.report.roster;
    assert_eq!(roster.unresolved_names, 1);
    assert_eq!(roster.fuzzy_names, 2);
    assert_eq!(roster.unresolved_starter_rows, 1);

    let last = match_row(&assembly, "2023-09-02 Milan-Lazio");
    assert_eq!(last.away.xi_value, Some(30_000_000.0));
    assert_eq!(last.away.lineup_ratio, Some(1.0));
}

#[test]
fn team_rows_mirror_their_partner() {
    let assembly = assemble(&inputs());
    let rows = &assembly.team_rows;
    for row in rows {
        let partner = rows
            .iter()
            .find(|p| p.game == row.game && p.team != row.team)
            .expect("every fixture has two sides");
        assert_eq!(row.opp, partner.own);
        assert_eq!(row.opponent, partner.team);
        assert_eq!(row.is_home.map(|h| !h), partner.is_home);
        assert_eq!(
            row.value_ratio_vs_opponent,
            value_ratio(row.own.xi_value, partner.own.xi_value)
        );
        if let (Some(own), Some(theirs)) = (row.odds, partner.odds) {
            assert_eq!(own.inverse(), theirs);
        }
    }

    let milan = rows
        .iter()
        .find(|r| r.game == "2023-08-19 Inter-Milan" && r.team == "Milan")
        .unwrap();
    let odds = milan.odds.unwrap();
    assert!((odds.win - 4.20).abs() < 1e-9);
    assert!((odds.lose - 1.90).abs() < 1e-9);
}

#[test]
fn odds_follow_priority_and_missing_prices_stay_empty() {
    let assembly = assemble(&inputs());
    assert_eq!(assembly.report.odds.source, "B365");

    let opener = match_row(&assembly, "2023-08-19 Inter-Milan");
    assert_eq!(opener.odds_1, Some(1.90));
    assert_eq!(opener.odds_x, Some(3.60));
    assert_eq!(opener.odds_2, Some(4.20));

    let unpriced = match_row(&assembly, "2023-09-02 Milan-Lazio");
    assert_eq!(unpriced.odds_1, None);
    assert_eq!(assembly.report.odds.fixtures_without_odds, 1);

    let cfg = PipelineConfig {
        drop_missing_odds: true,
        ..PipelineConfig::default()
    };
    let dropped = assemble_with(&inputs(), cfg);
    assert_eq!(dropped.match_rows.len(), 5);
    assert_eq!(dropped.report.odds.fixtures_dropped, 1);
}

#[test]
fn assembles_without_an_odds_table() {
    let mut tables = inputs();
    tables.odds = None;
    let assembly = assemble(&tables);
    assert_eq!(assembly.match_rows.len(), 6);
    assert!(assembly.match_rows.iter().all(|m| m.odds_1.is_none()));
    assert!(assembly.report.odds.source.is_empty());
}

#[test]
fn later_statistics_never_change_earlier_features() {
    let base = inputs();
    let baseline = assemble(&base);

    // Last round's own statistics feed nothing in the table: forms are lagged.
    let mut last_round = base.clone();
    for stat in last_round.stats.iter_mut().filter(|s| s.date == day(2023, 9, 2)) {
        stat.xg = stat.xg.map(|v| v * 3.0);
    }
    assert_eq!(assemble(&last_round).match_rows, baseline.match_rows);

    let mut second_round = base.clone();
    for stat in second_round.stats.iter_mut().filter(|s| s.date == day(2023, 8, 26)) {
        stat.xg = stat.xg.map(|v| v + 1.0);
    }
    let changed = assemble(&second_round);
    let cutoff = day(2023, 8, 26);
    assert_eq!(
        rows_before(&changed.match_rows, cutoff),
        rows_before(&baseline.match_rows, cutoff)
    );
    let before = match_row(&baseline, "2023-09-02 Inter-Roma");
    let after = match_row(&changed, "2023-09-02 Inter-Roma");
    assert_ne!(before.home.attack_form, after.home.attack_form);
}

#[test]
fn later_valuations_never_change_earlier_features() {
    let base = inputs();
    let baseline = assemble(&base);

    let mut revalued = base.clone();
    revalued.valuations.push(ValuationRecord {
        player_id: 3,
        date: day(2023, 9, 1),
        value: 150_000_000.0,
    });
    let changed = assemble(&revalued);

    let cutoff = day(2023, 9, 2);
    assert_eq!(
        rows_before(&changed.match_rows, cutoff),
        rows_before(&baseline.match_rows, cutoff)
    );
    let milan = match_row(&changed, "2023-09-02 Milan-Lazio");
    assert_eq!(milan.home.xi_value, Some(185_000_000.0));
}

#[test]
fn split_and_fold_round_trip() {
    let assembly = assemble(&inputs());
    let split = split_match_rows(&assembly.match_rows);
    assert_eq!(split.len(), assembly.match_rows.len() * 2);
    let (folded, report) = to_match_centric(&split);
    assert_eq!(report.without_home_row, 0);
    assert_eq!(folded, assembly.match_rows);
}
