use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::season::{day_from_fixture_key, parse_day};
use crate::tables::{
    FixtureStat, InputTables, MATCH_CENTRIC_COLUMNS, MatchFeatureRow, OddsTable, Outcome,
    PlayerRecord, RosterEntry, ScheduleEntry, TEAM_CENTRIC_COLUMNS, TeamFeatureRow,
    ValuationRecord,
};

pub const STATS_FILE: &str = "fbref_match_stats.csv";
pub const SCHEDULE_FILE: &str = "fbref_schedule.csv";
pub const ROSTER_FILE: &str = "fbref_lineups.csv";
pub const PLAYERS_FILE: &str = "players.csv";
pub const VALUATIONS_FILE: &str = "player_valuations.csv";
pub const ODDS_FILE: &str = "odds_history.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub stats: PathBuf,
    pub schedule: PathBuf,
    pub roster: PathBuf,
    pub players: PathBuf,
    pub valuations: PathBuf,
    pub odds: Option<PathBuf>,
}

impl InputPaths {
    /// Default file names under one data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            stats: dir.join(STATS_FILE),
            schedule: dir.join(SCHEDULE_FILE),
            roster: dir.join(ROSTER_FILE),
            players: dir.join(PLAYERS_FILE),
            valuations: dir.join(VALUATIONS_FILE),
            odds: Some(dir.join(ODDS_FILE)),
        }
    }
}

/// Rows read and rows skipped as malformed, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCount {
    pub read: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub stats: TableCount,
    pub schedule: TableCount,
    pub roster: TableCount,
    pub players: TableCount,
    pub valuations: TableCount,
    pub odds: TableCount,
}

pub fn load_inputs(paths: &InputPaths) -> Result<(InputTables, LoadReport), PipelineError> {
    let mut report = LoadReport::default();
    let (stats, count) = read_stats(open("fixture stats", &paths.stats)?)?;
    report.stats = count;
    let (schedule, count) = read_schedule(open("schedule", &paths.schedule)?)?;
    report.schedule = count;
    let (roster, count) = read_roster(open("roster", &paths.roster)?)?;
    report.roster = count;
    let (players, count) = read_players(open("player registry", &paths.players)?)?;
    report.players = count;
    let (valuations, count) = read_valuations(open("valuations", &paths.valuations)?)?;
    report.valuations = count;
    let odds = match &paths.odds {
        Some(path) => {
            let (table, count) = read_odds(open("odds", path)?)?;
            report.odds = count;
            Some(table)
        }
        None => None,
    };

    info!(
        "loaded stats={} schedule={} roster={} players={} valuations={} odds={}",
        report.stats.read,
        report.schedule.read,
        report.roster.read,
        report.players.read,
        report.valuations.read,
        report.odds.read
    );
    Ok((
        InputTables {
            stats,
            schedule,
            roster,
            players,
            valuations,
            odds,
        },
        report,
    ))
}

fn open(table: &'static str, path: &Path) -> Result<File, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput {
            table,
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn require_columns<R: Read>(
    reader: &mut csv::Reader<R>,
    table: &'static str,
    required: &[&str],
) -> Result<(), PipelineError> {
    let headers = reader
        .headers()
        .map_err(|source| PipelineError::Csv { table, source })?;
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(PipelineError::missing_column(table, column));
        }
    }
    Ok(())
}

fn csv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr)
}

#[derive(Debug, Deserialize)]
struct RawStat {
    game: String,
    team: String,
    #[serde(default)]
    opponent: String,
    result: String,
    #[serde(rename = "xG")]
    xg: Option<f64>,
    #[serde(rename = "xGA", default)]
    xga: Option<f64>,
    #[serde(default)]
    date: Option<String>,
}

/// Fixture/stats table. The date column is optional; fixture keys carry an ISO date prefix.
pub fn read_stats<R: Read>(rdr: R) -> Result<(Vec<FixtureStat>, TableCount), PipelineError> {
    const TABLE: &str = "fixture stats";
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TABLE, &["game", "team", "result", "xG"])?;
    let mut out = Vec::new();
    let mut count = TableCount::default();
    for result in reader.deserialize::<RawStat>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed stats row: {}", e);
                count.skipped += 1;
                continue;
            }
        };
        let date = raw
            .date
            .as_deref()
            .and_then(parse_day)
            .or_else(|| day_from_fixture_key(&raw.game));
        let (Some(date), Some(outcome)) = (date, Outcome::parse(&raw.result)) else {
            warn!("skipping stats row for '{}' in '{}': bad date or result", raw.team, raw.game);
            count.skipped += 1;
            continue;
        };
        if raw.game.is_empty() || raw.team.is_empty() {
            count.skipped += 1;
            continue;
        }
        out.push(FixtureStat {
            game: raw.game,
            date,
            team: raw.team,
            opponent: raw.opponent,
            result: outcome,
            xg: raw.xg.filter(|v| v.is_finite()),
            xga: raw.xga.filter(|v| v.is_finite()),
        });
    }
    count.read = out.len();
    Ok((out, count))
}

#[derive(Debug, Deserialize)]
struct RawSchedule {
    game: String,
    home_team: String,
    away_team: String,
}

pub fn read_schedule<R: Read>(rdr: R) -> Result<(Vec<ScheduleEntry>, TableCount), PipelineError> {
    const TABLE: &str = "schedule";
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TABLE, &["game", "home_team", "away_team"])?;
    let mut out = Vec::new();
    let mut count = TableCount::default();
    for result in reader.deserialize::<RawSchedule>() {
        match result {
            Ok(raw) if !raw.game.is_empty() => out.push(ScheduleEntry {
                game: raw.game,
                home_team: raw.home_team,
                away_team: raw.away_team,
            }),
            Ok(_) => count.skipped += 1,
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
                count.skipped += 1;
            }
        }
    }
    count.read = out.len();
    Ok((out, count))
}

#[derive(Debug, Deserialize)]
struct RawLineup {
    game: String,
    team: String,
    player: String,
    is_starter: String,
}

pub fn read_roster<R: Read>(rdr: R) -> Result<(Vec<RosterEntry>, TableCount), PipelineError> {
    const TABLE: &str = "roster";
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TABLE, &["game", "team", "player", "is_starter"])?;
    let mut out = Vec::new();
    let mut count = TableCount::default();
    for result in reader.deserialize::<RawLineup>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed lineup row: {}", e);
                count.skipped += 1;
                continue;
            }
        };
        let Some(is_starter) = parse_flag(&raw.is_starter) else {
            warn!("skipping lineup row for '{}': is_starter '{}'", raw.player, raw.is_starter);
            count.skipped += 1;
            continue;
        };
        out.push(RosterEntry {
            game: raw.game,
            team: raw.team,
            player: raw.player,
            is_starter,
        });
    }
    count.read = out.len();
    Ok((out, count))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "n" | "f" | "" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    player_id: u64,
    name: String,
    last_season: Option<i32>,
}

/// Player registry. Rows without a last-active season are kept with `i32::MIN`, which puts
/// them below any eligibility cutoff.
pub fn read_players<R: Read>(rdr: R) -> Result<(Vec<PlayerRecord>, TableCount), PipelineError> {
    const TABLE: &str = "player registry";
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TABLE, &["player_id", "name", "last_season"])?;
    let mut out = Vec::new();
    let mut count = TableCount::default();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => out.push(PlayerRecord {
                player_id: raw.player_id,
                name: raw.name,
                last_season: raw.last_season.unwrap_or(i32::MIN),
            }),
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                count.skipped += 1;
            }
        }
    }
    count.read = out.len();
    Ok((out, count))
}

#[derive(Debug, Deserialize)]
struct RawValuation {
    player_id: u64,
    date: String,
    market_value_in_eur: Option<f64>,
}

pub fn read_valuations<R: Read>(
    rdr: R,
) -> Result<(Vec<ValuationRecord>, TableCount), PipelineError> {
    const TABLE: &str = "valuations";
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TABLE, &["player_id", "date", "market_value_in_eur"])?;
    let mut out = Vec::new();
    let mut count = TableCount::default();
    for result in reader.deserialize::<RawValuation>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed valuation row: {}", e);
                count.skipped += 1;
                continue;
            }
        };
        match (parse_day(&raw.date), raw.market_value_in_eur) {
            (Some(date), Some(value)) if value.is_finite() => out.push(ValuationRecord {
                player_id: raw.player_id,
                date,
                value,
            }),
            _ => count.skipped += 1,
        }
    }
    count.read = out.len();
    if count.skipped > 0 {
        warn!("skipped {} valuation rows without a date or value", count.skipped);
    }
    Ok((out, count))
}

/// Odds stay untyped here; the odds stage picks its price columns from the headers.
pub fn read_odds<R: Read>(rdr: R) -> Result<(OddsTable, TableCount), PipelineError> {
    const TABLE: &str = "odds";
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);
    require_columns(&mut reader, TABLE, &["date", "home_team", "away_team"])?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| PipelineError::Csv { table: TABLE, source })?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    let mut count = TableCount::default();
    for record in reader.records() {
        match record {
            Ok(rec) => rows.push(rec.iter().map(str::to_string).collect()),
            Err(e) => {
                warn!("skipping malformed odds row: {}", e);
                count.skipped += 1;
            }
        }
    }
    count.read = rows.len();
    Ok((OddsTable { headers, rows }, count))
}

#[derive(Debug, Serialize)]
struct TeamRecord<'a> {
    date: String,
    game: &'a str,
    matchweek: u32,
    is_home: Option<u8>,
    team: &'a str,
    opponent: &'a str,
    result: &'static str,
    #[serde(rename = "Starting_XI_Value")]
    xi_value: Option<f64>,
    #[serde(rename = "Opponent_Value")]
    opponent_value: Option<f64>,
    #[serde(rename = "Value_Ratio_vs_Opponent")]
    value_ratio: Option<f64>,
    #[serde(rename = "Lineup_Strength_Ratio")]
    lineup_ratio: Option<f64>,
    #[serde(rename = "Opponent_Lineup_Ratio")]
    opponent_lineup_ratio: Option<f64>,
    #[serde(rename = "xG_Relative_Form")]
    attack_form: f64,
    #[serde(rename = "Defense_Form_Relative")]
    defense_form: f64,
    #[serde(rename = "Opponent_Attack_Form")]
    opponent_attack_form: f64,
    #[serde(rename = "Opponent_Defense_Form")]
    opponent_defense_form: f64,
    #[serde(rename = "Odds_Win")]
    odds_win: Option<f64>,
    #[serde(rename = "Odds_Draw")]
    odds_draw: Option<f64>,
    #[serde(rename = "Odds_Lose")]
    odds_lose: Option<f64>,
}

impl<'a> From<&'a TeamFeatureRow> for TeamRecord<'a> {
    fn from(row: &'a TeamFeatureRow) -> Self {
        Self {
            date: row.date.format("%Y-%m-%d").to_string(),
            game: &row.game,
            matchweek: row.matchweek,
            is_home: row.is_home.map(u8::from),
            team: &row.team,
            opponent: &row.opponent,
            result: row.result.as_str(),
            xi_value: row.own.xi_value,
            opponent_value: row.opp.xi_value,
            value_ratio: row.value_ratio_vs_opponent,
            lineup_ratio: row.own.lineup_ratio,
            opponent_lineup_ratio: row.opp.lineup_ratio,
            attack_form: row.own.attack_form,
            defense_form: row.own.defense_form,
            opponent_attack_form: row.opp.attack_form,
            opponent_defense_form: row.opp.defense_form,
            odds_win: row.odds.map(|o| o.win),
            odds_draw: row.odds.map(|o| o.draw),
            odds_lose: row.odds.map(|o| o.lose),
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord<'a> {
    date: String,
    game: &'a str,
    matchweek: u32,
    #[serde(rename = "Home_Team")]
    home_team: &'a str,
    #[serde(rename = "Away_Team")]
    away_team: &'a str,
    #[serde(rename = "Target")]
    target: u8,
    #[serde(rename = "Odds_1")]
    odds_1: Option<f64>,
    #[serde(rename = "Odds_X")]
    odds_x: Option<f64>,
    #[serde(rename = "Odds_2")]
    odds_2: Option<f64>,
    #[serde(rename = "Value_Ratio_vs_Opponent")]
    value_ratio: Option<f64>,
    #[serde(rename = "Home_Value")]
    home_value: Option<f64>,
    #[serde(rename = "Away_Value")]
    away_value: Option<f64>,
    #[serde(rename = "Home_Lineup_Ratio")]
    home_lineup_ratio: Option<f64>,
    #[serde(rename = "Away_Lineup_Ratio")]
    away_lineup_ratio: Option<f64>,
    #[serde(rename = "Home_Attack_Form")]
    home_attack_form: f64,
    #[serde(rename = "Home_Defense_Form")]
    home_defense_form: f64,
    #[serde(rename = "Away_Attack_Form")]
    away_attack_form: f64,
    #[serde(rename = "Away_Defense_Form")]
    away_defense_form: f64,
}

impl<'a> From<&'a MatchFeatureRow> for MatchRecord<'a> {
    fn from(row: &'a MatchFeatureRow) -> Self {
        Self {
            date: row.date.format("%Y-%m-%d").to_string(),
            game: &row.game,
            matchweek: row.matchweek,
            home_team: &row.home_team,
            away_team: &row.away_team,
            target: row.target.as_index(),
            odds_1: row.odds_1,
            odds_x: row.odds_x,
            odds_2: row.odds_2,
            value_ratio: row.value_ratio_vs_opponent,
            home_value: row.home.xi_value,
            away_value: row.away.xi_value,
            home_lineup_ratio: row.home.lineup_ratio,
            away_lineup_ratio: row.away.lineup_ratio,
            home_attack_form: row.home.attack_form,
            home_defense_form: row.home.defense_form,
            away_attack_form: row.away.attack_form,
            away_defense_form: row.away.defense_form,
        }
    }
}

/// The header is written even when there are no rows.
pub fn write_team_rows<W: Write>(w: W, rows: &[TeamFeatureRow]) -> Result<(), PipelineError> {
    const TABLE: &str = "team-centric output";
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    writer
        .write_record(TEAM_CENTRIC_COLUMNS)
        .map_err(|source| PipelineError::Csv { table: TABLE, source })?;
    for row in rows {
        writer
            .serialize(TeamRecord::from(row))
            .map_err(|source| PipelineError::Csv { table: TABLE, source })?;
    }
    writer.flush().map_err(|e| PipelineError::Csv {
        table: TABLE,
        source: e.into(),
    })
}

pub fn write_match_rows<W: Write>(w: W, rows: &[MatchFeatureRow]) -> Result<(), PipelineError> {
    const TABLE: &str = "match-centric output";
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    writer
        .write_record(MATCH_CENTRIC_COLUMNS)
        .map_err(|source| PipelineError::Csv { table: TABLE, source })?;
    for row in rows {
        writer
            .serialize(MatchRecord::from(row))
            .map_err(|source| PipelineError::Csv { table: TABLE, source })?;
    }
    writer.flush().map_err(|e| PipelineError::Csv {
        table: TABLE,
        source: e.into(),
    })
}

pub fn create_output(path: &Path) -> Result<File, PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    File::create(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
