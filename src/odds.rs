use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::name_resolver::{SimilarityScorer, TeamResolver};
use crate::season::parse_day;
use crate::tables::{OddsTable, TeamFeatureRow, TeamOdds};

const TABLE: &str = "odds";
const UNMATCHED_SAMPLE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OddsColumns {
    pub source: String,
    pub home: String,
    pub draw: String,
    pub away: String,
}

/// Picks the first prefix in `priority` with complete `H/D/A` columns, else the first
/// generic `*H` column (Asian handicap `AH` columns excluded) with `D` and `A` siblings.
pub fn select_columns(table: &OddsTable, priority: &[String]) -> Result<OddsColumns, PipelineError> {
    let has = |name: &str| table.column(name).is_some();
    let complete = |prefix: &str| {
        let cols = [
            format!("{prefix}H"),
            format!("{prefix}D"),
            format!("{prefix}A"),
        ];
        cols.iter().all(|c| has(c.as_str())).then(|| OddsColumns {
            source: prefix.to_string(),
            home: cols[0].clone(),
            draw: cols[1].clone(),
            away: cols[2].clone(),
        })
    };

    for prefix in priority {
        if let Some(cols) = complete(prefix.as_str()) {
            return Ok(cols);
        }
    }
    for header in &table.headers {
        let header = header.trim();
        let Some(prefix) = header.strip_suffix('H') else {
            continue;
        };
        if prefix.is_empty() || header.contains("AH") {
            continue;
        }
        if let Some(cols) = complete(prefix) {
            return Ok(cols);
        }
    }
    Err(PipelineError::SchemaMismatch {
        table: TABLE,
        detail: format!(
            "no complete home/draw/away price columns (tried {} then generic *H)",
            priority.join(", ")
        ),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamOddsRow {
    pub date: NaiveDate,
    pub team_key: String,
    pub odds: TeamOdds,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsReport {
    pub source: String,
    pub table_rows: usize,
    pub malformed_rows: usize,
    pub team_rows: usize,
    pub duplicate_keys: usize,
    pub unresolved_names: Vec<String>,
    pub rows_matched: usize,
    pub rows_unmatched: usize,
    /// Fixtures where neither side found prices.
    pub fixtures_without_odds: usize,
    pub unmatched_teams: Vec<String>,
    pub fixtures_dropped: usize,
}

/// Two team rows per well-formed odds row. The first row for a `(day, team)` key wins.
pub fn to_team_centric<S: SimilarityScorer>(
    table: &OddsTable,
    cols: &OddsColumns,
    teams: &TeamResolver<S>,
) -> Result<(Vec<TeamOddsRow>, OddsReport), PipelineError> {
    let column = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| PipelineError::missing_column(TABLE, name))
    };
    let date_col = column("date")?;
    let home_col = column("home_team")?;
    let away_col = column("away_team")?;
    let h_col = column(cols.home.as_str())?;
    let d_col = column(cols.draw.as_str())?;
    let a_col = column(cols.away.as_str())?;

    let names = table
        .rows
        .iter()
        .flat_map(|r| [cell(r, home_col), cell(r, away_col)])
        .filter(|n| !n.is_empty());
    let mapping = teams.build_mapping(names);

    let mut report = OddsReport {
        source: cols.source.clone(),
        table_rows: table.rows.len(),
        ..Default::default()
    };
    let mut unresolved = BTreeSet::new();
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(table.rows.len() * 2);

    for row in &table.rows {
        let date = parse_day(cell(row, date_col));
        let prices = (
            parse_price(cell(row, h_col)),
            parse_price(cell(row, d_col)),
            parse_price(cell(row, a_col)),
        );
        let (Some(date), (Some(win), Some(draw), Some(lose))) = (date, prices) else {
            report.malformed_rows += 1;
            continue;
        };
        let home_odds = TeamOdds { win, draw, lose };
        for (name, odds) in [
            (cell(row, home_col), home_odds),
            (cell(row, away_col), home_odds.inverse()),
        ] {
            let Some(key) = mapping.canonical(name) else {
                if !name.is_empty() {
                    unresolved.insert(name.to_string());
                }
                continue;
            };
            if !seen.insert((date, key.to_string())) {
                report.duplicate_keys += 1;
                continue;
            }
            out.push(TeamOddsRow {
                date,
                team_key: key.to_string(),
                odds,
            });
        }
    }

    report.team_rows = out.len();
    report.unresolved_names = unresolved.into_iter().collect();
    if report.malformed_rows > 0 {
        warn!("skipped {} malformed odds rows", report.malformed_rows);
    }
    if !report.unresolved_names.is_empty() {
        warn!(
            "{} odds team names did not resolve: {:?}",
            report.unresolved_names.len(),
            report.unresolved_names
        );
    }
    Ok((out, report))
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|p| p.is_finite() && *p > 0.0)
}

/// Joins prices onto fixture rows on `(day, canonical team)`. Missing prices stay `None`.
pub fn attach_odds<S: SimilarityScorer>(
    rows: Vec<TeamFeatureRow>,
    odds: &[TeamOddsRow],
    teams: &TeamResolver<S>,
    mut report: OddsReport,
) -> (Vec<TeamFeatureRow>, OddsReport) {
    let index: HashMap<(NaiveDate, &str), TeamOdds> = odds
        .iter()
        .map(|o| ((o.date, o.team_key.as_str()), o.odds))
        .collect();
    let mapping = teams.build_mapping(rows.iter().map(|r| r.team.as_str()));

    let mut unmatched = BTreeSet::new();
    let mut priced_games = HashSet::new();
    let mut games = HashSet::new();
    let rows: Vec<TeamFeatureRow> = rows
        .into_iter()
        .map(|mut row| {
            row.odds = mapping
                .canonical(&row.team)
                .and_then(|key| index.get(&(row.date, key)).copied());
            games.insert(row.game.clone());
            if row.odds.is_some() {
                report.rows_matched += 1;
                priced_games.insert(row.game.clone());
            } else {
                report.rows_unmatched += 1;
                unmatched.insert(row.team.clone());
            }
            row
        })
        .collect();

    report.fixtures_without_odds = games.len() - priced_games.len();
    report.unmatched_teams = unmatched.into_iter().take(UNMATCHED_SAMPLE).collect();
    info!(
        "odds attached: source={} matched={} unmatched={} fixtures_without_odds={}",
        if report.source.is_empty() { "none" } else { report.source.as_str() },
        report.rows_matched,
        report.rows_unmatched,
        report.fixtures_without_odds
    );
    if !report.unmatched_teams.is_empty() && !report.source.is_empty() {
        warn!("teams without prices (sample): {:?}", report.unmatched_teams);
    }
    (rows, report)
}

/// Drops every fixture where some side has no prices. Returns the dropped fixture count.
pub fn drop_fixtures_without_odds(rows: Vec<TeamFeatureRow>) -> (Vec<TeamFeatureRow>, usize) {
    let missing: HashSet<String> = rows
        .iter()
        .filter(|r| r.odds.is_none())
        .map(|r| r.game.clone())
        .collect();
    let kept = rows
        .into_iter()
        .filter(|r| !missing.contains(&r.game))
        .collect();
    (kept, missing.len())
}
