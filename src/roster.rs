use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::BaselineScope;
use crate::name_resolver::{IdentityMapping, NameResolver, SimilarityScorer};
use crate::numeric::median_f64;
use crate::season::day_from_fixture_key;
use crate::tables::{PlayerRecord, RosterEntry, TeamFeatureRow};
use crate::valuation::ValuationIndex;

#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    vocabulary: Vec<String>,
    ids: HashMap<String, (u64, i32)>,
    ambiguous: usize,
}

impl PlayerDirectory {
    /// Players last active before `min_last_season` are skipped. When a display name is
    /// shared, the most recently active player (then the smallest id) owns it.
    pub fn new(players: &[PlayerRecord], min_last_season: i32) -> Self {
        let mut out = Self::default();
        let mut shared = HashSet::new();
        for p in players {
            if p.last_season < min_last_season {
                continue;
            }
            let name = p.name.trim();
            if name.is_empty() {
                continue;
            }
            match out.ids.get_mut(name) {
                Some(current) => {
                    shared.insert(name.to_string());
                    let better = p.last_season > current.1
                        || (p.last_season == current.1 && p.player_id < current.0);
                    if better {
                        *current = (p.player_id, p.last_season);
                    }
                }
                None => {
                    out.ids
                        .insert(name.to_string(), (p.player_id, p.last_season));
                    out.vocabulary.push(name.to_string());
                }
            }
        }
        out.ambiguous = shared.len();
        out
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn id_of(&self, canonical: &str) -> Option<u64> {
        self.ids.get(canonical).map(|(id, _)| *id)
    }

    pub fn ambiguous_names(&self) -> usize {
        self.ambiguous
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineupStrength {
    pub starters: usize,
    pub resolved: usize,
    pub valued: usize,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterReport {
    pub distinct_starters: usize,
    pub exact_names: usize,
    pub fuzzy_names: usize,
    pub unresolved_names: usize,
    pub ambiguous_registry_names: usize,
    pub starter_rows: usize,
    pub duplicate_rows: usize,
    pub unknown_fixture_rows: usize,
    pub unresolved_starter_rows: usize,
    pub unvalued_starter_rows: usize,
    pub fixture_teams: usize,
    pub fixture_teams_excluded: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LineupValuation {
    pub strengths: HashMap<(String, String), LineupStrength>,
    pub mapping: IdentityMapping,
    pub report: RosterReport,
}

impl LineupValuation {
    pub fn value_of(&self, game: &str, team: &str) -> Option<f64> {
        self.strengths
            .get(&(game.to_string(), team.to_string()))
            .and_then(|s| s.value)
    }
}

/// Values every fixture-team's starting XI at the fixture date. Unresolved or unvalued
/// starters add zero; a fixture-team with no valued starter gets no strength at all.
pub fn value_lineups<S: SimilarityScorer>(
    roster: &[RosterEntry],
    fixture_dates: &HashMap<String, NaiveDate>,
    directory: &PlayerDirectory,
    valuations: &ValuationIndex,
    resolver: &NameResolver<S>,
) -> LineupValuation {
    let mut report = RosterReport {
        ambiguous_registry_names: directory.ambiguous_names(),
        ..Default::default()
    };

    let mut seen = HashSet::new();
    let mut starters: Vec<&RosterEntry> = Vec::new();
    for entry in roster.iter().filter(|e| e.is_starter) {
        report.starter_rows += 1;
        if seen.insert((entry.game.as_str(), entry.team.as_str(), entry.player.as_str())) {
            starters.push(entry);
        } else {
            report.duplicate_rows += 1;
        }
    }

    let mapping = resolver.build_mapping(starters.iter().map(|e| e.player.as_str()));
    let stats = mapping.stats();
    report.distinct_starters = stats.distinct;
    report.exact_names = stats.exact;
    report.fuzzy_names = stats.fuzzy;
    report.unresolved_names = stats.unresolved;

    let mut strengths: HashMap<(String, String), LineupStrength> = HashMap::new();
    for entry in starters {
        let Some(date) = fixture_dates
            .get(&entry.game)
            .copied()
            .or_else(|| day_from_fixture_key(&entry.game))
        else {
            report.unknown_fixture_rows += 1;
            continue;
        };
        let slot = strengths
            .entry((entry.game.clone(), entry.team.clone()))
            .or_default();
        slot.starters += 1;

        let Some(player_id) = mapping
            .canonical(&entry.player)
            .and_then(|name| directory.id_of(name))
        else {
            report.unresolved_starter_rows += 1;
            continue;
        };
        slot.resolved += 1;

        match valuations.value_as_of(player_id, date) {
            Some(value) => {
                slot.valued += 1;
                slot.value = Some(slot.value.unwrap_or(0.0) + value);
            }
            None => report.unvalued_starter_rows += 1,
        }
    }

    report.fixture_teams = strengths.len();
    report.fixture_teams_excluded = strengths.values().filter(|s| s.value.is_none()).count();

    info!(
        "lineups valued: fixture_teams={} excluded={} starters={} unresolved_rows={} unvalued_rows={}",
        report.fixture_teams,
        report.fixture_teams_excluded,
        report.starter_rows,
        report.unresolved_starter_rows,
        report.unvalued_starter_rows
    );
    if report.unresolved_names > 0 {
        warn!(
            "{} of {} starter names could not be resolved against the player registry",
            report.unresolved_names, report.distinct_starters
        );
    }

    LineupValuation {
        strengths,
        mapping,
        report,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatioReport {
    pub rows: usize,
    pub ratio_defined: usize,
    pub missing_strength: usize,
    pub missing_baseline: usize,
}

/// Median lineup strength of each row's team within the row's season.
///
/// With [`BaselineScope::PriorOnly`] only fixtures dated strictly before the row count. A
/// baseline needs at least `min_fixtures` valued lineups, otherwise it is `None`.
pub fn typical_strengths(
    rows: &[TeamFeatureRow],
    scope: BaselineScope,
    min_fixtures: usize,
) -> Vec<Option<f64>> {
    let mut groups: HashMap<(&str, i32), Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        groups
            .entry((row.team.as_str(), row.season))
            .or_default()
            .push(idx);
    }

    let min_fixtures = min_fixtures.max(1);
    let mut out = vec![None; rows.len()];
    for indices in groups.values() {
        for &idx in indices {
            let date = rows[idx].date;
            let samples: Vec<f64> = indices
                .iter()
                .filter(|&&j| scope == BaselineScope::FullSeason || rows[j].date < date)
                .filter_map(|&j| rows[j].own.xi_value)
                .collect();
            if samples.len() >= min_fixtures {
                out[idx] = median_f64(&samples).filter(|m| *m > 0.0);
            }
        }
    }
    out
}

pub fn apply_lineup_features(
    mut rows: Vec<TeamFeatureRow>,
    valuation: &LineupValuation,
    scope: BaselineScope,
    min_fixtures: usize,
) -> (Vec<TeamFeatureRow>, RatioReport) {
    for row in &mut rows {
        row.own.xi_value = valuation.value_of(&row.game, &row.team);
    }

    let typical = typical_strengths(&rows, scope, min_fixtures);
    let mut report = RatioReport {
        rows: rows.len(),
        ..Default::default()
    };
    for (row, typical) in rows.iter_mut().zip(typical) {
        row.own.lineup_ratio = match (row.own.xi_value, typical) {
            (None, _) => {
                report.missing_strength += 1;
                None
            }
            (Some(_), None) => {
                report.missing_baseline += 1;
                None
            }
            (Some(value), Some(typical)) => {
                report.ratio_defined += 1;
                Some(value / typical)
            }
        };
    }

    info!(
        "lineup ratios: defined={} missing_strength={} missing_baseline={}",
        report.ratio_defined, report.missing_strength, report.missing_baseline
    );
    (rows, report)
}
