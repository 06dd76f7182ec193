use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::name_resolver::{SimilarityScorer, TeamResolver};
use crate::season::season_of;
use crate::tables::{
    FixtureStat, MatchFeatureRow, ScheduleEntry, SideFeatures, TeamFeatureRow, TeamOdds, Target,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualityReport {
    pub input_rows: usize,
    pub paired_rows: usize,
    pub orphan_fixtures: usize,
    pub crowded_fixtures: usize,
    pub dropped_rows: usize,
    /// Rows whose conceded statistic was taken from the partner's attack statistic.
    pub conceded_filled: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HomeReport {
    pub fixtures: usize,
    pub without_schedule: usize,
    pub unresolved_home: usize,
    pub ambiguous_home: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldReport {
    pub fixtures: usize,
    pub folded: usize,
    pub without_home_row: usize,
}

pub fn rows_from_stats(stats: &[FixtureStat]) -> (Vec<TeamFeatureRow>, usize) {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(stats.len());
    let mut duplicates = 0usize;
    for s in stats {
        if !seen.insert((s.game.as_str(), s.team.as_str())) {
            duplicates += 1;
            continue;
        }
        rows.push(TeamFeatureRow {
            game: s.game.clone(),
            date: s.date,
            season: season_of(s.date),
            matchweek: 0,
            team: s.team.clone(),
            opponent: s.opponent.clone(),
            result: s.result,
            is_home: None,
            xg: s.xg,
            xga: s.xga,
            own: SideFeatures::default(),
            opp: SideFeatures::default(),
            value_ratio_vs_opponent: None,
            odds: None,
        });
    }
    if duplicates > 0 {
        warn!("dropped {duplicates} duplicate (fixture, team) stat rows");
    }
    (rows, duplicates)
}

/// Self-join on the fixture key. Only fixtures with exactly two distinct team rows survive;
/// every surviving row gets its partner's `own` features as `opp`.
pub fn pair_opponents(rows: Vec<TeamFeatureRow>) -> (Vec<TeamFeatureRow>, DualityReport) {
    let mut report = DualityReport {
        input_rows: rows.len(),
        ..Default::default()
    };

    let mut by_game: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        by_game.entry(row.game.as_str()).or_default().push(idx);
    }
    let mut keep = vec![false; rows.len()];
    for indices in by_game.values() {
        let distinct: HashSet<&str> = indices.iter().map(|&i| rows[i].team.as_str()).collect();
        match distinct.len() {
            2 if indices.len() == 2 => indices.iter().for_each(|&i| keep[i] = true),
            0 | 1 => report.orphan_fixtures += 1,
            _ => report.crowded_fixtures += 1,
        }
    }

    let kept: Vec<TeamFeatureRow> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, k)| k.then_some(row))
        .collect();
    report.dropped_rows = report.input_rows - kept.len();

    let partners = partner_indices(&kept);
    let mut out = kept.clone();
    for (idx, row) in out.iter_mut().enumerate() {
        let Some(p) = partners[idx] else {
            continue;
        };
        let partner = &kept[p];
        row.opponent = partner.team.clone();
        if row.xga.is_none() && partner.xg.is_some() {
            row.xga = partner.xg;
            report.conceded_filled += 1;
        }
        row.opp = partner.own;
        row.value_ratio_vs_opponent = value_ratio(row.own.xi_value, row.opp.xi_value);
        report.paired_rows += 1;
    }

    info!(
        "fixtures paired: rows={} orphan_fixtures={} crowded_fixtures={} conceded_filled={}",
        report.paired_rows, report.orphan_fixtures, report.crowded_fixtures, report.conceded_filled
    );
    if report.dropped_rows > 0 {
        warn!(
            "dropped {} rows from fixtures without exactly two sides",
            report.dropped_rows
        );
    }
    (out, report)
}

pub fn mirror_opponents(rows: Vec<TeamFeatureRow>) -> Vec<TeamFeatureRow> {
    let partners = partner_indices(&rows);
    let snapshot: Vec<SideFeatures> = rows.iter().map(|r| r.own).collect();
    rows.into_iter()
        .enumerate()
        .map(|(idx, mut row)| {
            if let Some(p) = partners[idx] {
                row.opp = snapshot[p];
                row.value_ratio_vs_opponent = value_ratio(row.own.xi_value, row.opp.xi_value);
            }
            row
        })
        .collect()
}

/// Own XI value relative to the opponent's; the `+ 1` keeps a zero opponent value finite.
pub fn value_ratio(own: Option<f64>, opp: Option<f64>) -> Option<f64> {
    match (own, opp) {
        (Some(own), Some(opp)) if opp + 1.0 > 0.0 => Some(own / (opp + 1.0)),
        _ => None,
    }
}

/// Marks each row home/away by strict canonical-name lookup against the schedule entry of
/// its fixture. Rows of fixtures that cannot be designated keep `is_home = None`.
pub fn designate_home<S: SimilarityScorer>(
    rows: Vec<TeamFeatureRow>,
    schedule: &[ScheduleEntry],
    teams: &TeamResolver<S>,
) -> (Vec<TeamFeatureRow>, HomeReport) {
    let by_game: HashMap<&str, &ScheduleEntry> =
        schedule.iter().map(|s| (s.game.as_str(), s)).collect();
    let names = rows
        .iter()
        .map(|r| r.team.as_str())
        .chain(schedule.iter().map(|s| s.home_team.as_str()))
        .chain(schedule.iter().map(|s| s.away_team.as_str()));
    let mapping = teams.build_mapping(names);

    let mut game_rows: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        game_rows.entry(row.game.as_str()).or_default().push(idx);
    }

    let mut report = HomeReport {
        fixtures: game_rows.len(),
        ..Default::default()
    };
    let mut flags: Vec<Option<bool>> = vec![None; rows.len()];
    for (game, indices) in &game_rows {
        let Some(entry) = by_game.get(game) else {
            report.without_schedule += 1;
            continue;
        };
        let (Some(home_key), away_key) = (
            mapping.canonical(&entry.home_team),
            mapping.canonical(&entry.away_team),
        ) else {
            report.unresolved_home += 1;
            continue;
        };

        let mut marks = Vec::with_capacity(indices.len());
        for &idx in indices {
            let key = mapping.canonical(&rows[idx].team);
            let mark = match key {
                Some(k) if k == home_key => Some(true),
                Some(k) if away_key == Some(k) => Some(false),
                _ => None,
            };
            marks.push((idx, mark));
        }
        let homes = marks.iter().filter(|(_, m)| *m == Some(true)).count();
        match homes {
            // A paired fixture's other side is away even when the schedule's away name
            // does not resolve.
            1 if marks.len() == 2 => marks
                .into_iter()
                .for_each(|(idx, m)| flags[idx] = Some(m == Some(true))),
            1 => marks.into_iter().for_each(|(idx, m)| flags[idx] = m),
            0 => report.unresolved_home += 1,
            _ => report.ambiguous_home += 1,
        }
    }

    let rows = rows
        .into_iter()
        .zip(flags)
        .map(|(mut row, flag)| {
            row.is_home = flag;
            row
        })
        .collect();

    let skipped = report.without_schedule + report.unresolved_home + report.ambiguous_home;
    info!(
        "home designation: fixtures={} skipped={}",
        report.fixtures, skipped
    );
    if skipped > 0 {
        warn!(
            "{} fixtures have no home designation (no schedule entry: {}, unresolved: {}, ambiguous: {})",
            skipped, report.without_schedule, report.unresolved_home, report.ambiguous_home
        );
    }
    (rows, report)
}

/// Keeps exactly the designated home row of each fixture and renames own/opponent to
/// home/away. Fixtures without a designated home row are excluded.
pub fn to_match_centric(rows: &[TeamFeatureRow]) -> (Vec<MatchFeatureRow>, FoldReport) {
    let mut homes: HashMap<&str, Vec<&TeamFeatureRow>> = HashMap::new();
    let mut games = HashSet::new();
    for row in rows {
        games.insert(row.game.as_str());
        if row.is_home == Some(true) {
            homes.entry(row.game.as_str()).or_default().push(row);
        }
    }

    let mut report = FoldReport {
        fixtures: games.len(),
        ..Default::default()
    };
    let mut out: Vec<MatchFeatureRow> = Vec::with_capacity(homes.len());
    for game in games {
        match homes.get(game).map(Vec::as_slice) {
            Some([home]) => out.push(fold_home_row(home)),
            _ => report.without_home_row += 1,
        }
    }
    out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.game.cmp(&b.game)));
    report.folded = out.len();

    if report.without_home_row > 0 {
        warn!(
            "{} fixtures excluded from the match table: no designated home row",
            report.without_home_row
        );
    }
    (out, report)
}

fn fold_home_row(home: &TeamFeatureRow) -> MatchFeatureRow {
    MatchFeatureRow {
        game: home.game.clone(),
        date: home.date,
        matchweek: home.matchweek,
        home_team: home.team.clone(),
        away_team: home.opponent.clone(),
        target: Target::from_home_outcome(home.result),
        odds_1: home.odds.map(|o| o.win),
        odds_x: home.odds.map(|o| o.draw),
        odds_2: home.odds.map(|o| o.lose),
        value_ratio_vs_opponent: home.value_ratio_vs_opponent,
        home: home.own,
        away: home.opp,
    }
}

/// Inverse of [`to_match_centric`]: two mirrored team rows per fixture. Odds only carry
/// over when all three prices are present.
pub fn split_match_rows(rows: &[MatchFeatureRow]) -> Vec<TeamFeatureRow> {
    let mut out = Vec::with_capacity(rows.len() * 2);
    for m in rows {
        let home_odds = match (m.odds_1, m.odds_x, m.odds_2) {
            (Some(win), Some(draw), Some(lose)) => Some(TeamOdds { win, draw, lose }),
            _ => None,
        };
        let home_result = m.target.home_outcome();
        let base = TeamFeatureRow {
            game: m.game.clone(),
            date: m.date,
            season: season_of(m.date),
            matchweek: m.matchweek,
            team: m.home_team.clone(),
            opponent: m.away_team.clone(),
            result: home_result,
            is_home: Some(true),
            xg: None,
            xga: None,
            own: m.home,
            opp: m.away,
            value_ratio_vs_opponent: m.value_ratio_vs_opponent,
            odds: home_odds,
        };
        let away = TeamFeatureRow {
            team: m.away_team.clone(),
            opponent: m.home_team.clone(),
            result: home_result.inverse(),
            is_home: Some(false),
            own: m.away,
            opp: m.home,
            value_ratio_vs_opponent: value_ratio(m.away.xi_value, m.home.xi_value),
            odds: home_odds.map(TeamOdds::inverse),
            ..base.clone()
        };
        out.push(base);
        out.push(away);
    }
    out
}

fn partner_indices(rows: &[TeamFeatureRow]) -> Vec<Option<usize>> {
    let mut by_game: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        by_game.entry(row.game.as_str()).or_default().push(idx);
    }
    let mut out = vec![None; rows.len()];
    for indices in by_game.values() {
        if let [a, b] = indices.as_slice()
            && rows[*a].team != rows[*b].team
        {
            out[*a] = Some(*b);
            out[*b] = Some(*a);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::name_resolver::{TeamAliases, TokenRatioScorer};
    use crate::tables::Outcome;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stat(game: &str, team: &str, opp: &str, result: Outcome, xg: f64) -> FixtureStat {
        FixtureStat {
            game: game.to_string(),
            date: day(2023, 8, 20),
            team: team.to_string(),
            opponent: opp.to_string(),
            result,
            xg: Some(xg),
            xga: None,
        }
    }

    fn resolver(teams: &[&str]) -> TeamResolver {
        TeamResolver::new(
            teams.iter().copied(),
            TeamAliases::bundled().clone(),
            TokenRatioScorer,
            90.0,
        )
    }

    fn schedule(game: &str, home: &str, away: &str) -> ScheduleEntry {
        ScheduleEntry {
            game: game.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
        }
    }

    #[test]
    fn pairing_mirrors_partner_and_fills_conceded() {
        let (mut rows, dups) = rows_from_stats(&[
            stat("g1", "Inter", "Monza", Outcome::Win, 2.1),
            stat("g1", "Monza", "Inter", Outcome::Loss, 0.4),
            stat("g1", "Monza", "Inter", Outcome::Loss, 0.4),
        ]);
        assert_eq!(dups, 1);
        rows[0].own.xi_value = Some(500.0);
        rows[1].own.xi_value = Some(99.0);

        let (rows, report) = pair_opponents(rows);
        assert_eq!(report.paired_rows, 2);
        assert_eq!(report.conceded_filled, 2);
        assert_eq!(rows[0].xga, Some(0.4));
        assert_eq!(rows[1].xga, Some(2.1));
        assert_eq!(rows[0].opp.xi_value, Some(99.0));
        assert_eq!(rows[1].opp.xi_value, Some(500.0));
        assert_eq!(rows[0].value_ratio_vs_opponent, Some(5.0));
    }

    #[test]
    fn pairing_drops_orphan_and_crowded_fixtures() {
        let (rows, _) = rows_from_stats(&[
            stat("g1", "Inter", "Monza", Outcome::Win, 2.1),
            stat("g2", "Roma", "Lazio", Outcome::Draw, 1.0),
            stat("g2", "Lazio", "Roma", Outcome::Draw, 1.0),
            stat("g2", "Napoli", "Roma", Outcome::Draw, 1.0),
        ]);
        let (rows, report) = pair_opponents(rows);
        assert!(rows.is_empty());
        assert_eq!(report.orphan_fixtures, 1);
        assert_eq!(report.crowded_fixtures, 1);
        assert_eq!(report.dropped_rows, 4);
    }

    #[test]
    fn home_comes_from_schedule_not_substrings() {
        // "Inter" is a substring of "Internazionale Primavera"; only the exact canonical
        // match may be marked home.
        let (rows, _) = rows_from_stats(&[
            stat("g1", "Inter", "Milan", Outcome::Win, 2.1),
            stat("g1", "Milan", "Inter", Outcome::Loss, 0.4),
            stat("g2", "Roma", "Lazio", Outcome::Draw, 1.0),
            stat("g2", "Lazio", "Roma", Outcome::Draw, 1.0),
            stat("g3", "Genoa", "Empoli", Outcome::Draw, 1.0),
            stat("g3", "Empoli", "Genoa", Outcome::Draw, 1.0),
        ]);
        let (rows, _) = pair_opponents(rows);
        let teams = resolver(&["Inter", "Milan", "Roma", "Lazio", "Genoa", "Empoli"]);
        let sched = vec![
            schedule("g1", "AC Milan", "FC Internazionale"),
            schedule("g2", "Internazionale Primavera", "Torino"),
        ];
        let (rows, report) = designate_home(rows, &sched, &teams);

        let flag = |game: &str, team: &str| {
            rows.iter()
                .find(|r| r.game == game && r.team == team)
                .and_then(|r| r.is_home)
        };
        assert_eq!(flag("g1", "Milan"), Some(true));
        assert_eq!(flag("g1", "Inter"), Some(false));
        assert_eq!(flag("g2", "Roma"), None);
        assert_eq!(flag("g3", "Genoa"), None);
        assert_eq!(report.without_schedule, 1);
        assert_eq!(report.unresolved_home, 1);

        let (matches, fold) = to_match_centric(&rows);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].home_team, "Milan");
        assert_eq!(matches[0].away_team, "Inter");
        assert_eq!(matches[0].target, Target::AwayWin);
        assert_eq!(fold.without_home_row, 2);
    }

    #[test]
    fn away_side_is_marked_when_schedule_away_name_is_unknown() {
        let (rows, _) = rows_from_stats(&[
            stat("g1", "Roma", "Lazio", Outcome::Win, 1.4),
            stat("g1", "Lazio", "Roma", Outcome::Loss, 0.9),
        ]);
        let (rows, _) = pair_opponents(rows);
        let teams = resolver(&["Roma", "Lazio"]);
        let sched = vec![schedule("g1", "AS Roma", "Zzyzx Athletic")];
        let (rows, report) = designate_home(rows, &sched, &teams);

        let roma = rows.iter().find(|r| r.team == "Roma").unwrap();
        let lazio = rows.iter().find(|r| r.team == "Lazio").unwrap();
        assert_eq!(roma.is_home, Some(true));
        assert_eq!(lazio.is_home, Some(false));
        assert_eq!(report.unresolved_home, 0);
    }

    #[test]
    fn split_then_fold_round_trips() {
        let expected = vec![MatchFeatureRow {
            game: "g1".to_string(),
            date: day(2023, 9, 2),
            matchweek: 3,
            home_team: "Inter".to_string(),
            away_team: "Monza".to_string(),
            target: Target::Draw,
            odds_1: Some(1.5),
            odds_x: Some(3.0),
            odds_2: Some(6.0),
            value_ratio_vs_opponent: Some(2.0),
            home: SideFeatures {
                xi_value: Some(300.0),
                lineup_ratio: Some(1.1),
                attack_form: 0.7,
                defense_form: -0.3,
            },
            away: SideFeatures {
                xi_value: Some(149.0),
                lineup_ratio: None,
                attack_form: -0.2,
                defense_form: 0.4,
            },
        }];
        let teams = split_match_rows(&expected);
        assert_eq!(teams.len(), 2);
        let away = &teams[1];
        assert_eq!(away.result, Outcome::Draw);
        let odds = away.odds.unwrap();
        assert!((odds.win - 6.0).abs() < 1e-9);
        assert!((odds.lose - 1.5).abs() < 1e-9);
        assert_eq!(away.opp, teams[0].own);

        let (folded, _) = to_match_centric(&teams);
        assert_eq!(folded, expected);
    }

    #[test]
    fn value_ratio_needs_both_sides() {
        assert_eq!(value_ratio(Some(10.0), Some(4.0)), Some(2.0));
        assert_eq!(value_ratio(Some(10.0), Some(0.0)), Some(10.0));
        assert_eq!(value_ratio(None, Some(4.0)), None);
        assert_eq!(value_ratio(Some(10.0), None), None);
    }
}
