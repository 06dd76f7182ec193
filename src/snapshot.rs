use chrono::NaiveDate;

use crate::name_resolver::TeamAliases;
use crate::tables::{MatchFeatureRow, SideFeatures};

#[derive(Debug, Clone, PartialEq)]
pub struct TeamSnapshot {
    pub team: String,
    pub game: String,
    pub date: NaiveDate,
    pub was_home: bool,
    pub features: SideFeatures,
}

/// Features of `team` from its most recent fixture dated strictly before `before` (or its
/// latest fixture overall). Team names compare by canonical alias key.
pub fn latest_snapshot(
    rows: &[MatchFeatureRow],
    team: &str,
    before: Option<NaiveDate>,
    aliases: &TeamAliases,
) -> Option<TeamSnapshot> {
    let key = aliases.canonical_key(team);
    rows.iter()
        .filter(|m| before.is_none_or(|cutoff| m.date < cutoff))
        .filter_map(|m| {
            if aliases.canonical_key(&m.home_team) == key {
                Some((m, true))
            } else if aliases.canonical_key(&m.away_team) == key {
                Some((m, false))
            } else {
                None
            }
        })
        .max_by(|(a, _), (b, _)| a.date.cmp(&b.date).then_with(|| a.game.cmp(&b.game)))
        .map(|(m, was_home)| TeamSnapshot {
            team: if was_home {
                m.home_team.clone()
            } else {
                m.away_team.clone()
            },
            game: m.game.clone(),
            date: m.date,
            was_home,
            features: if was_home { m.home } else { m.away },
        })
}
