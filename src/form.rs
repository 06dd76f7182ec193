use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::BaselineScope;
use crate::numeric::mean_f64;
use crate::tables::TeamFeatureRow;

/// Standard deviations below this are treated as zero spread.
const MIN_SPREAD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormCounts {
    pub computed: usize,
    pub without_history: usize,
    /// Fewer than two league samples, or zero spread.
    pub undefined_baseline: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormReport {
    pub rows: usize,
    pub window: usize,
    pub attack: FormCounts,
    pub defense: FormCounts,
}

pub fn assign_matchweeks(mut rows: Vec<TeamFeatureRow>) -> Vec<TeamFeatureRow> {
    let mut groups: HashMap<(i32, String), Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        groups
            .entry((row.season, row.team.clone()))
            .or_default()
            .push(idx);
    }
    for mut indices in groups.into_values() {
        indices.sort_by(|&a, &b| {
            rows[a]
                .date
                .cmp(&rows[b].date)
                .then_with(|| rows[a].game.cmp(&rows[b].game))
        });
        for (pos, idx) in indices.into_iter().enumerate() {
            rows[idx].matchweek = pos as u32 + 1;
        }
    }
    rows
}

/// Lagged rolling mean of `stat` per team. Rows of the same team on the same date never
/// see each other. `None` when no earlier fixture has the statistic.
pub fn rolling_means<F>(rows: &[TeamFeatureRow], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&TeamFeatureRow) -> Option<f64>,
{
    let mut by_team: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        by_team.entry(row.team.as_str()).or_default().push(idx);
    }

    let mut out = vec![None; rows.len()];
    for indices in by_team.values_mut() {
        indices.sort_by(|&a, &b| {
            rows[a]
                .date
                .cmp(&rows[b].date)
                .then_with(|| rows[a].game.cmp(&rows[b].game))
        });
        for (pos, &idx) in indices.iter().enumerate() {
            let date = rows[idx].date;
            let earlier = indices[..pos].partition_point(|&i| rows[i].date < date);
            let start = earlier.saturating_sub(window);
            let values: Vec<f64> = indices[start..earlier]
                .iter()
                .filter_map(|&i| stat(&rows[i]))
                .collect();
            out[idx] = mean_f64(&values);
        }
    }
    out
}

/// League mean and sample standard deviation of `stat` in each row's season.
/// `PriorOnly` restricts the sample to fixtures dated strictly before the row.
pub fn league_baselines<F>(
    rows: &[TeamFeatureRow],
    scope: BaselineScope,
    stat: F,
) -> Vec<Option<(f64, f64)>>
where
    F: Fn(&TeamFeatureRow) -> Option<f64>,
{
    let mut by_season: HashMap<i32, Vec<(NaiveDate, f64)>> = HashMap::new();
    for row in rows {
        if let Some(v) = stat(row).filter(|v| v.is_finite()) {
            by_season.entry(row.season).or_default().push((row.date, v));
        }
    }
    let mut prefixes: HashMap<i32, SeasonPrefix> = HashMap::new();
    for (season, mut samples) in by_season {
        samples.sort_by_key(|(date, _)| *date);
        prefixes.insert(season, SeasonPrefix::new(samples));
    }

    rows.iter()
        .map(|row| {
            let prefix = prefixes.get(&row.season)?;
            let n = match scope {
                BaselineScope::PriorOnly => prefix.count_before(row.date),
                BaselineScope::FullSeason => prefix.len(),
            };
            prefix.mean_and_std(n)
        })
        .collect()
}

struct SeasonPrefix {
    dates: Vec<NaiveDate>,
    sums: Vec<f64>,
    squares: Vec<f64>,
}

impl SeasonPrefix {
    fn new(samples: Vec<(NaiveDate, f64)>) -> Self {
        let mut dates = Vec::with_capacity(samples.len());
        let mut sums = vec![0.0];
        let mut squares = vec![0.0];
        for (date, v) in samples {
            dates.push(date);
            sums.push(sums[sums.len() - 1] + v);
            squares.push(squares[squares.len() - 1] + v * v);
        }
        Self {
            dates,
            sums,
            squares,
        }
    }

    fn len(&self) -> usize {
        self.dates.len()
    }

    fn count_before(&self, date: NaiveDate) -> usize {
        self.dates.partition_point(|d| *d < date)
    }

    fn mean_and_std(&self, n: usize) -> Option<(f64, f64)> {
        if n < 2 {
            return None;
        }
        let count = n as f64;
        let mean = self.sums[n] / count;
        let var = ((self.squares[n] - count * mean * mean) / (count - 1.0)).max(0.0);
        Some((mean, var.sqrt()))
    }
}

fn relative(
    mean: Option<f64>,
    baseline: Option<(f64, f64)>,
    counts: &mut FormCounts,
) -> f64 {
    match (mean, baseline) {
        (None, _) => {
            counts.without_history += 1;
            0.0
        }
        (Some(m), Some((mu, sd))) if sd > MIN_SPREAD => {
            counts.computed += 1;
            (m - mu) / sd
        }
        (Some(_), _) => {
            counts.undefined_baseline += 1;
            0.0
        }
    }
}

/// Fills `own.attack_form` (from xG) and `own.defense_form` (from xGA). Opponent forms are
/// not touched here; mirror them afterwards.
pub fn apply_form(
    mut rows: Vec<TeamFeatureRow>,
    window: usize,
    scope: BaselineScope,
) -> (Vec<TeamFeatureRow>, FormReport) {
    let window = window.max(1);
    let attack_means = rolling_means(&rows, window, |r| r.xg);
    let attack_base = league_baselines(&rows, scope, |r| r.xg);
    let defense_means = rolling_means(&rows, window, |r| r.xga);
    let defense_base = league_baselines(&rows, scope, |r| r.xga);

    let mut report = FormReport {
        rows: rows.len(),
        window,
        ..Default::default()
    };
    for (idx, row) in rows.iter_mut().enumerate() {
        row.own.attack_form = relative(attack_means[idx], attack_base[idx], &mut report.attack);
        row.own.defense_form =
            relative(defense_means[idx], defense_base[idx], &mut report.defense);
    }

    info!(
        "form computed: rows={} window={} attack={:?} defense={:?}",
        report.rows, window, report.attack, report.defense
    );
    let defaulted = report.attack.undefined_baseline + report.defense.undefined_baseline;
    if defaulted > 0 {
        warn!("{defaulted} form values defaulted to 0: league baseline undefined");
    }
    (rows, report)
}
