use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fixture_features::config::{BaselineScope, OutputShape, PipelineConfig};
use fixture_features::load::{self, InputPaths};
use fixture_features::name_resolver::TeamAliases;
use fixture_features::pipeline::{Assembler, AssemblyReport};
use fixture_features::snapshot;

#[derive(Debug, Parser)]
#[command(about = "Assemble leakage-free per-fixture features from stats, lineups, valuations and odds")]
struct Args {
    /// directory holding the default input files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[arg(long)]
    stats: Option<PathBuf>,
    #[arg(long)]
    schedule: Option<PathBuf>,
    #[arg(long)]
    lineups: Option<PathBuf>,
    #[arg(long)]
    players: Option<PathBuf>,
    #[arg(long)]
    valuations: Option<PathBuf>,
    #[arg(long)]
    odds: Option<PathBuf>,
    /// assemble without bookmaker prices
    #[arg(long)]
    skip_odds: bool,
    /// output CSV
    #[arg(long, default_value = "fixture_features.csv")]
    out: PathBuf,
    /// team | match
    #[arg(long)]
    shape: Option<String>,
    /// prior | full
    #[arg(long)]
    baseline: Option<String>,
    #[arg(long)]
    drop_missing_odds: bool,
    /// extra team aliases, JSON object of alias -> canonical name
    #[arg(long)]
    aliases: Option<PathBuf>,
    #[arg(long)]
    player_threshold: Option<f64>,
    #[arg(long)]
    team_threshold: Option<f64>,
    #[arg(long)]
    form_window: Option<usize>,
    /// print the latest feature snapshot of this team after assembling
    #[arg(long)]
    snapshot: Option<String>,
}

impl Args {
    fn config(&self) -> Result<PipelineConfig> {
        let mut cfg = PipelineConfig::from_env();
        if let Some(raw) = &self.shape {
            cfg.shape = OutputShape::parse(raw).with_context(|| format!("unknown shape '{raw}'"))?;
        }
        if let Some(raw) = &self.baseline {
            cfg.baseline =
                BaselineScope::parse(raw).with_context(|| format!("unknown baseline '{raw}'"))?;
        }
        if let Some(t) = self.player_threshold {
            cfg.player_match_threshold = t.clamp(0.0, 100.0);
        }
        if let Some(t) = self.team_threshold {
            cfg.team_match_threshold = t.clamp(0.0, 100.0);
        }
        if let Some(w) = self.form_window {
            if w == 0 {
                bail!("form window must be at least 1");
            }
            cfg.form_window = w;
        }
        cfg.drop_missing_odds |= self.drop_missing_odds;
        Ok(cfg)
    }

    fn paths(&self) -> InputPaths {
        let mut paths = InputPaths::in_dir(&self.data_dir);
        let overrides = [
            (&mut paths.stats, &self.stats),
            (&mut paths.schedule, &self.schedule),
            (&mut paths.roster, &self.lineups),
            (&mut paths.players, &self.players),
            (&mut paths.valuations, &self.valuations),
        ];
        for (slot, value) in overrides {
            if let Some(path) = value {
                *slot = path.clone();
            }
        }
        paths.odds = if self.skip_odds {
            None
        } else {
            Some(self.odds.clone().unwrap_or_else(|| self.data_dir.join(load::ODDS_FILE)))
        };
        paths
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    debug!("args: {args:?}");
    let cfg = args.config()?;
    let paths = args.paths();

    let (inputs, load_report) = load::load_inputs(&paths).context("loading input tables")?;
    let mut assembler = Assembler::new(cfg.clone());
    if let Some(path) = &args.aliases {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading aliases {}", path.display()))?;
        let extra = TeamAliases::from_json(&raw)
            .with_context(|| format!("parsing aliases {}", path.display()))?;
        assembler.aliases_mut().merge(extra);
    }
    let assembly = assembler.assemble(&inputs).context("assembling features")?;

    let file = load::create_output(&args.out)?;
    match cfg.shape {
        OutputShape::TeamCentric => load::write_team_rows(file, &assembly.team_rows)?,
        OutputShape::MatchCentric => load::write_match_rows(file, &assembly.match_rows)?,
    }

    println!("Feature table written");
    println!("Output: {} ({} rows)", args.out.display(), assembly.shape_len(cfg.shape));
    println!(
        "Skipped input rows: stats={} lineups={} players={} valuations={} odds={}",
        load_report.stats.skipped,
        load_report.roster.skipped,
        load_report.players.skipped,
        load_report.valuations.skipped,
        load_report.odds.skipped
    );
    print_report(&assembly.report);

    if let Some(team) = &args.snapshot {
        match snapshot::latest_snapshot(&assembly.match_rows, team, None, assembler.aliases()) {
            Some(snap) => println!(
                "Latest {} ({} {}): value={:?} lineup_ratio={:?} attack_form={:.3} defense_form={:.3}",
                snap.team,
                snap.date,
                if snap.was_home { "home" } else { "away" },
                snap.features.xi_value,
                snap.features.lineup_ratio,
                snap.features.attack_form,
                snap.features.defense_form
            ),
            None => println!("No fixtures found for {team}"),
        }
    }
    Ok(())
}

fn print_report(report: &AssemblyReport) {
    let roster = &report.roster;
    println!(
        "Players: {} eligible, {} valued; starters {} exact / {} fuzzy / {} unresolved",
        report.registry_players,
        report.valued_players,
        roster.exact_names,
        roster.fuzzy_names,
        roster.unresolved_names
    );
    println!(
        "Lineups: {} fixture-teams, {} without a valued starter",
        roster.fixture_teams, roster.fixture_teams_excluded
    );
    println!(
        "Lineup ratios: {} defined, {} missing strength, {} missing baseline",
        report.ratios.ratio_defined, report.ratios.missing_strength, report.ratios.missing_baseline
    );
    println!(
        "Pairing: {} rows, {} orphan fixtures, {} crowded fixtures",
        report.duality.paired_rows, report.duality.orphan_fixtures, report.duality.crowded_fixtures
    );
    println!(
        "Form (window {}): attack {:?}, defense {:?}",
        report.form.window, report.form.attack, report.form.defense
    );
    println!(
        "Home designation: {} fixtures, {} without schedule, {} unresolved, {} ambiguous",
        report.home.fixtures,
        report.home.without_schedule,
        report.home.unresolved_home,
        report.home.ambiguous_home
    );
    let odds = &report.odds;
    if odds.source.is_empty() {
        println!("Odds: none");
    } else {
        println!(
            "Odds ({}): {} rows matched, {} unmatched, {} fixtures without odds, {} dropped",
            odds.source,
            odds.rows_matched,
            odds.rows_unmatched,
            odds.fixtures_without_odds,
            odds.fixtures_dropped
        );
        if !odds.unmatched_teams.is_empty() {
            println!("Unmatched teams (sample): {}", odds.unmatched_teams.join(", "));
        }
    }
    println!(
        "Match table: {} fixtures, {} without a home row",
        report.fold.folded, report.fold.without_home_row
    );
}
