use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fixture_features::config::PipelineConfig;
use fixture_features::duality;
use fixture_features::load;
use fixture_features::name_resolver::{TeamAliases, TeamResolver, TokenRatioScorer};
use fixture_features::odds;

/// Reports how a bookmaker table would join onto the fixture stats.
#[derive(Debug, Parser)]
struct Args {
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[arg(long)]
    stats: Option<PathBuf>,
    #[arg(long)]
    odds: Option<PathBuf>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let cfg = PipelineConfig::from_env();
    let stats_path = args
        .stats
        .clone()
        .unwrap_or_else(|| args.data_dir.join(load::STATS_FILE));
    let odds_path = args
        .odds
        .clone()
        .unwrap_or_else(|| args.data_dir.join(load::ODDS_FILE));

    let stats_file =
        File::open(&stats_path).with_context(|| format!("opening {}", stats_path.display()))?;
    let (stats, _) = load::read_stats(stats_file)?;
    let odds_file =
        File::open(&odds_path).with_context(|| format!("opening {}", odds_path.display()))?;
    let (table, count) = load::read_odds(odds_file)?;

    let (rows, _) = duality::rows_from_stats(&stats);
    let teams = TeamResolver::new(
        rows.iter().map(|r| r.team.as_str()),
        TeamAliases::bundled().clone(),
        TokenRatioScorer,
        cfg.team_match_threshold,
    );

    let cols = odds::select_columns(&table, &cfg.odds_priority)?;
    println!(
        "Selected columns: {} / {} / {} (source {})",
        cols.home, cols.draw, cols.away, cols.source
    );
    let (team_odds, parsed) = odds::to_team_centric(&table, &cols, &teams)?;
    println!(
        "Odds rows: {} read, {} skipped while loading, {} malformed",
        parsed.table_rows, count.skipped, parsed.malformed_rows
    );
    println!(
        "Indexed (date, team) keys: {} ({} duplicates ignored)",
        team_odds.len(),
        parsed.duplicate_keys
    );
    if !parsed.unresolved_names.is_empty() {
        println!("Odds names without a stats team: {}", parsed.unresolved_names.join(", "));
    }

    let (_, report) = odds::attach_odds(rows, &team_odds, &teams, parsed);
    println!(
        "Stat rows matched: {} / {}",
        report.rows_matched,
        report.rows_matched + report.rows_unmatched
    );
    println!("Fixtures without odds: {}", report.fixtures_without_odds);
    if !report.unmatched_teams.is_empty() {
        println!("Unmatched teams (sample): {}", report.unmatched_teams.join(", "));
    }
    Ok(())
}
