use std::collections::HashMap;

use tracing::info;

use crate::config::{OutputShape, PipelineConfig};
use crate::duality::{self, DualityReport, FoldReport, HomeReport};
use crate::error::PipelineError;
use crate::form::{self, FormReport};
use crate::name_resolver::{NameResolver, SimilarityScorer, TeamAliases, TeamResolver, TokenRatioScorer};
use crate::odds::{self, OddsReport};
use crate::roster::{self, PlayerDirectory, RatioReport, RosterReport};
use crate::tables::{InputTables, MatchFeatureRow, TeamFeatureRow};
use crate::valuation::ValuationIndex;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub stat_rows: usize,
    pub duplicate_stat_rows: usize,
    pub registry_players: usize,
    pub valued_players: usize,
    pub roster: RosterReport,
    pub ratios: RatioReport,
    pub duality: DualityReport,
    pub form: FormReport,
    pub home: HomeReport,
    pub odds: OddsReport,
    pub fold: FoldReport,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub team_rows: Vec<TeamFeatureRow>,
    pub match_rows: Vec<MatchFeatureRow>,
    pub report: AssemblyReport,
}

impl Assembly {
    pub fn shape_len(&self, shape: OutputShape) -> usize {
        match shape {
            OutputShape::TeamCentric => self.team_rows.len(),
            OutputShape::MatchCentric => self.match_rows.len(),
        }
    }
}

pub struct Assembler<S = TokenRatioScorer> {
    config: PipelineConfig,
    aliases: TeamAliases,
    scorer: S,
}

impl Assembler<TokenRatioScorer> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_scorer(config, TeamAliases::bundled().clone(), TokenRatioScorer)
    }
}

impl<S: SimilarityScorer + Clone> Assembler<S> {
    pub fn with_scorer(config: PipelineConfig, aliases: TeamAliases, scorer: S) -> Self {
        Self {
            config,
            aliases,
            scorer,
        }
    }

    pub fn aliases(&self) -> &TeamAliases {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut TeamAliases {
        &mut self.aliases
    }

    pub fn assemble(&self, inputs: &InputTables) -> Result<Assembly, PipelineError> {
        let cfg = &self.config;
        let mut report = AssemblyReport {
            stat_rows: inputs.stats.len(),
            ..Default::default()
        };

        let (rows, duplicates) = duality::rows_from_stats(&inputs.stats);
        report.duplicate_stat_rows = duplicates;
        if rows.is_empty() {
            return Err(PipelineError::EmptyTable {
                table: "fixture stats",
            });
        }
        let fixture_dates: HashMap<String, _> =
            rows.iter().map(|r| (r.game.clone(), r.date)).collect();

        let directory = PlayerDirectory::new(&inputs.players, cfg.min_player_last_season);
        report.registry_players = directory.vocabulary().len();
        let players = NameResolver::new(
            directory.vocabulary(),
            self.scorer.clone(),
            cfg.player_match_threshold,
        );
        let valuations = ValuationIndex::from_records(&inputs.valuations);
        report.valued_players = valuations.entities();

        let lineups = roster::value_lineups(
            &inputs.roster,
            &fixture_dates,
            &directory,
            &valuations,
            &players,
        );
        report.roster = lineups.report.clone();

        // Fixtures dropped by the pairing must not count toward matchweeks or baselines.
        let (rows, pairing) = duality::pair_opponents(rows);
        report.duality = pairing;

        let rows = form::assign_matchweeks(rows);
        let (rows, ratios) = roster::apply_lineup_features(
            rows,
            &lineups,
            cfg.baseline,
            cfg.typical_min_fixtures,
        );
        report.ratios = ratios;

        let (rows, form_report) = form::apply_form(rows, cfg.form_window, cfg.baseline);
        report.form = form_report;
        let rows = duality::mirror_opponents(rows);

        let teams = TeamResolver::new(
            rows.iter().map(|r| r.team.as_str()),
            self.aliases.clone(),
            self.scorer.clone(),
            cfg.team_match_threshold,
        );
        let (rows, home) = duality::designate_home(rows, &inputs.schedule, &teams);
        report.home = home;

        let (mut rows, mut odds_report) = match &inputs.odds {
            Some(table) => {
                let cols = odds::select_columns(table, &cfg.odds_priority)?;
                info!(
                    "odds source {}: {}/{}/{}",
                    cols.source, cols.home, cols.draw, cols.away
                );
                let (team_odds, parsed) = odds::to_team_centric(table, &cols, &teams)?;
                odds::attach_odds(rows, &team_odds, &teams, parsed)
            }
            None => {
                info!("no odds table supplied; odds columns stay empty");
                odds::attach_odds(rows, &[], &teams, OddsReport::default())
            }
        };
        if cfg.drop_missing_odds {
            let (kept, dropped) = odds::drop_fixtures_without_odds(rows);
            rows = kept;
            odds_report.fixtures_dropped = dropped;
            info!("dropped {dropped} fixtures without complete odds");
        }
        report.odds = odds_report;

        let (match_rows, fold) = duality::to_match_centric(&rows);
        report.fold = fold;

        info!(
            "assembled {} team rows and {} match rows from {} stat rows",
            rows.len(),
            match_rows.len(),
            report.stat_rows
        );
        Ok(Assembly {
            team_rows: rows,
            match_rows,
            report,
        })
    }
}
