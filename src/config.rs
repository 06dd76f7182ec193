use std::env;

const DEFAULT_PLAYER_MATCH_THRESHOLD: f64 = 85.0;
const DEFAULT_TEAM_MATCH_THRESHOLD: f64 = 90.0;
const DEFAULT_FORM_WINDOW: usize = 5;
const DEFAULT_MIN_PLAYER_LAST_SEASON: i32 = 2017;
const DEFAULT_TYPICAL_MIN_FIXTURES: usize = 2;

/// Which fixtures feed a season baseline (league mean/std, typical lineup strength).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineScope {
    /// Only fixtures of the same season dated strictly before the fixture being described.
    PriorOnly,
    /// Every fixture of the season, including later ones.
    FullSeason,
}

impl BaselineScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prior" | "prior_only" | "prior-only" => Some(Self::PriorOnly),
            "full" | "season" | "full_season" | "full-season" => Some(Self::FullSeason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    TeamCentric,
    MatchCentric,
}

impl OutputShape {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "team" | "team_centric" | "team-centric" => Some(Self::TeamCentric),
            "match" | "match_centric" | "match-centric" => Some(Self::MatchCentric),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum similarity score (0..=100) for accepting a fuzzy player-name match.
    pub player_match_threshold: f64,
    /// Minimum similarity score (0..=100) for accepting a fuzzy team-name match.
    pub team_match_threshold: f64,
    /// Number of previous fixtures in the rolling form window.
    pub form_window: usize,
    /// Registry players last active before this season are left out of the vocabulary.
    pub min_player_last_season: i32,
    /// Minimum valued lineups behind a typical-strength median.
    pub typical_min_fixtures: usize,
    pub baseline: BaselineScope,
    /// Bookmaker column prefixes probed in order before the generic `*H/*D/*A` fallback.
    pub odds_priority: Vec<String>,
    pub shape: OutputShape,
    pub drop_missing_odds: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            player_match_threshold: DEFAULT_PLAYER_MATCH_THRESHOLD,
            team_match_threshold: DEFAULT_TEAM_MATCH_THRESHOLD,
            form_window: DEFAULT_FORM_WINDOW,
            min_player_last_season: DEFAULT_MIN_PLAYER_LAST_SEASON,
            typical_min_fixtures: DEFAULT_TYPICAL_MIN_FIXTURES,
            baseline: BaselineScope::PriorOnly,
            odds_priority: vec!["B365".to_string(), "Avg".to_string()],
            shape: OutputShape::MatchCentric,
            drop_missing_odds: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let player_match_threshold = env_f64("FEATURES_PLAYER_THRESHOLD")
            .unwrap_or(defaults.player_match_threshold)
            .clamp(0.0, 100.0);
        let team_match_threshold = env_f64("FEATURES_TEAM_THRESHOLD")
            .unwrap_or(defaults.team_match_threshold)
            .clamp(0.0, 100.0);
        let form_window = env::var("FEATURES_FORM_WINDOW")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.form_window)
            .max(1);
        let min_player_last_season = env::var("FEATURES_MIN_LAST_SEASON")
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(defaults.min_player_last_season);
        let typical_min_fixtures = env::var("FEATURES_TYPICAL_MIN_FIXTURES")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.typical_min_fixtures)
            .max(1);
        let baseline = env::var("FEATURES_BASELINE")
            .ok()
            .and_then(|v| BaselineScope::parse(&v))
            .unwrap_or(defaults.baseline);
        let odds_priority = env::var("FEATURES_ODDS_PRIORITY")
            .ok()
            .map(|v| parse_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.odds_priority);
        let shape = env::var("FEATURES_SHAPE")
            .ok()
            .and_then(|v| OutputShape::parse(&v))
            .unwrap_or(defaults.shape);
        let drop_missing_odds = env_bool("FEATURES_DROP_MISSING_ODDS", defaults.drop_missing_odds);

        Self {
            player_match_threshold,
            team_match_threshold,
            form_window,
            min_player_last_season,
            typical_min_fixtures,
            baseline,
            odds_priority,
            shape,
            drop_missing_odds,
        }
    }
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}
