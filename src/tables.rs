use chrono::NaiveDate;

pub const TEAM_CENTRIC_COLUMNS: [&str; 19] = [
    "date",
    "game",
    "matchweek",
    "is_home",
    "team",
    "opponent",
    "result",
    "Starting_XI_Value",
    "Opponent_Value",
    "Value_Ratio_vs_Opponent",
    "Lineup_Strength_Ratio",
    "Opponent_Lineup_Ratio",
    "xG_Relative_Form",
    "Defense_Form_Relative",
    "Opponent_Attack_Form",
    "Opponent_Defense_Form",
    "Odds_Win",
    "Odds_Draw",
    "Odds_Lose",
];

pub const MATCH_CENTRIC_COLUMNS: [&str; 18] = [
    "date",
    "game",
    "matchweek",
    "Home_Team",
    "Away_Team",
    "Target",
    "Odds_1",
    "Odds_X",
    "Odds_2",
    "Value_Ratio_vs_Opponent",
    "Home_Value",
    "Away_Value",
    "Home_Lineup_Ratio",
    "Away_Lineup_Ratio",
    "Home_Attack_Form",
    "Home_Defense_Form",
    "Away_Attack_Form",
    "Away_Defense_Form",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "W" | "WIN" => Some(Self::Win),
            "D" | "DRAW" => Some(Self::Draw),
            "L" | "LOSS" | "LOSE" => Some(Self::Loss),
            _ => None,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Draw => Self::Draw,
            Self::Loss => Self::Win,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win => "W",
            Self::Draw => "D",
            Self::Loss => "L",
        }
    }
}

/// Match-level class label. Encoded 0/1/2 for downstream classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    HomeWin,
    Draw,
    AwayWin,
}

impl Target {
    pub fn from_home_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win => Self::HomeWin,
            Outcome::Draw => Self::Draw,
            Outcome::Loss => Self::AwayWin,
        }
    }

    pub fn home_outcome(self) -> Outcome {
        match self {
            Self::HomeWin => Outcome::Win,
            Self::Draw => Outcome::Draw,
            Self::AwayWin => Outcome::Loss,
        }
    }

    pub fn as_index(self) -> u8 {
        match self {
            Self::HomeWin => 0,
            Self::Draw => 1,
            Self::AwayWin => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureStat {
    pub game: String,
    pub date: NaiveDate,
    pub team: String,
    pub opponent: String,
    pub result: Outcome,
    pub xg: Option<f64>,
    pub xga: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub game: String,
    pub home_team: String,
    pub away_team: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub game: String,
    pub team: String,
    pub player: String,
    pub is_starter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub player_id: u64,
    pub name: String,
    pub last_season: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationRecord {
    pub player_id: u64,
    pub date: NaiveDate,
    pub value: f64,
}

/// Raw bookmaker table. Price columns vary between feeds, so cells stay untyped until the
/// odds stage has picked its columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OddsTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamOdds {
    pub win: f64,
    pub draw: f64,
    pub lose: f64,
}

impl TeamOdds {
    pub fn inverse(self) -> Self {
        Self {
            win: self.lose,
            draw: self.draw,
            lose: self.win,
        }
    }
}

/// Per-side derived features. Forms are always numeric (0 = league average).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideFeatures {
    pub xi_value: Option<f64>,
    pub lineup_ratio: Option<f64>,
    pub attack_form: f64,
    pub defense_form: f64,
}

/// One row per (fixture, team). `opp` mirrors the partner row's `own`.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamFeatureRow {
    pub game: String,
    pub date: NaiveDate,
    pub season: i32,
    pub matchweek: u32,
    pub team: String,
    pub opponent: String,
    pub result: Outcome,
    pub is_home: Option<bool>,
    pub xg: Option<f64>,
    pub xga: Option<f64>,
    pub own: SideFeatures,
    pub opp: SideFeatures,
    pub value_ratio_vs_opponent: Option<f64>,
    pub odds: Option<TeamOdds>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchFeatureRow {
    pub game: String,
    pub date: NaiveDate,
    pub matchweek: u32,
    pub home_team: String,
    pub away_team: String,
    pub target: Target,
    pub odds_1: Option<f64>,
    pub odds_x: Option<f64>,
    pub odds_2: Option<f64>,
    pub value_ratio_vs_opponent: Option<f64>,
    pub home: SideFeatures,
    pub away: SideFeatures,
}

#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub stats: Vec<FixtureStat>,
    pub schedule: Vec<ScheduleEntry>,
    pub roster: Vec<RosterEntry>,
    pub players: Vec<PlayerRecord>,
    pub valuations: Vec<ValuationRecord>,
    pub odds: Option<OddsTable>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_and_target_encoding() {
        assert_eq!(Outcome::parse(" w "), Some(Outcome::Win));
        assert_eq!(Outcome::parse("x"), None);
        assert_eq!(Outcome::Loss.inverse(), Outcome::Win);
        assert_eq!(Target::from_home_outcome(Outcome::Loss), Target::AwayWin);
        assert_eq!(Target::AwayWin.as_index(), 2);
        assert_eq!(Target::Draw.home_outcome(), Outcome::Draw);
    }

    #[test]
    fn odds_inverse_swaps_win_and_lose() {
        let odds = TeamOdds {
            win: 1.5,
            draw: 3.0,
            lose: 6.0,
        };
        let inv = odds.inverse();
        assert!((inv.win - 6.0).abs() < 1e-9);
        assert!((inv.draw - 3.0).abs() < 1e-9);
        assert!((inv.lose - 1.5).abs() < 1e-9);
    }
}
