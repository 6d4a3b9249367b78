use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_date_or_placeholder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fan {
    pub fan_id: i64,
    pub name: String,
}

/// One attended game, both sides joined. Request-scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanGameRecord {
    pub game_id: i64,
    pub league: String,
    pub season: Option<String>,
    pub game_date: Option<NaiveDate>,
    pub home_team: String,
    pub home_score: i64,
    pub away_team: String,
    pub away_score: i64,
}

impl FanGameRecord {
    /// Winning abbreviation, `None` on a tie.
    pub fn winner(&self) -> Option<&str> {
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => Some(&self.home_team),
            std::cmp::Ordering::Less => Some(&self.away_team),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideResult {
    Win,
    Loss,
    Tie,
}

/// One side of one game, seen from that team's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPerspective {
    pub game_id: i64,
    pub league: String,
    pub game_date: Option<NaiveDate>,
    pub team: String,
    pub opponent: String,
    pub is_home: bool,
    pub result: SideResult,
}

/// The fixed-shape pair every game expands into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePerspectives {
    pub home: TeamPerspective,
    pub away: TeamPerspective,
}

impl GamePerspectives {
    pub fn into_array(self) -> [TeamPerspective; 2] {
        [self.home, self.away]
    }
}

/// Record by team for one fan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub league: String,
    pub team: String,
    pub team_name: String,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Fraction in 0.0..=1.0, three decimals
    pub win_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Legend,
}

impl Tier {
    pub const LADDER: [(Tier, u32); 4] = [
        (Tier::Bronze, 5),
        (Tier::Silver, 10),
        (Tier::Gold, 20),
        (Tier::Legend, 40),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierProgress {
    pub games_attended: u32,
    pub current_tier: Option<Tier>,
    pub next_tier: Tier,
    pub next_threshold: u32,
    /// 0.0..=1.0
    pub progress: f64,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueCount {
    pub league: String,
    pub games: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentGame {
    pub game_id: i64,
    pub league: String,
    pub game_date: Option<NaiveDate>,
    pub label: String,
}

impl From<&FanGameRecord> for RecentGame {
    fn from(game: &FanGameRecord) -> Self {
        Self {
            game_id: game.game_id,
            league: game.league.clone(),
            game_date: game.game_date,
            label: format!(
                "{}: {}",
                format_date_or_placeholder(game.game_date),
                game.matchup()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOverview {
    pub fan: Fan,
    pub tier: TierProgress,
    pub by_league: Vec<LeagueCount>,
    pub recent_games: Vec<RecentGame>,
    pub team_records: Vec<TeamStanding>,
    /// Non-fatal problems met while building the overview
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDetail {
    pub game_id: i64,
    pub date: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    /// Winning abbreviation or "Tie"
    pub winner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamGameLogEntry {
    pub game_id: i64,
    pub date: String,
    pub league: String,
    pub matchup: String,
    pub score: String,
    pub result: SideResult,
}

/// Raw per-fan aggregate for one team, before ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanTeamAggregate {
    pub fan_id: i64,
    pub fan_name: String,
    pub games: u32,
    pub wins: u32,
    pub ties: u32,
    pub last_attended: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub fan_id: i64,
    pub fan_name: String,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Percent in 0.0..=100.0, one decimal
    pub win_pct: f64,
    pub win_pct_display: String,
    pub last_attended: Option<NaiveDate>,
    pub last_attended_display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogTeam {
    pub league: String,
    pub abbreviation: String,
    pub full_name: String,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Usable data with a visible message about what is missing from it.
    pub fn partial(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: Some(message),
            timestamp: Utc::now(),
        }
    }

    /// A failed query still answers with a usable (empty) payload.
    pub fn degraded(data: T, message: String) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
