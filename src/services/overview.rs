use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::{get_fan, get_fan_games};
use crate::models::{
    Fan, FanGameRecord, FanOverview, GameDetail, GamePerspectives, LeagueCount, RecentGame,
    SideResult, TeamGameLogEntry, TeamPerspective, TeamStanding, Tier, TierProgress,
};
use crate::services::{CatalogCache, TeamCatalog};
use crate::utils::{fan_display_name, format_date_or_placeholder, round_to, win_fraction};

const RECENT_GAMES: usize = 5;

/// Builds a fan's personal overview from their attended games.
pub struct AttendanceAggregator {
    ladder: [(Tier, u32); 4],
}

impl AttendanceAggregator {
    pub fn new() -> Self {
        Self { ladder: Tier::LADDER }
    }

    /// Unknown fans get an empty overview rather than an error. A catalog
    /// outage only costs display names and is reported in `warnings`.
    pub async fn get_fan_overview(
        &self,
        pool: &SqlitePool,
        catalog: &CatalogCache,
        fan_id: i64,
    ) -> Result<FanOverview> {
        let fan = get_fan(pool, fan_id).await?.unwrap_or_else(|| Fan {
            fan_id,
            name: fan_display_name(fan_id, None),
        });
        let games = get_fan_games(pool, fan_id).await?;

        match catalog.get(pool).await {
            Ok(catalog) => Ok(self.build_overview(fan, &games, &catalog)),
            Err(e) => {
                tracing::warn!("Team catalog unavailable, showing abbreviations: {}", e);
                let mut overview = self.build_overview(fan, &games, &TeamCatalog::default());
                overview.warnings.push(format!("Team names unavailable: {}", e));
                Ok(overview)
            }
        }
    }

    pub fn build_overview(&self, fan: Fan, games: &[FanGameRecord], catalog: &TeamCatalog) -> FanOverview {
        let distinct: HashSet<i64> = games.iter().map(|g| g.game_id).collect();

        FanOverview {
            fan,
            tier: self.tier_progress(distinct.len() as u32),
            by_league: league_breakdown(games),
            recent_games: games.iter().take(RECENT_GAMES).map(RecentGame::from).collect(),
            team_records: team_records(games, catalog),
            warnings: Vec::new(),
        }
    }

    /// Position on the reward ladder. The next threshold is the first one the
    /// fan has not passed; reaching a threshold exactly counts as full progress.
    pub fn tier_progress(&self, games_attended: u32) -> TierProgress {
        let (next_tier, next_threshold) = self
            .ladder
            .iter()
            .copied()
            .find(|(_, threshold)| games_attended <= *threshold)
            .unwrap_or(self.ladder[self.ladder.len() - 1]);

        let current_tier = self
            .ladder
            .iter()
            .rev()
            .find(|(_, threshold)| games_attended >= *threshold)
            .map(|(tier, _)| *tier);

        let progress = (games_attended as f64 / next_threshold as f64).min(1.0);

        TierProgress {
            games_attended,
            current_tier,
            next_tier,
            next_threshold,
            progress,
            remaining: next_threshold.saturating_sub(games_attended),
        }
    }

    pub async fn get_game_detail(&self, pool: &SqlitePool, fan_id: i64, game_id: i64) -> Result<Option<GameDetail>> {
        let games = get_fan_games(pool, fan_id).await?;
        Ok(games.iter().find(|g| g.game_id == game_id).map(game_detail))
    }

    pub async fn get_team_game_log(
        &self,
        pool: &SqlitePool,
        fan_id: i64,
        league: &str,
        abbreviation: &str,
    ) -> Result<Vec<TeamGameLogEntry>> {
        let games = get_fan_games(pool, fan_id).await?;
        Ok(team_game_log(&games, league, abbreviation))
    }
}

/// Splits one game into the home and away points of view.
pub fn expand_perspectives(game: &FanGameRecord) -> GamePerspectives {
    let (home_result, away_result) = match game.home_score.cmp(&game.away_score) {
        std::cmp::Ordering::Greater => (SideResult::Win, SideResult::Loss),
        std::cmp::Ordering::Less => (SideResult::Loss, SideResult::Win),
        std::cmp::Ordering::Equal => (SideResult::Tie, SideResult::Tie),
    };

    let side = |team: &str, opponent: &str, is_home: bool, result: SideResult| TeamPerspective {
        game_id: game.game_id,
        league: game.league.clone(),
        game_date: game.game_date,
        team: team.to_string(),
        opponent: opponent.to_string(),
        is_home,
        result,
    };

    GamePerspectives {
        home: side(&game.home_team, &game.away_team, true, home_result),
        away: side(&game.away_team, &game.home_team, false, away_result),
    }
}

pub fn league_breakdown(games: &[FanGameRecord]) -> Vec<LeagueCount> {
    let mut by_league: BTreeMap<&str, HashSet<i64>> = BTreeMap::new();
    for game in games {
        by_league.entry(game.league.as_str()).or_default().insert(game.game_id);
    }
    by_league
        .into_iter()
        .map(|(league, ids)| LeagueCount {
            league: league.to_string(),
            games: ids.len() as u32,
        })
        .collect()
}

/// W/L/T per (league, team) across every side of every attended game.
/// Ordered by games, then win pct, then league and abbreviation.
pub fn team_records(games: &[FanGameRecord], catalog: &TeamCatalog) -> Vec<TeamStanding> {
    let mut tallies: HashMap<(String, String), (u32, u32, u32)> = HashMap::new();

    for perspective in games.iter().flat_map(|g| expand_perspectives(g).into_array()) {
        let tally = tallies
            .entry((perspective.league, perspective.team))
            .or_insert((0, 0, 0));
        match perspective.result {
            SideResult::Win => tally.0 += 1,
            SideResult::Loss => tally.1 += 1,
            SideResult::Tie => tally.2 += 1,
        }
    }

    let mut standings: Vec<TeamStanding> = tallies
        .into_iter()
        .map(|((league, team), (wins, losses, ties))| {
            let games = wins + losses + ties;
            TeamStanding {
                team_name: catalog.resolve_name(&league, &team).to_string(),
                win_pct: round_to(win_fraction(wins, ties, games), 3),
                league,
                team,
                games,
                wins,
                losses,
                ties,
            }
        })
        .collect();

    standings.sort_by(|a, b| {
        b.games
            .cmp(&a.games)
            .then(b.win_pct.total_cmp(&a.win_pct))
            .then_with(|| a.league.cmp(&b.league))
            .then_with(|| a.team.cmp(&b.team))
    });
    standings
}

/// A team's games from the fan's history, newest first.
pub fn team_game_log(games: &[FanGameRecord], league: &str, abbreviation: &str) -> Vec<TeamGameLogEntry> {
    let mut entries: Vec<(Option<chrono::NaiveDate>, TeamGameLogEntry)> = games
        .iter()
        .filter(|g| g.league == league)
        .flat_map(move |g| {
            expand_perspectives(g)
                .into_array()
                .into_iter()
                .filter(move |p| p.team == abbreviation)
                .map(move |p| {
                    (
                        g.game_date,
                        TeamGameLogEntry {
                            game_id: g.game_id,
                            date: format_date_or_placeholder(g.game_date),
                            league: g.league.clone(),
                            matchup: g.matchup(),
                            score: format!("{}-{}", g.home_score, g.away_score),
                            result: p.result,
                        },
                    )
                })
        })
        .collect();

    entries.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.game_id.cmp(&a.1.game_id)));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

pub fn game_detail(game: &FanGameRecord) -> GameDetail {
    GameDetail {
        game_id: game.game_id,
        date: format_date_or_placeholder(game.game_date),
        league: game.league.clone(),
        home_team: format!("{} ({})", game.home_team, game.home_score),
        away_team: format!("{} ({})", game.away_team, game.away_score),
        winner: game.winner().unwrap_or("Tie").to_string(),
    }
}
