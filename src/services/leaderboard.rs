use anyhow::Result;
use sqlx::SqlitePool;

use crate::db::get_leaderboard_aggregates;
use crate::models::{FanTeamAggregate, LeaderboardRow};
use crate::utils::{format_date_or_placeholder, format_percent, round_to, win_fraction};

pub struct LeaderboardRanker {
    default_limit: usize,
}

impl LeaderboardRanker {
    pub fn new(default_limit: usize) -> Self {
        Self { default_limit }
    }

    /// Top fans for one team. A league/team pair with no attendance yields an
    /// empty board, not an error.
    pub async fn get_team_leaderboard(
        &self,
        pool: &SqlitePool,
        league: &str,
        abbreviation: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardRow>> {
        let aggregates = get_leaderboard_aggregates(pool, league, abbreviation).await?;
        let limit = limit.unwrap_or(self.default_limit);
        Ok(rank_leaderboard(aggregates, limit))
    }
}

/// Win percentage on a 0-100 scale, one decimal.
pub fn win_pct_percent(wins: u32, ties: u32, games: u32) -> f64 {
    round_to(win_fraction(wins, ties, games) * 100.0, 1)
}

/// Orders by games, then numeric win pct, then fan id, and keeps the top `limit`.
pub fn rank_leaderboard(aggregates: Vec<FanTeamAggregate>, limit: usize) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = aggregates
        .into_iter()
        .map(|agg| {
            // Guards against a corrupt store producing W + T > games.
            let wins = agg.wins.min(agg.games);
            let ties = agg.ties.min(agg.games - wins);
            let win_pct = win_pct_percent(wins, ties, agg.games);
            LeaderboardRow {
                rank: 0,
                fan_id: agg.fan_id,
                fan_name: agg.fan_name,
                games: agg.games,
                wins,
                losses: agg.games - wins - ties,
                ties,
                win_pct,
                win_pct_display: format_percent(win_pct),
                last_attended: agg.last_attended,
                last_attended_display: format_date_or_placeholder(agg.last_attended),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.games
            .cmp(&a.games)
            .then(b.win_pct.total_cmp(&a.win_pct))
            .then(a.fan_id.cmp(&b.fan_id))
    });
    rows.truncate(limit);

    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;
    use chrono::NaiveDate;

    fn agg(fan_id: i64, games: u32, wins: u32, ties: u32) -> FanTeamAggregate {
        FanTeamAggregate {
            fan_id,
            fan_name: format!("Fan {}", fan_id),
            games,
            wins,
            ties,
            last_attended: None,
        }
    }

    #[test]
    fn test_tie_counts_as_half_in_ranking() {
        let rows = rank_leaderboard(vec![agg(1, 10, 7, 0), agg(2, 10, 7, 1)], 25);
        assert_eq!(rows[0].fan_id, 2);
        assert_eq!(rows[0].win_pct, 75.0);
        assert_eq!(rows[0].win_pct_display, "75.0%");
        assert_eq!(rows[0].losses, 2);
        assert_eq!(rows[1].fan_id, 1);
        assert_eq!(rows[1].win_pct_display, "70.0%");
        assert_eq!((rows[0].rank, rows[1].rank), (1, 2));
    }

    #[test]
    fn test_games_outrank_win_pct() {
        let rows = rank_leaderboard(vec![agg(1, 3, 3, 0), agg(2, 4, 0, 0), agg(3, 4, 1, 0)], 25);
        let order: Vec<i64> = rows.iter().map(|r| r.fan_id).collect();
        assert_eq!(order, vec![3, 2, 1]);
        for pair in rows.windows(2) {
            assert!(
                pair[0].games > pair[1].games
                    || (pair[0].games == pair[1].games && pair[0].win_pct >= pair[1].win_pct)
            );
        }
    }

    #[test]
    fn test_exact_ties_break_on_fan_id() {
        let rows = rank_leaderboard(vec![agg(9, 2, 1, 0), agg(4, 2, 1, 0)], 25);
        assert_eq!(rows[0].fan_id, 4);
    }

    #[test]
    fn test_truncates_to_limit() {
        let aggregates = (1..=30).map(|id| agg(id, id as u32, 0, 0)).collect();
        let rows = rank_leaderboard(aggregates, 25);
        assert_eq!(rows.len(), 25);
        assert_eq!(rows[0].fan_id, 30);
        assert_eq!(rows[24].rank, 25);

        assert!(rank_leaderboard(vec![agg(1, 1, 1, 0)], 0).is_empty());
    }

    #[test]
    fn test_win_pct_bounds() {
        assert_eq!(win_pct_percent(0, 0, 0), 0.0);
        let row = &rank_leaderboard(vec![agg(1, 0, 0, 0)], 5)[0];
        assert_eq!(row.win_pct_display, "0.0%");
        assert_eq!(row.losses, 0);
        assert_eq!(win_pct_percent(5, 0, 5), 100.0);
        assert_eq!(win_pct_percent(1, 0, 3), 33.3);

        let clamped = &rank_leaderboard(vec![agg(1, 2, 3, 4)], 5)[0];
        assert_eq!(clamped.wins + clamped.losses + clamped.ties, clamped.games);
        assert!((0.0..=100.0).contains(&clamped.win_pct));
    }

    #[test]
    fn test_missing_last_attended_uses_placeholder() {
        let mut with_date = agg(1, 1, 1, 0);
        with_date.last_attended = NaiveDate::from_ymd_opt(2025, 7, 10);
        let rows = rank_leaderboard(vec![with_date, agg(2, 1, 0, 0)], 5);
        assert_eq!(rows[0].last_attended_display, "2025-07-10");
        assert_eq!(rows[1].last_attended_display, "—");
    }

    #[tokio::test]
    async fn test_leaderboard_from_store() {
        let pool = memory_pool().await;
        insert_fan(&pool, 1, Some("Ava")).await;
        // fan 1: 10 NYY games, 7 wins, 3 losses
        // fan 2: 10 NYY games, 7 wins, 1 tie, 2 losses
        for game_id in 1..=10i64 {
            let (nyy, opp) = match game_id {
                1..=7 => (5, 2),
                _ => (1, 4),
            };
            insert_game(&pool, game_id, "MLB", Some("2024-05-01"), "NYY", nyy, "BOS", opp).await;
            attend(&pool, 1, game_id).await;
        }
        for game_id in 11..=20i64 {
            let (nyy, opp) = match game_id {
                11..=17 => (3, 0),
                18 => (2, 2),
                _ => (0, 1),
            };
            let date = format!("2024-06-{:02}", game_id);
            insert_game(&pool, game_id, "MLB", Some(date.as_str()), "TOR", opp, "NYY", nyy).await;
            attend(&pool, 2, game_id).await;
        }
        attend(&pool, 2, 11).await;

        let ranker = LeaderboardRanker::new(25);
        let rows = ranker.get_team_leaderboard(&pool, "MLB", "NYY", None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fan_id, 2);
        assert_eq!(rows[0].fan_name, "Fan 2");
        assert_eq!((rows[0].games, rows[0].wins, rows[0].ties, rows[0].losses), (10, 7, 1, 2));
        assert_eq!(rows[0].win_pct_display, "75.0%");
        assert_eq!(rows[0].last_attended_display, "2024-06-20");
        assert_eq!(rows[1].fan_name, "Ava");
        assert_eq!(rows[1].win_pct_display, "70.0%");

        let top_one = ranker.get_team_leaderboard(&pool, "MLB", "NYY", Some(1)).await.unwrap();
        assert_eq!(top_one.len(), 1);

        let unknown = ranker.get_team_leaderboard(&pool, "MLB", "XXX", None).await.unwrap();
        assert!(unknown.is_empty());
    }
}
