pub mod seed;
pub use seed::seed_data;

pub async fn clear_all_data(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM attendance").execute(pool).await?;
    sqlx::query("DELETE FROM game_team").execute(pool).await?;
    sqlx::query("DELETE FROM game").execute(pool).await?;
    sqlx::query("DELETE FROM team").execute(pool).await?;
    sqlx::query("DELETE FROM fan").execute(pool).await?;
    tracing::info!("All data cleared");
    Ok(())
}

use anyhow::Result;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::str::FromStr;

use crate::config::AppConfig;
use crate::models::*;
use crate::utils::{fan_display_name, parse_game_date};

pub async fn create_pool(config: &AppConfig) -> Result<SqlitePool> {
    let database_url = config.database_url.as_str();

    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(':') {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(config: &AppConfig) -> Result<()> {
    let pool = create_pool(config).await?;
    init_database_with_pool(&pool).await
}

/// Creates a schema compatible with the production store, for local use.
pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fan (
            fan_id   INTEGER PRIMARY KEY,
            fan_name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team (
            league       TEXT NOT NULL,
            abbreviation TEXT NOT NULL,
            city         TEXT,
            team_name    TEXT,
            PRIMARY KEY (league, abbreviation)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game (
            game_id   INTEGER PRIMARY KEY,
            league    TEXT NOT NULL,
            season    TEXT,
            game_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_team (
            game_id           INTEGER NOT NULL,
            home_away         TEXT NOT NULL CHECK (home_away IN ('HOME', 'AWAY')),
            team_abbreviation TEXT NOT NULL,
            score             INTEGER,
            is_winner         INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (game_id, home_away),
            FOREIGN KEY (game_id) REFERENCES game (game_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No uniqueness and no fan reference: the external store enforces neither,
    // so duplicate rows and fans without a profile row both occur.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            fan_id  INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            FOREIGN KEY (game_id) REFERENCES game (game_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_fan ON attendance(fan_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_game ON attendance(game_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_game_team_abbr ON game_team(team_abbreviation)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_game_date ON game(game_date)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

// Fan operations

pub async fn list_fans(pool: &SqlitePool, limit: i64) -> Result<Vec<Fan>> {
    let rows = sqlx::query("SELECT fan_id, fan_name FROM fan ORDER BY fan_id LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let fan_id: i64 = row.get("fan_id");
            let stored: Option<String> = row.get("fan_name");
            Fan {
                fan_id,
                name: fan_display_name(fan_id, stored.as_deref()),
            }
        })
        .collect())
}

pub async fn get_fan(pool: &SqlitePool, fan_id: i64) -> Result<Option<Fan>> {
    let row = sqlx::query("SELECT fan_id, fan_name FROM fan WHERE fan_id = ?")
        .bind(fan_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| {
        let stored: Option<String> = row.get("fan_name");
        Fan {
            fan_id,
            name: fan_display_name(fan_id, stored.as_deref()),
        }
    }))
}

/// One row per distinct attended game, newest first. Attendance is
/// de-duplicated before the two sides are joined so a game is never doubled.
pub async fn get_fan_games(pool: &SqlitePool, fan_id: i64) -> Result<Vec<FanGameRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT g.game_id, g.league, g.season, g.game_date,
               gh.team_abbreviation AS home_team, gh.score AS home_score,
               ga.team_abbreviation AS away_team, ga.score AS away_score
        FROM (SELECT DISTINCT game_id FROM attendance WHERE fan_id = ?) a
        JOIN game g       ON g.game_id = a.game_id
        JOIN game_team gh ON gh.game_id = g.game_id AND gh.home_away = 'HOME'
        JOIN game_team ga ON ga.game_id = g.game_id AND ga.home_away = 'AWAY'
        WHERE gh.score IS NOT NULL AND ga.score IS NOT NULL
        "#,
    )
    .bind(fan_id)
    .fetch_all(pool)
    .await?;

    let mut games = Vec::with_capacity(rows.len());
    for row in rows {
        let raw_date: Option<String> = row.try_get("game_date")?;
        games.push(FanGameRecord {
            game_id: row.try_get("game_id")?,
            league: row.try_get("league")?,
            season: row.try_get("season")?,
            game_date: raw_date.as_deref().and_then(parse_game_date),
            home_team: row.try_get("home_team")?,
            home_score: row.try_get("home_score")?,
            away_team: row.try_get("away_team")?,
            away_score: row.try_get("away_score")?,
        });
    }

    // Stored dates are free text; order on the parsed value so junk sorts last.
    games.sort_by(|a, b| b.game_date.cmp(&a.game_date).then(b.game_id.cmp(&a.game_id)));

    tracing::debug!("Fan {} has {} distinct scored games", fan_id, games.len());
    Ok(games)
}

// Team catalog

/// Teams with at least one game, with their display names.
pub async fn get_team_catalog(pool: &SqlitePool) -> Result<Vec<CatalogTeam>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT t.league, t.abbreviation,
               TRIM(COALESCE(t.city, '') || ' ' || COALESCE(t.team_name, '')) AS full_name
        FROM team t
        JOIN game_team gt ON gt.team_abbreviation = t.abbreviation
        JOIN game g       ON g.game_id = gt.game_id AND g.league = t.league
        ORDER BY t.league, t.abbreviation
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut teams = Vec::with_capacity(rows.len());
    for row in rows {
        let abbreviation: String = row.try_get("abbreviation")?;
        let full_name: String = row.try_get("full_name")?;
        teams.push(CatalogTeam {
            league: row.try_get("league")?,
            full_name: if full_name.is_empty() {
                abbreviation.clone()
            } else {
                full_name
            },
            abbreviation,
        });
    }
    Ok(teams)
}

// Leaderboard

/// Latest parseable date in a unit-separator joined list.
fn latest_date(joined: &str) -> Option<chrono::NaiveDate> {
    joined.split('\u{1f}').filter_map(parse_game_date).max()
}

/// Per-fan aggregates for one team. Wins and ties compare the selected
/// side's score against the opposing side of the same game.
pub async fn get_leaderboard_aggregates(
    pool: &SqlitePool,
    league: &str,
    abbreviation: &str,
) -> Result<Vec<FanTeamAggregate>> {
    let rows = sqlx::query(
        r#"
        WITH attended AS (
            SELECT DISTINCT fan_id, game_id FROM attendance
        ),
        fan_team_games AS (
            SELECT a.fan_id, g.game_id, g.game_date,
                   gt.score  AS team_score,
                   opp.score AS opp_score
            FROM attended a
            JOIN game g         ON g.game_id = a.game_id
            JOIN game_team gt   ON gt.game_id = g.game_id
            JOIN game_team opp  ON opp.game_id = g.game_id AND opp.home_away <> gt.home_away
            WHERE g.league = ?
              AND gt.team_abbreviation = ?
              AND gt.score IS NOT NULL
              AND opp.score IS NOT NULL
        )
        SELECT ftg.fan_id                                              AS fan_id,
               MAX(f.fan_name)                                         AS fan_name,
               COUNT(*)                                                AS games,
               SUM(CASE WHEN team_score > opp_score THEN 1 ELSE 0 END) AS wins,
               SUM(CASE WHEN team_score = opp_score THEN 1 ELSE 0 END) AS ties,
               GROUP_CONCAT(game_date, char(31))                       AS attended_dates
        FROM fan_team_games ftg
        LEFT JOIN fan f ON f.fan_id = ftg.fan_id
        GROUP BY ftg.fan_id
        "#,
    )
    .bind(league)
    .bind(abbreviation)
    .fetch_all(pool)
    .await?;

    let mut aggregates = Vec::with_capacity(rows.len());
    for row in rows {
        let fan_id: i64 = row.try_get("fan_id")?;
        let stored: Option<String> = row.try_get("fan_name")?;
        let dates: Option<String> = row.try_get("attended_dates")?;
        aggregates.push(FanTeamAggregate {
            fan_id,
            fan_name: fan_display_name(fan_id, stored.as_deref()),
            games: row.try_get::<i64, _>("games")?.max(0) as u32,
            wins: row.try_get::<i64, _>("wins")?.max(0) as u32,
            ties: row.try_get::<i64, _>("ties")?.max(0) as u32,
            last_attended: dates.as_deref().and_then(latest_date),
        });
    }

    tracing::debug!(
        "Leaderboard {}/{}: {} fans with attendance",
        league,
        abbreviation,
        aggregates.len()
    );
    Ok(aggregates)
}
