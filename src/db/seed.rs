use anyhow::Result;
use sqlx::SqlitePool;

async fn insert_fan_raw(pool: &SqlitePool, fan_id: i64, name: Option<&str>) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO fan (fan_id, fan_name) VALUES (?, ?)")
        .bind(fan_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

async fn insert_team_raw(pool: &SqlitePool, league: &str, abbr: &str, city: &str, name: &str) -> Result<()> {
    sqlx::query(
        r#"INSERT OR REPLACE INTO team (league, abbreviation, city, team_name)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(league)
    .bind(abbr)
    .bind(city)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

/// Inserts the game and both of its sides; the winner flag follows the scores.
async fn insert_game_raw(pool: &SqlitePool, game: &SeedGame) -> Result<()> {
    let (game_id, league, season, date, home, home_score, away, away_score) = *game;

    sqlx::query(
        r#"INSERT OR REPLACE INTO game (game_id, league, season, game_date)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(game_id)
    .bind(league)
    .bind(season)
    .bind(date)
    .execute(pool)
    .await?;

    for (side, abbr, score, other) in [
        ("HOME", home, home_score, away_score),
        ("AWAY", away, away_score, home_score),
    ] {
        sqlx::query(
            r#"INSERT OR REPLACE INTO game_team (game_id, home_away, team_abbreviation, score, is_winner)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(game_id)
        .bind(side)
        .bind(abbr)
        .bind(score)
        .bind(score > other)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn insert_attendance_raw(pool: &SqlitePool, fan_id: i64, game_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO attendance (fan_id, game_id) VALUES (?, ?)")
        .bind(fan_id)
        .bind(game_id)
        .execute(pool)
        .await?;
    Ok(())
}

// (game_id, league, season, date, home, home_score, away, away_score)
type SeedGame = (i64, &'static str, &'static str, Option<&'static str>, &'static str, i64, &'static str, i64);

const TEAMS: &[(&str, &str, &str, &str)] = &[
    ("MLB", "NYY", "New York", "Yankees"),
    ("MLB", "LAA", "Los Angeles", "Angels"),
    ("MLB", "BOS", "Boston", "Red Sox"),
    ("MLB", "TOR", "Toronto", "Blue Jays"),
    ("NFL", "CAR", "Carolina", "Panthers"),
    ("NFL", "NYJ", "New York", "Jets"),
    ("NFL", "ATL", "Atlanta", "Falcons"),
    ("NBA", "NYK", "New York", "Knicks"),
    ("NBA", "MIL", "Milwaukee", "Bucks"),
    ("NBA", "CHA", "Charlotte", "Hornets"),
    ("NBA", "ATL", "Atlanta", "Hawks"),
];

const GAMES: &[SeedGame] = &[
    (1001, "MLB", "2024", Some("2024-04-12"), "NYY", 6, "BOS", 2),
    (1002, "MLB", "2024", Some("2024-05-03"), "BOS", 4, "NYY", 5),
    (1003, "MLB", "2024", Some("2024-06-18"), "NYY", 1, "TOR", 3),
    (1004, "MLB", "2024", Some("2024-07-10"), "NYY", 7, "LAA", 4),
    (1005, "MLB", "2024", Some("2024-08-21"), "TOR", 2, "NYY", 2),
    (1006, "MLB", "2025", Some("2025-04-05"), "LAA", 3, "NYY", 8),
    (1007, "MLB", "2025", Some("2025-05-16 19:05:00"), "NYY", 0, "BOS", 1),
    (1008, "MLB", "2025", Some("2025-07-10"), "NYY", 9, "LAA", 3),
    (2001, "NFL", "2024", Some("2024-09-15"), "CAR", 17, "NYJ", 20),
    (2002, "NFL", "2024", Some("2024-10-27"), "ATL", 24, "CAR", 24),
    (2003, "NFL", "2025", Some("2025-06-22"), "CAR", 31, "NYJ", 10),
    (3001, "NBA", "2024", Some("2024-10-30"), "CHA", 110, "ATL", 104),
    (3002, "NBA", "2024", Some("2024-12-25"), "NYK", 117, "MIL", 114),
    (3003, "NBA", "2025", Some("2025-05-10"), "NYK", 98, "MIL", 106),
    (3004, "NBA", "2025", None, "MIL", 120, "CHA", 99),
];

const FANS: &[(i64, Option<&str>)] = &[
    (1, Some("Dillon S.")),
    (2, Some("Maya R.")),
    (3, None),
    (4, Some("Theo K.")),
    (5, None),
];

const ATTENDANCE: &[(i64, &[i64])] = &[
    (1, &[1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008, 2001, 3002, 3003]),
    (2, &[1001, 1002, 1004, 1005, 1006, 1008, 2002, 2003, 3001]),
    (3, &[1003, 1007, 3004]),
    (4, &[2001, 2002, 2003, 3001, 3002]),
    // fan 5 has no history
];

pub async fn seed_data(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fan")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Database already seeded ({} fans found), skipping.", count);
        return Ok(());
    }

    tracing::info!("Seeding database with demo fans, teams and games...");

    for (league, abbr, city, name) in TEAMS {
        insert_team_raw(pool, league, abbr, city, name).await?;
    }
    for game in GAMES {
        insert_game_raw(pool, game).await?;
    }
    for (fan_id, name) in FANS {
        insert_fan_raw(pool, *fan_id, *name).await?;
    }
    for (fan_id, games) in ATTENDANCE {
        for game_id in games.iter() {
            insert_attendance_raw(pool, *fan_id, *game_id).await?;
        }
    }
    // The external store tolerates repeated scans of the same ticket.
    insert_attendance_raw(pool, 1, 1001).await?;
    insert_attendance_raw(pool, 2, 1008).await?;

    tracing::info!(
        "Database seeded successfully: {} teams, {} games, {} fans.",
        TEAMS.len(),
        GAMES.len(),
        FANS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;
    use crate::db::{get_fan_games, get_team_catalog};

    #[tokio::test]
    async fn test_seed_is_idempotent_and_deduplicated() {
        let pool = memory_pool().await;
        seed_data(&pool).await.unwrap();
        seed_data(&pool).await.unwrap();

        let fans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fan")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fans, FANS.len() as i64);

        let games = get_fan_games(&pool, 1).await.unwrap();
        assert_eq!(games.len(), 11);

        let catalog = get_team_catalog(&pool).await.unwrap();
        assert_eq!(catalog.len(), TEAMS.len());
    }
}
