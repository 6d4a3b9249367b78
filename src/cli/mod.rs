use anyhow::Result;
use std::path::Path;

use crate::config::AppConfig;
use crate::db::{create_pool, list_fans};
use crate::models::{CatalogTeam, LeaderboardRow};
use crate::services::{AttendanceAggregator, CatalogCache, LeaderboardRanker};

/// Closest catalog teams to an unknown abbreviation, best first.
pub fn suggest_teams<'a>(catalog: &'a [CatalogTeam], league: &str, query: &str, max: usize) -> Vec<&'a CatalogTeam> {
    let query = query.to_lowercase();
    let mut scored: Vec<(f64, &CatalogTeam)> = catalog
        .iter()
        .filter(|t| t.league.eq_ignore_ascii_case(league))
        .map(|t| {
            let by_abbr = strsim::jaro_winkler(&query, &t.abbreviation.to_lowercase());
            let by_name = strsim::jaro_winkler(&query, &t.full_name.to_lowercase());
            (by_abbr.max(by_name), t)
        })
        .filter(|(score, _)| *score >= 0.6)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(max).map(|(_, t)| t).collect()
}

pub async fn show_fans(config: &AppConfig) -> Result<()> {
    let pool = create_pool(config).await?;

    match list_fans(&pool, 5000).await {
        Ok(fans) if fans.is_empty() => {
            println!("📭 No fans found in database. Try: fanzone seed");
        }
        Ok(fans) => {
            println!("👥 Fans:\n");
            for fan in fans {
                println!("   {} — {}", fan.fan_id, fan.name);
            }
        }
        Err(e) => println!("❌ Query failed: {}", e),
    }
    Ok(())
}

pub async fn show_teams(config: &AppConfig, league: Option<&str>) -> Result<()> {
    let pool = create_pool(config).await?;
    let cache = CatalogCache::new(config.catalog_ttl);

    let catalog = match cache.get(&pool).await {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("❌ Query failed: {}", e);
            return Ok(());
        }
    };

    if catalog.teams().is_empty() {
        println!("📭 No teams with games found. Load game data first.");
        return Ok(());
    }

    println!("🏆 Teams with games:\n");
    for league_name in catalog.leagues() {
        if league.is_some_and(|wanted| !wanted.eq_ignore_ascii_case(&league_name)) {
            continue;
        }
        println!("📊 {}:", league_name);
        for team in catalog.teams_in_league(&league_name) {
            println!("   • {} — {}", team.abbreviation, team.full_name);
        }
        println!();
    }

    println!("💡 Use 'fanzone leaderboard --league <league> --team <abbr>' to rank fans");
    Ok(())
}

pub async fn show_overview(config: &AppConfig, fan_id: i64) -> Result<()> {
    let pool = create_pool(config).await?;
    let cache = CatalogCache::new(config.catalog_ttl);
    let aggregator = AttendanceAggregator::new();

    let overview = match aggregator.get_fan_overview(&pool, &cache, fan_id).await {
        Ok(overview) => overview,
        Err(e) => {
            println!("❌ Query failed: {}", e);
            return Ok(());
        }
    };

    for warning in &overview.warnings {
        println!("⚠️  {}", warning);
    }

    let tier = &overview.tier;
    println!("👋 Hello {}!", overview.fan.name);
    println!(
        "   {} point(s) away from your next reward ({:?} at {})",
        tier.remaining, tier.next_tier, tier.next_threshold
    );
    println!("   Progress: {:.0}%", tier.progress * 100.0);
    if let Some(current) = tier.current_tier {
        println!("   Current tier: {:?}", current);
    }
    println!("   Lifetime games attended: {}", tier.games_attended);

    let by_league = if overview.by_league.is_empty() {
        "—".to_string()
    } else {
        overview
            .by_league
            .iter()
            .map(|l| format!("{}: {}", l.league, l.games))
            .collect::<Vec<_>>()
            .join(" • ")
    };
    println!("   By league: {}", by_league);

    if overview.recent_games.is_empty() {
        println!("\n📭 No games yet for this fan.");
        return Ok(());
    }

    println!("\n📅 Previous games:");
    for game in &overview.recent_games {
        println!("   [{}] {}", game.game_id, game.label);
    }

    println!("\n📊 Record by team:");
    println!("   {:<6} {:<28} {:>3} {:>3} {:>3} {:>6} {:>5}", "League", "Team", "W", "L", "T", "Win%", "Games");
    for record in &overview.team_records {
        println!(
            "   {:<6} {:<28} {:>3} {:>3} {:>3} {:>6.3} {:>5}",
            record.league, record.team_name, record.wins, record.losses, record.ties, record.win_pct, record.games
        );
    }

    println!("\n💡 Use 'fanzone game --fan {} --game <id>' for game details", fan_id);
    Ok(())
}

pub async fn show_game(config: &AppConfig, fan_id: i64, game_id: i64) -> Result<()> {
    let pool = create_pool(config).await?;
    let aggregator = AttendanceAggregator::new();

    match aggregator.get_game_detail(&pool, fan_id, game_id).await {
        Ok(Some(detail)) => {
            println!("🏟️  Game {} ({})", detail.game_id, detail.league);
            println!("   Date:   {}", detail.date);
            println!("   Home:   {}", detail.home_team);
            println!("   Away:   {}", detail.away_team);
            println!("   Winner: {}", detail.winner);
        }
        Ok(None) => println!("📭 Fan {} did not attend game {}", fan_id, game_id),
        Err(e) => println!("❌ Query failed: {}", e),
    }
    Ok(())
}

pub async fn show_leaderboard(
    config: &AppConfig,
    league: &str,
    team: &str,
    limit: Option<usize>,
    csv_path: Option<&Path>,
) -> Result<()> {
    let pool = create_pool(config).await?;
    let cache = CatalogCache::new(config.catalog_ttl);
    let ranker = LeaderboardRanker::new(config.leaderboard_limit);

    let catalog = match cache.get(&pool).await {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("❌ Query failed: {}", e);
            return Ok(());
        }
    };

    if !catalog.contains(league, team) {
        println!("❌ No team '{}' with games in league '{}'", team, league);
        let suggestions = suggest_teams(catalog.teams(), league, team, 3);
        if !suggestions.is_empty() {
            println!("\n💡 Did you mean:");
            for t in suggestions {
                println!("   • {} — {}", t.abbreviation, t.full_name);
            }
        }
        return Ok(());
    }

    let rows = match ranker.get_team_leaderboard(&pool, league, team, limit).await {
        Ok(rows) => rows,
        Err(e) => {
            println!("❌ Query failed: {}", e);
            return Ok(());
        }
    };

    println!("🏆 {} — lifetime leaderboard\n", catalog.resolve_name(league, team));
    if rows.is_empty() {
        println!("📭 No fan attendance found for this team yet.");
        return Ok(());
    }

    println!(
        "   {:>4} {:>6} {:<20} {:>5} {:>3} {:>3} {:>3} {:>7} {:>12}",
        "Rank", "Fan ID", "Fan Name", "Games", "W", "L", "T", "Win %", "Last Attended"
    );
    for row in &rows {
        println!(
            "   {:>4} {:>6} {:<20} {:>5} {:>3} {:>3} {:>3} {:>7} {:>12}",
            row.rank,
            row.fan_id,
            row.fan_name,
            row.games,
            row.wins,
            row.losses,
            row.ties,
            row.win_pct_display,
            row.last_attended_display
        );
    }

    if let Some(path) = csv_path {
        write_leaderboard_csv(path, &rows)?;
        println!("\n✅ Exported {} rows to {}", rows.len(), path.display());
    }

    Ok(())
}

pub fn write_leaderboard_csv(path: &Path, rows: &[LeaderboardRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Rank",
        "Fan ID",
        "Fan Name",
        "Games",
        "W",
        "L",
        "T",
        "Win %",
        "Last Attended Date",
    ])?;
    for row in rows {
        writer.write_record([
            row.rank.to_string(),
            row.fan_id.to_string(),
            row.fan_name.clone(),
            row.games.to_string(),
            row.wins.to_string(),
            row.losses.to_string(),
            row.ties.to_string(),
            row.win_pct_display.clone(),
            row.last_attended_display.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
