use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::db::{create_pool, list_fans};
use crate::models::{
    ApiResponse, CatalogTeam, Fan, FanOverview, GameDetail, LeaderboardRow, TeamGameLogEntry,
};
use crate::services::{AttendanceAggregator, CatalogCache, LeaderboardRanker, TeamCatalog};
use crate::utils::fan_display_name;

const MAX_FANS: i64 = 5000;

/// Everything a request needs. The catalog cache is the only state shared
/// between sessions; a session's selections travel in the request itself.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub catalog: Arc<CatalogCache>,
    pub aggregator: Arc<AttendanceAggregator>,
    pub ranker: Arc<LeaderboardRanker>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        Self {
            pool,
            catalog: Arc::new(CatalogCache::new(config.catalog_ttl)),
            aggregator: Arc::new(AttendanceAggregator::new()),
            ranker: Arc::new(LeaderboardRanker::new(config.leaderboard_limit)),
        }
    }
}

pub async fn serve(config: &AppConfig, port: u16) -> anyhow::Result<()> {
    let pool = create_pool(config).await?;

    let app = create_router().with_state(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Fanzone API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/fans", get(list_fans_handler))
        .route("/fans/{fan_id}/overview", get(fan_overview_handler))
        .route("/fans/{fan_id}/games/{game_id}", get(game_detail_handler))
        .route("/fans/{fan_id}/teams/{league}/{abbr}/games", get(team_game_log_handler))
        .route("/catalog", get(catalog_handler))
        .route("/catalog/leagues", get(leagues_handler))
        .route("/leaderboard/{league}/{abbr}", get(leaderboard_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Query failures come back as an empty payload plus a visible message;
/// they never fail the whole request.
fn respond<T>(result: anyhow::Result<T>, action: &str, empty: impl FnOnce() -> T) -> Json<ApiResponse<T>> {
    match result {
        Ok(data) => Json(ApiResponse::success(data)),
        Err(e) => {
            tracing::error!("Failed to {}: {}", action, e);
            Json(ApiResponse::degraded(empty(), format!("Query failed: {}", e)))
        }
    }
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Fanzone API is running"))
}

// GET /fans - Fans for the selection list
#[derive(Deserialize)]
struct FansQuery {
    limit: Option<i64>,
}

async fn list_fans_handler(
    State(state): State<AppState>,
    Query(params): Query<FansQuery>,
) -> Json<ApiResponse<Vec<Fan>>> {
    let limit = params.limit.unwrap_or(MAX_FANS).clamp(1, MAX_FANS);
    respond(list_fans(&state.pool, limit).await, "list fans", Vec::new)
}

// GET /fans/{fan_id}/overview - Personal overview
async fn fan_overview_handler(
    State(state): State<AppState>,
    Path(fan_id): Path<i64>,
) -> Json<ApiResponse<FanOverview>> {
    let result = state
        .aggregator
        .get_fan_overview(&state.pool, &state.catalog, fan_id)
        .await;

    match result {
        Ok(overview) if !overview.warnings.is_empty() => {
            let message = overview.warnings.join("; ");
            Json(ApiResponse::partial(overview, message))
        }
        result => {
            let aggregator = state.aggregator.clone();
            respond(result, "build fan overview", move || {
                let fan = Fan {
                    fan_id,
                    name: fan_display_name(fan_id, None),
                };
                aggregator.build_overview(fan, &[], &TeamCatalog::default())
            })
        }
    }
}

// GET /fans/{fan_id}/games/{game_id} - Detail for one attended game
async fn game_detail_handler(
    State(state): State<AppState>,
    Path((fan_id, game_id)): Path<(i64, i64)>,
) -> Json<ApiResponse<Option<GameDetail>>> {
    respond(
        state.aggregator.get_game_detail(&state.pool, fan_id, game_id).await,
        "load game detail",
        || None,
    )
}

// GET /fans/{fan_id}/teams/{league}/{abbr}/games - A fan's games for one team
async fn team_game_log_handler(
    State(state): State<AppState>,
    Path((fan_id, league, abbr)): Path<(i64, String, String)>,
) -> Json<ApiResponse<Vec<TeamGameLogEntry>>> {
    respond(
        state
            .aggregator
            .get_team_game_log(&state.pool, fan_id, &league, &abbr)
            .await,
        "load team game log",
        Vec::new,
    )
}

// GET /catalog - Teams with at least one game
#[derive(Deserialize)]
struct CatalogQuery {
    league: Option<String>,
}

async fn catalog_handler(
    State(state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> Json<ApiResponse<Vec<CatalogTeam>>> {
    let result = state.catalog.get(&state.pool).await.map(|catalog| match params.league {
        Some(league) => catalog.teams_in_league(&league),
        None => catalog.teams().to_vec(),
    });
    respond(result, "load team catalog", Vec::new)
}

// GET /catalog/leagues - Leagues for the selection list
async fn leagues_handler(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    let result = state.catalog.get(&state.pool).await.map(|catalog| catalog.leagues());
    respond(result, "load leagues", Vec::new)
}

// GET /leaderboard/{league}/{abbr} - Top fans for a team
#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

async fn leaderboard_handler(
    State(state): State<AppState>,
    Path((league, abbr)): Path<(String, String)>,
    Query(params): Query<LeaderboardQuery>,
) -> Json<ApiResponse<Vec<LeaderboardRow>>> {
    respond(
        state
            .ranker
            .get_team_leaderboard(&state.pool, &league, &abbr, params.limit)
            .await,
        "build leaderboard",
        Vec::new,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;

    #[test]
    fn test_failed_query_degrades_to_empty_payload() {
        let Json(response) = respond::<Vec<Fan>>(
            Err(anyhow::anyhow!("connection refused")),
            "list fans",
            Vec::new,
        );
        assert!(!response.success);
        assert_eq!(response.data, Some(Vec::new()));
        assert_eq!(response.error.as_deref(), Some("Query failed: connection refused"));
    }

    #[test]
    fn test_success_passes_data_through() {
        let Json(response) = respond(Ok(vec![1, 2, 3]), "count", Vec::new);
        assert!(response.success);
        assert_eq!(response.data, Some(vec![1, 2, 3]));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_catalog_outage_surfaces_message_with_overview() {
        let pool = memory_pool().await;
        insert_fan(&pool, 1, Some("Ava")).await;
        insert_game(&pool, 1, "MLB", Some("2024-05-01"), "NYY", 5, "BOS", 3).await;
        attend(&pool, 1, 1).await;
        sqlx::query("DROP TABLE team").execute(&pool).await.unwrap();

        let config = AppConfig::from_lookup(|key| (key == "DATABASE_URL").then(|| "sqlite::memory:".to_string())).unwrap();
        let state = AppState::new(pool, &config);

        let Json(response) = fan_overview_handler(State(state), Path(1)).await;
        assert!(response.success);
        assert!(response.error.as_deref().unwrap().starts_with("Team names unavailable"));
        let overview = response.data.unwrap();
        assert_eq!(overview.tier.games_attended, 1);
        assert_eq!(overview.team_records[0].team_name, overview.team_records[0].team);
    }

    #[test]
    fn test_degraded_overview_envelope_shape() {
        let aggregator = AttendanceAggregator::new();
        let Json(response) = respond(Err(anyhow::anyhow!("no such table: attendance")), "build fan overview", || {
            let fan = Fan {
                fan_id: 42,
                name: fan_display_name(42, None),
            };
            aggregator.build_overview(fan, &[], &TeamCatalog::default())
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["fan"]["name"], "Fan 42");
        assert_eq!(json["data"]["tier"]["games_attended"], 0);
        assert_eq!(json["data"]["tier"]["next_threshold"], 5);
        assert_eq!(json["data"]["tier"]["remaining"], 5);
        assert_eq!(json["data"]["recent_games"], serde_json::json!([]));
        assert!(json["error"].as_str().unwrap().contains("no such table"));
    }
}
