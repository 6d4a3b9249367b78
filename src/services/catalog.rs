use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::db::get_team_catalog;
use crate::models::CatalogTeam;

/// Teams known to have played, with an index for name resolution.
#[derive(Debug, Default)]
pub struct TeamCatalog {
    teams: Vec<CatalogTeam>,
    names: HashMap<(String, String), String>,
}

impl TeamCatalog {
    pub fn new(teams: Vec<CatalogTeam>) -> Self {
        let names = teams
            .iter()
            .map(|t| ((t.league.clone(), t.abbreviation.clone()), t.full_name.clone()))
            .collect();
        Self { teams, names }
    }

    pub fn teams(&self) -> &[CatalogTeam] {
        &self.teams
    }

    pub fn contains(&self, league: &str, abbreviation: &str) -> bool {
        self.names
            .contains_key(&(league.to_string(), abbreviation.to_string()))
    }

    /// Full display name, or the raw abbreviation when the pair is unknown.
    pub fn resolve_name<'a>(&'a self, league: &str, abbreviation: &'a str) -> &'a str {
        self.names
            .get(&(league.to_string(), abbreviation.to_string()))
            .map(String::as_str)
            .unwrap_or(abbreviation)
    }

    pub fn leagues(&self) -> Vec<String> {
        let mut leagues: Vec<String> = self.teams.iter().map(|t| t.league.clone()).collect();
        leagues.sort();
        leagues.dedup();
        leagues
    }

    pub fn teams_in_league(&self, league: &str) -> Vec<CatalogTeam> {
        self.teams
            .iter()
            .filter(|t| t.league == league)
            .cloned()
            .collect()
    }
}

struct CachedCatalog {
    expires_at: Instant,
    catalog: Arc<TeamCatalog>,
}

/// Process-wide memo of the team catalog with a fixed time-to-live.
/// Expired entries are replaced lazily on the next read.
pub struct CatalogCache {
    ttl: Duration,
    slot: RwLock<Option<CachedCatalog>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub async fn get(&self, pool: &SqlitePool) -> Result<Arc<TeamCatalog>> {
        self.get_with(|| get_team_catalog(pool)).await
    }

    pub async fn get_with<F, Fut>(&self, load: F) -> Result<Arc<TeamCatalog>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CatalogTeam>>>,
    {
        if let Some(catalog) = self.fresh(Instant::now()).await {
            tracing::debug!("Team catalog cache hit");
            return Ok(catalog);
        }

        let mut slot = self.slot.write().await;
        // Another session may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.catalog.clone());
            }
        }

        tracing::debug!("Team catalog cache miss, reloading");
        let catalog = Arc::new(TeamCatalog::new(load().await?));
        *slot = Some(CachedCatalog {
            expires_at: Instant::now() + self.ttl,
            catalog: catalog.clone(),
        });
        tracing::info!("Team catalog loaded with {} teams", catalog.teams().len());
        Ok(catalog)
    }

    async fn fresh(&self, now: Instant) -> Option<Arc<TeamCatalog>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| now < cached.expires_at)
            .map(|cached| cached.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn team(league: &str, abbr: &str, name: &str) -> CatalogTeam {
        CatalogTeam {
            league: league.to_string(),
            abbreviation: abbr.to_string(),
            full_name: name.to_string(),
        }
    }

    #[test]
    fn test_unresolved_name_falls_back_to_abbreviation() {
        let catalog = TeamCatalog::new(vec![team("MLB", "NYY", "New York Yankees")]);
        assert_eq!(catalog.resolve_name("MLB", "NYY"), "New York Yankees");
        assert_eq!(catalog.resolve_name("MLB", "XXX"), "XXX");
        assert_eq!(catalog.resolve_name("NFL", "NYY"), "NYY");
        assert!(catalog.contains("MLB", "NYY"));
        assert!(!catalog.contains("MLB", "XXX"));
    }

    #[test]
    fn test_leagues_sorted_and_distinct() {
        let catalog = TeamCatalog::new(vec![
            team("NFL", "CAR", "Carolina Panthers"),
            team("MLB", "NYY", "New York Yankees"),
            team("MLB", "BOS", "Boston Red Sox"),
        ]);
        assert_eq!(catalog.leagues(), vec!["MLB".to_string(), "NFL".to_string()]);
        assert_eq!(catalog.teams_in_league("MLB").len(), 2);
    }

    #[tokio::test]
    async fn test_cache_serves_until_expiry() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        let loads = AtomicUsize::new(0);
        let counter = &loads;

        for _ in 0..3 {
            let catalog = cache
                .get_with(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![team("MLB", "NYY", "New York Yankees")])
                })
                .await
                .unwrap();
            assert_eq!(catalog.teams().len(), 1);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_reloads_after_ttl() {
        let cache = CatalogCache::new(Duration::from_millis(10));
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![team("MLB", "NYY", "New York Yankees")])
        };

        cache.get_with(load).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.get_with(load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_one_reload() {
        let cache = CatalogCache::new(Duration::from_millis(200));
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![team("MLB", "NYY", "New York Yankees")])
        };

        cache.get_with(load).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        let (a, b, c, d) = tokio::join!(
            cache.get_with(load),
            cache.get_with(load),
            cache.get_with(load),
            cache.get_with(load),
        );
        for catalog in [a, b, c, d] {
            assert_eq!(catalog.unwrap().teams().len(), 1);
        }
        // one initial load plus a single refresh after expiry
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        let err = cache
            .get_with(|| async { Err(anyhow::anyhow!("store unreachable")) })
            .await;
        assert!(err.is_err());

        let catalog = cache
            .get_with(|| async { Ok(vec![team("MLB", "NYY", "New York Yankees")]) })
            .await
            .unwrap();
        assert_eq!(catalog.teams().len(), 1);
    }
}
