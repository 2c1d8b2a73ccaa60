//! Last-known-good cache for upstream snapshots.
//!
//! The background refresher writes here on every successful fetch; HTTP
//! handlers only ever read.  When an upstream call fails the refresher
//! simply skips the write, so handlers keep serving the previous snapshot.
//! Handlers fall back to the curated data in [`super::fallback`] when a
//! section has never been populated.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::models::{Game, InjuryItem, Prop};
use crate::providers::espn::Standings;

#[derive(Default)]
struct SlateInner {
    games: Vec<Game>,
    games_at: Option<DateTime<Utc>>,
    standings: Option<Standings>,
    standings_at: Option<DateTime<Utc>>,
    props: Vec<Prop>,
    props_at: Option<DateTime<Utc>>,
    injuries: Vec<InjuryItem>,
    injuries_at: Option<DateTime<Utc>>,
}

/// Thread-safe snapshot cache shared between refresher and handlers.
#[derive(Clone)]
pub struct SlateCache {
    inner: Arc<RwLock<SlateInner>>,
}

impl SlateCache {
    pub fn new() -> Self {
        SlateCache {
            inner: Arc::new(RwLock::new(SlateInner::default())),
        }
    }

    pub async fn set_games(&self, games: Vec<Game>) {
        let mut inner = self.inner.write().await;
        inner.games = games;
        inner.games_at = Some(Utc::now());
    }

    pub async fn games(&self) -> Vec<Game> {
        self.inner.read().await.games.clone()
    }

    pub async fn games_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.games_at
    }

    /// game id -> status, used to gate opening-line freezes.
    pub async fn status_map(&self) -> HashMap<String, String> {
        self.inner
            .read()
            .await
            .games
            .iter()
            .map(|g| (g.id.clone(), g.status.clone()))
            .collect()
    }

    pub async fn set_standings(&self, standings: Standings) {
        let mut inner = self.inner.write().await;
        inner.standings = Some(standings);
        inner.standings_at = Some(Utc::now());
    }

    pub async fn standings(&self) -> Option<Standings> {
        self.inner.read().await.standings.clone()
    }

    pub async fn set_props(&self, props: Vec<Prop>) {
        let mut inner = self.inner.write().await;
        inner.props = props;
        inner.props_at = Some(Utc::now());
    }

    pub async fn props(&self) -> Vec<Prop> {
        self.inner.read().await.props.clone()
    }

    pub async fn set_injuries(&self, injuries: Vec<InjuryItem>) {
        let mut inner = self.inner.write().await;
        inner.injuries = injuries;
        inner.injuries_at = Some(Utc::now());
    }

    pub async fn injuries(&self) -> Vec<InjuryItem> {
        self.inner.read().await.injuries.clone()
    }

    pub async fn injuries_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.injuries_at
    }

    /// Timestamps for the debug endpoint.
    pub async fn freshness(&self) -> HashMap<&'static str, Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        HashMap::from([
            ("games", inner.games_at),
            ("standings", inner.standings_at),
            ("props", inner.props_at),
            ("injuries", inner.injuries_at),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, status: &str) -> Game {
        Game {
            id: id.into(),
            status: status.into(),
            home: "GSW".into(),
            away: "BOS".into(),
            home_name: "Warriors".into(),
            away_name: "Celtics".into(),
            home_score: None,
            away_score: None,
            quarter: None,
            clock: None,
            time: None,
            home_win_prob: None,
            away_win_prob: None,
            home_odds: None,
            away_odds: None,
            spread: None,
            ou: None,
            opening: None,
        }
    }

    #[tokio::test]
    async fn test_games_round_trip_and_status_map() {
        let cache = SlateCache::new();
        assert!(cache.games().await.is_empty());
        assert!(cache.games_fetched_at().await.is_none());

        cache
            .set_games(vec![game("gsw-bos", "upcoming"), game("nyk-det", "live")])
            .await;

        assert_eq!(cache.games().await.len(), 2);
        assert!(cache.games_fetched_at().await.is_some());

        let statuses = cache.status_map().await;
        assert_eq!(statuses.get("gsw-bos").map(String::as_str), Some("upcoming"));
        assert_eq!(statuses.get("nyk-det").map(String::as_str), Some("live"));
    }

    #[tokio::test]
    async fn test_standings_start_empty() {
        let cache = SlateCache::new();
        assert!(cache.standings().await.is_none());
    }
}
