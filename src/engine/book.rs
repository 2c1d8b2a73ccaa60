//! In-memory odds book: the reconciled per-game betting lines.
//!
//! Every refresh round hands the book one batch per source.  Sources are
//! merged in fixed priority order (DraftKings, Odds-API, ESPN, Gemini);
//! per market the first non-null value wins.  Two retention rules sit on
//! top of the merge:
//!
//! * **opening** — the first line seen for a game while it is still
//!   `upcoming` is frozen per market and never overwritten.
//! * **sticky** — once a game goes live or final, sources stop quoting it;
//!   the last known pre-game lines stay on the record so the frontend can
//!   keep displaying them.
//!
//! The book is hydrated from SQLite on startup and hands back the records
//! it touched each round so they can be persisted again.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::models::{Game, GameLines, LinesView, MarketLines, OddsSnapshot};
use crate::odds::format_american;
use crate::providers::source_priority;
use crate::teams;

/// Thread-safe reconciled odds keyed by game id.
#[derive(Clone)]
pub struct OddsBook {
    inner: Arc<RwLock<HashMap<String, OddsSnapshot>>>,
}

impl OddsBook {
    pub fn new() -> Self {
        OddsBook {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load persisted snapshots (startup rehydration).
    pub async fn hydrate(&self, snapshots: Vec<OddsSnapshot>) {
        let mut inner = self.inner.write().await;
        for snap in snapshots {
            inner.insert(snap.game_id.clone(), snap);
        }
        debug!("OddsBook hydrated with {} snapshots", inner.len());
    }

    /// Merge one refresh round and return the records that changed.
    ///
    /// `batches` is (source name, that source's lines); `status_by_game`
    /// maps game id to its scoreboard status and gates opening freezes.
    /// Games absent from every batch are left untouched (sticky).
    pub async fn merge_round(
        &self,
        mut batches: Vec<(String, Vec<GameLines>)>,
        status_by_game: &HashMap<String, String>,
    ) -> Vec<OddsSnapshot> {
        batches.sort_by_key(|(source, _)| source_priority(source));

        // game id -> (source-ordered contributions)
        let mut contributions: HashMap<String, Vec<(String, GameLines)>> = HashMap::new();
        for (source, batch) in batches {
            for gl in batch {
                let id = teams::game_id(&gl.home, &gl.away);
                contributions
                    .entry(id)
                    .or_default()
                    .push((source.clone(), gl));
            }
        }

        let mut inner = self.inner.write().await;
        let mut dirty = Vec::new();

        for (game_id, sources) in contributions {
            // Priority-ordered first-non-null merge across sources
            let mut merged = MarketLines::default();
            let mut winning_source: Option<String> = None;
            for (source, gl) in &sources {
                let before = merged.clone();
                merged.fill_from(&gl.lines);
                if winning_source.is_none() && merged != before {
                    winning_source = Some(source.clone());
                }
            }
            if merged.is_empty() {
                continue;
            }

            let status = status_by_game
                .get(&game_id)
                .map(String::as_str)
                .unwrap_or("upcoming");

            let (home, away) = (&sources[0].1.home, &sources[0].1.away);
            let entry = inner.entry(game_id.clone()).or_insert_with(|| OddsSnapshot {
                game_id: game_id.clone(),
                home: home.clone(),
                away: away.clone(),
                current: MarketLines::default(),
                opening: MarketLines::default(),
                source: None,
                updated_at: Utc::now(),
            });

            // Sticky current: fresh values replace, missing markets keep
            // their last known value.
            let mut current = merged.clone();
            current.fill_from(&entry.current);

            // Opening freezes per market while the game is still upcoming.
            let mut opening = entry.opening.clone();
            if status == "upcoming" {
                opening.fill_from(&merged);
            }

            let changed = current != entry.current
                || opening != entry.opening
                || winning_source != entry.source;
            entry.current = current;
            entry.opening = opening;
            entry.source = winning_source;
            entry.updated_at = Utc::now();

            if changed {
                dirty.push(entry.clone());
            }
        }

        dirty
    }

    pub async fn snapshot_for(&self, game_id: &str) -> Option<OddsSnapshot> {
        self.inner.read().await.get(game_id).cloned()
    }

    /// All records, for the debug endpoint.
    pub async fn all(&self) -> Vec<OddsSnapshot> {
        let mut snaps: Vec<OddsSnapshot> = self.inner.read().await.values().cloned().collect();
        snaps.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        snaps
    }

    /// Attach reconciled odds to scoreboard games: formatted moneylines,
    /// spread/total strings, the frozen opening view, and devigged implied
    /// win probabilities for upcoming games.
    pub async fn decorate_games(&self, games: &mut [Game]) {
        let inner = self.inner.read().await;
        for game in games.iter_mut() {
            let Some(snap) = inner.get(&game.id) else {
                continue;
            };

            game.home_odds = snap.current.home_ml.map(format_american);
            game.away_odds = snap.current.away_ml.map(format_american);
            game.spread = snap.current.spread.clone();
            game.ou = snap.current.total.clone();

            if !snap.opening.is_empty() {
                game.opening = Some(LinesView {
                    home_odds: snap.opening.home_ml.map(format_american),
                    away_odds: snap.opening.away_ml.map(format_american),
                    spread: snap.opening.spread.clone(),
                    ou: snap.opening.total.clone(),
                });
            }

            if game.status == "upcoming" {
                if let (Some(home_ml), Some(away_ml)) =
                    (snap.current.home_ml, snap.current.away_ml)
                {
                    if let Some((home, away)) =
                        crate::providers::espn::win_probs_from_moneylines(home_ml, away_ml)
                    {
                        game.home_win_prob = Some(home);
                        game.away_win_prob = Some(away);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(
        home: &str,
        away: &str,
        home_ml: Option<i32>,
        away_ml: Option<i32>,
        spread: Option<&str>,
        total: Option<&str>,
    ) -> GameLines {
        GameLines {
            home: home.to_string(),
            away: away.to_string(),
            commence: None,
            lines: MarketLines {
                home_ml,
                away_ml,
                spread: spread.map(str::to_string),
                total: total.map(str::to_string),
            },
        }
    }

    fn upcoming(game_id: &str) -> HashMap<String, String> {
        HashMap::from([(game_id.to_string(), "upcoming".to_string())])
    }

    #[tokio::test]
    async fn test_higher_priority_source_wins_per_market() {
        let book = OddsBook::new();
        let dirty = book
            .merge_round(
                vec![
                    (
                        "The Odds-API".into(),
                        vec![lines("GSW", "BOS", Some(150), Some(-180), Some("BOS -6"), None)],
                    ),
                    (
                        "DraftKings".into(),
                        vec![lines("GSW", "BOS", Some(148), Some(-175), None, Some("224.5"))],
                    ),
                ],
                &upcoming("gsw-bos"),
            )
            .await;

        assert_eq!(dirty.len(), 1);
        let snap = &dirty[0];
        // DraftKings outranks Odds-API where both quoted
        assert_eq!(snap.current.home_ml, Some(148));
        assert_eq!(snap.current.away_ml, Some(-175));
        // Odds-API fills the market DraftKings lacked
        assert_eq!(snap.current.spread.as_deref(), Some("BOS -6"));
        assert_eq!(snap.current.total.as_deref(), Some("224.5"));
        assert_eq!(snap.source.as_deref(), Some("DraftKings"));
    }

    #[tokio::test]
    async fn test_opening_freezes_on_first_sight() {
        let book = OddsBook::new();
        let statuses = upcoming("gsw-bos");

        book.merge_round(
            vec![(
                "DraftKings".into(),
                vec![lines("GSW", "BOS", Some(150), Some(-180), Some("BOS -6"), None)],
            )],
            &statuses,
        )
        .await;

        // Line moves and the total appears later
        book.merge_round(
            vec![(
                "DraftKings".into(),
                vec![lines("GSW", "BOS", Some(148), Some(-175), Some("BOS -5.5"), Some("224.5"))],
            )],
            &statuses,
        )
        .await;

        let snap = book.snapshot_for("gsw-bos").await.unwrap();
        // Current tracks the move
        assert_eq!(snap.current.home_ml, Some(148));
        assert_eq!(snap.current.spread.as_deref(), Some("BOS -5.5"));
        // Opening keeps the first value per market; late markets still fill
        assert_eq!(snap.opening.home_ml, Some(150));
        assert_eq!(snap.opening.spread.as_deref(), Some("BOS -6"));
        assert_eq!(snap.opening.total.as_deref(), Some("224.5"));
    }

    #[tokio::test]
    async fn test_opening_does_not_fill_once_live() {
        let book = OddsBook::new();
        book.merge_round(
            vec![(
                "DraftKings".into(),
                vec![lines("GSW", "BOS", Some(150), None, None, None)],
            )],
            &upcoming("gsw-bos"),
        )
        .await;

        let live = HashMap::from([("gsw-bos".to_string(), "live".to_string())]);
        book.merge_round(
            vec![(
                "The Odds-API".into(),
                vec![lines("GSW", "BOS", Some(200), Some(-250), Some("BOS -8"), None)],
            )],
            &live,
        )
        .await;

        let snap = book.snapshot_for("gsw-bos").await.unwrap();
        // Current still updates in-play
        assert_eq!(snap.current.home_ml, Some(200));
        // Opening stays as it was pre-game: the spread never opened
        assert_eq!(snap.opening.home_ml, Some(150));
        assert!(snap.opening.spread.is_none());
    }

    #[tokio::test]
    async fn test_sticky_lines_survive_source_dropout() {
        let book = OddsBook::new();
        book.merge_round(
            vec![(
                "DraftKings".into(),
                vec![lines("GSW", "BOS", Some(148), Some(-175), Some("BOS -5.5"), Some("224.5"))],
            )],
            &upcoming("gsw-bos"),
        )
        .await;

        // Game went live; every book pulled the game, round has no lines
        let live = HashMap::from([("gsw-bos".to_string(), "live".to_string())]);
        let dirty = book.merge_round(vec![("DraftKings".into(), vec![])], &live).await;
        assert!(dirty.is_empty());

        let snap = book.snapshot_for("gsw-bos").await.unwrap();
        assert_eq!(snap.current.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(snap.current.home_ml, Some(148));
    }

    #[tokio::test]
    async fn test_partial_round_keeps_last_known_markets() {
        let book = OddsBook::new();
        let statuses = upcoming("gsw-bos");
        book.merge_round(
            vec![(
                "DraftKings".into(),
                vec![lines("GSW", "BOS", Some(148), Some(-175), Some("BOS -5.5"), Some("224.5"))],
            )],
            &statuses,
        )
        .await;

        // Next round only the moneylines come back
        book.merge_round(
            vec![(
                "DraftKings".into(),
                vec![lines("GSW", "BOS", Some(152), Some(-178), None, None)],
            )],
            &statuses,
        )
        .await;

        let snap = book.snapshot_for("gsw-bos").await.unwrap();
        assert_eq!(snap.current.home_ml, Some(152));
        assert_eq!(snap.current.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(snap.current.total.as_deref(), Some("224.5"));
    }

    #[tokio::test]
    async fn test_hydrate_then_decorate() {
        let book = OddsBook::new();
        book.hydrate(vec![OddsSnapshot {
            game_id: "gsw-bos".into(),
            home: "GSW".into(),
            away: "BOS".into(),
            current: MarketLines {
                home_ml: Some(148),
                away_ml: Some(-175),
                spread: Some("BOS -5.5".into()),
                total: Some("224.5".into()),
            },
            opening: MarketLines {
                home_ml: Some(150),
                away_ml: Some(-180),
                spread: None,
                total: None,
            },
            source: Some("DraftKings".into()),
            updated_at: Utc::now(),
        }])
        .await;

        let mut games = vec![Game {
            id: "gsw-bos".into(),
            status: "upcoming".into(),
            home: "GSW".into(),
            away: "BOS".into(),
            home_name: "Warriors".into(),
            away_name: "Celtics".into(),
            home_score: None,
            away_score: None,
            quarter: None,
            clock: None,
            time: Some("7:00 PM PT".into()),
            home_win_prob: None,
            away_win_prob: None,
            home_odds: None,
            away_odds: None,
            spread: None,
            ou: None,
            opening: None,
        }];
        book.decorate_games(&mut games).await;

        let game = &games[0];
        assert_eq!(game.home_odds.as_deref(), Some("+148"));
        assert_eq!(game.away_odds.as_deref(), Some("-175"));
        assert_eq!(game.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(game.ou.as_deref(), Some("224.5"));
        assert!(game.home_win_prob.is_some());
        let opening = game.opening.as_ref().unwrap();
        assert_eq!(opening.home_odds.as_deref(), Some("+150"));
    }
}
