use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub mod models;
use models::*;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database for tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Odds snapshots ───────────────────────────────────────────────────────

    /// Upsert a reconciled odds snapshot.  Opening columns are written
    /// through `excluded` too: the book only ever sends a frozen opening,
    /// so the row always reflects the in-memory record.
    pub fn upsert_odds_snapshot(&self, snap: &OddsSnapshot) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO odds_snapshots (
                game_id, home, away,
                home_ml, away_ml, spread, total,
                opening_home_ml, opening_away_ml, opening_spread, opening_total,
                source, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
             ON CONFLICT(game_id) DO UPDATE SET
                home_ml=excluded.home_ml,
                away_ml=excluded.away_ml,
                spread=excluded.spread,
                total=excluded.total,
                opening_home_ml=excluded.opening_home_ml,
                opening_away_ml=excluded.opening_away_ml,
                opening_spread=excluded.opening_spread,
                opening_total=excluded.opening_total,
                source=excluded.source,
                updated_at=excluded.updated_at",
            params![
                snap.game_id,
                snap.home,
                snap.away,
                snap.current.home_ml,
                snap.current.away_ml,
                snap.current.spread,
                snap.current.total,
                snap.opening.home_ml,
                snap.opening.away_ml,
                snap.opening.spread,
                snap.opening.total,
                snap.source,
                snap.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Load every persisted snapshot (book rehydration on startup)
    pub fn load_odds_snapshots(&self) -> Result<Vec<OddsSnapshot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, home, away,
                    home_ml, away_ml, spread, total,
                    opening_home_ml, opening_away_ml, opening_spread, opening_total,
                    source, updated_at
             FROM odds_snapshots ORDER BY updated_at DESC",
        )?;
        let snaps = stmt
            .query_map([], map_odds_snapshot)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snaps)
    }

    /// Drop snapshots older than the cutoff so old slates don't accumulate
    pub fn prune_odds_snapshots(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM odds_snapshots WHERE updated_at < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }

    // ── Picks ────────────────────────────────────────────────────────────────

    pub fn insert_pick(&self, pick: &Pick) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO picks (
                game_id, market, selection, odds, confidence, rationale,
                status, created_at, settled_at, result
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                pick.game_id,
                pick.market,
                pick.selection,
                pick.odds,
                pick.confidence,
                pick.rationale,
                pick.status,
                pick.created_at,
                pick.settled_at,
                pick.result,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_picks(&self, limit: i64) -> Result<Vec<Pick>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, game_id, market, selection, odds, confidence, rationale,
                    status, created_at, settled_at, result
             FROM picks ORDER BY created_at DESC LIMIT ?1",
        )?;
        let picks = stmt
            .query_map(params![limit], map_pick)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(picks)
    }

    pub fn list_pending_picks(&self) -> Result<Vec<Pick>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, game_id, market, selection, odds, confidence, rationale,
                    status, created_at, settled_at, result
             FROM picks WHERE status='pending' ORDER BY created_at ASC",
        )?;
        let picks = stmt
            .query_map([], map_pick)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(picks)
    }

    pub fn settle_pick(&self, id: i64, status: &str, result: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE picks SET status=?1, result=?2, settled_at=?3 WHERE id=?4",
            params![status, result, Utc::now(), id],
        )?;
        Ok(())
    }

    // ── Stats ────────────────────────────────────────────────────────────────

    /// Aggregate counters for the debug endpoint
    pub fn get_stats(&self) -> Result<Stats> {
        let conn = self.conn.lock().unwrap();
        let odds_snapshots: i64 = conn
            .query_row("SELECT COUNT(*) FROM odds_snapshots", [], |r| r.get(0))
            .unwrap_or(0);
        let total_picks: i64 = conn
            .query_row("SELECT COUNT(*) FROM picks", [], |r| r.get(0))
            .unwrap_or(0);
        let pending_picks: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM picks WHERE status='pending'",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);
        let won_picks: i64 = conn
            .query_row("SELECT COUNT(*) FROM picks WHERE status='won'", [], |r| {
                r.get(0)
            })
            .unwrap_or(0);
        Ok(Stats {
            odds_snapshots,
            total_picks,
            pending_picks,
            won_picks,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_odds_snapshot(row: &rusqlite::Row) -> rusqlite::Result<OddsSnapshot> {
    Ok(OddsSnapshot {
        game_id: row.get(0)?,
        home: row.get(1)?,
        away: row.get(2)?,
        current: MarketLines {
            home_ml: row.get(3)?,
            away_ml: row.get(4)?,
            spread: row.get(5)?,
            total: row.get(6)?,
        },
        opening: MarketLines {
            home_ml: row.get(7)?,
            away_ml: row.get(8)?,
            spread: row.get(9)?,
            total: row.get(10)?,
        },
        source: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn map_pick(row: &rusqlite::Row) -> rusqlite::Result<Pick> {
    Ok(Pick {
        id: row.get(0)?,
        game_id: row.get(1)?,
        market: row.get(2)?,
        selection: row.get(3)?,
        odds: row.get(4)?,
        confidence: row.get(5)?,
        rationale: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        settled_at: row.get(9)?,
        result: row.get(10)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS odds_snapshots (
    game_id          TEXT    PRIMARY KEY,
    home             TEXT    NOT NULL,
    away             TEXT    NOT NULL,
    home_ml          INTEGER,
    away_ml          INTEGER,
    spread           TEXT,
    total            TEXT,
    opening_home_ml  INTEGER,
    opening_away_ml  INTEGER,
    opening_spread   TEXT,
    opening_total    TEXT,
    source           TEXT,
    updated_at       TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS picks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id     TEXT    NOT NULL,
    market      TEXT    NOT NULL,
    selection   TEXT    NOT NULL,
    odds        TEXT,
    confidence  INTEGER,
    rationale   TEXT,
    status      TEXT    NOT NULL DEFAULT 'pending',
    created_at  TEXT    NOT NULL,
    settled_at  TEXT,
    result      TEXT
);

CREATE INDEX IF NOT EXISTS idx_picks_status ON picks(status);
CREATE INDEX IF NOT EXISTS idx_picks_game ON picks(game_id);
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub odds_snapshots: i64,
    pub total_picks: i64,
    pub pending_picks: i64,
    pub won_picks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(game_id: &str) -> OddsSnapshot {
        OddsSnapshot {
            game_id: game_id.to_string(),
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
                spread: Some("BOS -6".into()),
                total: Some("225.0".into()),
            },
            source: Some("draftkings".into()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_odds_snapshot_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_odds_snapshot(&snapshot("gsw-bos")).unwrap();

        let loaded = db.load_odds_snapshots().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].game_id, "gsw-bos");
        assert_eq!(loaded[0].current.home_ml, Some(148));
        assert_eq!(loaded[0].opening.spread.as_deref(), Some("BOS -6"));
        assert_eq!(loaded[0].source.as_deref(), Some("draftkings"));
    }

    #[test]
    fn test_odds_snapshot_upsert_replaces_current_keeps_opening() {
        let db = Database::open_in_memory().unwrap();
        let mut snap = snapshot("gsw-bos");
        db.upsert_odds_snapshot(&snap).unwrap();

        snap.current.home_ml = Some(155);
        snap.current.spread = Some("BOS -5".into());
        db.upsert_odds_snapshot(&snap).unwrap();

        let loaded = db.load_odds_snapshots().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].current.home_ml, Some(155));
        // Opening is whatever the book says it is — unchanged here
        assert_eq!(loaded[0].opening.home_ml, Some(150));
    }

    #[test]
    fn test_pick_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let pick = Pick {
            id: None,
            game_id: "gsw-bos".into(),
            market: "moneyline".into(),
            selection: "BOS ML".into(),
            odds: Some("-175".into()),
            confidence: Some(68),
            rationale: Some("Road favorite with rest edge".into()),
            status: "pending".into(),
            created_at: Utc::now(),
            settled_at: None,
            result: None,
        };
        let id = db.insert_pick(&pick).unwrap();
        assert_eq!(db.list_pending_picks().unwrap().len(), 1);

        db.settle_pick(id, "won", "BOS 118-104 GSW").unwrap();
        assert!(db.list_pending_picks().unwrap().is_empty());

        let all = db.list_picks(10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, "won");
        assert_eq!(all[0].result.as_deref(), Some("BOS 118-104 GSW"));
        assert!(all[0].settled_at.is_some());
    }

    #[test]
    fn test_prune_old_snapshots() {
        let db = Database::open_in_memory().unwrap();
        let mut old = snapshot("lal-dal");
        old.updated_at = Utc::now() - chrono::Duration::days(10);
        db.upsert_odds_snapshot(&old).unwrap();
        db.upsert_odds_snapshot(&snapshot("gsw-bos")).unwrap();

        let removed = db
            .prune_odds_snapshots(Utc::now() - chrono::Duration::days(3))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.load_odds_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn test_stats_counts() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_odds_snapshot(&snapshot("gsw-bos")).unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.odds_snapshots, 1);
        assert_eq!(stats.total_picks, 0);
    }
}
