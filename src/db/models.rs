use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game as served to the frontend.  Field names follow the JSON contract
/// the frontend already consumes, hence camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// `home-away` lowercased, optionally `-YYYYMMDD` suffixed
    pub id: String,
    /// "upcoming" | "live" | "final" — upstream status taken as-is
    pub status: String,
    pub home: String,
    pub away: String,
    pub home_name: String,
    pub away_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    /// Tip-off display string for upcoming games
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_win_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_win_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_odds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_odds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ou: Option<String>,
    /// Frozen pre-game lines, attached once an opening snapshot exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening: Option<LinesView>,
}

/// Wire view of one set of lines (moneylines formatted with their sign).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_odds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_odds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ou: Option<String>,
}

/// One source's lines for one game.  Moneylines are American integers,
/// spread/total stay string-formatted the way the books print them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketLines {
    pub home_ml: Option<i32>,
    pub away_ml: Option<i32>,
    pub spread: Option<String>,
    pub total: Option<String>,
}

impl MarketLines {
    pub fn is_empty(&self) -> bool {
        self.home_ml.is_none()
            && self.away_ml.is_none()
            && self.spread.is_none()
            && self.total.is_none()
    }

    /// Fill any missing market from `other` — the "first non-null wins"
    /// merge the reconciler applies in source-priority order.
    pub fn fill_from(&mut self, other: &MarketLines) {
        if self.home_ml.is_none() {
            self.home_ml = other.home_ml;
        }
        if self.away_ml.is_none() {
            self.away_ml = other.away_ml;
        }
        if self.spread.is_none() {
            self.spread = other.spread.clone();
        }
        if self.total.is_none() {
            self.total = other.total.clone();
        }
    }
}

/// Lines for one game as fetched from one provider, keyed by canonical
/// team abbreviations.
#[derive(Debug, Clone)]
pub struct GameLines {
    pub home: String,
    pub away: String,
    pub commence: Option<DateTime<Utc>>,
    pub lines: MarketLines,
}

/// Reconciled per-game odds record: the merged current lines plus the
/// frozen opening snapshot.  This is what the book holds in memory and
/// what gets persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub game_id: String,
    pub home: String,
    pub away: String,
    pub current: MarketLines,
    pub opening: MarketLines,
    /// Highest-priority source that contributed on the last refresh
    pub source: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A player prop.  The live PrizePicks board carries no recommendation;
/// the curated fallback list does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prop {
    pub player: String,
    pub team: String,
    pub game: String,
    pub prop: String,
    pub line: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A saved LLM recommendation, later settled against the final score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub id: Option<i64>,
    pub game_id: String,
    /// "moneyline" | "spread" | "total" | freeform from the LLM
    pub market: String,
    /// e.g. "BOS ML", "OVER 224.5" — freeform text, not a structured bet
    pub selection: String,
    pub odds: Option<String>,
    pub confidence: Option<i32>,
    pub rationale: Option<String>,
    /// "pending" | "won" | "lost" | "push"
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    /// Final-score summary recorded at settlement
    pub result: Option<String>,
}

/// One row of the conference standings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingRow {
    pub abbr: String,
    pub team: String,
    pub w: i64,
    pub l: i64,
    pub pct: String,
    pub streak: String,
}

/// One entry of the injury report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryItem {
    pub team: String,
    pub player: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
