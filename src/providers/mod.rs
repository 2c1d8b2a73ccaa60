pub mod draftkings;
pub mod espn;
pub mod odds_api;
pub mod prizepicks;

pub use draftkings::DraftKings;
pub use espn::EspnClient;
pub use odds_api::TheOddsApi;
pub use prizepicks::PrizePicks;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::GameLines;

/// Trait every betting-lines provider implements.
#[async_trait]
pub trait LinesProvider: Send + Sync {
    /// Return lines for every NBA game the provider currently quotes,
    /// keyed by canonical team abbreviations.
    async fn fetch_game_lines(&self) -> Result<Vec<GameLines>>;

    /// Human-readable name for logging and reconciliation priority.
    fn name(&self) -> &str;
}

/// Reconciliation priority: lower wins.  Sportsbook feeds outrank the
/// ESPN embedded lines; LLM search grounding is last-resort.
pub fn source_priority(name: &str) -> u8 {
    let n = name.to_lowercase();
    if n.contains("draftkings") {
        0
    } else if n.contains("odds-api") || n.contains("oddsapi") {
        1
    } else if n.contains("espn") {
        2
    } else if n.contains("gemini") {
        3
    } else {
        4
    }
}
