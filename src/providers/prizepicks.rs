use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::db::models::Prop;
use crate::teams;

/// PrizePicks league id for the NBA board.
const NBA_LEAGUE_ID: u32 = 7;

/// Client for the PrizePicks projections API.  The payload is JSON:API:
/// projections reference players through `relationships`, and the player
/// records ride along in `included`.
pub struct PrizePicks {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl PrizePicks {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; nba-edge)")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PrizePicks {
            http,
            base_url: base_url
                .unwrap_or("https://api.prizepicks.com")
                .to_string(),
        })
    }

    /// Current NBA projections board.
    pub async fn fetch_props(&self) -> Result<Vec<Prop>> {
        let url = format!(
            "{}/projections?league_id={}&per_page=250&single_stat=true",
            self.base_url, NBA_LEAGUE_ID
        );
        debug!("Fetching PrizePicks NBA board");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("PrizePicks request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("PrizePicks error: {}", resp.status());
        }

        let raw: Value = resp
            .json()
            .await
            .context("Failed to parse PrizePicks response")?;
        Ok(parse_projections(&raw))
    }
}

// ── Parsing helpers ────────────────────────────────────────────────────────────

struct PlayerRef {
    name: String,
    team: String,
}

fn parse_players(raw: &Value) -> HashMap<String, PlayerRef> {
    let mut players = HashMap::new();
    let Some(included) = raw["included"].as_array() else {
        return players;
    };
    for item in included {
        if item["type"].as_str() != Some("new_player") {
            continue;
        }
        let Some(id) = item["id"].as_str() else {
            continue;
        };
        let attrs = &item["attributes"];
        let Some(name) = attrs["name"].as_str() else {
            continue;
        };
        let team = attrs["team"]
            .as_str()
            .and_then(teams::canonical_abbr)
            .map(str::to_string)
            .unwrap_or_else(|| attrs["team"].as_str().unwrap_or("").to_string());
        players.insert(
            id.to_string(),
            PlayerRef {
                name: name.to_string(),
                team,
            },
        );
    }
    players
}

fn parse_projections(raw: &Value) -> Vec<Prop> {
    let players = parse_players(raw);
    let Some(data) = raw["data"].as_array() else {
        return vec![];
    };

    data.iter()
        .filter_map(|item| {
            if item["type"].as_str() != Some("projection") {
                return None;
            }
            let attrs = &item["attributes"];
            let line = attrs["line_score"]
                .as_f64()
                .or_else(|| attrs["line_score"].as_str().and_then(|s| s.parse().ok()))?;
            let stat = attrs["stat_type"].as_str()?;

            let player_id = item["relationships"]["new_player"]["data"]["id"].as_str()?;
            let player = players.get(player_id)?;

            // "description" is the opponent on the PrizePicks board
            let game = match attrs["description"]
                .as_str()
                .and_then(teams::canonical_abbr)
            {
                Some(opp) => format!("{} vs {}", player.team, opp),
                None => player.team.clone(),
            };

            Some(Prop {
                player: player.name.clone(),
                team: player.team.clone(),
                game,
                prop: stat.to_string(),
                line,
                rec: None,
                conf: None,
                reason: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board_fixture() -> Value {
        json!({
            "data": [{
                "type": "projection",
                "id": "9001",
                "attributes": {
                    "line_score": 27.5,
                    "stat_type": "Points",
                    "description": "GSW"
                },
                "relationships": {
                    "new_player": { "data": { "id": "p1", "type": "new_player" } }
                }
            }],
            "included": [{
                "type": "new_player",
                "id": "p1",
                "attributes": { "name": "Jayson Tatum", "team": "BOS" }
            }]
        })
    }

    #[test]
    fn test_parse_projections() {
        let props = parse_projections(&board_fixture());
        assert_eq!(props.len(), 1);
        let p = &props[0];
        assert_eq!(p.player, "Jayson Tatum");
        assert_eq!(p.team, "BOS");
        assert_eq!(p.game, "BOS vs GSW");
        assert_eq!(p.prop, "Points");
        assert!((p.line - 27.5).abs() < f64::EPSILON);
        assert!(p.rec.is_none());
    }

    #[test]
    fn test_parse_projections_missing_player_skipped() {
        let mut raw = board_fixture();
        raw["included"] = json!([]);
        assert!(parse_projections(&raw).is_empty());
    }

    #[test]
    fn test_parse_projections_empty_payload() {
        assert!(parse_projections(&json!({})).is_empty());
    }
}
