use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::LinesProvider;
use crate::db::models::{GameLines, MarketLines};
use crate::odds::parse_american;
use crate::teams;

/// NBA event group on the public DraftKings sportsbook API.
const NBA_EVENT_GROUP: &str = "42648";

/// Client for DraftKings' unauthenticated event-group endpoint.  This is a
/// scrape of the same JSON the sportsbook site renders; the shape is
/// undocumented and nested (categories -> subcategories -> offers).
pub struct DraftKings {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl DraftKings {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; nba-edge)")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(DraftKings {
            http,
            base_url: base_url
                .unwrap_or("https://sportsbook.draftkings.com/sites/US-SB/api/v5")
                .to_string(),
        })
    }
}

#[async_trait]
impl LinesProvider for DraftKings {
    fn name(&self) -> &str {
        "DraftKings"
    }

    async fn fetch_game_lines(&self) -> Result<Vec<GameLines>> {
        let url = format!(
            "{}/eventgroups/{}?format=json",
            self.base_url, NBA_EVENT_GROUP
        );
        debug!("Fetching DraftKings event group {}", NBA_EVENT_GROUP);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("DraftKings request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("DraftKings error: {}", resp.status());
        }

        let raw: Value = resp
            .json()
            .await
            .context("Failed to parse DraftKings response")?;

        Ok(parse_event_group(&raw))
    }
}

// ── Parsing helpers ────────────────────────────────────────────────────────────

struct DkEvent {
    home: &'static str,
    away: &'static str,
    commence: Option<DateTime<Utc>>,
}

/// Events name games "AWAY Team @ HOME Team"; team fields carry the same
/// shorthand ("GS Warriors", "LA Clippers").
fn parse_events(event_group: &Value) -> HashMap<String, DkEvent> {
    let mut events = HashMap::new();
    let Some(arr) = event_group["events"].as_array() else {
        return events;
    };
    for ev in arr {
        let Some(id) = ev["eventId"]
            .as_str()
            .map(str::to_string)
            .or_else(|| ev["eventId"].as_i64().map(|v| v.to_string()))
        else {
            continue;
        };
        let away = ev["teamName1"]
            .as_str()
            .or_else(|| ev["name"].as_str().and_then(|n| n.split(" @ ").next()));
        let home = ev["teamName2"]
            .as_str()
            .or_else(|| ev["name"].as_str().and_then(|n| n.split(" @ ").nth(1)));
        let (Some(away), Some(home)) = (
            away.and_then(teams::canonical_abbr),
            home.and_then(teams::canonical_abbr),
        ) else {
            continue;
        };
        let commence = ev["startDate"]
            .as_str()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc));
        events.insert(id, DkEvent { home, away, commence });
    }
    events
}

fn offer_line(offer: &Value, lines: &mut MarketLines, event: &DkEvent) {
    let label = offer["label"].as_str().unwrap_or("").to_lowercase();
    let Some(outcomes) = offer["outcomes"].as_array() else {
        return;
    };

    if label.contains("moneyline") {
        for o in outcomes {
            let Some(price) = o["oddsAmerican"].as_str().and_then(parse_american) else {
                continue;
            };
            match o["label"].as_str().and_then(teams::canonical_abbr) {
                Some(abbr) if abbr == event.home => lines.home_ml = Some(price),
                Some(abbr) if abbr == event.away => lines.away_ml = Some(price),
                _ => {}
            }
        }
    } else if label.contains("spread") {
        // Favorite-form string from the negative-line outcome
        for o in outcomes {
            let Some(line) = o["line"]
                .as_f64()
                .or_else(|| o["line"].as_str().and_then(|s| s.parse().ok()))
            else {
                continue;
            };
            if line < 0.0 {
                if let Some(abbr) = o["label"].as_str().and_then(teams::canonical_abbr) {
                    lines.spread = Some(format!("{} {}", abbr, line));
                }
            }
        }
    } else if label.contains("total") {
        for o in outcomes {
            if o["label"].as_str().map(str::to_lowercase).as_deref() == Some("over") {
                if let Some(line) = o["line"]
                    .as_f64()
                    .or_else(|| o["line"].as_str().and_then(|s| s.parse().ok()))
                {
                    lines.total = Some(format!("{}", line));
                }
            }
        }
    }
}

fn parse_event_group(raw: &Value) -> Vec<GameLines> {
    let event_group = &raw["eventGroup"];
    let events = parse_events(event_group);
    if events.is_empty() {
        return vec![];
    }

    let mut lines_by_event: HashMap<String, MarketLines> = HashMap::new();

    let categories = event_group["offerCategories"].as_array();
    for category in categories.into_iter().flatten() {
        if category["name"].as_str() != Some("Game Lines") {
            continue;
        }
        let descriptors = category["offerSubcategoryDescriptors"].as_array();
        for descriptor in descriptors.into_iter().flatten() {
            let offers = descriptor["offerSubcategory"]["offers"].as_array();
            // offers is a list of per-event offer lists
            for event_offers in offers.into_iter().flatten() {
                for offer in event_offers.as_array().into_iter().flatten() {
                    let Some(event_id) = offer["eventId"]
                        .as_str()
                        .map(str::to_string)
                        .or_else(|| offer["eventId"].as_i64().map(|v| v.to_string()))
                    else {
                        continue;
                    };
                    let Some(event) = events.get(&event_id) else {
                        continue;
                    };
                    let lines = lines_by_event.entry(event_id).or_default();
                    offer_line(offer, lines, event);
                }
            }
        }
    }

    lines_by_event
        .into_iter()
        .filter_map(|(event_id, lines)| {
            if lines.is_empty() {
                return None;
            }
            let event = events.get(&event_id)?;
            Some(GameLines {
                home: event.home.to_string(),
                away: event.away.to_string(),
                commence: event.commence,
                lines,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_group_fixture() -> Value {
        json!({
            "eventGroup": {
                "events": [{
                    "eventId": "301",
                    "name": "BOS Celtics @ GS Warriors",
                    "teamName1": "BOS Celtics",
                    "teamName2": "GS Warriors",
                    "startDate": "2026-02-20T03:00:00Z"
                }],
                "offerCategories": [{
                    "name": "Game Lines",
                    "offerSubcategoryDescriptors": [{
                        "offerSubcategory": {
                            "offers": [[
                                {
                                    "eventId": "301",
                                    "label": "Moneyline",
                                    "outcomes": [
                                        { "label": "GS Warriors", "oddsAmerican": "+148" },
                                        { "label": "BOS Celtics", "oddsAmerican": "-175" }
                                    ]
                                },
                                {
                                    "eventId": "301",
                                    "label": "Spread",
                                    "outcomes": [
                                        { "label": "BOS Celtics", "line": -5.5, "oddsAmerican": "-110" },
                                        { "label": "GS Warriors", "line": 5.5, "oddsAmerican": "-110" }
                                    ]
                                },
                                {
                                    "eventId": "301",
                                    "label": "Total",
                                    "outcomes": [
                                        { "label": "Over", "line": 224.5, "oddsAmerican": "-110" },
                                        { "label": "Under", "line": 224.5, "oddsAmerican": "-110" }
                                    ]
                                }
                            ]]
                        }
                    }]
                }]
            }
        })
    }

    #[test]
    fn test_parse_event_group_full_lines() {
        let lines = parse_event_group(&event_group_fixture());
        assert_eq!(lines.len(), 1);
        let gl = &lines[0];
        assert_eq!(gl.home, "GSW");
        assert_eq!(gl.away, "BOS");
        assert_eq!(gl.lines.home_ml, Some(148));
        assert_eq!(gl.lines.away_ml, Some(-175));
        assert_eq!(gl.lines.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(gl.lines.total.as_deref(), Some("224.5"));
        assert!(gl.commence.is_some());
    }

    #[test]
    fn test_parse_event_group_ignores_other_categories() {
        let mut raw = event_group_fixture();
        raw["eventGroup"]["offerCategories"][0]["name"] = json!("Player Props");
        assert!(parse_event_group(&raw).is_empty());
    }

    #[test]
    fn test_parse_event_group_empty() {
        assert!(parse_event_group(&json!({})).is_empty());
    }
}
