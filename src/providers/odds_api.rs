use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::LinesProvider;
use crate::db::models::{GameLines, MarketLines};
use crate::teams;

/// Client for the-odds-api.com v4.  Events are keyed by full team names
/// ("Golden State Warriors"); quota usage is reported via response headers.
pub struct TheOddsApi {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    home_team: String,
    away_team: String,
    #[serde(default)]
    commence_time: Option<DateTime<Utc>>,
    #[serde(default)]
    bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize)]
struct Bookmaker {
    key: String,
    #[serde(default)]
    markets: Vec<BookMarket>,
}

#[derive(Debug, Deserialize)]
struct BookMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<BookOutcome>,
}

#[derive(Debug, Deserialize)]
struct BookOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

impl TheOddsApi {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TheOddsApi {
            http,
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or("https://api.the-odds-api.com/v4")
                .to_string(),
        })
    }

    fn quota_header(headers: &reqwest::header::HeaderMap, name: &str) -> u64 {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v as u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl LinesProvider for TheOddsApi {
    fn name(&self) -> &str {
        "The Odds-API"
    }

    async fn fetch_game_lines(&self) -> Result<Vec<GameLines>> {
        let url = format!(
            "{}/sports/basketball_nba/odds?apiKey={}&regions=us&markets=h2h,spreads,totals&oddsFormat=american",
            self.base_url, self.api_key,
        );
        debug!("Fetching NBA odds from the-odds-api");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("the-odds-api request failed")?;

        let used = Self::quota_header(resp.headers(), "x-requests-used");
        let remaining = Self::quota_header(resp.headers(), "x-requests-remaining");
        if remaining > 0 && remaining < 50 {
            warn!("the-odds-api quota low: {} used, {} remaining", used, remaining);
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("the-odds-api error {}: {}", status, body);
        }

        let events: Vec<OddsEvent> = resp
            .json()
            .await
            .context("failed to parse the-odds-api response")?;

        Ok(events.iter().filter_map(event_lines).collect())
    }
}

/// Reduce one event's bookmaker list to a single set of lines.
/// DraftKings-keyed books first so the figures match what the frontend's
/// users see; any remaining book fills the gaps.
fn event_lines(event: &OddsEvent) -> Option<GameLines> {
    let home = teams::canonical_abbr(&event.home_team)?;
    let away = teams::canonical_abbr(&event.away_team)?;

    let mut lines = MarketLines::default();
    let mut books: Vec<&Bookmaker> = event.bookmakers.iter().collect();
    books.sort_by_key(|b| if b.key == "draftkings" { 0 } else { 1 });

    for book in books {
        lines.fill_from(&book_lines(book, &event.home_team, &event.away_team));
        if lines.home_ml.is_some() && lines.spread.is_some() && lines.total.is_some() {
            break;
        }
    }

    if lines.is_empty() {
        return None;
    }
    Some(GameLines {
        home: home.to_string(),
        away: away.to_string(),
        commence: event.commence_time,
        lines,
    })
}

fn book_lines(book: &Bookmaker, home_team: &str, away_team: &str) -> MarketLines {
    let mut lines = MarketLines::default();

    for market in &book.markets {
        match market.key.as_str() {
            "h2h" => {
                for o in &market.outcomes {
                    let price = o.price.round() as i32;
                    if price.abs() < 100 {
                        continue;
                    }
                    if o.name == home_team {
                        lines.home_ml = Some(price);
                    } else if o.name == away_team {
                        lines.away_ml = Some(price);
                    }
                }
            }
            "spreads" => {
                // Favorite-form string, e.g. "BOS -5.5"
                let favorite = market
                    .outcomes
                    .iter()
                    .filter(|o| o.point.is_some_and(|p| p < 0.0))
                    .min_by(|a, b| {
                        a.point
                            .partial_cmp(&b.point)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                if let Some(fav) = favorite {
                    if let (Some(abbr), Some(point)) =
                        (teams::canonical_abbr(&fav.name), fav.point)
                    {
                        lines.spread = Some(format!("{} {}", abbr, point));
                    }
                }
            }
            "totals" => {
                if let Some(over) = market.outcomes.iter().find(|o| o.name == "Over") {
                    if let Some(point) = over.point {
                        lines.total = Some(format!("{}", point));
                    }
                }
            }
            _ => {}
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_fixture() -> OddsEvent {
        serde_json::from_value(serde_json::json!({
            "home_team": "Golden State Warriors",
            "away_team": "Boston Celtics",
            "commence_time": "2026-02-20T03:00:00Z",
            "bookmakers": [
                {
                    "key": "fanduel",
                    "markets": [
                        { "key": "h2h", "outcomes": [
                            { "name": "Golden State Warriors", "price": 150.0 },
                            { "name": "Boston Celtics", "price": -178.0 }
                        ]}
                    ]
                },
                {
                    "key": "draftkings",
                    "markets": [
                        { "key": "h2h", "outcomes": [
                            { "name": "Golden State Warriors", "price": 148.0 },
                            { "name": "Boston Celtics", "price": -175.0 }
                        ]},
                        { "key": "spreads", "outcomes": [
                            { "name": "Boston Celtics", "price": -110.0, "point": -5.5 },
                            { "name": "Golden State Warriors", "price": -110.0, "point": 5.5 }
                        ]},
                        { "key": "totals", "outcomes": [
                            { "name": "Over", "price": -110.0, "point": 224.5 },
                            { "name": "Under", "price": -110.0, "point": 224.5 }
                        ]}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_event_lines_prefers_draftkings_book() {
        let gl = event_lines(&event_fixture()).unwrap();
        assert_eq!(gl.home, "GSW");
        assert_eq!(gl.away, "BOS");
        // DraftKings figures, not FanDuel's
        assert_eq!(gl.lines.home_ml, Some(148));
        assert_eq!(gl.lines.away_ml, Some(-175));
        assert_eq!(gl.lines.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(gl.lines.total.as_deref(), Some("224.5"));
    }

    #[test]
    fn test_event_lines_unknown_team_skipped() {
        let event: OddsEvent = serde_json::from_value(serde_json::json!({
            "home_team": "Harlem Globetrotters",
            "away_team": "Boston Celtics",
            "bookmakers": []
        }))
        .unwrap();
        assert!(event_lines(&event).is_none());
    }

    #[test]
    fn test_event_lines_empty_books_skipped() {
        let event: OddsEvent = serde_json::from_value(serde_json::json!({
            "home_team": "Golden State Warriors",
            "away_team": "Boston Celtics",
            "bookmakers": []
        }))
        .unwrap();
        assert!(event_lines(&event).is_none());
    }
}
