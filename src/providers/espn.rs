use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::LinesProvider;
use crate::db::models::{Game, GameLines, InjuryItem, MarketLines, StandingRow};
use crate::teams;

/// Client for ESPN's unauthenticated site API.
/// Scoreboard docs are informal; the JSON shape is whatever ESPN ships today.
pub struct EspnClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

/// Conference standings split the way the frontend renders them.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Standings {
    #[serde(rename = "East")]
    pub east: Vec<StandingRow>,
    #[serde(rename = "West")]
    pub west: Vec<StandingRow>,
}

impl EspnClient {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EspnClient {
            http,
            base_url: base_url
                .unwrap_or("https://site.api.espn.com/apis/site/v2/sports/basketball/nba")
                .to_string(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Value> {
        debug!("Fetching {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("ESPN request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("ESPN error: {}", resp.status());
        }
        resp.json().await.context("Failed to parse ESPN response")
    }

    /// Today's scoreboard: every game with scores, status and clock.
    pub async fn fetch_scoreboard(&self) -> Result<Vec<Game>> {
        let url = format!("{}/scoreboard", self.base_url);
        let raw = self.fetch(&url).await?;
        Ok(parse_scoreboard(&raw))
    }

    /// Conference standings.
    pub async fn fetch_standings(&self) -> Result<Standings> {
        // The standings document lives under /apis/v2 instead of
        // /apis/site/v2; ESPN keys conferences as "children" groups.
        let url = format!(
            "{}/standings?level=2",
            self.base_url.replace("/apis/site/v2/", "/apis/v2/")
        );
        let raw = self.fetch(&url).await?;
        Ok(parse_standings(&raw))
    }

    /// League-wide injury report.
    pub async fn fetch_injuries(&self) -> Result<Vec<InjuryItem>> {
        let url = format!("{}/injuries", self.base_url);
        let raw = self.fetch(&url).await?;
        Ok(parse_injuries(&raw))
    }
}

#[async_trait]
impl LinesProvider for EspnClient {
    fn name(&self) -> &str {
        "ESPN"
    }

    /// ESPN embeds a single consensus line per scoreboard event; surface it
    /// as a low-priority lines source for the reconciler.
    async fn fetch_game_lines(&self) -> Result<Vec<GameLines>> {
        let url = format!("{}/scoreboard", self.base_url);
        let raw = self.fetch(&url).await?;
        Ok(parse_scoreboard_lines(&raw))
    }
}

// ── Parsing helpers ────────────────────────────────────────────────────────────

fn status_from_state(state: &str) -> &'static str {
    match state {
        "pre" => "upcoming",
        "post" => "final",
        _ => "live",
    }
}

fn competitor<'a>(competition: &'a Value, side: &str) -> Option<&'a Value> {
    competition["competitors"]
        .as_array()?
        .iter()
        .find(|c| c["homeAway"].as_str() == Some(side))
}

fn team_abbr(competitor: &Value) -> Option<&'static str> {
    let team = &competitor["team"];
    team["abbreviation"]
        .as_str()
        .and_then(teams::canonical_abbr)
        .or_else(|| team["displayName"].as_str().and_then(teams::canonical_abbr))
}

fn team_nickname(competitor: &Value, abbr: &str) -> String {
    competitor["team"]["shortDisplayName"]
        .as_str()
        .or_else(|| competitor["team"]["name"].as_str())
        .map(str::to_string)
        .or_else(|| teams::nickname(abbr).map(str::to_string))
        .unwrap_or_else(|| abbr.to_string())
}

fn score_of(competitor: &Value) -> Option<i32> {
    competitor["score"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| competitor["score"].as_i64().map(|v| v as i32))
}

fn parse_event(event: &Value) -> Option<Game> {
    let competition = event["competitions"].as_array()?.first()?;
    let home = competitor(competition, "home")?;
    let away = competitor(competition, "away")?;
    let home_abbr = team_abbr(home)?;
    let away_abbr = team_abbr(away)?;

    let state = event["status"]["type"]["state"].as_str().unwrap_or("pre");
    let status = status_from_state(state);

    let mut game = Game {
        id: teams::game_id(home_abbr, away_abbr),
        status: status.to_string(),
        home: home_abbr.to_string(),
        away: away_abbr.to_string(),
        home_name: team_nickname(home, home_abbr),
        away_name: team_nickname(away, away_abbr),
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
    };

    match status {
        "upcoming" => {
            game.time = event["status"]["type"]["shortDetail"]
                .as_str()
                .map(str::to_string)
                .or_else(|| event["date"].as_str().map(str::to_string));
        }
        _ => {
            game.home_score = score_of(home);
            game.away_score = score_of(away);
            game.quarter = event["status"]["period"].as_i64().map(|v| v as i32);
            game.clock = event["status"]["displayClock"]
                .as_str()
                .map(str::to_string);
        }
    }

    Some(game)
}

fn parse_scoreboard(raw: &Value) -> Vec<Game> {
    raw["events"]
        .as_array()
        .map(|events| events.iter().filter_map(parse_event).collect())
        .unwrap_or_default()
}

/// Extract the embedded consensus odds from a scoreboard event.
fn parse_event_lines(event: &Value) -> Option<GameLines> {
    let competition = event["competitions"].as_array()?.first()?;
    let home_abbr = team_abbr(competitor(competition, "home")?)?;
    let away_abbr = team_abbr(competitor(competition, "away")?)?;

    let odds = competition["odds"].as_array()?.first()?;

    let ml_of = |v: &Value| -> Option<i32> {
        v.as_i64()
            .map(|n| n as i32)
            .or_else(|| v.as_str().and_then(crate::odds::parse_american))
    };
    let home_ml = ml_of(&odds["homeTeamOdds"]["moneyLine"]);
    let away_ml = ml_of(&odds["awayTeamOdds"]["moneyLine"]);

    // "details" is the favorite-form spread string, e.g. "BOS -5.5"
    let spread = odds["details"].as_str().map(str::to_string);
    let total = odds["overUnder"]
        .as_f64()
        .map(|v| format!("{}", v))
        .or_else(|| odds["overUnder"].as_str().map(str::to_string));

    let lines = MarketLines {
        home_ml,
        away_ml,
        spread,
        total,
    };
    if lines.is_empty() {
        return None;
    }

    let commence = event["date"]
        .as_str()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc));

    Some(GameLines {
        home: home_abbr.to_string(),
        away: away_abbr.to_string(),
        commence,
        lines,
    })
}

fn parse_scoreboard_lines(raw: &Value) -> Vec<GameLines> {
    raw["events"]
        .as_array()
        .map(|events| events.iter().filter_map(parse_event_lines).collect())
        .unwrap_or_default()
}

fn stat_display(stats: &[Value], name: &str) -> Option<String> {
    stats
        .iter()
        .find(|s| s["name"].as_str() == Some(name))
        .and_then(|s| {
            s["displayValue"]
                .as_str()
                .map(str::to_string)
                .or_else(|| s["value"].as_f64().map(|v| v.to_string()))
        })
}

fn stat_int(stats: &[Value], name: &str) -> Option<i64> {
    stats
        .iter()
        .find(|s| s["name"].as_str() == Some(name))
        .and_then(|s| {
            s["value"]
                .as_f64()
                .map(|v| v as i64)
                .or_else(|| s["displayValue"].as_str().and_then(|d| d.parse().ok()))
        })
}

fn parse_standing_entry(entry: &Value) -> Option<StandingRow> {
    let team = &entry["team"];
    let abbr = team["abbreviation"]
        .as_str()
        .and_then(teams::canonical_abbr)
        .or_else(|| team["displayName"].as_str().and_then(teams::canonical_abbr))?;
    let name = team["displayName"]
        .as_str()
        .map(str::to_string)
        .or_else(|| teams::full_name(abbr))?;

    let stats = entry["stats"].as_array()?;
    Some(StandingRow {
        abbr: abbr.to_string(),
        team: name,
        w: stat_int(stats, "wins")?,
        l: stat_int(stats, "losses")?,
        pct: stat_display(stats, "winPercent").unwrap_or_else(|| "-".to_string()),
        streak: stat_display(stats, "streak").unwrap_or_else(|| "-".to_string()),
    })
}

fn parse_standings(raw: &Value) -> Standings {
    let mut standings = Standings::default();
    let Some(children) = raw["children"].as_array() else {
        return standings;
    };
    for conference in children {
        let name = conference["name"]
            .as_str()
            .or_else(|| conference["abbreviation"].as_str())
            .unwrap_or("");
        let rows: Vec<StandingRow> = conference["standings"]["entries"]
            .as_array()
            .map(|entries| entries.iter().filter_map(parse_standing_entry).collect())
            .unwrap_or_default();
        if name.to_lowercase().contains("east") {
            standings.east = rows;
        } else if name.to_lowercase().contains("west") {
            standings.west = rows;
        }
    }
    standings
}

fn parse_injuries(raw: &Value) -> Vec<InjuryItem> {
    let Some(teams_arr) = raw["injuries"].as_array() else {
        return vec![];
    };

    let mut items = Vec::new();
    for team_block in teams_arr {
        let team = team_block["displayName"]
            .as_str()
            .and_then(teams::canonical_abbr)
            .map(str::to_string)
            .unwrap_or_else(|| team_block["displayName"].as_str().unwrap_or("").to_string());

        let Some(entries) = team_block["injuries"].as_array() else {
            continue;
        };
        for entry in entries {
            let Some(player) = entry["athlete"]["displayName"].as_str() else {
                continue;
            };
            let status = entry["status"]
                .as_str()
                .map(str::to_string)
                .or_else(|| entry["status"]["name"].as_str().map(str::to_string))
                .unwrap_or_else(|| "Unknown".to_string());
            items.push(InjuryItem {
                team: team.clone(),
                player: player.to_string(),
                position: entry["athlete"]["position"]["abbreviation"]
                    .as_str()
                    .map(str::to_string),
                status,
                comment: entry["shortComment"]
                    .as_str()
                    .or_else(|| entry["longComment"].as_str())
                    .map(str::to_string),
            });
        }
    }
    items
}

/// Format a devigged implied-probability pair from two moneylines, as a
/// percentage rounded to one decimal.  Returns `None` without both lines.
pub fn win_probs_from_moneylines(home_ml: i32, away_ml: i32) -> Option<(f64, f64)> {
    let home = crate::odds::american_to_decimal(home_ml)?;
    let away = crate::odds::american_to_decimal(away_ml)?;
    let raw_home = crate::odds::implied_probability(home);
    let raw_away = crate::odds::implied_probability(away);
    let overround = raw_home + raw_away;
    if overround <= 0.0 {
        return None;
    }
    let home_pct = (raw_home / overround * 1000.0).round() / 10.0;
    let away_pct = (raw_away / overround * 1000.0).round() / 10.0;
    Some((home_pct, away_pct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoreboard_fixture() -> Value {
        json!({
            "events": [
                {
                    "date": "2026-02-20T03:00:00Z",
                    "status": {
                        "period": 0,
                        "displayClock": "0:00",
                        "type": { "state": "pre", "shortDetail": "7:00 PM PT" }
                    },
                    "competitions": [{
                        "competitors": [
                            {
                                "homeAway": "home",
                                "score": "0",
                                "team": { "abbreviation": "GS", "shortDisplayName": "Warriors" }
                            },
                            {
                                "homeAway": "away",
                                "score": "0",
                                "team": { "abbreviation": "BOS", "shortDisplayName": "Celtics" }
                            }
                        ],
                        "odds": [{
                            "details": "BOS -5.5",
                            "overUnder": 224.5,
                            "homeTeamOdds": { "moneyLine": 148 },
                            "awayTeamOdds": { "moneyLine": -175 }
                        }]
                    }]
                },
                {
                    "status": {
                        "period": 4,
                        "displayClock": "7:21",
                        "type": { "state": "in" }
                    },
                    "competitions": [{
                        "competitors": [
                            {
                                "homeAway": "home",
                                "score": "88",
                                "team": { "abbreviation": "NY", "shortDisplayName": "Knicks" }
                            },
                            {
                                "homeAway": "away",
                                "score": "104",
                                "team": { "abbreviation": "DET", "shortDisplayName": "Pistons" }
                            }
                        ]
                    }]
                }
            ]
        })
    }

    #[test]
    fn test_parse_scoreboard_upcoming_and_live() {
        let games = parse_scoreboard(&scoreboard_fixture());
        assert_eq!(games.len(), 2);

        let upcoming = &games[0];
        assert_eq!(upcoming.id, "gsw-bos");
        assert_eq!(upcoming.status, "upcoming");
        assert_eq!(upcoming.home, "GSW");
        assert_eq!(upcoming.home_name, "Warriors");
        assert_eq!(upcoming.time.as_deref(), Some("7:00 PM PT"));
        assert!(upcoming.home_score.is_none());

        let live = &games[1];
        assert_eq!(live.id, "nyk-det");
        assert_eq!(live.status, "live");
        assert_eq!(live.home_score, Some(88));
        assert_eq!(live.away_score, Some(104));
        assert_eq!(live.quarter, Some(4));
        assert_eq!(live.clock.as_deref(), Some("7:21"));
    }

    #[test]
    fn test_parse_scoreboard_lines_extracts_embedded_odds() {
        let lines = parse_scoreboard_lines(&scoreboard_fixture());
        // Only the first event carries an odds block
        assert_eq!(lines.len(), 1);
        let gl = &lines[0];
        assert_eq!(gl.home, "GSW");
        assert_eq!(gl.away, "BOS");
        assert_eq!(gl.lines.home_ml, Some(148));
        assert_eq!(gl.lines.away_ml, Some(-175));
        assert_eq!(gl.lines.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(gl.lines.total.as_deref(), Some("224.5"));
    }

    #[test]
    fn test_parse_standings() {
        let raw = json!({
            "children": [{
                "name": "Eastern Conference",
                "standings": { "entries": [{
                    "team": { "abbreviation": "DET", "displayName": "Detroit Pistons" },
                    "stats": [
                        { "name": "wins", "value": 40.0, "displayValue": "40" },
                        { "name": "losses", "value": 13.0, "displayValue": "13" },
                        { "name": "winPercent", "displayValue": ".755" },
                        { "name": "streak", "displayValue": "W3" }
                    ]
                }]}
            }]
        });
        let standings = parse_standings(&raw);
        assert_eq!(standings.east.len(), 1);
        assert!(standings.west.is_empty());
        let row = &standings.east[0];
        assert_eq!(row.abbr, "DET");
        assert_eq!(row.w, 40);
        assert_eq!(row.l, 13);
        assert_eq!(row.pct, ".755");
        assert_eq!(row.streak, "W3");
    }

    #[test]
    fn test_parse_injuries() {
        let raw = json!({
            "injuries": [{
                "displayName": "Boston Celtics",
                "injuries": [{
                    "status": "Out",
                    "shortComment": "Tatum (ankle) is out for Wednesday's game.",
                    "athlete": {
                        "displayName": "Jayson Tatum",
                        "position": { "abbreviation": "SF" }
                    }
                }]
            }]
        });
        let items = parse_injuries(&raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].team, "BOS");
        assert_eq!(items[0].player, "Jayson Tatum");
        assert_eq!(items[0].status, "Out");
        assert_eq!(items[0].position.as_deref(), Some("SF"));
    }

    #[test]
    fn test_win_probs_devig_sum_to_100() {
        let (home, away) = win_probs_from_moneylines(148, -175).unwrap();
        assert!((home + away - 100.0).abs() < 0.11);
        assert!(away > home, "favorite should carry the higher probability");
    }
}
