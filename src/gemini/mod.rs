//! Gemini API client for betting analysis, chat and search-grounded lines.

pub mod parse;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::models::{Game, GameLines};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("No Gemini API key provided. Set GEMINI_API_KEY env var or pass api_key in the request.")]
    MissingKey,
    /// Upstream error message surfaced verbatim to the caller
    #[error("{0}")]
    Upstream(String),
    #[error("Gemini request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini returned no candidates")]
    EmptyResponse,
}

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Server-side API key; empty means callers must supply their own
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

/// Gemini API client
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn has_server_key(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Request-supplied key falls back to the server key.
    pub fn effective_key(&self, request_key: &str) -> Result<String, GeminiError> {
        if !request_key.is_empty() {
            return Ok(request_key.to_string());
        }
        if self.has_server_key() {
            return Ok(self.config.api_key.clone());
        }
        Err(GeminiError::MissingKey)
    }

    async fn generate(
        &self,
        key: &str,
        system: &str,
        contents: Vec<Content>,
        max_tokens: u32,
        temperature: f32,
        search_grounding: bool,
    ) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, key
        );

        let request = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            },
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature,
            },
            tools: search_grounding.then(|| vec![serde_json::json!({ "google_search": {} })]),
        };

        debug!("Gemini generateContent ({} tokens max)", max_tokens);
        let resp = self.http.post(&url).json(&request).send().await?;
        let data: Value = resp.json().await?;

        if let Some(message) = data["error"]["message"].as_str() {
            return Err(GeminiError::Upstream(message.to_string()));
        }

        data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(GeminiError::EmptyResponse)
    }

    /// One-shot analysis for a single prompt.
    pub async fn analyze(
        &self,
        key: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, GeminiError> {
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }];
        self.generate(key, system, contents, 400, 0.75, false).await
    }

    /// Multi-turn chat: the frontend's `assistant` role maps to Gemini's
    /// `model` role.
    pub async fn chat(
        &self,
        key: &str,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, GeminiError> {
        let contents = messages
            .iter()
            .map(|m| Content {
                role: if m.role == "assistant" {
                    "model".to_string()
                } else {
                    "user".to_string()
                },
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();
        self.generate(key, system, contents, 600, 0.75, false).await
    }

    /// Last-resort lines source: ask Gemini with search grounding to report
    /// current lines for the given matchups in a fixed labeled format, then
    /// parse that text.  Requires the server key; returns an empty list when
    /// unconfigured so the reconciler just skips the source.
    pub async fn search_lines(&self, upcoming: &[Game]) -> Vec<GameLines> {
        if !self.has_server_key() || upcoming.is_empty() {
            return vec![];
        }

        let matchups: Vec<String> = upcoming
            .iter()
            .map(|g| format!("{} @ {}", g.away, g.home))
            .collect();
        let prompt = format!(
            "Search for current betting lines for these NBA games: {}.\n\
             Reply with one line per game, exactly in this format and nothing else:\n\
             LINES: AWAY @ HOME | ML <away american odds> / <home american odds> | SPREAD <team abbreviation> <line> | TOTAL <points>\n\
             Use the three-letter abbreviations given above. Omit a segment if you cannot find it.",
            matchups.join(", ")
        );

        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![Part { text: prompt }],
        }];
        match self
            .generate(
                &self.config.api_key,
                "You are a precise sports data assistant. Output only the requested format.",
                contents,
                500,
                0.1,
                true,
            )
            .await
        {
            Ok(text) => parse::parse_lines_text(&text),
            Err(e) => {
                warn!("Gemini search-grounded lines failed: {}", e);
                vec![]
            }
        }
    }
}

// ── Prompt builders ────────────────────────────────────────────────────────────

/// System prompt for the analyst persona, refreshed with the current slate
/// so the model talks about tonight's games instead of stale ones.
pub fn system_prompt(
    games: &[Game],
    standings: Option<&crate::providers::espn::Standings>,
) -> String {
    let mut prompt = format!(
        "You are a sharp NBA betting analyst. Today is {}.\n",
        chrono::Utc::now().format("%Y-%m-%d")
    );

    let live: Vec<String> = games
        .iter()
        .filter(|g| g.status == "live")
        .filter_map(|g| {
            let (home, away) = (g.home_score?, g.away_score?);
            let (leader, trailer, ls, ts) = if home >= away {
                (&g.home, &g.away, home, away)
            } else {
                (&g.away, &g.home, away, home)
            };
            Some(format!(
                "{} leads {} {}-{} (Q{} {})",
                leader,
                trailer,
                ls,
                ts,
                g.quarter.unwrap_or(0),
                g.clock.as_deref().unwrap_or("")
            ))
        })
        .collect();
    if !live.is_empty() {
        prompt.push_str(&format!("LIVE: {}.\n", live.join(", ")));
    }

    let tonight: Vec<String> = games
        .iter()
        .filter(|g| g.status == "upcoming")
        .map(|g| {
            let favorite = match (g.home_win_prob, g.away_win_prob) {
                (Some(h), Some(a)) if h >= a => {
                    format!("{} {}, {:.1}% win", g.home, g.home_odds.as_deref().unwrap_or("n/a"), h)
                }
                (Some(_), Some(a)) => {
                    format!("{} {}, {:.1}% win", g.away, g.away_odds.as_deref().unwrap_or("n/a"), a)
                }
                _ => "lines pending".to_string(),
            };
            format!("{}@{} ({})", g.away, g.home, favorite)
        })
        .collect();
    if !tonight.is_empty() {
        prompt.push_str(&format!("TONIGHT: {}.\n", tonight.join(", ")));
    }

    if let Some(standings) = standings {
        let leaders = |rows: &[crate::db::models::StandingRow]| -> String {
            rows.iter()
                .take(3)
                .map(|r| format!("{} {}-{}", r.abbr, r.w, r.l))
                .collect::<Vec<_>>()
                .join(", ")
        };
        if !standings.east.is_empty() || !standings.west.is_empty() {
            prompt.push_str(&format!(
                "LEADERS: East - {}. West - {}.\n",
                leaders(&standings.east),
                leaders(&standings.west)
            ));
        }
    }

    prompt.push_str(
        "Give sharp, direct betting analysis. Use betting terminology (ATS, ML, O/U, value, etc.). \
         Be concise. Always note entertainment-only disclaimer briefly at end.",
    );
    prompt
}

/// Pre-game analysis prompt: lines and win probabilities.
/// Live/final prompt: score state.
pub fn analysis_prompt(game: &Game) -> String {
    if game.status == "upcoming" {
        format!(
            "Betting analysis: {} @ {}. Win probs: {} {}%, {} {}%. Spread: {}. O/U: {}. ML: {} {} / {} {}. Best play in 3-4 sentences.",
            game.away_name,
            game.home_name,
            game.away,
            game.away_win_prob.unwrap_or(50.0),
            game.home,
            game.home_win_prob.unwrap_or(50.0),
            game.spread.as_deref().unwrap_or("n/a"),
            game.ou.as_deref().unwrap_or("n/a"),
            game.away,
            game.away_odds.as_deref().unwrap_or("n/a"),
            game.home,
            game.home_odds.as_deref().unwrap_or("n/a"),
        )
    } else {
        format!(
            "Live betting: {} {} @ {} {} (Q{} {}). Any live value? Brief and sharp.",
            game.away_name,
            game.away_score.unwrap_or(0),
            game.home_name,
            game.home_score.unwrap_or(0),
            game.quarter.unwrap_or(0),
            game.clock.as_deref().unwrap_or(""),
        )
    }
}
