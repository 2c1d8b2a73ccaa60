use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::warn;

use crate::db::models::{Game, Pick};
use crate::db::Database;
use crate::engine::{fallback, picks, OddsBook, SlateCache};
use crate::gemini::{self, ChatMessage, GeminiClient, GeminiError};
use crate::odds::{calculate_parlay, ParlayError};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: SlateCache,
    pub book: OddsBook,
    pub gemini: Arc<GeminiClient>,
}

/// API errors carry the HTTP status and a JSON `detail` body, matching the
/// error shape the frontend already handles.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<GeminiError> for ApiError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::MissingKey | GeminiError::Upstream(_) => {
                ApiError::BadRequest(err.to_string())
            }
            GeminiError::Http(_) | GeminiError::EmptyResponse => {
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

impl From<ParlayError> for ApiError {
    fn from(err: ParlayError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

// ── Request bodies ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub game_id: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ParlayRequest {
    pub legs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SavePickRequest {
    pub game_id: String,
    /// Freeform analysis text containing the labeled PICK fields
    pub text: String,
}

/// Build the Axum router.  When a static frontend build is present it is
/// served as an SPA fallback behind the API routes.
pub fn router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/api/games", get(games_handler))
        .route("/api/standings", get(standings_handler))
        .route("/api/props", get(props_handler))
        .route("/api/injuries", get(injuries_handler))
        .route("/api/parlay", post(parlay_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/picks", get(picks_handler).post(save_pick_handler))
        .route("/api/debug/odds", get(debug_odds_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state));

    if let Some(dir) = static_dir.filter(|d| Path::new(d).exists()) {
        let index = Path::new(dir).join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
}

/// Cached scoreboard with reconciled odds attached; curated fallback when
/// the scoreboard has never been fetched.
async fn assemble_games(state: &AppState) -> Vec<Game> {
    let mut games = state.cache.games().await;
    if games.is_empty() {
        warn!("Scoreboard cache empty, serving fallback slate");
        games = fallback::fallback_games();
    }
    state.book.decorate_games(&mut games).await;
    games
}

/// GET /api/games
async fn games_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let games = assemble_games(&state).await;
    Json(json!({
        "games": games,
        "fetched_at": state.cache.games_fetched_at().await,
    }))
}

/// GET /api/standings
async fn standings_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let standings = match state.cache.standings().await {
        Some(s) => s,
        None => {
            warn!("Standings cache empty, serving fallback table");
            fallback::fallback_standings()
        }
    };
    Json(json!({ "standings": standings }))
}

/// GET /api/props
async fn props_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut props = state.cache.props().await;
    if props.is_empty() {
        props = fallback::fallback_props();
    }
    Json(json!({ "props": props }))
}

/// GET /api/injuries
async fn injuries_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let injuries = state.cache.injuries().await;
    Json(json!({
        "injuries": injuries,
        "fetched_at": state.cache.injuries_fetched_at().await,
    }))
}

/// POST /api/parlay
async fn parlay_handler(
    Json(req): Json<ParlayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = calculate_parlay(&req.legs)?;
    Ok(Json(quote))
}

/// POST /api/analyze
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state.gemini.effective_key(&req.api_key)?;

    let games = assemble_games(&state).await;
    let game = games
        .iter()
        .find(|g| g.id == req.game_id)
        .ok_or_else(|| ApiError::NotFound("Game not found".to_string()))?;

    let standings = state.cache.standings().await;
    let system = gemini::system_prompt(&games, standings.as_ref());
    let prompt = gemini::analysis_prompt(game);

    let analysis = state.gemini.analyze(&key, &system, &prompt).await?;
    Ok(Json(json!({ "analysis": analysis })))
}

/// POST /api/chat
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state.gemini.effective_key(&req.api_key)?;

    let games = assemble_games(&state).await;
    let standings = state.cache.standings().await;
    let system = gemini::system_prompt(&games, standings.as_ref());

    let reply = state.gemini.chat(&key, &system, &req.messages).await?;
    Ok(Json(json!({ "reply": reply })))
}

/// GET /api/picks
async fn picks_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let picks = state.db.list_picks(100)?;
    Ok(Json(json!({ "picks": picks })))
}

/// POST /api/picks — parse the labeled pick out of analysis text and save it
async fn save_pick_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SavePickRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let games = assemble_games(&state).await;
    if !games.iter().any(|g| g.id == req.game_id) {
        return Err(ApiError::NotFound("Game not found".to_string()));
    }

    let draft = gemini::parse::parse_pick(&req.text).ok_or_else(|| {
        ApiError::BadRequest("No labeled PICK found in analysis text".to_string())
    })?;

    let mut pick = Pick {
        id: None,
        game_id: req.game_id,
        market: draft.market,
        selection: draft.selection,
        odds: draft.odds,
        confidence: draft.confidence,
        rationale: draft.rationale,
        status: "pending".to_string(),
        created_at: Utc::now(),
        settled_at: None,
        result: None,
    };

    // Backfill the price from the book when the LLM didn't quote one
    if pick.odds.is_none() && pick.market == "moneyline" {
        if let Some(snap) = state.book.snapshot_for(&pick.game_id).await {
            let selection = pick.selection.to_uppercase();
            pick.odds = if selection.contains(&snap.home) {
                snap.current.home_ml
            } else if selection.contains(&snap.away) {
                snap.current.away_ml
            } else {
                None
            }
            .map(crate::odds::format_american);
        }
    }

    let id = state.db.insert_pick(&pick)?;
    pick.id = Some(id);

    // Settle immediately if the game is already final
    let _ = picks::settle_pending(&state.db, &games);

    Ok((StatusCode::CREATED, Json(json!({ "pick": pick }))))
}

/// GET /api/debug/odds — raw book contents plus cache/database freshness
async fn debug_odds_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshots = state.book.all().await;
    let stats = state.db.get_stats()?;
    Ok(Json(json!({
        "snapshots": snapshots,
        "stats": stats,
        "freshness": state.cache.freshness().await,
    })))
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "has_server_key": state.gemini.has_server_key(),
    }))
}
