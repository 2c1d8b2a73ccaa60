use anyhow::Result;
use clap::Parser;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod api;
mod config;
mod db;
mod engine;
mod gemini;
mod odds;
mod providers;
mod teams;

use api::AppState;
use config::Config;
use db::models::GameLines;
use db::Database;
use engine::{picks, OddsBook, SlateCache};
use gemini::{GeminiClient, GeminiConfig};
use providers::{DraftKings, EspnClient, LinesProvider, PrizePicks, TheOddsApi};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database and rehydrate the odds book from persisted snapshots
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let retention = chrono::Duration::days(config.snapshot_retention_days as i64);
    match db.prune_odds_snapshots(chrono::Utc::now() - retention) {
        Ok(0) => {}
        Ok(n) => info!("Pruned {} stale odds snapshots", n),
        Err(e) => warn!("Snapshot pruning failed: {}", e),
    }

    let book = OddsBook::new();
    let persisted = db.load_odds_snapshots()?;
    if !persisted.is_empty() {
        info!("Rehydrating odds book with {} snapshots", persisted.len());
        book.hydrate(persisted).await;
    }

    let cache = SlateCache::new();

    // Build upstream clients
    let espn = Arc::new(EspnClient::new(config.espn_api_url.as_deref())?);
    let prizepicks = PrizePicks::new(config.prizepicks_api_url.as_deref())?;

    let mut line_providers: Vec<Arc<dyn LinesProvider>> = Vec::new();
    line_providers.push(Arc::new(DraftKings::new(
        config.draftkings_api_url.as_deref(),
    )?));
    if let Some(key) = config.odds_api_key.as_deref() {
        line_providers.push(Arc::new(TheOddsApi::new(
            key,
            config.odds_api_url.as_deref(),
        )?));
    } else {
        info!("ODDS_API_KEY not set, the-odds-api source disabled");
    }
    line_providers.push(Arc::clone(&espn) as Arc<dyn LinesProvider>);
    info!("Configured {} lines provider(s)", line_providers.len());

    let gemini = Arc::new(GeminiClient::new(GeminiConfig {
        api_key: config.gemini_api_key.clone().unwrap_or_default(),
        base_url: config.gemini_api_url.clone(),
        model: config.gemini_model.clone(),
        timeout_secs: 30,
    })?);
    if !gemini.has_server_key() {
        info!("GEMINI_API_KEY not set, callers must supply their own key");
    }

    // Background refresher: scoreboard, lines reconciliation, slate data
    {
        let config = config.clone();
        let db = db.clone();
        let cache = cache.clone();
        let book = book.clone();
        let espn = Arc::clone(&espn);
        let gemini = Arc::clone(&gemini);

        tokio::spawn(async move {
            run_refresher(config, db, cache, book, espn, prizepicks, line_providers, gemini)
                .await;
        });
    }

    // Serve the HTTP API
    let state = AppState {
        db,
        cache,
        book,
        gemini,
    };
    let app = api::router(state, Some(config.static_dir.as_str()));
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Poll loop: three cadences multiplexed on one task.
#[allow(clippy::too_many_arguments)]
async fn run_refresher(
    config: Config,
    db: Database,
    cache: SlateCache,
    book: OddsBook,
    espn: Arc<EspnClient>,
    prizepicks: PrizePicks,
    line_providers: Vec<Arc<dyn LinesProvider>>,
    gemini: Arc<GeminiClient>,
) {
    let mut scoreboard_tick = tokio::time::interval(Duration::from_secs(config.scoreboard_poll_secs));
    let mut odds_tick = tokio::time::interval(Duration::from_secs(config.odds_poll_secs));
    let mut slate_tick = tokio::time::interval(Duration::from_secs(config.slate_poll_secs));
    scoreboard_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    odds_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    slate_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        "Refresher started (scoreboard={}s, odds={}s, slate={}s)",
        config.scoreboard_poll_secs, config.odds_poll_secs, config.slate_poll_secs
    );

    loop {
        tokio::select! {
            _ = scoreboard_tick.tick() => {
                refresh_scoreboard(&db, &cache, &espn).await;
            }
            _ = odds_tick.tick() => {
                // Small jitter so restarts don't synchronise hammering the books
                let jitter_ms = rand::thread_rng().gen_range(0..1500);
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                refresh_odds(&config, &db, &cache, &book, &line_providers, &gemini).await;
            }
            _ = slate_tick.tick() => {
                refresh_slate(&cache, &espn, &prizepicks).await;
            }
        }
    }
}

async fn refresh_scoreboard(db: &Database, cache: &SlateCache, espn: &EspnClient) {
    match espn.fetch_scoreboard().await {
        Ok(games) => {
            info!("Scoreboard refreshed: {} games", games.len());
            match picks::settle_pending(db, &games) {
                Ok(0) => {}
                Ok(n) => info!("Settled {} pick(s) on final scores", n),
                Err(e) => warn!("Pick settlement failed: {}", e),
            }
            cache.set_games(games).await;
        }
        Err(e) => warn!("Scoreboard fetch failed, keeping cached slate: {}", e),
    }
}

async fn refresh_odds(
    config: &Config,
    db: &Database,
    cache: &SlateCache,
    book: &OddsBook,
    line_providers: &[Arc<dyn LinesProvider>],
    gemini: &GeminiClient,
) {
    let provider_timeout = Duration::from_secs(8);

    // Poll all providers concurrently; a slow source only costs itself
    let fetch_futures: Vec<_> = line_providers
        .iter()
        .map(|p| {
            let p = Arc::clone(p);
            async move {
                let res = tokio::time::timeout(provider_timeout, p.fetch_game_lines()).await;
                let out = match res {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!("timed out after {:?}", provider_timeout)),
                };
                (p.name().to_string(), out)
            }
        })
        .collect();

    let mut batches: Vec<(String, Vec<GameLines>)> = Vec::new();
    for (name, result) in futures_util::future::join_all(fetch_futures).await {
        match result {
            Ok(lines) => {
                info!("{}: {} games quoted", name, lines.len());
                batches.push((name, lines));
            }
            Err(e) => warn!("Lines provider '{}' failed: {}", name, e),
        }
    }

    let statuses = cache.status_map().await;

    // Last-resort Gemini search grounding, only for upcoming games no book
    // has quoted yet
    if config.gemini_lines {
        let quoted: std::collections::HashSet<String> = batches
            .iter()
            .flat_map(|(_, lines)| lines.iter())
            .map(|gl| teams::game_id(&gl.home, &gl.away))
            .collect();
        let missing: Vec<_> = cache
            .games()
            .await
            .into_iter()
            .filter(|g| g.status == "upcoming" && !quoted.contains(&g.id))
            .collect();
        if !missing.is_empty() {
            let grounded = gemini.search_lines(&missing).await;
            if !grounded.is_empty() {
                info!("Gemini search grounding quoted {} game(s)", grounded.len());
                batches.push(("Gemini".to_string(), grounded));
            }
        }
    }

    let dirty = book.merge_round(batches, &statuses).await;
    if dirty.is_empty() {
        return;
    }
    info!("Odds book updated: {} game(s) changed", dirty.len());
    for snap in &dirty {
        if let Err(e) = db.upsert_odds_snapshot(snap) {
            error!("Failed to persist odds snapshot {}: {}", snap.game_id, e);
        }
    }
}

async fn refresh_slate(cache: &SlateCache, espn: &EspnClient, prizepicks: &PrizePicks) {
    match espn.fetch_standings().await {
        Ok(standings) => {
            info!(
                "Standings refreshed: {} east, {} west",
                standings.east.len(),
                standings.west.len()
            );
            cache.set_standings(standings).await;
        }
        Err(e) => warn!("Standings fetch failed: {}", e),
    }

    match espn.fetch_injuries().await {
        Ok(injuries) => {
            info!("Injury report refreshed: {} entries", injuries.len());
            cache.set_injuries(injuries).await;
        }
        Err(e) => warn!("Injuries fetch failed: {}", e),
    }

    match prizepicks.fetch_props().await {
        Ok(props) if !props.is_empty() => {
            info!("PrizePicks board refreshed: {} props", props.len());
            cache.set_props(props).await;
        }
        Ok(_) => info!("PrizePicks board empty, keeping previous props"),
        Err(e) => warn!("PrizePicks fetch failed: {}", e),
    }
}
