//! Settlement of saved picks against final scores.
//!
//! A pick's selection is freeform LLM text ("BOS ML", "OVER 224.5",
//! "BOS -5.5"), so settlement is regex extraction against the final
//! scoreline rather than a structured bet evaluation.  Anything that can't
//! be matched stays pending.

use anyhow::Result;
use regex::Regex;
use tracing::{info, warn};

use crate::db::models::{Game, Pick};
use crate::db::Database;
use crate::teams;

/// Strip the optional `-YYYYMMDD` suffix so picks settle against the
/// scoreboard id regardless of which form they were saved with.
fn base_id(id: &str) -> &str {
    if let Some((prefix, suffix)) = id.rsplit_once('-') {
        if suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_digit()) {
            return prefix;
        }
    }
    id
}

fn score_summary(game: &Game, home: i32, away: i32) -> String {
    format!("{} {}-{} {}", game.away, away, home, game.home)
}

fn settle_moneyline(pick: &Pick, game: &Game, home: i32, away: i32) -> Option<&'static str> {
    let re = Regex::new(r"[A-Za-z]{2,4}").ok()?;
    let side = re
        .find_iter(&pick.selection)
        .filter_map(|m| teams::canonical_abbr(m.as_str()))
        .find(|abbr| *abbr == game.home || *abbr == game.away)?;

    let (own, opp) = if side == game.home {
        (home, away)
    } else {
        (away, home)
    };
    Some(if own > opp {
        "won"
    } else if own < opp {
        "lost"
    } else {
        "push"
    })
}

fn settle_spread(pick: &Pick, game: &Game, home: i32, away: i32) -> Option<&'static str> {
    let re = Regex::new(r"([A-Za-z]{2,4})\s*([+-]\d+(?:\.\d+)?)").ok()?;
    let caps = re.captures(&pick.selection)?;
    let side = teams::canonical_abbr(caps.get(1)?.as_str())
        .filter(|abbr| *abbr == game.home || *abbr == game.away)?;
    let line: f64 = caps.get(2)?.as_str().parse().ok()?;

    let margin = if side == game.home {
        (home - away) as f64
    } else {
        (away - home) as f64
    };
    let cover = margin + line;
    Some(if cover > 0.0 {
        "won"
    } else if cover < 0.0 {
        "lost"
    } else {
        "push"
    })
}

fn settle_total(pick: &Pick, home: i32, away: i32) -> Option<&'static str> {
    let re = Regex::new(r"(?i)\b(over|under)\b\s*(\d+(?:\.\d+)?)").ok()?;
    let caps = re.captures(&pick.selection)?;
    let over = caps.get(1)?.as_str().eq_ignore_ascii_case("over");
    let line: f64 = caps.get(2)?.as_str().parse().ok()?;

    let total = (home + away) as f64;
    Some(if total == line {
        "push"
    } else if (total > line) == over {
        "won"
    } else {
        "lost"
    })
}

/// Score one pick against its final game.  `None` means the game isn't
/// final yet or the selection text couldn't be matched.
pub fn settle_against(pick: &Pick, game: &Game) -> Option<(String, String)> {
    if game.status != "final" {
        return None;
    }
    let (home, away) = (game.home_score?, game.away_score?);

    let status = match pick.market.as_str() {
        "moneyline" => settle_moneyline(pick, game, home, away),
        "spread" => settle_spread(pick, game, home, away),
        "total" => settle_total(pick, home, away),
        // Freeform market label: try every matcher in specificity order
        _ => settle_total(pick, home, away)
            .or_else(|| settle_spread(pick, game, home, away))
            .or_else(|| settle_moneyline(pick, game, home, away)),
    }?;

    Some((status.to_string(), score_summary(game, home, away)))
}

/// Settle every pending pick whose game has gone final.
pub fn settle_pending(db: &Database, games: &[Game]) -> Result<usize> {
    let pending = db.list_pending_picks()?;
    if pending.is_empty() {
        return Ok(0);
    }

    let mut settled = 0;
    for pick in &pending {
        let Some(game) = games
            .iter()
            .find(|g| base_id(&g.id) == base_id(&pick.game_id))
        else {
            continue;
        };
        let Some((status, result)) = settle_against(pick, game) else {
            continue;
        };
        let Some(id) = pick.id else {
            continue;
        };
        match db.settle_pick(id, &status, &result) {
            Ok(()) => {
                info!("Pick {} settled {}: {} ({})", id, status, pick.selection, result);
                settled += 1;
            }
            Err(e) => warn!("Failed to settle pick {}: {}", id, e),
        }
    }
    Ok(settled)
}
