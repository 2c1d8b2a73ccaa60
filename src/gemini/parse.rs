//! Parsers for freeform Gemini output.
//!
//! Two text shapes come back from the LLM: labeled pick fields inside an
//! analysis (`PICK:` / `ODDS:` / `CONFIDENCE:` lines) and the fixed
//! `LINES:` rows requested by the search-grounded lines fallback.  Both are
//! plain regex extraction — the model is prompted to emit the labels, and
//! anything that doesn't match is ignored.

use regex::Regex;

use crate::db::models::{GameLines, MarketLines};
use crate::teams;

/// A pick pulled out of analysis text, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PickDraft {
    pub selection: String,
    pub market: String,
    pub odds: Option<String>,
    pub confidence: Option<i32>,
    pub rationale: Option<String>,
}

fn labeled_line(text: &str, label: &str) -> Option<String> {
    let pattern = format!(r"(?im)^\s*{}\s*:\s*(.+)$", label);
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Derive the market from the selection text when the LLM didn't label it.
fn market_of_selection(selection: &str) -> String {
    let upper = selection.to_uppercase();
    if upper.contains("OVER") || upper.contains("UNDER") {
        "total".to_string()
    } else if upper.contains('+') || upper.contains('-') {
        // A spread number rides along ("BOS -5.5"); bare "+150" style prices
        // show up under ODDS:, not in the selection.
        "spread".to_string()
    } else {
        "moneyline".to_string()
    }
}

/// Extract a labeled pick from freeform analysis text.
/// Returns `None` when no `PICK:` line is present.
pub fn parse_pick(text: &str) -> Option<PickDraft> {
    let selection = labeled_line(text, "PICK")?;
    let market = labeled_line(text, "MARKET")
        .map(|m| m.to_lowercase())
        .unwrap_or_else(|| market_of_selection(&selection));
    let odds = labeled_line(text, "ODDS")
        .and_then(|o| crate::odds::parse_american(&o))
        .map(crate::odds::format_american);
    let confidence = labeled_line(text, "CONFIDENCE").and_then(|c| {
        c.trim_end_matches('%')
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|v| (0..=100).contains(v))
    });
    let rationale = labeled_line(text, "RATIONALE");

    Some(PickDraft {
        selection,
        market,
        odds,
        confidence,
        rationale,
    })
}

/// Parse the `LINES:` rows the search-grounded fallback asks Gemini to emit:
///
/// `LINES: BOS @ GSW | ML -175 / +148 | SPREAD BOS -5.5 | TOTAL 224.5`
///
/// Segments may be missing; rows with unknown teams are dropped.
pub fn parse_lines_text(text: &str) -> Vec<GameLines> {
    let Ok(matchup_re) = Regex::new(r"(?i)LINES:\s*([A-Za-z]{2,4})\s*@\s*([A-Za-z]{2,4})") else {
        return vec![];
    };
    let Ok(ml_re) = Regex::new(r"(?i)\bML\s*([+-]\d{3,5})\s*/\s*([+-]\d{3,5})") else {
        return vec![];
    };
    let Ok(spread_re) = Regex::new(r"(?i)\bSPREAD\s*([A-Za-z]{2,4})\s*([+-]?\d+(?:\.\d+)?)")
    else {
        return vec![];
    };
    let Ok(total_re) = Regex::new(r"(?i)\bTOTAL\s*(\d+(?:\.\d+)?)") else {
        return vec![];
    };

    text.lines()
        .filter_map(|line| {
            let caps = matchup_re.captures(line)?;
            let away = teams::canonical_abbr(caps.get(1)?.as_str())?;
            let home = teams::canonical_abbr(caps.get(2)?.as_str())?;

            let mut lines = MarketLines::default();
            if let Some(ml) = ml_re.captures(line) {
                // Requested order is away / home
                lines.away_ml = ml.get(1).and_then(|m| crate::odds::parse_american(m.as_str()));
                lines.home_ml = ml.get(2).and_then(|m| crate::odds::parse_american(m.as_str()));
            }
            if let Some(sp) = spread_re.captures(line) {
                if let Some(team) = teams::canonical_abbr(sp.get(1)?.as_str()) {
                    lines.spread = Some(format!("{} {}", team, sp.get(2)?.as_str()));
                }
            }
            if let Some(tot) = total_re.captures(line) {
                lines.total = Some(tot.get(1)?.as_str().to_string());
            }

            if lines.is_empty() {
                return None;
            }
            Some(GameLines {
                home: home.to_string(),
                away: away.to_string(),
                commence: None,
                lines,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pick_full_labels() {
        let text = "Solid spot for the road favorite here.\n\
                    PICK: BOS ML\n\
                    MARKET: Moneyline\n\
                    ODDS: -175\n\
                    CONFIDENCE: 68%\n\
                    RATIONALE: Boston covers on the road with the rest edge.";
        let draft = parse_pick(text).unwrap();
        assert_eq!(draft.selection, "BOS ML");
        assert_eq!(draft.market, "moneyline");
        assert_eq!(draft.odds.as_deref(), Some("-175"));
        assert_eq!(draft.confidence, Some(68));
        assert!(draft.rationale.unwrap().contains("rest edge"));
    }

    #[test]
    fn test_parse_pick_derives_market_from_selection() {
        let draft = parse_pick("PICK: OVER 224.5").unwrap();
        assert_eq!(draft.market, "total");
        let draft = parse_pick("PICK: BOS -5.5").unwrap();
        assert_eq!(draft.market, "spread");
        let draft = parse_pick("PICK: BOS ML").unwrap();
        assert_eq!(draft.market, "moneyline");
    }

    #[test]
    fn test_parse_pick_ignores_junk_odds_and_confidence() {
        let draft = parse_pick("PICK: BOS ML\nODDS: even\nCONFIDENCE: 250").unwrap();
        assert!(draft.odds.is_none());
        assert!(draft.confidence.is_none());
    }

    #[test]
    fn test_parse_pick_none_without_label() {
        assert!(parse_pick("Take Boston tonight, easy money.").is_none());
    }

    #[test]
    fn test_parse_lines_text_full_row() {
        let text = "LINES: BOS @ GSW | ML -175 / +148 | SPREAD BOS -5.5 | TOTAL 224.5";
        let lines = parse_lines_text(text);
        assert_eq!(lines.len(), 1);
        let gl = &lines[0];
        assert_eq!(gl.away, "BOS");
        assert_eq!(gl.home, "GSW");
        assert_eq!(gl.lines.away_ml, Some(-175));
        assert_eq!(gl.lines.home_ml, Some(148));
        assert_eq!(gl.lines.spread.as_deref(), Some("BOS -5.5"));
        assert_eq!(gl.lines.total.as_deref(), Some("224.5"));
    }

    #[test]
    fn test_parse_lines_text_partial_segments() {
        let text = "LINES: ORL @ SAC | TOTAL 215\nnoise line\nLINES: DEN @ LAC | ML -125 / +105";
        let lines = parse_lines_text(text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].lines.total.as_deref(), Some("215"));
        assert!(lines[0].lines.home_ml.is_none());
        assert_eq!(lines[1].lines.away_ml, Some(-125));
        assert_eq!(lines[1].lines.home_ml, Some(105));
    }

    #[test]
    fn test_parse_lines_text_unknown_team_dropped() {
        let text = "LINES: XXX @ GSW | ML -175 / +148";
        assert!(parse_lines_text(text).is_empty());
    }

    #[test]
    fn test_parse_lines_text_empty_segments_dropped() {
        assert!(parse_lines_text("LINES: BOS @ GSW | nothing useful").is_empty());
    }
}
