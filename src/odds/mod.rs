//! Odds arithmetic: American/decimal conversion, implied probability and
//! parlay quoting.
//!
//! American notation: a negative number is the stake required to win 100
//! units, a positive number is the payout on a 100-unit stake.  Valid
//! American odds always satisfy |odds| >= 100.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParlayError {
    #[error("a parlay needs at least 2 legs, got {0}")]
    TooFewLegs(usize),
    #[error("invalid American odds: {0}")]
    InvalidOdds(String),
}

/// Parse an American odds string ("+148", "-175", "148").
/// Rejects values with |odds| < 100, which are not valid American notation.
pub fn parse_american(s: &str) -> Option<i32> {
    let trimmed = s.trim();
    let cleaned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let value: i32 = cleaned.parse().ok()?;
    if value.abs() < 100 {
        return None;
    }
    Some(value)
}

/// Format with the explicit sign sportsbooks print: "+148" / "-175".
pub fn format_american(odds: i32) -> String {
    if odds > 0 {
        format!("+{}", odds)
    } else {
        odds.to_string()
    }
}

/// American -> decimal.  Returns `None` for |odds| < 100.
pub fn american_to_decimal(odds: i32) -> Option<f64> {
    if odds.abs() < 100 {
        return None;
    }
    if odds > 0 {
        Some(1.0 + odds as f64 / 100.0)
    } else {
        Some(1.0 + 100.0 / odds.abs() as f64)
    }
}

/// Decimal -> American, rounded to the nearest integer price.
/// Returns `None` for decimal odds at or below 1.0 (no payout).
pub fn decimal_to_american(decimal: f64) -> Option<i32> {
    if !(decimal > 1.0) || !decimal.is_finite() {
        return None;
    }
    if decimal >= 2.0 {
        Some(((decimal - 1.0) * 100.0).round() as i32)
    } else {
        Some(-(100.0 / (decimal - 1.0)).round() as i32)
    }
}

/// Implied win probability of decimal odds (ignores vig).
pub fn implied_probability(decimal: f64) -> f64 {
    if decimal <= 1.0 {
        return 1.0;
    }
    1.0 / decimal
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayQuote {
    pub legs: usize,
    pub combined_decimal: f64,
    pub combined_american: String,
    pub implied_probability: f64,
    pub payout_per_100: f64,
}

/// Quote a parlay from American odds legs.
///
/// Combined decimal odds are the product of per-leg decimal odds; the
/// implied probability is `1 / combined`; the profit on a 100-unit stake is
/// `(combined - 1) * 100`.
pub fn calculate_parlay(legs: &[String]) -> Result<ParlayQuote, ParlayError> {
    if legs.len() < 2 {
        return Err(ParlayError::TooFewLegs(legs.len()));
    }

    let mut combined = 1.0_f64;
    for leg in legs {
        let american =
            parse_american(leg).ok_or_else(|| ParlayError::InvalidOdds(leg.clone()))?;
        let decimal = american_to_decimal(american)
            .ok_or_else(|| ParlayError::InvalidOdds(leg.clone()))?;
        combined *= decimal;
    }

    let combined_american = decimal_to_american(combined)
        .map(format_american)
        .unwrap_or_else(|| "+0".to_string());

    Ok(ParlayQuote {
        legs: legs.len(),
        combined_decimal: (combined * 1000.0).round() / 1000.0,
        combined_american,
        implied_probability: (implied_probability(combined) * 10_000.0).round() / 10_000.0,
        payout_per_100: ((combined - 1.0) * 100.0 * 100.0).round() / 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_american_to_decimal_positive() {
        assert_relative_eq!(american_to_decimal(148).unwrap(), 2.48, epsilon = 1e-9);
        assert_relative_eq!(american_to_decimal(100).unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_american_to_decimal_negative() {
        assert_relative_eq!(
            american_to_decimal(-175).unwrap(),
            1.0 + 100.0 / 175.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_american_to_decimal_rejects_sub_100() {
        assert_eq!(american_to_decimal(50), None);
        assert_eq!(american_to_decimal(-99), None);
        assert_eq!(american_to_decimal(0), None);
    }

    #[test]
    fn test_round_trip_recovers_american() {
        // -100 is excluded: even money canonically prints as +100
        for odds in [-10_000, -525, -175, -110, 100, 105, 148, 210, 2_500] {
            let decimal = american_to_decimal(odds).unwrap();
            assert_eq!(
                decimal_to_american(decimal),
                Some(odds),
                "round trip failed for {}",
                odds
            );
        }
    }

    #[test]
    fn test_parse_american() {
        assert_eq!(parse_american("+148"), Some(148));
        assert_eq!(parse_american("-175"), Some(-175));
        assert_eq!(parse_american(" 210 "), Some(210));
        assert_eq!(parse_american("+50"), None);
        assert_eq!(parse_american("EVEN"), None);
    }

    #[test]
    fn test_format_american() {
        assert_eq!(format_american(148), "+148");
        assert_eq!(format_american(-175), "-175");
    }

    #[test]
    fn test_implied_probability() {
        assert_relative_eq!(implied_probability(2.0), 0.5, epsilon = 1e-9);
        assert_relative_eq!(implied_probability(4.0), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_parlay_combined_is_product_of_legs() {
        let quote =
            calculate_parlay(&["+100".to_string(), "+100".to_string()]).unwrap();
        // 2.0 * 2.0 = 4.0 decimal, +300 American, 25% implied, 300 payout
        assert_relative_eq!(quote.combined_decimal, 4.0, epsilon = 1e-9);
        assert_eq!(quote.combined_american, "+300");
        assert_relative_eq!(quote.implied_probability, 0.25, epsilon = 1e-9);
        assert_relative_eq!(quote.payout_per_100, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parlay_mixed_favorites_and_dogs() {
        let quote =
            calculate_parlay(&["-175".to_string(), "+148".to_string()]).unwrap();
        let expected = (1.0 + 100.0 / 175.0) * 2.48;
        assert_relative_eq!(quote.combined_decimal, expected, epsilon = 1e-3);
        assert_relative_eq!(
            quote.implied_probability,
            1.0 / expected,
            epsilon = 1e-3
        );
        assert_relative_eq!(
            quote.payout_per_100,
            (expected - 1.0) * 100.0,
            epsilon = 0.5
        );
    }

    #[test]
    fn test_parlay_rejects_single_leg() {
        let err = calculate_parlay(&["-110".to_string()]).unwrap_err();
        assert_eq!(err, ParlayError::TooFewLegs(1));
    }

    #[test]
    fn test_parlay_rejects_empty() {
        assert_eq!(
            calculate_parlay(&[]).unwrap_err(),
            ParlayError::TooFewLegs(0)
        );
    }

    #[test]
    fn test_parlay_rejects_bad_leg() {
        let err =
            calculate_parlay(&["-110".to_string(), "pickem".to_string()]).unwrap_err();
        assert!(matches!(err, ParlayError::InvalidOdds(_)));
    }
}
