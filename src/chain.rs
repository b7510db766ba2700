// =============================================================================
// OptionChainIngest — OSI symbol parsing/building, chain unification
// =============================================================================
//
// OSI grammar: ROOT(1-6 chars) + YYMMDD + C/P + strike*1000 (8 digits).
// Example: SPY260212C00500000 -> underlying=SPY, expiration=2026-02-12,
// type=call, strike=500.00.
//
// Hand-written parser (no `regex` dependency): walk the string once,
// validate each segment, and fail closed to an "unknown" record rather than
// throwing.
// =============================================================================

use crate::types::OptionSide;
use serde::{Deserialize, Serialize};

/// Parsed components of an OSI option symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedOsi {
    pub underlying: String,
    /// YYYY-MM-DD
    pub expiration: String,
    pub side: Option<OptionSide>,
    pub strike: f64,
    /// True when the OSI grammar did not match; `side` is then `None` and
    /// `underlying`/`expiration`/`strike` carry best-effort or default values.
    pub unknown: bool,
}

impl ParsedOsi {
    fn unknown(raw: &str) -> Self {
        Self {
            underlying: raw.to_string(),
            expiration: String::new(),
            side: None,
            strike: 0.0,
            unknown: true,
        }
    }
}

/// Parse an OSI-style option symbol. Rejection (malformed input) returns a
/// default record with `unknown = true` rather than an error — matches the
/// spec's "type=unknown" rejection contract.
pub fn parse_osi(symbol: &str) -> ParsedOsi {
    let bytes = symbol.as_bytes();
    if bytes.len() < 1 + 6 + 1 + 8 {
        return ParsedOsi::unknown(symbol);
    }

    // Find the split point: root is 1-6 uppercase letters, followed
    // immediately by 6 digits (YYMMDD), then C/P, then 8 digits.
    let total_len = bytes.len();
    let tail_len = 6 + 1 + 8; // YYMMDD + C/P + strike digits
    if total_len <= tail_len {
        return ParsedOsi::unknown(symbol);
    }
    let root_len = total_len - tail_len;
    if root_len < 1 || root_len > 6 {
        return ParsedOsi::unknown(symbol);
    }

    let root = &symbol[..root_len];
    if !root.chars().all(|c| c.is_ascii_uppercase()) {
        return ParsedOsi::unknown(symbol);
    }

    let date_part = &symbol[root_len..root_len + 6];
    if !date_part.chars().all(|c| c.is_ascii_digit()) {
        return ParsedOsi::unknown(symbol);
    }

    let side_char = symbol.as_bytes()[root_len + 6] as char;
    let side = match side_char {
        'C' => OptionSide::Call,
        'P' => OptionSide::Put,
        _ => return ParsedOsi::unknown(symbol),
    };

    let strike_part = &symbol[root_len + 7..];
    if strike_part.len() != 8 || !strike_part.chars().all(|c| c.is_ascii_digit()) {
        return ParsedOsi::unknown(symbol);
    }
    let strike_raw: u64 = match strike_part.parse() {
        Ok(v) => v,
        Err(_) => return ParsedOsi::unknown(symbol),
    };
    let strike = strike_raw as f64 / 1000.0;

    let yy: u32 = match date_part[0..2].parse() {
        Ok(v) => v,
        Err(_) => return ParsedOsi::unknown(symbol),
    };
    let mm = &date_part[2..4];
    let dd = &date_part[4..6];
    let year = 2000 + yy;
    let expiration = format!("{year:04}-{mm}-{dd}");

    ParsedOsi {
        underlying: root.to_string(),
        expiration,
        side: Some(side),
        strike,
        unknown: false,
    }
}

/// Build an OSI symbol from its components. `expiration` must be YYYY-MM-DD.
/// Returns `None` if the components cannot form a valid OSI string (e.g.
/// malformed expiration or a root outside 1-6 chars).
pub fn build_osi(underlying: &str, expiration: &str, side: OptionSide, strike: f64) -> Option<String> {
    if underlying.is_empty() || underlying.len() > 6 {
        return None;
    }
    if !underlying.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let parts: Vec<&str> = expiration.split('-').collect();
    if parts.len() != 3 {
        return None;
    }
    let year: u32 = parts[0].parse().ok()?;
    let yy = year % 100;
    let mm: u32 = parts[1].parse().ok()?;
    let dd: u32 = parts[2].parse().ok()?;
    if !(1..=12).contains(&mm) || !(1..=31).contains(&dd) {
        return None;
    }

    let side_char = match side {
        OptionSide::Call => 'C',
        OptionSide::Put => 'P',
    };

    let strike_thousandths = (strike * 1000.0).round() as u64;
    Some(format!(
        "{underlying}{yy:02}{mm:02}{dd:02}{side_char}{strike_thousandths:08}"
    ))
}

/// Round-trip: build(parse(s)) == s for well-formed s.
pub fn round_trip(symbol: &str) -> Option<String> {
    let parsed = parse_osi(symbol);
    if parsed.unknown {
        return None;
    }
    build_osi(&parsed.underlying, &parsed.expiration, parsed.side?, parsed.strike)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_call() {
        let p = parse_osi("SPY260212C00500000");
        assert!(!p.unknown);
        assert_eq!(p.underlying, "SPY");
        assert_eq!(p.expiration, "2026-02-12");
        assert_eq!(p.side, Some(OptionSide::Call));
        assert!((p.strike - 500.0).abs() < 1e-9);
    }

    #[test]
    fn parse_well_formed_put_fractional_strike() {
        let p = parse_osi("QQQ260101P00432500");
        assert!(!p.unknown);
        assert_eq!(p.side, Some(OptionSide::Put));
        assert!((p.strike - 432.5).abs() < 1e-9);
    }

    #[test]
    fn parse_rejects_malformed() {
        let p = parse_osi("not-an-osi-symbol");
        assert!(p.unknown);
        assert_eq!(p.side, None);
    }

    #[test]
    fn parse_rejects_too_short() {
        let p = parse_osi("SPY1C1");
        assert!(p.unknown);
    }

    #[test]
    fn round_trip_invariant_holds() {
        let symbols = [
            "SPY260212C00500000",
            "QQQ260101P00432500",
            "A260601C00001000",
            "MSTRX260315P00123456",
        ];
        for s in symbols {
            assert_eq!(round_trip(s).as_deref(), Some(s), "round trip failed for {s}");
        }
    }

    #[test]
    fn build_rejects_bad_root() {
        assert!(build_osi("toolonge", "2026-02-12", OptionSide::Call, 500.0).is_none());
        assert!(build_osi("spy", "2026-02-12", OptionSide::Call, 500.0).is_none());
    }

    #[test]
    fn build_pads_strike_to_eight_digits() {
        let s = build_osi("SPY", "2026-02-12", OptionSide::Call, 5.0).unwrap();
        assert!(s.ends_with("C00005000"));
    }
}
