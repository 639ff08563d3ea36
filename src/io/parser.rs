// src/io/parser.rs
//
// Fault-tolerant parser for water-quality sensor lines.
//
// Sensor firmware in the field emits loosely formatted text, typically
// "pH: 7.2 TDS: 145 Turbidity: 2.3" but with spacing, ordering and labelling
// variations between firmware revisions. Each field is resolved by an ordered
// chain of strategies: a case-insensitive keyword scan first, a fixed token
// position as fallback. Strategies are independent per field, so a line with
// a mangled TDS label can still resolve TDS positionally while pH and
// turbidity resolve by keyword.

use tracing::warn;

use super::Reading;

// ============================================================================
// Field Extraction Strategies
// ============================================================================

/// Keywords identifying each field. Matching is case-insensitive substring
/// matching per token, so "turb" also hits "Turbidity:".
const PH_KEYWORDS: &[&str] = &["ph"];
const TDS_KEYWORDS: &[&str] = &["tds"];
const TURBIDITY_KEYWORDS: &[&str] = &["turb"];

/// Token index per field when no keyword resolves it (0-indexed).
const PH_POSITION: usize = 1;
const TDS_POSITION: usize = 4;
const TURBIDITY_POSITION: usize = 6;

/// Strip colons from a token and parse it as a float.
fn numeric_value(token: &str) -> Option<f64> {
    token.replace(':', "").parse::<f64>().ok()
}

/// Scan all tokens for a keyword hit; the candidate value is the token
/// following the hit, colons stripped. The scan never early-exits: the last
/// hit whose neighbour parses as a number wins, and hits with a missing or
/// unparsable neighbour leave the previous candidate intact.
fn keyword_scan(tokens: &[&str], keywords: &[&str]) -> Option<f64> {
    let mut value = None;
    for (i, token) in tokens.iter().enumerate() {
        let lower = token.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(kw)) {
            if let Some(parsed) = tokens.get(i + 1).and_then(|t| numeric_value(t)) {
                value = Some(parsed);
            }
        }
    }
    value
}

/// Fixed-position fallback for firmware that prints bare values.
fn positional(tokens: &[&str], index: usize) -> Option<f64> {
    tokens.get(index).and_then(|t| numeric_value(t))
}

/// Resolve one field: keyword scan, then positional fallback.
fn extract_field(tokens: &[&str], keywords: &[&str], fallback_index: usize) -> Option<f64> {
    keyword_scan(tokens, keywords).or_else(|| positional(tokens, fallback_index))
}

// ============================================================================
// Line Parsing
// ============================================================================

/// Parse one raw device line into a [`Reading`].
///
/// Returns `None` when any of the three fields stays unresolved after both
/// strategies, or when the pH value is outside [0, 14]. TDS and turbidity
/// out of their nominal windows only warn; pH alone rejects. Total: parse
/// failures are absorbed per field and never propagate.
pub fn parse_line(line: &str) -> Option<Reading> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();

    let ph = extract_field(&tokens, PH_KEYWORDS, PH_POSITION);
    let tds = extract_field(&tokens, TDS_KEYWORDS, TDS_POSITION);
    let turbidity = extract_field(&tokens, TURBIDITY_KEYWORDS, TURBIDITY_POSITION);

    let (ph, tds, turbidity) = match (ph, tds, turbidity) {
        (Some(ph), Some(tds), Some(turbidity)) => (ph, tds, turbidity),
        _ => {
            warn!(line = %trimmed, "incomplete sensor line, dropping");
            return None;
        }
    };

    if !(0.0..=14.0).contains(&ph) {
        warn!(ph, line = %trimmed, "pH out of range, dropping line");
        return None;
    }

    if !(0.0..=10_000.0).contains(&tds) {
        warn!(tds, "TDS outside expected range");
    }

    if !(0.0..=100.0).contains(&turbidity) {
        warn!(turbidity, "turbidity outside expected range");
    }

    Some(Reading { ph, tds, turbidity })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_line() {
        let reading = parse_line("pH: 7.2 TDS: 145 Turbidity: 2.3").unwrap();
        assert_eq!(reading.ph, 7.2);
        assert_eq!(reading.tds, 145.0);
        assert_eq!(reading.turbidity, 2.3);
    }

    #[test]
    fn test_parse_without_colons() {
        let reading = parse_line("pH 6.8 TDS 310 Turbidity 0.9").unwrap();
        assert_eq!(reading.ph, 6.8);
        assert_eq!(reading.tds, 310.0);
        assert_eq!(reading.turbidity, 0.9);
    }

    #[test]
    fn test_parse_mixed_case_and_spacing() {
        let reading = parse_line("  PH:  7.0   tds: 500  TURB: 12.5  ").unwrap();
        assert_eq!(reading.ph, 7.0);
        assert_eq!(reading.tds, 500.0);
        assert_eq!(reading.turbidity, 12.5);
    }

    #[test]
    fn test_parse_empty_and_whitespace_rejected() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("\t\r\n").is_none());
    }

    #[test]
    fn test_parse_ph_out_of_range_rejected() {
        assert!(parse_line("pH: 15 TDS: 10 Turbidity: 1").is_none());
        assert!(parse_line("pH: -0.1 TDS: 10 Turbidity: 1").is_none());
    }

    #[test]
    fn test_parse_ph_boundaries_accepted() {
        assert!(parse_line("pH: 0 TDS: 10 Turbidity: 1").is_some());
        assert!(parse_line("pH: 14 TDS: 10 Turbidity: 1").is_some());
    }

    #[test]
    fn test_parse_soft_ranges_warn_but_accept() {
        let reading = parse_line("pH: 7 TDS: 20000 Turbidity: 200").unwrap();
        assert_eq!(reading.tds, 20_000.0);
        assert_eq!(reading.turbidity, 200.0);
    }

    #[test]
    fn test_keyword_scan_beats_positional_fallback() {
        // Positional indices 1/4/6 would pick "bar", "baz" and "99" here;
        // the keyword hits must win.
        let reading = parse_line("foo bar pH: 6.5 baz TDS: 99 qux Turbidity: 1.1").unwrap();
        assert_eq!(reading.ph, 6.5);
        assert_eq!(reading.tds, 99.0);
        assert_eq!(reading.turbidity, 1.1);
    }

    #[test]
    fn test_positional_fallback_resolves_bare_values() {
        // No keywords at all: values sit at token indices 1, 4 and 6.
        let reading = parse_line("a 7.1 b c 230 d 3.4").unwrap();
        assert_eq!(reading.ph, 7.1);
        assert_eq!(reading.tds, 230.0);
        assert_eq!(reading.turbidity, 3.4);
    }

    #[test]
    fn test_unresolvable_field_rejects_line() {
        // TDS has no keyword and token index 4 does not exist.
        assert!(parse_line("pH: 7.0 Turbidity:").is_none());
        // Garbage everywhere.
        assert!(parse_line("no numbers here at all").is_none());
    }

    #[test]
    fn test_last_keyword_match_wins() {
        let reading = parse_line("pH: 5.0 pH: 6.0 TDS: 10 Turbidity: 1").unwrap();
        assert_eq!(reading.ph, 6.0);
    }

    #[test]
    fn test_unparsable_hit_keeps_earlier_candidate() {
        // The second "pH" hit is followed by a non-numeric token; the first
        // candidate must survive.
        let reading = parse_line("pH: 5.5 pH: abc TDS: 10 Turbidity: 1").unwrap();
        assert_eq!(reading.ph, 5.5);
    }

    #[test]
    fn test_keyword_at_end_of_line_falls_back() {
        // "tds" hits on the final token with no neighbour; positional
        // fallback (index 4) resolves it instead.
        let reading = parse_line("pH: 7.0 Turbidity: 1.0 42 tds").unwrap();
        assert_eq!(reading.tds, 42.0);
    }

    #[test]
    fn test_field_failure_stays_local_to_the_field() {
        // "6.9x" defeats both strategies for pH, so the line is dropped --
        // but only because pH is unresolved; TDS and turbidity still parse.
        assert!(parse_line("pH: 6.9x TDS: 100 Turbidity: 2").is_none());

        // With a parsable token at index 1 the same line shape is accepted:
        // pH falls back to position while the others resolve by keyword.
        let reading = parse_line("value 6.9 TDS: 100 Turbidity: 2").unwrap();
        assert_eq!(reading.ph, 6.9);
        assert_eq!(reading.tds, 100.0);
        assert_eq!(reading.turbidity, 2.0);
    }

    #[test]
    fn test_scientific_notation_and_integers() {
        let reading = parse_line("pH: 7 TDS: 1.5e2 Turbidity: 3").unwrap();
        assert_eq!(reading.tds, 150.0);
        assert_eq!(reading.turbidity, 3.0);
    }
}
