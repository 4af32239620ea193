//! Field normalization for raw spreadsheet cells.
//!
//! Spreadsheet exports mix `64,00%` and `64.00%`, leave cells blank and
//! occasionally contain free text. Every helper here is total: bad input
//! becomes zero, and callers that need to tell "missing" from "zero" use
//! [`has_rate`].

/// Parse a percentage cell into a fraction (`"64,00%"` -> `0.64`).
///
/// Returns 0 for absent, blank, non-numeric or non-finite values.
pub fn parse_percent(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let cleaned = raw.trim().replace('%', "").replace(',', ".");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value / 100.0,
        _ => 0.0,
    }
}

/// Parse a non-negative count cell. Blank or malformed cells count as 0.
pub fn parse_count(raw: Option<&str>) -> u64 {
    raw.map(str::trim)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Whether a rate cell takes part in averages: non-blank and strictly
/// positive once parsed.
pub fn has_rate(raw: Option<&str>) -> bool {
    match raw {
        Some(value) if !value.trim().is_empty() => parse_percent(Some(value)) > 0.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_percent_blank_and_absent() {
        assert_eq!(parse_percent(Some("")), 0.0);
        assert_eq!(parse_percent(Some("   ")), 0.0);
        assert_eq!(parse_percent(None), 0.0);
    }

    #[test]
    fn test_parse_percent_locale_separators() {
        assert!(close(parse_percent(Some("64,00%")), 0.64));
        assert!(close(parse_percent(Some("64.00%")), 0.64));
        assert!(close(parse_percent(Some(" 92,5 % ")), 0.925));
        assert!(close(parse_percent(Some("100")), 1.0));
    }

    #[test]
    fn test_parse_percent_garbage() {
        assert_eq!(parse_percent(Some("abc")), 0.0);
        assert_eq!(parse_percent(Some("%")), 0.0);
        assert_eq!(parse_percent(Some("1.234,5%")), 0.0);
        assert_eq!(parse_percent(Some("inf")), 0.0);
        assert_eq!(parse_percent(Some("NaN")), 0.0);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Some("12")), 12);
        assert_eq!(parse_count(Some(" 7 ")), 7);
        assert_eq!(parse_count(Some("")), 0);
        assert_eq!(parse_count(Some("-3")), 0);
        assert_eq!(parse_count(Some("n/a")), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[test]
    fn test_has_rate() {
        assert!(has_rate(Some("80%")));
        assert!(!has_rate(Some("0%")));
        assert!(!has_rate(Some("")));
        assert!(!has_rate(Some("abc")));
        assert!(!has_rate(None));
    }
}
