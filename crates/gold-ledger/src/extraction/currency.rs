//! Rupiah price parsing.

use regex::Regex;
use std::sync::LazyLock;

static PRICE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.,]+").unwrap());

/// Parse a localized price such as `Rp 1.234.567` into an integer.
///
/// Takes the first run of digits and separators, strips `.` and `,`, and
/// parses what is left. Returns `None` when there is no such run or the
/// digits do not form a valid `i64`. A decimal part is not recognised, so
/// `1.234,50` parses as `123450`.
pub fn parse_currency(text: &str) -> Option<i64> {
    let run = PRICE_RUN_RE.find(text)?;
    let digits = run.as_str().replace(['.', ','], "");
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_separated() {
        assert_eq!(parse_currency("Rp 1.234.567"), Some(1_234_567));
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(parse_currency("Rp 1,234,567"), Some(1_234_567));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("abc"), None);
        assert_eq!(parse_currency("Harga Jual"), None);
    }

    #[test]
    fn test_separators_only() {
        assert_eq!(parse_currency("Rp ."), None);
        assert_eq!(parse_currency("- , -"), None);
    }

    #[test]
    fn test_first_run_wins() {
        assert_eq!(parse_currency("Rp1.000.000 (naik 5.000)"), Some(1_000_000));
    }

    #[test]
    fn test_overflow_is_unparseable() {
        assert_eq!(parse_currency("Rp 99.999.999.999.999.999.999"), None);
    }
}
