//! Compiled regex patterns for value typing.

use std::sync::LazyLock;

use regex::Regex;

/// Numbers with a fraction or exponent: `12.5`, `-1e5`, `1,234,567.89`, `3,14`.
pub static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[-+]?(?:",
        r"(?:\d+\.?\d*|\d*\.?\d+)(?:[eE][-+]?\d+)?",
        r"|\d{1,3}(?:,\d{3})+(?:\.\d+)?",
        r"|\d+,\d+",
        r")$"
    ))
    .expect("Invalid decimal pattern")
});

/// Dates without a time part: ISO `2023-12-31`, US `12/31/2023`, dotted `31.12.2023`.
pub static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"\d{4}[-/]\d{1,2}[-/]\d{1,2}",
        r"|\d{1,2}[-/]\d{1,2}[-/]\d{2,4}",
        r"|\d{1,2}\.\d{1,2}\.\d{2,4}",
        r")$"
    ))
    .expect("Invalid date pattern")
});

/// Dates followed by a clock time, with optional seconds, fraction, zone or AM/PM.
pub static DATETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"\d{4}[-/]\d{1,2}[-/]\d{1,2}[T ]\d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?",
        r"|\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}[T ]?\d{1,2}:\d{2}(?::\d{2})?(?:\s*(?i:am|pm))?",
        r")$"
    ))
    .expect("Invalid datetime pattern")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_pattern() {
        assert!(DECIMAL_PATTERN.is_match("12.34"));
        assert!(DECIMAL_PATTERN.is_match("-1e5"));
        assert!(DECIMAL_PATTERN.is_match("1,234,567.89"));
        assert!(DECIMAL_PATTERN.is_match("3,14"));
        assert!(!DECIMAL_PATTERN.is_match("12.3.4"));
        assert!(!DECIMAL_PATTERN.is_match("."));
        assert!(!DECIMAL_PATTERN.is_match("1,2,3"));
    }

    #[test]
    fn test_date_pattern() {
        assert!(DATE_PATTERN.is_match("2023-12-31"));
        assert!(DATE_PATTERN.is_match("2023/12/31"));
        assert!(DATE_PATTERN.is_match("12/31/2023"));
        assert!(DATE_PATTERN.is_match("31.12.2023"));
        assert!(!DATE_PATTERN.is_match("2023-12-31T12:30"));
    }

    #[test]
    fn test_datetime_pattern() {
        assert!(DATETIME_PATTERN.is_match("2023-12-31T12:30:45"));
        assert!(DATETIME_PATTERN.is_match("2023-12-31 12:30:45"));
        assert!(DATETIME_PATTERN.is_match("2023-12-31T12:30:45Z"));
        assert!(DATETIME_PATTERN.is_match("10/14/2010 9:30 PM"));
        assert!(!DATETIME_PATTERN.is_match("2023-12-31"));
    }
}
