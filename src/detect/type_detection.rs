//! Value typing used by header detection.

use super::regexes::{DATE_PATTERN, DATETIME_PATTERN, DECIMAL_PATTERN};
use crate::field_type::Type;

/// Placeholders that stand for a missing value, compared case-insensitively.
const NULL_WORDS: &[&str] = &["", "-", "--", "?", "null", "none", "na", "n/a", "nan", "#n/a"];

#[inline]
fn is_null_value(s: &str) -> bool {
    NULL_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w))
}

/// Whole numbers, signed or not. Limited to 19 digits so values fit in i64.
#[inline]
fn is_integer(s: &str) -> bool {
    let digits = s
        .strip_prefix('-')
        .or_else(|| s.strip_prefix('+'))
        .unwrap_or(s);
    !digits.is_empty() && digits.len() <= 19 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Boolean words. Bare 0/1 are integers, not booleans.
#[inline]
fn is_boolean(s: &str) -> bool {
    match s.len() {
        1 => matches!(s.as_bytes()[0].to_ascii_lowercase(), b'y' | b'n' | b't' | b'f'),
        2 => s.eq_ignore_ascii_case("no"),
        3 => s.eq_ignore_ascii_case("yes"),
        4 => s.eq_ignore_ascii_case("true"),
        5 => s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

/// Detect the type of a single field value.
pub fn detect_value_type(value: &str) -> Type {
    let trimmed = value.trim();

    if is_null_value(trimmed) {
        return Type::Null;
    }

    if is_integer(trimmed) {
        return Type::Integer;
    }

    if is_boolean(trimmed) {
        return Type::Boolean;
    }

    if DECIMAL_PATTERN.is_match(trimmed) {
        return Type::Decimal;
    }

    if DATETIME_PATTERN.is_match(trimmed) {
        return Type::DateTime;
    }

    if DATE_PATTERN.is_match(trimmed) {
        return Type::Date;
    }

    Type::Text
}

/// Most frequent non-null type among `values`, or `None` if all are null.
///
/// Ties go to the type with the lower index (more specific first).
pub fn majority_type<'a, I>(values: I) -> Option<Type>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = [0usize; Type::COUNT];
    for value in values {
        counts[detect_value_type(value).as_index()] += 1;
    }
    counts[Type::Null.as_index()] = 0;

    let (index, &count) = counts
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then_with(|| ib.cmp(ia)))?;
    (count > 0).then(|| Type::from_index(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_value_type() {
        assert_eq!(detect_value_type("123"), Type::Integer);
        assert_eq!(detect_value_type("-123"), Type::Integer);
        assert_eq!(detect_value_type("12.34"), Type::Decimal);
        assert_eq!(detect_value_type("1,234.5"), Type::Decimal);
        assert_eq!(detect_value_type("true"), Type::Boolean);
        assert_eq!(detect_value_type("2023-12-31"), Type::Date);
        assert_eq!(detect_value_type("2023-12-31T12:30:45"), Type::DateTime);
        assert_eq!(detect_value_type("hello"), Type::Text);
        assert_eq!(detect_value_type("ID"), Type::Text);
        assert_eq!(detect_value_type(""), Type::Null);
        assert_eq!(detect_value_type("NULL"), Type::Null);
        assert_eq!(detect_value_type("n/A"), Type::Null);
        assert_eq!(detect_value_type(" 42 "), Type::Integer);
    }

    #[test]
    fn test_majority_type() {
        assert_eq!(majority_type(["1", "2", "x"]), Some(Type::Integer));
        assert_eq!(majority_type(["", "NULL"]), None);
        assert_eq!(majority_type(["", "a", ""]), Some(Type::Text));
        assert_eq!(majority_type(std::iter::empty()), None);
    }
}
