//! Header row detection.

use log::debug;

use super::split::{LineDialect, split_fields, unquote};
use super::type_detection::{detect_value_type, majority_type};
use crate::cancel::CancellationToken;
use crate::descriptor::Detection;
use crate::error::Cancelled;
use crate::field_type::Type;
use crate::sample::SampleWindow;

fn is_one_letter(value: &str) -> bool {
    value.trim().chars().count() == 1
}

/// Decide whether the first row of `window` holds column names.
///
/// `window` must start at the first tabular row. Each column's first-row
/// value type is compared with the majority type of the next `lookahead`
/// rows. The row is a header when more than `mismatch_ratio` of the
/// comparable columns disagree, or when none of its values is numeric.
/// With fewer than two rows there is no evidence and the answer is
/// `Defaulted(false)`.
pub fn detect_header(
    window: &SampleWindow,
    dialect: &LineDialect,
    lookahead: usize,
    mismatch_ratio: f64,
    cancel: &CancellationToken,
) -> Result<Detection<bool>, Cancelled> {
    let split = |line: &str| -> Vec<String> {
        split_fields(line, dialect)
            .into_iter()
            .map(|f| unquote(f, dialect))
            .collect()
    };

    let mut lines = window.non_blank();
    let Some(first) = lines.next() else {
        return Ok(Detection::Defaulted(false));
    };
    let first = split(first);

    let mut rows = Vec::with_capacity(lookahead);
    for (i, line) in lines.take(lookahead).enumerate() {
        cancel.check_at(i)?;
        rows.push(split(line));
    }
    if rows.is_empty() {
        debug!("single row: no header evidence");
        return Ok(Detection::Defaulted(false));
    }

    let mut compared = 0usize;
    let mut mismatched = 0usize;
    let mut any_numeric = false;

    for (col, value) in first.iter().enumerate() {
        let first_type = detect_value_type(value);
        any_numeric |= first_type.is_numeric();
        if first_type == Type::Null {
            continue;
        }
        let column: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(col).map(String::as_str))
            .collect();
        let Some(data_type) = majority_type(column.iter().copied()) else {
            continue;
        };
        // a one-letter name such as `N` reads as a boolean; it only counts
        // as one when the data uses one-letter flags too
        let first_type = if first_type == Type::Boolean
            && is_one_letter(value)
            && !column.iter().any(|v| is_one_letter(v))
        {
            Type::Text
        } else {
            first_type
        };
        compared += 1;
        if !first_type.agrees_with(data_type) {
            mismatched += 1;
        }
    }

    let disagreement = if compared == 0 {
        0.0
    } else {
        mismatched as f64 / compared as f64
    };
    let has_header = disagreement > mismatch_ratio || !any_numeric;
    debug!(
        "header check: {mismatched}/{compared} columns disagree, numeric first row: {any_numeric} -> {has_header}"
    );

    Ok(Detection::Resolved(has_header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Escape;

    fn header(lines: &[&str]) -> Detection<bool> {
        let window = SampleWindow::from_lines(lines.iter().copied());
        let dialect = LineDialect::qualified(',', Some('"'), Escape::Doubled);
        detect_header(&window, &dialect, 10, 0.5, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_header_over_numeric_column() {
        assert_eq!(header(&["ID,Name", "1,Alice"]), Detection::Resolved(true));
    }

    #[test]
    fn test_numeric_rows_have_no_header() {
        assert_eq!(
            header(&["1,2,3", "4,5,6", "7,8,9"]),
            Detection::Resolved(false)
        );
    }

    #[test]
    fn test_typed_columns() {
        assert_eq!(
            header(&[
                "id,score,date,active",
                "1,95.5,2023-01-15,true",
                "2,87.2,2023-02-20,false"
            ]),
            Detection::Resolved(true)
        );
    }

    #[test]
    fn test_data_first_row_with_text_and_numbers() {
        assert_eq!(
            header(&["7,Alice,2023-01-15", "8,Bob,2023-02-20", "9,Carol,2023-03-01"]),
            Detection::Resolved(false)
        );
    }

    #[test]
    fn test_all_text_first_row_is_header() {
        assert_eq!(
            header(&["name,city", "Alice,Paris", "Bob,Rome"]),
            Detection::Resolved(true)
        );
    }

    #[test]
    fn test_one_letter_names_over_boolean_words() {
        assert_eq!(
            header(&["T,F,2023", "true,no,5", "false,yes,7", "true,yes,9"]),
            Detection::Resolved(true)
        );
    }

    #[test]
    fn test_one_letter_flags_in_data() {
        assert_eq!(
            header(&["Y,N,1", "N,Y,2", "Y,Y,3"]),
            Detection::Resolved(false)
        );
    }

    #[test]
    fn test_single_row() {
        assert_eq!(header(&["ID,Name"]), Detection::Defaulted(false));
        assert_eq!(header(&[]), Detection::Defaulted(false));
    }

    #[test]
    fn test_quoted_header() {
        assert_eq!(
            header(&["\"year\",\"amount\"", "2020,10.5", "2021,11.0"]),
            Detection::Resolved(true)
        );
    }
}
