//! Qualifier-aware field splitting for single sample lines.

use crate::descriptor::Escape;

/// Splitting rules for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDialect {
    pub delimiter: char,
    pub qualifier: Option<char>,
    pub escape: Escape,
}

impl LineDialect {
    /// Dialect that splits on `delimiter` only.
    pub const fn naive(delimiter: char) -> Self {
        Self {
            delimiter,
            qualifier: None,
            escape: Escape::None,
        }
    }

    /// Dialect that honours `qualifier` wrapped fields.
    pub const fn qualified(delimiter: char, qualifier: Option<char>, escape: Escape) -> Self {
        Self {
            delimiter,
            qualifier,
            escape,
        }
    }
}

/// Split a line into raw fields, keeping any qualifiers.
///
/// A qualifier opens a wrapped field only at the start of a field and the
/// delimiter does not split while the field is open. If a line ends while a
/// field is still open the wrapping was not real, and the line is split
/// naively instead.
pub fn split_fields<'a>(line: &'a str, dialect: &LineDialect) -> Vec<&'a str> {
    let Some(q) = dialect.qualifier.filter(|&q| q != dialect.delimiter) else {
        return line.split(dialect.delimiter).collect();
    };
    let escape = dialect.escape.char().filter(|&e| e != q);

    let mut fields = Vec::new();
    let mut start = 0;
    let mut at_field_start = true;
    let mut in_quotes = false;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_quotes {
            if Some(c) == escape {
                // escaped character is literal
                chars.next();
            } else if c == q {
                if chars.peek().map(|&(_, n)| n) == Some(q) {
                    // doubled qualifier
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        if c == dialect.delimiter {
            fields.push(&line[start..i]);
            start = i + c.len_utf8();
            at_field_start = true;
            continue;
        }

        if at_field_start && c == q {
            in_quotes = true;
        }
        at_field_start = false;
    }

    if in_quotes {
        return line.split(dialect.delimiter).collect();
    }

    fields.push(&line[start..]);
    fields
}

/// Number of fields on a line. A blank line has zero fields.
pub fn field_count(line: &str, dialect: &LineDialect) -> usize {
    if line.trim().is_empty() {
        return 0;
    }
    split_fields(line, dialect).len()
}

/// Field count that treats a row of only blank fields (`,,,`) as empty.
pub fn meaningful_field_count(line: &str, dialect: &LineDialect) -> usize {
    let fields = split_fields(line, dialect);
    if fields.iter().all(|f| unquote(f, dialect).trim().is_empty()) {
        0
    } else {
        fields.len()
    }
}

/// Remove wrapping qualifiers and resolve escapes in a raw field.
pub fn unquote(field: &str, dialect: &LineDialect) -> String {
    let Some(q) = dialect.qualifier else {
        return field.to_string();
    };
    let trimmed = field.trim();
    let inner = trimmed
        .strip_prefix(q)
        .and_then(|rest| rest.strip_suffix(q))
        .filter(|_| trimmed.chars().count() >= 2);
    let Some(inner) = inner else {
        return field.to_string();
    };

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if Some(c) == dialect.escape.char() && chars.peek() == Some(&q) {
            continue;
        }
        if c == q && chars.peek() == Some(&q) {
            chars.next();
        }
        value.push(c);
    }
    value
}
