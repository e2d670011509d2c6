//! Qualifier usage and escape convention detection.

use log::debug;

use super::split::{LineDialect, split_fields};
use crate::cancel::CancellationToken;
use crate::descriptor::{Detection, Escape, Quote};
use crate::error::Cancelled;
use crate::sample::SampleWindow;

/// Inferred quoting convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifierGuess {
    pub quote: Quote,
    pub escape: Escape,
}

impl QualifierGuess {
    /// No quoting and no escaping.
    pub const UNUSED: QualifierGuess = QualifierGuess {
        quote: Quote::None,
        escape: Escape::None,
    };
}

/// Evidence gathered from a sample for one qualifier character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualifierEvidence {
    /// Non-blank lines examined.
    pub lines: usize,
    /// Lines containing the qualifier at all.
    pub lines_with_qualifier: usize,
    /// Lines with a balanced qualifier count and at least one wrapped field.
    pub qualified_lines: usize,
    /// Wrapped fields containing a doubled qualifier.
    pub doubled: usize,
    /// Wrapped fields containing a backslash-escaped qualifier.
    pub backslashed: usize,
}

impl QualifierEvidence {
    /// Share of lines containing the qualifier that use it for wrapping.
    ///
    /// Lines without the qualifier say nothing either way: files often quote
    /// only the fields that need it.
    pub fn ratio(&self) -> f64 {
        if self.lines_with_qualifier == 0 {
            0.0
        } else {
            self.qualified_lines as f64 / self.lines_with_qualifier as f64
        }
    }

    /// Escape convention supported by the wrapped fields.
    pub fn escape(&self) -> Escape {
        if self.backslashed > self.doubled {
            Escape::Char('\\')
        } else if self.doubled > 0 {
            Escape::Doubled
        } else {
            Escape::None
        }
    }
}

/// Qualifier characters not preceded by a backslash.
fn unescaped_count(line: &str, qualifier: char) -> usize {
    let mut count = 0;
    let mut prev = None;
    for c in line.chars() {
        if c == qualifier && prev != Some('\\') {
            count += 1;
        }
        // a doubled backslash escapes itself
        prev = if prev == Some('\\') && c == '\\' { None } else { Some(c) };
    }
    count
}

/// Collect qualifier evidence from every non-blank line.
pub fn qualifier_evidence(
    window: &SampleWindow,
    delimiter: char,
    qualifier: char,
    cancel: &CancellationToken,
) -> Result<QualifierEvidence, Cancelled> {
    let dialect = LineDialect::qualified(delimiter, Some(qualifier), Escape::Doubled);
    let mut doubled_pair = String::with_capacity(8);
    doubled_pair.push(qualifier);
    doubled_pair.push(qualifier);
    let mut backslashed_pair = String::with_capacity(8);
    backslashed_pair.push('\\');
    backslashed_pair.push(qualifier);

    let mut evidence = QualifierEvidence::default();

    for (i, line) in window.non_blank().enumerate() {
        cancel.check_at(i)?;
        evidence.lines += 1;

        if !line.contains(qualifier) {
            continue;
        }
        evidence.lines_with_qualifier += 1;

        let count = unescaped_count(line, qualifier);
        if count == 0 || count % 2 != 0 {
            continue;
        }

        let mut wrapped = false;
        for field in split_fields(line, &dialect) {
            let Some(inner) = field
                .strip_prefix(qualifier)
                .and_then(|rest| rest.strip_suffix(qualifier))
            else {
                continue;
            };
            wrapped = true;
            if inner.contains(doubled_pair.as_str()) {
                evidence.doubled += 1;
            }
            if inner.contains(backslashed_pair.as_str()) {
                evidence.backslashed += 1;
            }
        }
        if wrapped {
            evidence.qualified_lines += 1;
        }
    }

    Ok(evidence)
}

/// Decide whether `qualifier` actually wraps fields, and how it is escaped.
///
/// Usage is confirmed when, among lines containing the qualifier, the share
/// with balanced, wrapped fields exceeds `threshold`. A qualifier equal to the delimiter is
/// never confirmed.
pub fn detect_qualifier(
    window: &SampleWindow,
    delimiter: char,
    qualifier: char,
    threshold: f64,
    cancel: &CancellationToken,
) -> Result<Detection<QualifierGuess>, Cancelled> {
    if qualifier == delimiter {
        return Ok(Detection::Defaulted(QualifierGuess::UNUSED));
    }

    let evidence = qualifier_evidence(window, delimiter, qualifier, cancel)?;
    debug!(
        "qualifier {qualifier:?}: {}/{} lines wrapped, {} doubled, {} backslashed",
        evidence.qualified_lines, evidence.lines, evidence.doubled, evidence.backslashed
    );

    if evidence.lines == 0 {
        return Ok(Detection::NoSignal);
    }

    if evidence.ratio() > threshold {
        return Ok(Detection::Resolved(QualifierGuess {
            quote: Quote::Some(qualifier),
            escape: evidence.escape(),
        }));
    }

    if evidence.lines_with_qualifier == 0 {
        Ok(Detection::Resolved(QualifierGuess::UNUSED))
    } else {
        // the character shows up, but not as a wrapper
        Ok(Detection::Defaulted(QualifierGuess::UNUSED))
    }
}
