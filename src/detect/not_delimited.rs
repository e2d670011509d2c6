//! Recognising files that are not delimited at all.

use super::split::{LineDialect, field_count};
use crate::descriptor::{Delimiter, Detection};
use crate::sample::SampleWindow;

/// True when the sample shows no tabular structure.
///
/// That is the case when the delimiter guess found no signal, or when no
/// non-blank line splits into more than one field under the chosen
/// delimiter. An empty window is not flagged: there is nothing to judge.
pub fn is_not_delimited(
    window: &SampleWindow,
    delimiter: &Detection<Delimiter>,
    dialect: &LineDialect,
) -> bool {
    if window.non_blank().next().is_none() {
        return false;
    }
    if matches!(delimiter, Detection::NoSignal) {
        return true;
    }
    window.non_blank().all(|line| field_count(line, dialect) <= 1)
}
