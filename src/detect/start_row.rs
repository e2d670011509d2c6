//! Preamble detection: where does the tabular part of a file begin?

use log::debug;

use super::split::{LineDialect, meaningful_field_count};
use crate::cancel::CancellationToken;
use crate::descriptor::Detection;
use crate::error::Cancelled;
use crate::sample::SampleWindow;

/// Find the number of preamble lines before the first stable run.
///
/// A stable run is `run` non-blank lines sharing one field count of at
/// least two; blank lines (including rows of bare delimiters) inside the
/// run are ignored. The window must start at byte offset zero. Without a
/// stable run the result is `Defaulted(0)`.
pub fn guess_start_row(
    window: &SampleWindow,
    dialect: &LineDialect,
    run: usize,
    cancel: &CancellationToken,
) -> Result<Detection<usize>, Cancelled> {
    let mut counts = Vec::with_capacity(window.len());
    for (i, line) in window.lines().iter().enumerate() {
        cancel.check_at(i)?;
        counts.push(meaningful_field_count(line, dialect));
    }

    let non_blank = counts.iter().filter(|&&c| c > 0).count();
    let run = run.max(1).min(non_blank);
    if run == 0 {
        return Ok(Detection::Defaulted(0));
    }

    for (start, &count) in counts.iter().enumerate() {
        if count < 2 {
            continue;
        }
        let stable = counts[start..]
            .iter()
            .filter(|&&c| c > 0)
            .take(run)
            .filter(|&&c| c == count)
            .count();
        if stable == run {
            debug!("stable run of {run} lines with {count} fields starts at line {start}");
            return Ok(Detection::Resolved(start));
        }
    }

    debug!("no stable run in {} sample lines", counts.len());
    Ok(Detection::Defaulted(0))
}
