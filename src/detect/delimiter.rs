//! Field delimiter guessing.
//!
//! Every candidate splits each sample line; the candidate under which the
//! most lines agree on one field count wins.

use foldhash::{HashMap, HashMapExt};
use log::debug;

use super::split::{LineDialect, split_fields, unquote};
use crate::cancel::CancellationToken;
use crate::descriptor::{Delimiter, Detection};
use crate::error::Cancelled;
use crate::sample::SampleWindow;

/// Multiplier applied when the most common field count is 1.
const ONE_FIELD_PENALTY: f64 = 0.5;

/// Scores closer than this are treated as a tie.
const SCORE_EPSILON: f64 = 1e-9;

/// A delimiter and how well it explains the sample.
#[derive(Debug, Clone, PartialEq)]
pub struct DelimiterCandidate {
    pub delimiter: Delimiter,
    /// Lines sharing the winning field count, each weighted by the share
    /// of its fields that are non-empty.
    pub score: f64,
    /// The winning field count.
    pub field_count: usize,
    /// Non-blank lines that split into more than one field.
    pub split_lines: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct CountBucket {
    lines: usize,
    weight: f64,
}

/// Score one delimiter against the sample.
pub fn score_delimiter(
    window: &SampleWindow,
    dialect: &LineDialect,
    cancel: &CancellationToken,
) -> Result<DelimiterCandidate, Cancelled> {
    let mut buckets: HashMap<usize, CountBucket> = HashMap::with_capacity(16);
    let mut split_lines = 0;

    for (i, line) in window.non_blank().enumerate() {
        cancel.check_at(i)?;
        let fields = split_fields(line, dialect);
        let non_empty = fields
            .iter()
            .filter(|f| !unquote(f, dialect).trim().is_empty())
            .count();
        if fields.len() > 1 {
            split_lines += 1;
        }
        let bucket = buckets.entry(fields.len()).or_default();
        bucket.lines += 1;
        bucket.weight += non_empty as f64 / fields.len() as f64;
    }

    // deterministic: most lines first, then the larger field count
    let best = |min_count: usize| {
        buckets
            .iter()
            .filter(|&(&count, _)| count >= min_count)
            .max_by(|(ca, a), (cb, b)| a.lines.cmp(&b.lines).then_with(|| ca.cmp(cb)))
            .map(|(&count, bucket)| (count, *bucket))
    };

    let (field_count, score) = match best(1) {
        None => (0, 0.0),
        Some((count, bucket)) if count >= 2 => (count, bucket.weight),
        Some(_) => match best(2) {
            Some((count, bucket)) => (count, bucket.weight * ONE_FIELD_PENALTY),
            None => (1, 0.0),
        },
    };

    Ok(DelimiterCandidate {
        delimiter: Delimiter(dialect.delimiter),
        score,
        field_count,
        split_lines,
    })
}

/// Tie-break rank: comma, then tab, then the remaining candidates in order.
fn tie_rank(delimiter: char, position: usize) -> usize {
    match delimiter {
        ',' => 0,
        '\t' => 1,
        _ => position + 2,
    }
}

/// Score every candidate, best first.
///
/// Candidates equal to the template's qualifier or escape character are
/// skipped.
pub fn rank_delimiters(
    window: &SampleWindow,
    candidates: &[char],
    template: &LineDialect,
    cancel: &CancellationToken,
) -> Result<Vec<DelimiterCandidate>, Cancelled> {
    let mut scored = Vec::with_capacity(candidates.len());
    for (position, &delimiter) in candidates.iter().enumerate() {
        cancel.check()?;
        // never the qualifier or a dedicated escape character
        if template.qualifier == Some(delimiter) || template.escape.char() == Some(delimiter) {
            continue;
        }
        let dialect = LineDialect { delimiter, ..*template };
        let candidate = score_delimiter(window, &dialect, cancel)?;
        debug!(
            "delimiter {} scored {:.2} ({} fields)",
            candidate.delimiter, candidate.score, candidate.field_count
        );
        scored.push((tie_rank(delimiter, position), candidate));
    }

    scored.sort_by(|(ra, a), (rb, b)| {
        if (a.score - b.score).abs() <= SCORE_EPSILON {
            ra.cmp(rb)
        } else {
            b.score.total_cmp(&a.score)
        }
    });

    Ok(scored.into_iter().map(|(_, c)| c).collect())
}

/// Propose the most likely field delimiter.
///
/// `template` supplies the qualifier and escape used while splitting; its
/// delimiter is ignored. Returns `NoSignal` when no candidate splits any
/// line into more than one field.
pub fn guess_delimiter(
    window: &SampleWindow,
    candidates: &[char],
    template: &LineDialect,
    cancel: &CancellationToken,
) -> Result<Detection<Delimiter>, Cancelled> {
    let ranked = rank_delimiters(window, candidates, template, cancel)?;

    match ranked.first() {
        Some(best) if best.score > SCORE_EPSILON => {
            debug!("delimiter guess: {}", best.delimiter);
            Ok(Detection::Resolved(best.delimiter))
        }
        _ => {
            debug!("no candidate delimiter splits the sample");
            Ok(Detection::NoSignal)
        }
    }
}
