/// Tunable constants for the line-based heuristics.
///
/// The defaults were calibrated against the fixtures in the test suite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Fraction of lines containing the qualifier that must show balanced,
    /// wrapped fields before the qualifier counts as used.
    pub qualifier_ratio: f64,
    /// Fraction of comparable columns whose first-row type must disagree
    /// with the data rows before the first row counts as a header.
    pub header_mismatch_ratio: f64,
    /// Number of consecutive lines sharing a field count that marks the
    /// start of tabular data.
    pub stable_run: usize,
    /// Number of rows after the first tabular row used for header typing.
    pub header_lookahead: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            qualifier_ratio: 0.5,
            header_mismatch_ratio: 0.5,
            stable_run: 3,
            header_lookahead: 10,
        }
    }
}

/// Delimiters tried when none is pinned, in tie-break order after comma and tab.
pub const DEFAULT_DELIMITERS: &[char] = &[',', ';', '|', '\t', ':'];

/// Qualifier tested for usage when none is pinned.
pub const DEFAULT_QUALIFIER: char = '"';

/// Bytes inspected by the encoding sniffer.
pub const DEFAULT_ENCODING_PREFIX: usize = 4096;
