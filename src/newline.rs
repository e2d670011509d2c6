//! Line break detection.

use std::fmt;

use serde::Serialize;

/// Line break convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Newline {
    /// Old Mac-style line ending (\r).
    Cr,
    /// Unix-style line ending (\n).
    #[default]
    Lf,
    /// Windows-style line ending (\r\n).
    CrLf,
}

impl Newline {
    /// Returns the text sequence for this line break.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Newline::Cr => "\r",
            Newline::Lf => "\n",
            Newline::CrLf => "\r\n",
        }
    }

    /// Returns the conventional name.
    pub const fn name(&self) -> &'static str {
        match self {
            Newline::Cr => "CR",
            Newline::Lf => "LF",
            Newline::CrLf => "CRLF",
        }
    }
}

impl fmt::Display for Newline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Occurrences of each line break kind in a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewlineCounts {
    pub cr: usize,
    pub lf: usize,
    pub crlf: usize,
}

impl NewlineCounts {
    /// Count lone CR, lone LF and CRLF pairs. A CRLF pair counts once.
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let cr_total = bytecount::count(bytes, b'\r');
        let lf_total = bytecount::count(bytes, b'\n');
        let crlf = bytes.windows(2).filter(|w| *w == b"\r\n").count();

        Self {
            cr: cr_total - crlf,
            lf: lf_total - crlf,
            crlf,
        }
    }

    /// Total number of line breaks.
    pub fn total(&self) -> usize {
        self.cr + self.lf + self.crlf
    }
}

/// Determine the line break convention of a decoded sample.
///
/// The most frequent kind wins. Ties prefer CRLF, then LF, then CR.
/// A sample without any line break is reported as LF.
pub fn detect_newline(text: &str) -> Newline {
    let counts = NewlineCounts::new(text);

    if counts.total() == 0 {
        return Newline::Lf;
    }

    if counts.crlf >= counts.lf && counts.crlf >= counts.cr {
        Newline::CrLf
    } else if counts.lf >= counts.cr {
        Newline::Lf
    } else {
        Newline::Cr
    }
}
