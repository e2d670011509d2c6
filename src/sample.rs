use std::io::{self, Read};
use std::sync::Arc;

use crate::newline::Newline;

/// Bounds on how much of a file is examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    /// Maximum number of lines in a sample window.
    pub max_lines: usize,
    /// Maximum number of raw bytes read from the source.
    pub max_bytes: usize,
}

impl Default for SampleLimits {
    fn default() -> Self {
        // A few hundred lines is plenty for structural guesses
        Self {
            max_lines: 300,
            max_bytes: 64 * 1024,
        }
    }
}

impl SampleLimits {
    /// Limits with the given line count and the default byte span.
    pub fn lines(max_lines: usize) -> Self {
        Self {
            max_lines,
            ..Self::default()
        }
    }
}

/// Raw bytes read from the start of a source.
#[derive(Debug, Clone, Default)]
pub struct RawSample {
    pub bytes: Vec<u8>,
    /// True when the byte limit cut the source short.
    pub truncated: bool,
}

/// Read at most `limits.max_bytes` bytes from the current position.
pub fn read_sample<R: Read>(reader: &mut R, limits: &SampleLimits) -> io::Result<RawSample> {
    let mut bytes = Vec::with_capacity(limits.max_bytes.min(64 * 1024));
    reader
        .by_ref()
        .take(limits.max_bytes as u64)
        .read_to_end(&mut bytes)?;
    let truncated = bytes.len() >= limits.max_bytes;
    Ok(RawSample { bytes, truncated })
}

/// Immutable bounded view over the leading lines of a decoded file.
///
/// [`SampleWindow::skip`] returns a new window sharing the same lines.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    lines: Arc<[String]>,
    start: usize,
}

impl SampleWindow {
    /// Split decoded text into at most `max_lines` lines.
    ///
    /// When `truncated` is set and the text does not end on a line break,
    /// the trailing partial line is dropped.
    pub fn from_text(text: &str, newline: Newline, max_lines: usize, truncated: bool) -> Self {
        let separator = newline.as_str();
        let complete = !truncated || text.ends_with(separator);

        let mut lines: Vec<String> = text
            .split(separator)
            .map(|line| match newline {
                // stray CR before LF in an LF file
                Newline::Lf => line.strip_suffix('\r').unwrap_or(line).to_string(),
                _ => line.to_string(),
            })
            .collect();

        // split leaves an empty tail after the final break (or a partial line)
        if text.ends_with(separator) || !complete || text.is_empty() {
            lines.pop();
        }
        lines.truncate(max_lines);

        Self {
            lines: lines.into(),
            start: 0,
        }
    }

    /// Build a window from literal lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            start: 0,
        }
    }

    /// A window starting `n` lines further into the file.
    pub fn skip(&self, n: usize) -> Self {
        Self {
            lines: Arc::clone(&self.lines),
            start: (self.start + n).min(self.lines.len()),
        }
    }

    /// The lines in this window.
    #[inline]
    pub fn lines(&self) -> &[String] {
        &self.lines[self.start..]
    }

    /// Number of lines in this window.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len() - self.start
    }

    /// Returns true if the window holds no lines.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator over the lines that contain something besides whitespace.
    pub fn non_blank(&self) -> impl Iterator<Item = &str> {
        self.lines()
            .iter()
            .map(String::as_str)
            .filter(|line| !line.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_text_lf() {
        let window = SampleWindow::from_text("a,b\nc,d\n", Newline::Lf, 100, false);
        assert_eq!(window.lines(), &["a,b", "c,d"]);
    }

    #[test]
    fn test_from_text_without_final_break() {
        let window = SampleWindow::from_text("a,b\r\nc,d", Newline::CrLf, 100, false);
        assert_eq!(window.lines(), &["a,b", "c,d"]);
    }

    #[test]
    fn test_from_text_drops_partial_line() {
        let window = SampleWindow::from_text("a,b\nc,d\ne,", Newline::Lf, 100, true);
        assert_eq!(window.lines(), &["a,b", "c,d"]);
    }

    #[test]
    fn test_from_text_line_limit() {
        let window = SampleWindow::from_text("1\n2\n3\n4\n", Newline::Lf, 2, false);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_from_text_empty() {
        let window = SampleWindow::from_text("", Newline::Lf, 10, false);
        assert!(window.is_empty());
    }

    #[test]
    fn test_skip_shares_lines() {
        let window = SampleWindow::from_lines(["# title", "a,b", "1,2"]);
        let skipped = window.skip(1);
        assert_eq!(skipped.lines(), &["a,b", "1,2"]);
        assert_eq!(window.len(), 3);
        assert!(window.skip(10).is_empty());
    }

    #[test]
    fn test_non_blank() {
        let window = SampleWindow::from_lines(["a", "  ", "", "b"]);
        assert_eq!(window.non_blank().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_read_sample_limits() {
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        let sample = read_sample(&mut cursor, &SampleLimits { max_lines: 1, max_bytes: 4 }).unwrap();
        assert_eq!(sample.bytes, b"0123");
        assert!(sample.truncated);

        let mut cursor = Cursor::new(b"ab".to_vec());
        let sample = read_sample(&mut cursor, &SampleLimits::default()).unwrap();
        assert_eq!(sample.bytes, b"ab");
        assert!(!sample.truncated);
    }
}
