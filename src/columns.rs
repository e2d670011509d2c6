//! Column names for the first tabular row.

use std::io::{Read, Seek, SeekFrom};

use log::debug;
use serde::Serialize;

use crate::descriptor::{Escape, Quote, ResolvedFormat};
use crate::error::Result;
use crate::newline::Newline;
use crate::sample::{SampleLimits, read_sample};

/// One named column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    /// 0-based position.
    pub index: usize,
    pub name: String,
}

/// Ordered column names. Names are never blank and never repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnHeaderSet {
    headers: Vec<ColumnHeader>,
}

/// Name used for a column without a usable header, 1-based.
fn placeholder(position: usize) -> String {
    format!("Column{position}")
}

impl ColumnHeaderSet {
    /// `Column1..ColumnN`.
    pub fn synthesized(count: usize) -> Self {
        Self::from_raw_names(std::iter::repeat_n("", count))
    }

    /// Build a set from header row fields.
    ///
    /// Fields are trimmed, blank ones become `Column<N>` and a repeated name
    /// gets the smallest numeric suffix (starting at 2) that makes it unique.
    pub fn from_raw_names<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers: Vec<ColumnHeader> = Vec::new();
        for (index, name) in raw.into_iter().enumerate() {
            let trimmed = name.as_ref().trim();
            let base = if trimmed.is_empty() {
                placeholder(index + 1)
            } else {
                trimmed.to_string()
            };

            let taken = |candidate: &str| headers.iter().any(|h| h.name == candidate);
            let mut name = base.clone();
            let mut suffix = 2;
            while taken(&name) {
                name = format!("{base}{suffix}");
                suffix += 1;
            }
            headers.push(ColumnHeader { index, name });
        }
        Self { headers }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnHeader> {
        self.headers.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnHeader> {
        self.headers.iter()
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(|h| h.name.as_str())
    }

    /// 0-based position of the column called `name`.
    pub fn index_of(&self, name: &str, ignore_case: bool) -> Option<usize> {
        self.headers
            .iter()
            .find(|h| {
                if ignore_case {
                    h.name.to_lowercase() == name.to_lowercase()
                } else {
                    h.name == name
                }
            })
            .map(|h| h.index)
    }
}

impl<'a> IntoIterator for &'a ColumnHeaderSet {
    type Item = &'a ColumnHeader;
    type IntoIter = std::slice::Iter<'a, ColumnHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

/// Decoded sample text starting at the first tabular row.
fn tabular_text<R: Read + Seek>(
    source: &mut R,
    format: &ResolvedFormat,
    limits: &SampleLimits,
) -> Result<String> {
    source.seek(SeekFrom::Start(0))?;
    let sample = read_sample(source, limits)?;
    let text = format.code_page.decode(&sample.bytes);

    let separator = format.newline.as_str();
    let mut rest: &str = &text;
    for _ in 0..format.skip_rows {
        match rest.find(separator) {
            Some(pos) => rest = &rest[pos + separator.len()..],
            None => return Ok(String::new()),
        }
    }
    Ok(rest.to_string())
}

/// Record reader configured for `format`.
///
/// Non-ASCII delimiters and qualifiers are rejected before a refresh runs,
/// so `None` here only happens for hand-built formats.
fn record_reader<'a>(text: &'a str, format: &ResolvedFormat) -> Option<csv::Reader<&'a [u8]>> {
    let delimiter = u8::try_from(format.delimiter.char()).ok()?;

    let mut reader_builder = csv::ReaderBuilder::new();
    reader_builder
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::Fields);

    match format.qualifier {
        Quote::None => {
            reader_builder.quoting(false);
        }
        Quote::Some(q) => {
            reader_builder.quoting(true).quote(u8::try_from(q).ok()?);
        }
    }

    match format.escape {
        Escape::Char(e) => {
            reader_builder
                .escape(Some(u8::try_from(e).ok()?))
                .double_quote(false);
        }
        Escape::Doubled | Escape::None => {
            reader_builder.double_quote(true);
        }
    }

    let terminator = match format.newline {
        Newline::CrLf => csv::Terminator::CRLF,
        Newline::Lf => csv::Terminator::Any(b'\n'),
        Newline::Cr => csv::Terminator::Any(b'\r'),
    };
    reader_builder.terminator(terminator);

    Some(reader_builder.from_reader(text.as_bytes()))
}

/// Read the effective column names for `format`.
///
/// With a header row its fields are cleaned up into names; otherwise
/// `Column1..ColumnN` is synthesized for the width of the first row. A
/// source without any rows yields an empty set.
pub fn read_column_headers<R: Read + Seek>(
    source: &mut R,
    format: &ResolvedFormat,
    limits: &SampleLimits,
) -> Result<ColumnHeaderSet> {
    let text = tabular_text(source, format, limits)?;
    let Some(mut reader) = record_reader(&text, format) else {
        return Ok(ColumnHeaderSet::default());
    };

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        debug!("no rows after skipping {} lines", format.skip_rows);
        return Ok(ColumnHeaderSet::default());
    }

    let columns = if format.has_header {
        ColumnHeaderSet::from_raw_names(record.iter())
    } else {
        ColumnHeaderSet::synthesized(record.len())
    };
    debug!("{} columns", columns.len());
    Ok(columns)
}

/// Names of columns that are blank in every sampled data row.
///
/// Only meaningful for files with a header row; without one, or without any
/// data rows, the result is empty.
pub fn empty_columns<R: Read + Seek>(
    source: &mut R,
    format: &ResolvedFormat,
    limits: &SampleLimits,
) -> Result<Vec<String>> {
    if !format.has_header {
        return Ok(Vec::new());
    }

    let text = tabular_text(source, format, limits)?;
    let Some(mut reader) = record_reader(&text, format) else {
        return Ok(Vec::new());
    };

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(Vec::new());
    }
    let columns = ColumnHeaderSet::from_raw_names(record.iter());
    let mut filled = vec![false; columns.len()];

    let mut rows = 0usize;
    while rows < limits.max_lines && reader.read_record(&mut record)? {
        rows += 1;
        for (i, value) in record.iter().enumerate().take(filled.len()) {
            if !value.trim().is_empty() {
                filled[i] = true;
            }
        }
    }
    if rows == 0 {
        return Ok(Vec::new());
    }

    Ok(columns
        .iter()
        .filter(|h| !filled[h.index])
        .map(|h| h.name.clone())
        .collect())
}
