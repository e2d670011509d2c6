use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::columns::ColumnHeaderSet;
use crate::encoding::CodePage;
use crate::newline::Newline;

/// Outcome of a single heuristic.
///
/// `Defaulted` carries a value the detector fell back to without evidence,
/// so callers can tell it apart from a confident inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection<T> {
    /// The sample supported this value.
    Resolved(T),
    /// Weak or missing evidence; this is the documented default.
    Defaulted(T),
    /// No value could be inferred; the caller picks the fallback.
    NoSignal,
}

impl<T> Detection<T> {
    /// Returns the carried value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Detection::Resolved(v) | Detection::Defaulted(v) => Some(v),
            Detection::NoSignal => None,
        }
    }

    /// Returns a reference to the carried value, if any.
    pub fn as_ref(&self) -> Detection<&T> {
        match self {
            Detection::Resolved(v) => Detection::Resolved(v),
            Detection::Defaulted(v) => Detection::Defaulted(v),
            Detection::NoSignal => Detection::NoSignal,
        }
    }

    /// Returns true for `Resolved`.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Detection::Resolved(_))
    }

    /// Maps the carried value, keeping the tag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Detection<U> {
        match self {
            Detection::Resolved(v) => Detection::Resolved(f(v)),
            Detection::Defaulted(v) => Detection::Defaulted(f(v)),
            Detection::NoSignal => Detection::NoSignal,
        }
    }
}

/// Field delimiter character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Delimiter(pub char);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(',');
    pub const SEMICOLON: Delimiter = Delimiter(';');
    pub const PIPE: Delimiter = Delimiter('|');
    pub const TAB: Delimiter = Delimiter('\t');
    pub const COLON: Delimiter = Delimiter(':');

    /// Returns the delimiter character.
    #[inline]
    pub const fn char(self) -> char {
        self.0
    }

    /// Returns true for the tab sentinel.
    #[inline]
    pub const fn is_tab(self) -> bool {
        self.0 == '\t'
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tab() {
            write!(f, "TAB")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<Delimiter> for String {
    fn from(d: Delimiter) -> Self {
        d.to_string()
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tab") || s == "\\t" {
            return Ok(Delimiter::TAB);
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Delimiter(c)),
            _ => Err(format!("delimiter must be a single character or TAB, got {s:?}")),
        }
    }
}

/// Qualifier (quote) character configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Quote {
    /// Fields are never wrapped.
    #[default]
    None,
    /// Fields may be wrapped in this character.
    Some(char),
}

impl Quote {
    /// Returns the quote character if set.
    pub fn char(&self) -> Option<char> {
        match self {
            Quote::None => None,
            Quote::Some(c) => Some(*c),
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::None => write!(f, "none"),
            Quote::Some(c) => write!(f, "{c}"),
        }
    }
}

/// How a literal qualifier is written inside a qualified field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Escape {
    /// No escaping convention.
    #[default]
    None,
    /// The qualifier is doubled (`"a""b"`).
    Doubled,
    /// A dedicated escape character precedes the qualifier (`"a\"b"`).
    Char(char),
}

impl Escape {
    /// Returns the dedicated escape character, if any.
    pub fn char(&self) -> Option<char> {
        match self {
            Escape::Char(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Escape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Escape::None => write!(f, "none"),
            Escape::Doubled => write!(f, "doubled qualifier"),
            Escape::Char(c) => write!(f, "{c}"),
        }
    }
}

/// Structural description of a delimited file.
///
/// Every field starts unset. A refresh fills only the unset fields, so a
/// value the caller put here before refreshing is an override and wins
/// over any guess.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormatDescriptor {
    /// Encoding identifier.
    pub code_page: Option<CodePage>,
    /// Line break convention.
    pub newline: Option<Newline>,
    /// Field delimiter.
    pub delimiter: Option<Delimiter>,
    /// Qualifier character, or `Quote::None` when fields are never wrapped.
    pub qualifier: Option<Quote>,
    /// Escape convention inside qualified fields.
    pub escape: Option<Escape>,
    /// Number of preamble lines before the first tabular row.
    pub skip_rows: Option<usize>,
    /// Whether the first tabular row holds column names.
    pub has_header: Option<bool>,
    /// Effective column names.
    pub columns: Option<ColumnHeaderSet>,
}

impl FormatDescriptor {
    /// Create an empty descriptor; every field will be inferred.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the delimiter.
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Pin the qualifier.
    pub fn with_qualifier(mut self, qualifier: Quote) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Pin the number of preamble lines.
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = Some(skip_rows);
        self
    }

    /// Pin the header flag.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    /// Pin the encoding.
    pub fn with_code_page(mut self, code_page: CodePage) -> Self {
        self.code_page = Some(code_page);
        self
    }

    /// Forget the column names so the next refresh reads them again.
    ///
    /// Call this after changing any field that shapes the header row.
    pub fn invalidate_columns(&mut self) {
        self.columns = None;
    }

    /// Concrete values, using the documented defaults for unset fields.
    pub fn resolved(&self) -> ResolvedFormat {
        ResolvedFormat {
            code_page: self.code_page.unwrap_or(CodePage::UTF8),
            newline: self.newline.unwrap_or_default(),
            delimiter: self.delimiter.unwrap_or(Delimiter::COMMA),
            qualifier: self.qualifier.unwrap_or_default(),
            escape: self.escape.unwrap_or_default(),
            skip_rows: self.skip_rows.unwrap_or(0),
            has_header: self.has_header.unwrap_or(false),
        }
    }
}

/// Fully populated format values, as consumed by a tabular reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub code_page: CodePage,
    pub newline: Newline,
    pub delimiter: Delimiter,
    pub qualifier: Quote,
    pub escape: Escape,
    pub skip_rows: usize,
    pub has_header: bool,
}

impl Default for ResolvedFormat {
    fn default() -> Self {
        FormatDescriptor::default().resolved()
    }
}
