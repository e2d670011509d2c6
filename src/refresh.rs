//! The refresh pass: runs every detector in order and fills a descriptor.
//!
//! A pass is an explicit state machine. Each state names the last property
//! that was settled, and each transition runs exactly one stage:
//!
//! ```text
//! Unstarted -> EncodingResolved -> NewlineResolved -> DelimiterResolved
//!   -> QualifierResolved -> StartRowResolved -> HeaderResolved -> Complete
//! ```
//!
//! Cancellation moves any non-terminal state to `Cancelled`. A stage whose
//! field the caller already set is skipped and reported as `Overridden`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;

use crate::cancel::{CancellationToken, NoProgress, Progress};
use crate::columns::read_column_headers;
use crate::config::{DEFAULT_DELIMITERS, DEFAULT_ENCODING_PREFIX, DEFAULT_QUALIFIER, Thresholds};
use crate::descriptor::{Delimiter, Detection, Escape, FormatDescriptor, Quote};
use crate::detect::qualifier::{QualifierGuess, detect_qualifier, qualifier_evidence};
use crate::detect::{LineDialect, detect_header, guess_delimiter, guess_start_row, is_not_delimited};
use crate::encoding::{CodePage, LegacyFallback, sniff_encoding};
use crate::error::{Cancelled, InvalidOverride, Result, SniffError};
use crate::newline::{NewlineCounts, detect_newline};
use crate::sample::{RawSample, SampleLimits, SampleWindow, read_sample};

/// One step of a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Encoding,
    Newline,
    Delimiter,
    Qualifier,
    StartRow,
    Header,
    Columns,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Encoding,
        Stage::Newline,
        Stage::Delimiter,
        Stage::Qualifier,
        Stage::StartRow,
        Stage::Header,
        Stage::Columns,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Stage::Encoding => "encoding",
            Stage::Newline => "newline",
            Stage::Delimiter => "delimiter",
            Stage::Qualifier => "qualifier",
            Stage::StartRow => "start row",
            Stage::Header => "header",
            Stage::Columns => "columns",
        }
    }

    /// Share of the pass done once this stage finishes.
    fn fraction_done(self) -> f64 {
        let position = Stage::ALL.iter().position(|&s| s == self).unwrap_or(0);
        (position + 1) as f64 / Stage::ALL.len() as f64
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a refresh pass stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RefreshState {
    #[default]
    Unstarted,
    EncodingResolved,
    NewlineResolved,
    DelimiterResolved,
    QualifierResolved,
    StartRowResolved,
    HeaderResolved,
    Complete,
    Cancelled,
}

impl RefreshState {
    /// The stage that moves the pass forward, or `None` once terminal.
    pub const fn next_stage(self) -> Option<Stage> {
        match self {
            RefreshState::Unstarted => Some(Stage::Encoding),
            RefreshState::EncodingResolved => Some(Stage::Newline),
            RefreshState::NewlineResolved => Some(Stage::Delimiter),
            RefreshState::DelimiterResolved => Some(Stage::Qualifier),
            RefreshState::QualifierResolved => Some(Stage::StartRow),
            RefreshState::StartRowResolved => Some(Stage::Header),
            RefreshState::HeaderResolved => Some(Stage::Columns),
            RefreshState::Complete | RefreshState::Cancelled => None,
        }
    }

    /// The state reached after `stage` completes.
    pub const fn after(stage: Stage) -> RefreshState {
        match stage {
            Stage::Encoding => RefreshState::EncodingResolved,
            Stage::Newline => RefreshState::NewlineResolved,
            Stage::Delimiter => RefreshState::DelimiterResolved,
            Stage::Qualifier => RefreshState::QualifierResolved,
            Stage::StartRow => RefreshState::StartRowResolved,
            Stage::Header => RefreshState::HeaderResolved,
            Stage::Columns => RefreshState::Complete,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RefreshState::Complete | RefreshState::Cancelled)
    }
}

/// How a single stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageOutcome {
    /// The detector found supporting evidence.
    Resolved,
    /// The caller pinned the field; the detector did not run.
    Overridden,
    /// No usable evidence; the documented default was stored.
    DefaultedNoSignal,
    /// Cancellation was observed during or before the stage.
    Cancelled,
    /// Reading the source failed.
    Failed,
}

impl<T> From<&Detection<T>> for StageOutcome {
    fn from(detection: &Detection<T>) -> Self {
        match detection {
            Detection::Resolved(_) => StageOutcome::Resolved,
            Detection::Defaulted(_) | Detection::NoSignal => StageOutcome::DefaultedNoSignal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Summary of one refresh pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub state: RefreshState,
    /// Outcomes in execution order; stages never reached are absent.
    pub stages: Vec<StageReport>,
    /// Caller overrides that were dropped before the pass started.
    pub rejected: Vec<InvalidOverride>,
    /// The sample shows no tabular structure.
    pub not_delimited: bool,
}

impl RefreshReport {
    /// Outcome of `stage`, if it ran.
    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.outcome)
    }

    pub fn is_complete(&self) -> bool {
        self.state == RefreshState::Complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == RefreshState::Cancelled
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageReport { stage, outcome });
    }
}

/// Why a stage stopped early.
enum Interrupt {
    Cancelled,
    Failed(SniffError),
}

impl From<Cancelled> for Interrupt {
    fn from(_: Cancelled) -> Self {
        Interrupt::Cancelled
    }
}

impl From<SniffError> for Interrupt {
    fn from(err: SniffError) -> Self {
        Interrupt::Failed(err)
    }
}

impl From<io::Error> for Interrupt {
    fn from(err: io::Error) -> Self {
        Interrupt::Failed(SniffError::Io(err))
    }
}

type StageResult = std::result::Result<StageOutcome, Interrupt>;

/// Drop overrides that cannot work with the rest of the descriptor.
pub fn validate_overrides(descriptor: &mut FormatDescriptor) -> Vec<InvalidOverride> {
    let mut rejected = Vec::new();

    if let Some(delimiter) = descriptor.delimiter {
        if !delimiter.char().is_ascii() {
            rejected.push(InvalidOverride::NonAsciiDelimiter(delimiter.char()));
            descriptor.delimiter = None;
        }
    }

    if let Some(Quote::Some(q)) = descriptor.qualifier {
        if !q.is_ascii() {
            rejected.push(InvalidOverride::NonAsciiQualifier(q));
            descriptor.qualifier = None;
        } else if descriptor.delimiter == Some(Delimiter(q)) {
            rejected.push(InvalidOverride::QualifierEqualsDelimiter(q));
            descriptor.qualifier = None;
        }
    }

    if let (Some(Escape::Char(e)), Some(delimiter)) = (descriptor.escape, descriptor.delimiter) {
        if e == delimiter.char() {
            rejected.push(InvalidOverride::EscapeEqualsDelimiter(e));
            descriptor.escape = None;
        }
    }

    if let Some(code_page) = descriptor.code_page {
        if !code_page.is_supported() {
            rejected.push(InvalidOverride::UnknownCodePage(code_page.0));
            descriptor.code_page = None;
        }
    }

    rejected
}

/// Splitting rules implied by the descriptor as it stands.
fn line_dialect(descriptor: &FormatDescriptor) -> LineDialect {
    let format = descriptor.resolved();
    LineDialect::qualified(format.delimiter.char(), format.qualifier.char(), format.escape)
}

/// Infers the structure of delimited files.
///
/// # Example
///
/// ```no_run
/// use csv_sleuth::{FormatDescriptor, Refresher, SampleLimits};
///
/// let mut refresher = Refresher::new();
/// refresher.sample_limits(SampleLimits::lines(100));
///
/// let mut descriptor = FormatDescriptor::new();
/// let report = refresher.refresh_path("data.csv", &mut descriptor).unwrap();
/// println!("Delimiter: {:?}", descriptor.delimiter);
/// println!("Complete: {}", report.is_complete());
/// ```
#[derive(Debug, Clone)]
pub struct Refresher {
    sample_limits: SampleLimits,
    thresholds: Thresholds,
    delimiter_candidates: Vec<char>,
    qualifier_candidate: char,
    legacy_fallback: LegacyFallback,
    default_delimiter: Delimiter,
    encoding_prefix_len: usize,
}

impl Default for Refresher {
    fn default() -> Self {
        Self::new()
    }
}

impl Refresher {
    /// Create a new Refresher with default settings.
    pub fn new() -> Self {
        Self {
            sample_limits: SampleLimits::default(),
            thresholds: Thresholds::default(),
            delimiter_candidates: DEFAULT_DELIMITERS.to_vec(),
            qualifier_candidate: DEFAULT_QUALIFIER,
            legacy_fallback: LegacyFallback::default(),
            default_delimiter: Delimiter::COMMA,
            encoding_prefix_len: DEFAULT_ENCODING_PREFIX,
        }
    }

    /// Set how much of the source is sampled.
    pub fn sample_limits(&mut self, limits: SampleLimits) -> &mut Self {
        self.sample_limits = limits;
        self
    }

    /// Set the heuristic thresholds.
    pub fn thresholds(&mut self, thresholds: Thresholds) -> &mut Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the delimiters tried when none is pinned.
    pub fn delimiter_candidates(&mut self, candidates: &[char]) -> &mut Self {
        self.delimiter_candidates = candidates.to_vec();
        self
    }

    /// Set the qualifier tested for usage when none is pinned.
    pub fn qualifier_candidate(&mut self, qualifier: char) -> &mut Self {
        self.qualifier_candidate = qualifier;
        self
    }

    /// Set what non-UTF-8 input decodes as.
    pub fn legacy_fallback(&mut self, fallback: LegacyFallback) -> &mut Self {
        self.legacy_fallback = fallback;
        self
    }

    /// Set the delimiter stored when no candidate splits the sample.
    pub fn default_delimiter(&mut self, delimiter: Delimiter) -> &mut Self {
        self.default_delimiter = delimiter;
        self
    }

    /// Set how many leading bytes the encoding sniffer examines.
    pub fn encoding_prefix_len(&mut self, len: usize) -> &mut Self {
        self.encoding_prefix_len = len.max(1);
        self
    }

    /// Refresh `descriptor` from the file at `path`.
    pub fn refresh_path<P: AsRef<Path>>(
        &self,
        path: P,
        descriptor: &mut FormatDescriptor,
    ) -> Result<RefreshReport> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        self.refresh(
            &mut reader,
            descriptor,
            &CancellationToken::new(),
            &mut NoProgress,
        )
    }

    /// Refresh `descriptor` from in-memory bytes.
    pub fn refresh_bytes(
        &self,
        data: &[u8],
        descriptor: &mut FormatDescriptor,
    ) -> Result<RefreshReport> {
        self.refresh(
            &mut Cursor::new(data),
            descriptor,
            &CancellationToken::new(),
            &mut NoProgress,
        )
    }

    /// Run a full refresh pass over `source`.
    ///
    /// Fields already set in `descriptor` are kept and their stages skipped.
    /// Cancellation is not an error: the report ends in
    /// `RefreshState::Cancelled` and the descriptor holds what the finished
    /// stages filled in. An I/O failure aborts the pass with
    /// [`SniffError::Stage`], which carries the partial report.
    pub fn refresh<R: Read + Seek>(
        &self,
        source: &mut R,
        descriptor: &mut FormatDescriptor,
        cancel: &CancellationToken,
        progress: &mut dyn Progress,
    ) -> Result<RefreshReport> {
        let mut report = RefreshReport {
            rejected: validate_overrides(descriptor),
            ..RefreshReport::default()
        };
        for rejected in &report.rejected {
            warn!("{rejected}");
        }

        let mut pass = Pass {
            refresher: self,
            source,
            cancel,
            raw: RawSample::default(),
            window: SampleWindow::from_lines(Vec::<String>::new()),
            delimiter_guess: Detection::NoSignal,
            not_delimited: false,
        };

        while let Some(stage) = report.state.next_stage() {
            if cancel.is_cancelled() {
                report.record(stage, StageOutcome::Cancelled);
                report.state = RefreshState::Cancelled;
                break;
            }

            match pass.run(stage, descriptor) {
                Ok(outcome) => {
                    debug!("{stage}: {outcome:?}");
                    report.record(stage, outcome);
                    report.state = RefreshState::after(stage);
                    progress.report(stage, stage.fraction_done());
                }
                Err(Interrupt::Cancelled) => {
                    debug!("{stage}: cancelled");
                    report.record(stage, StageOutcome::Cancelled);
                    report.state = RefreshState::Cancelled;
                }
                Err(Interrupt::Failed(source)) => {
                    warn!("{stage} stage failed: {source}");
                    report.record(stage, StageOutcome::Failed);
                    report.not_delimited = pass.not_delimited;
                    return Err(SniffError::Stage {
                        stage,
                        report: Box::new(report),
                        source: Box::new(source),
                    });
                }
            }
        }
        report.not_delimited = pass.not_delimited;

        if report.is_complete() {
            let format = descriptor.resolved();
            info!(
                "refresh complete: code page {}, newline {}, delimiter {}, qualifier {}, skip {}, header {}, {} columns",
                format.code_page,
                format.newline,
                format.delimiter,
                format.qualifier,
                format.skip_rows,
                format.has_header,
                descriptor.columns.as_ref().map_or(0, |c| c.len())
            );
            if report.not_delimited {
                info!("sample does not look delimited");
            }
        } else {
            info!("refresh cancelled in state {:?}", report.state);
        }

        Ok(report)
    }
}

/// Working data for one refresh pass.
struct Pass<'a, R> {
    refresher: &'a Refresher,
    source: &'a mut R,
    cancel: &'a CancellationToken,
    raw: RawSample,
    window: SampleWindow,
    delimiter_guess: Detection<Delimiter>,
    not_delimited: bool,
}

impl<R: Read + Seek> Pass<'_, R> {
    fn run(&mut self, stage: Stage, descriptor: &mut FormatDescriptor) -> StageResult {
        match stage {
            Stage::Encoding => self.encoding(descriptor),
            Stage::Newline => self.newline(descriptor),
            Stage::Delimiter => self.delimiter(descriptor),
            Stage::Qualifier => self.qualifier(descriptor),
            Stage::StartRow => self.start_row(descriptor),
            Stage::Header => self.header(descriptor),
            Stage::Columns => self.columns(descriptor),
        }
    }

    /// Sample window past the pinned preamble, if any.
    fn data_window(&self, descriptor: &FormatDescriptor) -> SampleWindow {
        match descriptor.skip_rows {
            Some(n) => self.window.skip(n),
            None => self.window.clone(),
        }
    }

    fn encoding(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        self.source.seek(SeekFrom::Start(0))?;
        self.raw = read_sample(&mut *self.source, &self.refresher.sample_limits)?;
        debug!(
            "sampled {} bytes{}",
            self.raw.bytes.len(),
            if self.raw.truncated { " (truncated)" } else { "" }
        );

        if descriptor.code_page.is_some() {
            return Ok(StageOutcome::Overridden);
        }

        let prefix_len = self.raw.bytes.len().min(self.refresher.encoding_prefix_len);
        let detection = sniff_encoding(&self.raw.bytes[..prefix_len], self.refresher.legacy_fallback);
        descriptor.code_page = Some(detection.clone().value().unwrap_or(CodePage::UTF8));
        Ok(StageOutcome::from(&detection))
    }

    fn newline(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        let code_page = descriptor.code_page.unwrap_or(CodePage::UTF8);
        let text = code_page.decode(&self.raw.bytes);

        let outcome = match descriptor.newline {
            Some(_) => StageOutcome::Overridden,
            None => {
                descriptor.newline = Some(detect_newline(&text));
                if NewlineCounts::new(&text).total() > 0 {
                    StageOutcome::Resolved
                } else {
                    StageOutcome::DefaultedNoSignal
                }
            }
        };

        let newline = descriptor.newline.unwrap_or_default();
        self.window = SampleWindow::from_text(
            &text,
            newline,
            self.refresher.sample_limits.max_lines,
            self.raw.truncated,
        );
        debug!("{} sample lines", self.window.len());
        Ok(outcome)
    }

    fn delimiter(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        let window = self.data_window(descriptor);
        let pinned_qualifier = descriptor.qualifier.and_then(|q| q.char());
        let pinned_escape = descriptor.escape.and_then(|e| e.char());
        let template = LineDialect::qualified(
            ',',
            match descriptor.qualifier {
                Some(quote) => quote.char(),
                None => Some(self.refresher.qualifier_candidate),
            },
            descriptor.escape.unwrap_or_default(),
        );

        let outcome = match descriptor.delimiter {
            Some(pinned) => {
                self.delimiter_guess = Detection::Resolved(pinned);
                StageOutcome::Overridden
            }
            None => {
                let detection = guess_delimiter(
                    &window,
                    &self.refresher.delimiter_candidates,
                    &template,
                    self.cancel,
                )?;
                let fallback = self.fallback_delimiter(&[pinned_qualifier, pinned_escape]);
                descriptor.delimiter = Some(detection.clone().value().unwrap_or(fallback));
                let outcome = StageOutcome::from(&detection);
                self.delimiter_guess = detection;
                outcome
            }
        };

        let delimiter = descriptor.delimiter.unwrap_or(self.refresher.default_delimiter);

        let dialect = LineDialect::qualified(
            delimiter.char(),
            descriptor
                .qualifier
                .map_or(Some(self.refresher.qualifier_candidate), |q| q.char()),
            descriptor.escape.unwrap_or_default(),
        );
        self.not_delimited = is_not_delimited(&window, &self.delimiter_guess, &dialect);
        Ok(outcome)
    }

    /// Delimiter stored when no candidate splits the sample: the configured
    /// default, or the first candidate not taken by a pinned qualifier or escape.
    fn fallback_delimiter(&self, reserved: &[Option<char>]) -> Delimiter {
        let default = self.refresher.default_delimiter;
        std::iter::once(default.char())
            .chain(self.refresher.delimiter_candidates.iter().copied())
            .chain(DEFAULT_DELIMITERS.iter().copied())
            .find(|c| !reserved.contains(&Some(*c)))
            .map_or(default, Delimiter)
    }

    fn qualifier(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        let window = self.data_window(descriptor);
        let delimiter = descriptor.delimiter.unwrap_or(self.refresher.default_delimiter).char();
        let thresholds = &self.refresher.thresholds;

        match descriptor.qualifier {
            Some(Quote::Some(q)) => {
                if descriptor.escape.is_none() {
                    let evidence = qualifier_evidence(&window, delimiter, q, self.cancel)?;
                    descriptor.escape = Some(evidence.escape());
                }
                Ok(StageOutcome::Overridden)
            }
            Some(Quote::None) => {
                descriptor.escape.get_or_insert(Escape::None);
                Ok(StageOutcome::Overridden)
            }
            None => {
                let detection = detect_qualifier(
                    &window,
                    delimiter,
                    self.refresher.qualifier_candidate,
                    thresholds.qualifier_ratio,
                    self.cancel,
                )?;
                let guess = detection.clone().value().unwrap_or(QualifierGuess::UNUSED);
                descriptor.qualifier = Some(guess.quote);
                descriptor.escape.get_or_insert(guess.escape);
                Ok(StageOutcome::from(&detection))
            }
        }
    }

    fn start_row(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        if descriptor.skip_rows.is_some() {
            return Ok(StageOutcome::Overridden);
        }
        let detection = guess_start_row(
            &self.window,
            &line_dialect(descriptor),
            self.refresher.thresholds.stable_run,
            self.cancel,
        )?;
        descriptor.skip_rows = Some(detection.clone().value().unwrap_or(0));
        Ok(StageOutcome::from(&detection))
    }

    fn header(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        if descriptor.has_header.is_some() {
            return Ok(StageOutcome::Overridden);
        }
        let thresholds = &self.refresher.thresholds;
        let detection = detect_header(
            &self.data_window(descriptor),
            &line_dialect(descriptor),
            thresholds.header_lookahead,
            thresholds.header_mismatch_ratio,
            self.cancel,
        )?;
        descriptor.has_header = Some(detection.clone().value().unwrap_or(false));
        Ok(StageOutcome::from(&detection))
    }

    fn columns(&mut self, descriptor: &mut FormatDescriptor) -> StageResult {
        if descriptor.columns.is_some() {
            return Ok(StageOutcome::Overridden);
        }
        let columns = read_column_headers(
            &mut *self.source,
            &descriptor.resolved(),
            &self.refresher.sample_limits,
        )?;
        let outcome = if columns.is_empty() {
            StageOutcome::DefaultedNoSignal
        } else {
            StageOutcome::Resolved
        };
        descriptor.columns = Some(columns);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &[u8] = b"ID,Name,Score\n1,Alice,90.5\n2,Bob,85\n3,Carol,77.25\n";

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    impl Seek for FailingReader {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_full_pass() {
        let mut descriptor = FormatDescriptor::new();
        let report = Refresher::new().refresh_bytes(BASIC, &mut descriptor).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.stages.len(), Stage::ALL.len());
        assert_eq!(descriptor.code_page, Some(CodePage::UTF8));
        assert_eq!(descriptor.delimiter, Some(Delimiter::COMMA));
        assert_eq!(descriptor.qualifier, Some(Quote::None));
        assert_eq!(descriptor.skip_rows, Some(0));
        assert_eq!(descriptor.has_header, Some(true));
        let columns = descriptor.columns.unwrap();
        assert_eq!(columns.names().collect::<Vec<_>>(), vec!["ID", "Name", "Score"]);
        assert!(!report.not_delimited);
    }

    #[test]
    fn test_state_machine_order() {
        let mut state = RefreshState::Unstarted;
        let mut seen = Vec::new();
        while let Some(stage) = state.next_stage() {
            seen.push(stage);
            state = RefreshState::after(stage);
        }
        assert_eq!(seen, Stage::ALL);
        assert!(state.is_terminal());
        assert_eq!(RefreshState::Cancelled.next_stage(), None);
    }

    #[test]
    fn test_overrides_short_circuit() {
        let mut descriptor = FormatDescriptor::new()
            .with_delimiter(Delimiter::SEMICOLON)
            .with_header(false);
        let report = Refresher::new().refresh_bytes(BASIC, &mut descriptor).unwrap();

        assert_eq!(report.outcome(Stage::Delimiter), Some(StageOutcome::Overridden));
        assert_eq!(report.outcome(Stage::Header), Some(StageOutcome::Overridden));
        assert_eq!(descriptor.delimiter, Some(Delimiter::SEMICOLON));
        assert_eq!(descriptor.has_header, Some(false));
        // every line is one field under the pinned delimiter
        assert!(report.not_delimited);
    }

    #[test]
    fn test_invalid_overrides_are_dropped() {
        let mut descriptor = FormatDescriptor::new()
            .with_delimiter(Delimiter::COMMA)
            .with_qualifier(Quote::Some(','))
            .with_code_page(CodePage(99999));
        let report = Refresher::new().refresh_bytes(BASIC, &mut descriptor).unwrap();

        assert_eq!(
            report.rejected,
            vec![
                InvalidOverride::QualifierEqualsDelimiter(','),
                InvalidOverride::UnknownCodePage(99999)
            ]
        );
        assert_eq!(report.outcome(Stage::Encoding), Some(StageOutcome::Resolved));
        assert_eq!(descriptor.code_page, Some(CodePage::UTF8));
        assert_eq!(descriptor.qualifier, Some(Quote::None));
    }

    #[test]
    fn test_pinned_qualifier_never_becomes_delimiter() {
        let mut descriptor = FormatDescriptor::new().with_qualifier(Quote::Some(','));
        let report = Refresher::new()
            .refresh_bytes(b"just some text\nmore free text\nand another line\n", &mut descriptor)
            .unwrap();

        assert!(report.rejected.is_empty());
        assert_eq!(report.outcome(Stage::Delimiter), Some(StageOutcome::DefaultedNoSignal));
        assert_eq!(descriptor.qualifier, Some(Quote::Some(',')));
        assert_eq!(descriptor.delimiter, Some(Delimiter::SEMICOLON));
    }

    #[test]
    fn test_pinned_escape_never_becomes_delimiter() {
        let mut descriptor = FormatDescriptor::new();
        descriptor.escape = Some(Escape::Char(';'));
        let report = Refresher::new()
            .refresh_bytes(b"a;b;c\n1;2;3\n4;5;6\n", &mut descriptor)
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(descriptor.escape, Some(Escape::Char(';')));
        assert_ne!(descriptor.delimiter, Some(Delimiter::SEMICOLON));
        assert!(report.not_delimited);
    }

    #[test]
    fn test_validate_non_ascii() {
        let mut descriptor = FormatDescriptor::new()
            .with_delimiter(Delimiter('§'))
            .with_qualifier(Quote::Some('«'));
        descriptor.escape = Some(Escape::Char('\\'));
        let rejected = validate_overrides(&mut descriptor);
        assert_eq!(
            rejected,
            vec![
                InvalidOverride::NonAsciiDelimiter('§'),
                InvalidOverride::NonAsciiQualifier('«')
            ]
        );
        assert_eq!(descriptor.delimiter, None);
        assert_eq!(descriptor.qualifier, None);
        assert_eq!(descriptor.escape, Some(Escape::Char('\\')));
    }

    #[test]
    fn test_escape_equal_to_delimiter() {
        let mut descriptor = FormatDescriptor::new().with_delimiter(Delimiter::PIPE);
        descriptor.escape = Some(Escape::Char('|'));
        let rejected = validate_overrides(&mut descriptor);
        assert_eq!(rejected, vec![InvalidOverride::EscapeEqualsDelimiter('|')]);
        assert_eq!(descriptor.escape, None);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut descriptor = FormatDescriptor::new();
        let report = Refresher::new()
            .refresh(&mut Cursor::new(BASIC), &mut descriptor, &cancel, &mut NoProgress)
            .unwrap();

        assert!(report.is_cancelled());
        assert_eq!(
            report.stages,
            vec![StageReport {
                stage: Stage::Encoding,
                outcome: StageOutcome::Cancelled
            }]
        );
        assert_eq!(descriptor, FormatDescriptor::new());
    }

    #[test]
    fn test_cancelled_between_stages() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut progress = move |stage: Stage, _fraction: f64| {
            if stage == Stage::Newline {
                trigger.cancel();
            }
        };
        let mut descriptor = FormatDescriptor::new();
        let report = Refresher::new()
            .refresh(&mut Cursor::new(BASIC), &mut descriptor, &cancel, &mut progress)
            .unwrap();

        assert_eq!(report.state, RefreshState::Cancelled);
        assert_eq!(report.outcome(Stage::Newline), Some(StageOutcome::Resolved));
        assert_eq!(report.outcome(Stage::Delimiter), Some(StageOutcome::Cancelled));
        assert!(descriptor.code_page.is_some());
        assert!(descriptor.newline.is_some());
        assert!(descriptor.delimiter.is_none());
        assert!(descriptor.columns.is_none());
    }

    #[test]
    fn test_progress_reports_every_stage() {
        let mut seen = Vec::new();
        let mut progress = |stage: Stage, fraction: f64| seen.push((stage, fraction));
        let mut descriptor = FormatDescriptor::new();
        Refresher::new()
            .refresh(
                &mut Cursor::new(BASIC),
                &mut descriptor,
                &CancellationToken::new(),
                &mut progress,
            )
            .unwrap();

        assert_eq!(seen.len(), Stage::ALL.len());
        assert_eq!(seen[0].0, Stage::Encoding);
        assert!((seen[6].1 - 1.0).abs() < 1e-9);
        assert!(seen.windows(2).all(|w| w[0].1 < w[1].1));
    }

    #[test]
    fn test_io_failure_aborts() {
        let mut descriptor = FormatDescriptor::new();
        let err = Refresher::new()
            .refresh(
                &mut FailingReader,
                &mut descriptor,
                &CancellationToken::new(),
                &mut NoProgress,
            )
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Encoding));
        let report = err.report().unwrap();
        assert_eq!(report.outcome(Stage::Encoding), Some(StageOutcome::Failed));
        assert_eq!(report.state, RefreshState::Unstarted);
        assert!(descriptor.code_page.is_none());
    }

    #[test]
    fn test_empty_source_completes_with_defaults() {
        let mut descriptor = FormatDescriptor::new();
        let report = Refresher::new().refresh_bytes(b"", &mut descriptor).unwrap();

        assert!(report.is_complete());
        assert!(
            report
                .stages
                .iter()
                .all(|r| r.outcome == StageOutcome::DefaultedNoSignal)
        );
        assert_eq!(descriptor.resolved(), crate::descriptor::ResolvedFormat::default());
        assert!(descriptor.columns.unwrap().is_empty());
        assert!(!report.not_delimited);
    }

    #[test]
    fn test_cached_columns_kept_until_invalidated() {
        let refresher = Refresher::new();
        let mut descriptor = FormatDescriptor::new();
        refresher.refresh_bytes(BASIC, &mut descriptor).unwrap();

        descriptor.has_header = Some(false);
        let report = refresher.refresh_bytes(BASIC, &mut descriptor).unwrap();
        assert_eq!(report.outcome(Stage::Columns), Some(StageOutcome::Overridden));
        assert_eq!(descriptor.columns.as_ref().unwrap().index_of("Name", false), Some(1));

        descriptor.invalidate_columns();
        refresher.refresh_bytes(BASIC, &mut descriptor).unwrap();
        assert_eq!(descriptor.columns.as_ref().unwrap().index_of("Column2", false), Some(1));
    }
}
