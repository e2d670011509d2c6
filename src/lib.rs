//! csv-sleuth: blind structural inference for delimited text files
//!
//! Given nothing but a seekable byte source, csv-sleuth works out how the file
//! is laid out: its encoding, line breaks, field delimiter, whether fields are
//! wrapped in a qualifier (and how that qualifier is escaped), how many
//! preamble lines precede the table, whether the first row holds column names,
//! and what those names are.
//!
//! # Quick Start
//!
//! ```no_run
//! use csv_sleuth::{FormatDescriptor, Refresher};
//!
//! let refresher = Refresher::new();
//! let mut descriptor = FormatDescriptor::new();
//! let report = refresher.refresh_path("data.csv", &mut descriptor).unwrap();
//!
//! let format = descriptor.resolved();
//! println!("Delimiter: {}", format.delimiter);
//! println!("Has header: {}", format.has_header);
//! println!("Not delimited: {}", report.not_delimited);
//! ```
//!
//! # Overrides
//!
//! Any field set on the descriptor before a refresh is kept and its detector
//! is skipped:
//!
//! ```no_run
//! use csv_sleuth::{Delimiter, FormatDescriptor, Refresher, StageOutcome, Stage};
//!
//! let mut descriptor = FormatDescriptor::new().with_delimiter(Delimiter::TAB);
//! let report = Refresher::new()
//!     .refresh_bytes(b"a\tb\n1\t2\n", &mut descriptor)
//!     .unwrap();
//! assert_eq!(report.outcome(Stage::Delimiter), Some(StageOutcome::Overridden));
//! ```
//!
//! # Detection outcomes
//!
//! Detectors never fail on odd input. Each returns a [`Detection`] that says
//! whether the sample supported the value, whether a documented default was
//! used, or whether there was no signal at all. The [`RefreshReport`] carries
//! the same information per stage.

mod cancel;
mod columns;
mod config;
mod descriptor;
pub mod detect;
mod encoding;
mod error;
mod field_type;
mod newline;
mod refresh;
mod sample;

pub use cancel::{CancellationToken, NoProgress, Progress};
pub use columns::{ColumnHeader, ColumnHeaderSet, empty_columns, read_column_headers};
pub use config::{DEFAULT_DELIMITERS, DEFAULT_ENCODING_PREFIX, DEFAULT_QUALIFIER, Thresholds};
pub use descriptor::{Delimiter, Detection, Escape, FormatDescriptor, Quote, ResolvedFormat};
pub use error::{Cancelled, InvalidOverride, Result, SniffError};
pub use field_type::Type;
pub use newline::{Newline, detect_newline};
pub use refresh::{
    RefreshReport, RefreshState, Refresher, Stage, StageOutcome, StageReport, validate_overrides,
};
pub use sample::{SampleLimits, SampleWindow};

// Re-export for advanced usage
pub use encoding::{CodePage, LegacyFallback, is_utf8, sniff_encoding};
