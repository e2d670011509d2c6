//! Line-based heuristics, one module per structural property.
//!
//! Each detector reads a [`crate::SampleWindow`] and returns a
//! [`crate::Detection`]; none of them touch the byte source.

pub mod delimiter;
pub mod header;
pub mod not_delimited;
pub mod qualifier;
pub(crate) mod regexes;
pub mod split;
pub mod start_row;
pub mod type_detection;

pub use delimiter::{DelimiterCandidate, guess_delimiter, rank_delimiters};
pub use header::detect_header;
pub use not_delimited::is_not_delimited;
pub use qualifier::{QualifierGuess, detect_qualifier};
pub use split::{LineDialect, split_fields};
pub use start_row::guess_start_row;
pub use type_detection::detect_value_type;
