//! Log processing for faultscope
//!
//! This crate turns raw server log text into structured records and
//! provides the filters applied to record collections.

mod filter;
mod normalize;
mod parser;

pub use filter::RecordFilter;
pub use normalize::{core_exception, split_file_line};
pub use parser::{LogParser, ParseError, parse_timestamp};

// Re-export types used in our public API
pub use faultscope_types::{LogLevel, LogRecord, TimeRange};
