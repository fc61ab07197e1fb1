//! Shared types for faultscope
//!
//! This crate contains data structures used across multiple faultscope crates:
//! parsed log records, time ranges, and the outputs of error analysis.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Header tokens recognised in server logs, with the level each maps to.
    ///
    /// Covers the plain tokens, the JUL names English-locale Tomcat prints,
    /// and the localized names Korean-locale Tomcat prints.
    pub const TOKENS: &'static [(&'static str, LogLevel)] = &[
        ("DEBUG", LogLevel::Debug),
        ("FINE", LogLevel::Debug),
        ("디버그", LogLevel::Debug),
        ("INFO", LogLevel::Info),
        ("정보", LogLevel::Info),
        ("WARNING", LogLevel::Warn),
        ("WARN", LogLevel::Warn),
        ("경고", LogLevel::Warn),
        ("ERROR", LogLevel::Error),
        ("SEVERE", LogLevel::Error),
        ("심각", LogLevel::Error),
    ];

    /// Map a header token to a level; unknown tokens yield `None`
    pub fn from_token(token: &str) -> Option<Self> {
        Self::TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, level)| *level)
    }

    /// Canonical display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Accepts header tokens as well as case-insensitive canonical names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(level) = Self::from_token(s) {
            return Ok(level);
        }
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "severe" => Ok(Self::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// One parsed log line or exception block
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp from the record header (millisecond precision)
    pub timestamp: NaiveDateTime,

    /// Severity
    pub level: LogLevel,

    /// Thread tag, without brackets
    pub thread: String,

    /// Logger or component name
    pub logger: String,

    /// Message body, may span several lines
    pub message: String,

    /// Fully qualified exception class
    pub exception_type: Option<String>,

    /// Text following the exception class
    pub exception_message: Option<String>,

    /// `class.method` of the frame that threw
    pub source_location: Option<String>,

    /// `File:line` of the frame that threw
    pub file_line: Option<String>,

    /// File or archive member the record came from
    pub origin: String,
}

impl LogRecord {
    /// Create a record without exception details
    pub fn new(
        timestamp: NaiveDateTime,
        level: LogLevel,
        thread: impl Into<String>,
        logger: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            thread: thread.into(),
            logger: logger.into(),
            message: message.into(),
            exception_type: None,
            exception_message: None,
            source_location: None,
            file_line: None,
            origin: origin.into(),
        }
    }

    /// Attach the exception recovered from a stack trace
    pub fn with_exception(
        mut self,
        exception_type: impl Into<String>,
        exception_message: Option<String>,
        source_location: impl Into<String>,
        file_line: impl Into<String>,
    ) -> Self {
        self.exception_type = Some(exception_type.into());
        self.exception_message = exception_message;
        self.source_location = Some(source_location.into());
        self.file_line = Some(file_line.into());
        self
    }

    /// Whether this record carries an exception
    pub fn is_error(&self) -> bool {
        self.exception_type.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Counts per log level
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub debug: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
}

impl LevelCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a LogRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.level {
                LogLevel::Debug => counts.debug += 1,
                LogLevel::Info => counts.info += 1,
                LogLevel::Warn => counts.warn += 1,
                LogLevel::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.debug + self.info + self.warn + self.error
    }
}

// ============================================================================
// Time Ranges
// ============================================================================

/// Time range for record filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimeRange {
    /// No time bounds
    #[default]
    All,
    /// From `n` hours before the reference instant
    LastHours(u32),
    /// From `n` days before the reference instant
    LastDays(u32),
    /// Explicit inclusive bounds, either side optional
    Between {
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
}

impl TimeRange {
    /// Resolve to inclusive `(start, end)` bounds relative to `now`.
    ///
    /// A look-back reaching past the earliest representable instant has no
    /// lower bound.
    pub fn bounds(&self, now: NaiveDateTime) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let back = |delta: Option<TimeDelta>| delta.and_then(|d| now.checked_sub_signed(d));
        match *self {
            Self::All => (None, None),
            Self::LastHours(n) => (back(TimeDelta::try_hours(i64::from(n))), None),
            Self::LastDays(n) => (back(TimeDelta::try_days(i64::from(n))), None),
            Self::Between { start, end } => (start, end),
        }
    }

    /// Get display label for this time range
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::LastHours(n) => format!("last {n}h"),
            Self::LastDays(n) => format!("last {n}d"),
            Self::Between { start, end } => {
                let fmt = |t: &Option<NaiveDateTime>| {
                    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "..".to_string())
                };
                format!("{} to {}", fmt(start), fmt(end))
            }
        }
    }
}

// ============================================================================
// Analysis Types
// ============================================================================

/// Grouping dimension of a summary row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SummaryType {
    ByLocation,
    Hourly,
    Daily,
    ByThread,
}

impl SummaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByLocation => "by_location",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::ByThread => "by_thread",
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key columns of a summary row, tagged by summary type
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "summary_type", rename_all = "snake_case")]
pub enum GroupKey {
    ByLocation {
        filename: String,
        line: String,
        exception: String,
    },
    Hourly {
        time_bucket: NaiveDateTime,
        exception: String,
    },
    Daily {
        time_bucket: NaiveDate,
        exception: String,
    },
    ByThread {
        thread: String,
        exception: String,
    },
}

impl GroupKey {
    pub fn summary_type(&self) -> SummaryType {
        match self {
            Self::ByLocation { .. } => SummaryType::ByLocation,
            Self::Hourly { .. } => SummaryType::Hourly,
            Self::Daily { .. } => SummaryType::Daily,
            Self::ByThread { .. } => SummaryType::ByThread,
        }
    }

    pub fn exception(&self) -> &str {
        match self {
            Self::ByLocation { exception, .. }
            | Self::Hourly { exception, .. }
            | Self::Daily { exception, .. }
            | Self::ByThread { exception, .. } => exception,
        }
    }
}

/// One row of the long-form summary table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupedCount {
    #[serde(flatten)]
    pub key: GroupKey,
    pub count: usize,
}

impl GroupedCount {
    pub fn summary_type(&self) -> SummaryType {
        self.key.summary_type()
    }
}

/// Detected anomaly in the error stream
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    /// Many errors within a short span
    Burst {
        start: NaiveDateTime,
        end: NaiveDateTime,
        count: usize,
        duration_seconds: f64,
    },
    /// The same exception thrown from the same line many times
    Repeating {
        exception: String,
        file: String,
        line: String,
        count: usize,
    },
}

impl Pattern {
    pub fn is_burst(&self) -> bool {
        matches!(self, Self::Burst { .. })
    }

    /// `file:line` for repeating faults
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Repeating { file, line, .. } => Some(format!("{file}:{line}")),
            Self::Burst { .. } => None,
        }
    }
}

/// Occurrences of one core exception
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExceptionCount {
    pub exception: String,
    pub count: usize,
}

/// Occurrences at one throw site
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    pub filename: String,
    pub line: String,
    pub count: usize,
}

/// Busiest and quietest hour buckets
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ErrorTimeline {
    pub peak_hour: Option<NaiveDateTime>,
    pub peak_hour_count: usize,
    pub quiet_hour: Option<NaiveDateTime>,
    pub quiet_hour_count: usize,
    pub avg_errors_per_hour: f64,
}

/// Scalar and nested metrics of one analysis run
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricBundle {
    pub total_errors: usize,
    pub unique_error_types: usize,
    pub affected_files: usize,
    pub error_rate_per_hour: f64,
    pub top_errors: Vec<ExceptionCount>,
    pub top_error_locations: Vec<LocationCount>,
    pub error_timeline: ErrorTimeline,
    pub error_patterns: Vec<Pattern>,
}

impl MetricBundle {
    pub fn burst_count(&self) -> usize {
        self.error_patterns.iter().filter(|p| p.is_burst()).count()
    }

    pub fn repeating_count(&self) -> usize {
        self.error_patterns.len() - self.burst_count()
    }
}
