use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, warn};

use faultscope_types::{LogLevel, LogRecord};

/// Header timestamp layout, e.g. `10-Jun-2025 08:26:46.310`
const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S%.f";

/// Record header: timestamp, level token, `[thread]`, logger, one space
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    let levels = LogLevel::TOKENS
        .iter()
        .map(|(token, _)| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?P<timestamp>\d{{2}}-\w{{3}}-\d{{4}} \d{{2}}:\d{{2}}:\d{{2}}\.\d{{3}}) (?P<level>{levels}) \[(?P<thread>[^\]]+)\] (?P<logger>\S+) "
    ))
    .expect("header pattern is valid")
});

/// Start of the next line that opens with a date
static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\d{2}-\w{3}-\d{4}").expect("boundary pattern is valid"));

static NESTED_EXCEPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\A(?P<message>.*?)nested exception is (?P<exception>[^:]+)(?:: (?P<exc_message>.+?))?\s+at (?P<location>[^(]+)\((?P<file>[^)]+)\)",
    )
    .expect("nested exception pattern is valid")
});

static ROOT_CAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\A(?P<message>.*?)with root cause\s+(?P<exception>[a-zA-Z0-9._]+): (?P<exc_message>.+?)\s+at (?P<location>[^(]+)\((?P<file>[^)]+)\)",
    )
    .expect("root cause pattern is valid")
});

/// Per-record parse failures. These never abort a parse run.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),
}

/// Parse a header timestamp such as `10-Jun-2025 08:26:46.310`
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::MalformedTimestamp(s.to_string()))
}

/// Causal-chain grammars tried against every ERROR record body, in order
#[derive(Clone, Copy, Debug)]
enum ErrorGrammar {
    /// `... nested exception is <Type>: <msg> at <location>(<file:line>)`
    NestedException,
    /// `... with root cause <Type>: <msg> at <location>(<file:line>)`
    RootCause,
}

impl ErrorGrammar {
    const ALL: [Self; 2] = [Self::NestedException, Self::RootCause];

    fn pattern(self) -> &'static Regex {
        match self {
            Self::NestedException => &NESTED_EXCEPTION,
            Self::RootCause => &ROOT_CAUSE,
        }
    }

    fn apply(self, segment: &Segment<'_>, origin: &str) -> Option<LogRecord> {
        let caps = self.pattern().captures(segment.body)?;
        let exception_message = caps
            .name("exc_message")
            .map(|m| m.as_str().trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let record = LogRecord::new(
            segment.timestamp,
            LogLevel::Error,
            segment.thread,
            segment.logger,
            group(&caps, "message"),
            origin,
        )
        .with_exception(
            group(&caps, "exception"),
            exception_message,
            group(&caps, "location"),
            group(&caps, "file"),
        );
        Some(record)
    }
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map(|m| m.as_str().trim()).unwrap_or_default()
}

/// One header plus the text up to the next date-led line
#[derive(Debug)]
struct Segment<'t> {
    timestamp: NaiveDateTime,
    level: LogLevel,
    thread: &'t str,
    logger: &'t str,
    body: &'t str,
}

/// Log parser for extracting records from server log text
pub struct LogParser;

impl LogParser {
    /// Parse the full text of one source into records.
    ///
    /// Error grammars run first over every ERROR record, then the general
    /// grammar. A general ERROR record is dropped when an exception record
    /// with the same timestamp and level was already produced.
    pub fn parse(text: &str, origin: &str) -> Vec<LogRecord> {
        let segments = Self::segments(text, origin);
        let mut records = Vec::new();

        for grammar in ErrorGrammar::ALL {
            records.extend(
                segments
                    .iter()
                    .filter(|s| s.level == LogLevel::Error)
                    .filter_map(|s| grammar.apply(s, origin)),
            );
        }

        let captured: HashSet<(NaiveDateTime, LogLevel)> =
            records.iter().map(|r| (r.timestamp, r.level)).collect();
        let exception_records = records.len();

        for segment in &segments {
            if segment.level == LogLevel::Error
                && captured.contains(&(segment.timestamp, segment.level))
            {
                continue;
            }
            records.push(LogRecord::new(
                segment.timestamp,
                segment.level,
                segment.thread,
                segment.logger,
                segment.body.trim(),
                origin,
            ));
        }

        debug!(
            origin,
            records = records.len(),
            exceptions = exception_records,
            "parsed source"
        );
        records
    }

    /// Split text into header-led segments, dropping any with a bad timestamp
    fn segments<'t>(text: &'t str, origin: &str) -> Vec<Segment<'t>> {
        let mut segments = Vec::new();
        let mut pos = 0;

        while let Some(caps) = HEADER.captures_at(text, pos) {
            let (Some(header), Some(level)) = (caps.get(0), caps.name("level")) else {
                break;
            };
            let body_start = header.end();
            let body_end = BOUNDARY
                .find_at(text, body_start)
                .map(|m| m.start())
                .unwrap_or(text.len());
            pos = body_end;

            let Some(level) = LogLevel::from_token(level.as_str()) else {
                continue;
            };
            let raw_timestamp = group(&caps, "timestamp");
            let timestamp = match parse_timestamp(raw_timestamp) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(origin, error = %e, "dropping record");
                    continue;
                }
            };

            segments.push(Segment {
                timestamp,
                level,
                thread: group(&caps, "thread"),
                logger: group(&caps, "logger"),
                body: &text[body_start..body_end],
            });
        }

        segments
    }
}
