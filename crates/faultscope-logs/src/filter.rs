use chrono::NaiveDateTime;
use regex::Regex;

use faultscope_types::{LogLevel, LogRecord, TimeRange};

/// Compiled filter for log records.
///
/// All supplied criteria are ANDed; an unset criterion matches everything.
#[derive(Clone, Default)]
pub struct RecordFilter {
    /// Inclusive lower time bound
    start: Option<NaiveDateTime>,

    /// Inclusive upper time bound
    end: Option<NaiveDateTime>,

    /// Exact level match
    level: Option<LogLevel>,

    /// Exact exception type match
    exception_type: Option<String>,

    /// Thread name search pattern
    thread: Option<Regex>,
}

impl RecordFilter {
    /// Create a filter that matches every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both time bounds from a range resolved against `now`
    pub fn with_time_range(mut self, range: TimeRange, now: NaiveDateTime) -> Self {
        let (start, end) = range.bounds(now);
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Only keep records whose exception type equals `exception_type` exactly
    pub fn with_exception_type(mut self, exception_type: impl Into<String>) -> Self {
        self.exception_type = Some(exception_type.into());
        self
    }

    /// Only keep records whose thread name contains a match for `pattern`
    pub fn with_thread_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.thread = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Check if a record matches this filter
    pub fn matches(&self, record: &LogRecord) -> bool {
        if self.start.is_some_and(|start| record.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| record.timestamp > end) {
            return false;
        }
        if self.level.is_some_and(|level| record.level != level) {
            return false;
        }
        if let Some(exception_type) = &self.exception_type {
            if record.exception_type.as_deref() != Some(exception_type.as_str()) {
                return false;
            }
        }
        match &self.thread {
            Some(re) => re.is_match(&record.thread),
            None => true,
        }
    }

    /// Keep matching records, preserving their order
    pub fn apply(&self, records: Vec<LogRecord>) -> Vec<LogRecord> {
        if self.is_empty() {
            return records;
        }
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.level.is_none()
            && self.exception_type.is_none()
            && self.thread.is_none()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    pub fn exception_type(&self) -> Option<&str> {
        self.exception_type.as_deref()
    }

    /// Get the thread pattern as written
    pub fn thread_pattern(&self) -> Option<&str> {
        self.thread.as_ref().map(|re| re.as_str())
    }
}

impl std::fmt::Debug for RecordFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordFilter")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("level", &self.level)
            .field("exception_type", &self.exception_type)
            .field("thread", &self.thread_pattern())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record(at: NaiveDateTime, level: LogLevel, thread: &str) -> LogRecord {
        LogRecord::new(at, level, thread, "com.example.App", "msg", "app.log")
    }

    fn sample() -> Vec<LogRecord> {
        vec![
            record(ts(8, 0), LogLevel::Error, "http-nio-8080-exec-1"),
            record(ts(8, 5), LogLevel::Info, "http-nio-8080-exec-2"),
            record(ts(8, 10), LogLevel::Error, "scheduler-1"),
            record(ts(8, 15), LogLevel::Error, "http-nio-8080-exec-3"),
            record(ts(8, 20), LogLevel::Warn, "http-nio-8080-exec-1"),
        ]
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = RecordFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(sample()).len(), 5);
    }

    #[test]
    fn test_level_and_thread_compose() {
        let filter = RecordFilter::new()
            .with_level(LogLevel::Error)
            .with_thread_pattern(r"exec-\d+")
            .unwrap();
        let kept = filter.apply(sample());
        let threads: Vec<_> = kept.iter().map(|r| r.thread.as_str()).collect();
        assert_eq!(threads, ["http-nio-8080-exec-1", "http-nio-8080-exec-3"]);
    }

    #[test]
    fn test_time_bounds_are_inclusive() {
        let filter = RecordFilter::new().with_start(ts(8, 5)).with_end(ts(8, 15));
        let kept = filter.apply(sample());
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].timestamp, ts(8, 5));
        assert_eq!(kept[2].timestamp, ts(8, 15));
    }

    #[test]
    fn test_time_range_preset() {
        let filter = RecordFilter::new().with_time_range(TimeRange::LastHours(1), ts(9, 12));
        let kept = filter.apply(sample());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_exception_type_exact_match() {
        let mut records = sample();
        records[0] = records[0].clone().with_exception(
            "java.io.IOException",
            None,
            "com.example.Disk.write",
            "Disk.java:5",
        );
        let filter = RecordFilter::new().with_exception_type("java.io.IOException");
        assert_eq!(filter.apply(records.clone()).len(), 1);

        let filter = RecordFilter::new().with_exception_type("IOException");
        assert!(filter.apply(records).is_empty());
    }

    #[test]
    fn test_invalid_thread_pattern() {
        assert!(RecordFilter::new().with_thread_pattern("exec-[").is_err());
    }
}
