use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use faultscope_logs::{core_exception, split_file_line};
use faultscope_types::LogRecord;

/// An exception record with its grouping keys derived
#[derive(Clone, Copy, Debug)]
pub struct ErrorEvent<'a> {
    pub record: &'a LogRecord,

    /// Core exception name, if the type has one
    pub exception: Option<&'a str>,

    /// `(filename, line)` of the throw site
    pub location: Option<(&'a str, &'a str)>,
}

impl<'a> ErrorEvent<'a> {
    /// Derive keys for an exception record; other records yield `None`
    pub fn from_record(record: &'a LogRecord) -> Option<Self> {
        if !record.is_error() {
            return None;
        }
        Some(Self {
            record,
            exception: record.exception_type.as_deref().and_then(core_exception),
            location: record.file_line.as_deref().and_then(split_file_line),
        })
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.record.timestamp
    }

    /// Start of the containing hour
    pub fn hour(&self) -> NaiveDateTime {
        let t = self.record.timestamp;
        t.date().and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(t.hour()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use faultscope_types::LogLevel;

    #[test]
    fn test_derived_keys() {
        let at = NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_milli_opt(8, 26, 46, 310)
            .unwrap();
        let record = LogRecord::new(at, LogLevel::Error, "exec-1", "app", "failed", "a.log")
            .with_exception(
                "java.lang.NullPointerException",
                None,
                "com.example.Foo.bar",
                "Foo.java:42",
            );

        let event = ErrorEvent::from_record(&record).unwrap();
        assert_eq!(event.exception, Some("NullPointerException"));
        assert_eq!(event.location, Some(("Foo.java", "42")));
        assert_eq!(
            event.hour(),
            NaiveDate::from_ymd_opt(2025, 6, 10)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_plain_record_is_not_an_event() {
        let at = NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let record = LogRecord::new(at, LogLevel::Error, "exec-1", "app", "failed", "a.log");
        assert!(ErrorEvent::from_record(&record).is_none());
    }
}
