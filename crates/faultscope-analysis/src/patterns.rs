use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};

use faultscope_types::Pattern;

use crate::ErrorEvent;

/// Records per burst window
pub const BURST_WINDOW: usize = 10;

/// A window is a burst when its span is strictly below this
pub const BURST_SPAN_SECS: i64 = 60;

/// A throw site repeats when it occurs more often than this
pub const REPEAT_THRESHOLD: usize = 5;

/// Cap on the combined pattern list
pub const MAX_PATTERNS: usize = 10;

/// Flags error bursts and repeating faults
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternDetector;

impl PatternDetector {
    /// Bursts first, then repeating faults, truncated to [`MAX_PATTERNS`]
    pub fn detect(&self, events: &[ErrorEvent<'_>]) -> Vec<Pattern> {
        let mut patterns = Self::bursts(events);
        patterns.extend(Self::repeating(events));
        patterns.truncate(MAX_PATTERNS);
        patterns
    }

    /// Every sliding window of [`BURST_WINDOW`] time-ordered records whose
    /// span is under a minute. Overlapping windows are each reported.
    fn bursts(events: &[ErrorEvent<'_>]) -> Vec<Pattern> {
        let mut times: Vec<NaiveDateTime> = events.iter().map(ErrorEvent::timestamp).collect();
        times.sort();

        let limit = TimeDelta::seconds(BURST_SPAN_SECS);
        times
            .windows(BURST_WINDOW)
            .filter_map(|window| {
                let (start, end) = (window[0], window[BURST_WINDOW - 1]);
                let span = end - start;
                (span < limit).then(|| Pattern::Burst {
                    start,
                    end,
                    count: BURST_WINDOW,
                    duration_seconds: span.num_milliseconds() as f64 / 1000.0,
                })
            })
            // Nothing past the cap can survive truncation
            .take(MAX_PATTERNS)
            .collect()
    }

    /// Throw sites (exception, file, line) seen more than [`REPEAT_THRESHOLD`] times
    fn repeating(events: &[ErrorEvent<'_>]) -> Vec<Pattern> {
        let mut groups: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();
        for event in events {
            if let (Some(exception), Some((file, line))) = (event.exception, event.location) {
                *groups.entry((exception, file, line)).or_default() += 1;
            }
        }

        groups
            .into_iter()
            .filter(|(_, count)| *count > REPEAT_THRESHOLD)
            .map(|((exception, file, line), count)| Pattern::Repeating {
                exception: exception.to_string(),
                file: file.to_string(),
                line: line.to_string(),
                count,
            })
            .collect()
    }
}
