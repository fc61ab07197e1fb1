use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use faultscope_types::{
    ErrorTimeline, ExceptionCount, GroupKey, GroupedCount, LocationCount, LogRecord, MetricBundle,
};

use crate::{ErrorEvent, PatternDetector};

/// Entries kept in each top-N list
const TOP_N: usize = 10;

/// Grouped count table and metric bundle from one analysis run
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Analysis {
    pub summary: Vec<GroupedCount>,
    pub metrics: MetricBundle,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.metrics.total_errors == 0
    }
}

/// Turns a record collection into an [`Analysis`]
pub trait Analyzer {
    fn analyze(&self, records: &[LogRecord]) -> Analysis;
}

/// Aggregates the records that carry an exception
#[derive(Clone, Debug, Default)]
pub struct ErrorAnalyzer {
    detector: PatternDetector,
}

impl ErrorAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Long-form counts for all four summary types. Rows sort by key, so
    /// the tables come out as by_location, hourly, daily, by_thread.
    fn summarize(events: &[ErrorEvent<'_>]) -> Vec<GroupedCount> {
        let mut counts: BTreeMap<GroupKey, usize> = BTreeMap::new();

        for event in events {
            let Some(exception) = event.exception else {
                continue;
            };
            let mut keys = Vec::with_capacity(4);
            if let Some((filename, line)) = event.location {
                keys.push(GroupKey::ByLocation {
                    filename: filename.to_string(),
                    line: line.to_string(),
                    exception: exception.to_string(),
                });
            }
            keys.push(GroupKey::Hourly {
                time_bucket: event.hour(),
                exception: exception.to_string(),
            });
            keys.push(GroupKey::Daily {
                time_bucket: event.timestamp().date(),
                exception: exception.to_string(),
            });
            keys.push(GroupKey::ByThread {
                thread: event.record.thread.clone(),
                exception: exception.to_string(),
            });

            for key in keys {
                *counts.entry(key).or_default() += 1;
            }
        }

        counts
            .into_iter()
            .map(|(key, count)| GroupedCount { key, count })
            .collect()
    }

    fn metrics(&self, events: &[ErrorEvent<'_>]) -> MetricBundle {
        if events.is_empty() {
            return MetricBundle::default();
        }

        let total_errors = events.len();
        let unique_error_types = events
            .iter()
            .filter_map(|e| e.exception)
            .collect::<HashSet<_>>()
            .len();
        let affected_files = events
            .iter()
            .filter_map(|e| e.location.map(|(filename, _)| filename))
            .collect::<HashSet<_>>()
            .len();

        let top_errors = top_n(events.iter().filter_map(|e| e.exception))
            .into_iter()
            .map(|(exception, count)| ExceptionCount {
                exception: exception.to_string(),
                count,
            })
            .collect();
        let top_error_locations = top_n(events.iter().filter_map(|e| e.location))
            .into_iter()
            .map(|((filename, line), count)| LocationCount {
                filename: filename.to_string(),
                line: line.to_string(),
                count,
            })
            .collect();

        MetricBundle {
            total_errors,
            unique_error_types,
            affected_files,
            error_rate_per_hour: error_rate_per_hour(events),
            top_errors,
            top_error_locations,
            error_timeline: timeline(events),
            error_patterns: self.detector.detect(events),
        }
    }
}

impl Analyzer for ErrorAnalyzer {
    fn analyze(&self, records: &[LogRecord]) -> Analysis {
        let events: Vec<ErrorEvent<'_>> =
            records.iter().filter_map(ErrorEvent::from_record).collect();

        let analysis = Analysis {
            summary: Self::summarize(&events),
            metrics: self.metrics(&events),
        };
        debug!(
            records = records.len(),
            errors = analysis.metrics.total_errors,
            rows = analysis.summary.len(),
            patterns = analysis.metrics.error_patterns.len(),
            "analysis complete"
        );
        analysis
    }
}

/// Errors per elapsed hour. With no elapsed time the total itself is the rate.
fn error_rate_per_hour(events: &[ErrorEvent<'_>]) -> f64 {
    let total = events.len() as f64;
    let (Some(min), Some(max)) = (
        events.iter().map(ErrorEvent::timestamp).min(),
        events.iter().map(ErrorEvent::timestamp).max(),
    ) else {
        return 0.0;
    };

    let elapsed_hours = (max - min).num_milliseconds() as f64 / 3_600_000.0;
    if elapsed_hours > 0.0 {
        total / elapsed_hours
    } else {
        total
    }
}

/// Highest counts first; equal counts keep first-seen order
fn top_n<K: Eq + Hash + Copy>(keys: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_N);
    counts
}

/// Peak and quiet hour buckets; ties go to the earlier hour
fn timeline(events: &[ErrorEvent<'_>]) -> ErrorTimeline {
    let mut hourly: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for event in events {
        *hourly.entry(event.hour()).or_default() += 1;
    }

    let mut timeline = ErrorTimeline::default();
    for (&hour, &count) in &hourly {
        if timeline.peak_hour.is_none() || count > timeline.peak_hour_count {
            timeline.peak_hour = Some(hour);
            timeline.peak_hour_count = count;
        }
        if timeline.quiet_hour.is_none() || count < timeline.quiet_hour_count {
            timeline.quiet_hour = Some(hour);
            timeline.quiet_hour_count = count;
        }
    }
    if !hourly.is_empty() {
        timeline.avg_errors_per_hour = events.len() as f64 / hourly.len() as f64;
    }
    timeline
}
