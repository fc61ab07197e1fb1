//! Plain-text, JSON and CSV rendering of an analysis

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use faultscope_analysis::{Analysis, GroupKey, GroupedCount, MetricBundle, SummaryType};
use faultscope_types::{LevelCounts, LogRecord};

/// Number of exception types listed in the summary
const SUMMARY_TOP_ERRORS: usize = 5;

const HOUR_FORMAT: &str = "%Y-%m-%d %H:00";

pub fn summary(records: &[LogRecord], analysis: &Analysis) -> String {
    let metrics = &analysis.metrics;
    let levels = LevelCounts::tally(records);
    let mut out = String::new();

    let _ = writeln!(out, "ANALYSIS SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(
        out,
        "Records: {} (ERROR {}, WARN {}, INFO {}, DEBUG {})",
        levels.total(),
        levels.error,
        levels.warn,
        levels.info,
        levels.debug
    );
    let _ = writeln!(out, "Total Errors: {}", metrics.total_errors);
    let _ = writeln!(out, "Unique Error Types: {}", metrics.unique_error_types);
    let _ = writeln!(out, "Affected Files: {}", metrics.affected_files);
    let _ = writeln!(out, "Error Rate: {:.2} errors/hour", metrics.error_rate_per_hour);

    if !metrics.top_errors.is_empty() {
        let _ = writeln!(out, "\nTop Error Types:");
        for entry in metrics.top_errors.iter().take(SUMMARY_TOP_ERRORS) {
            let _ = writeln!(out, "  - {}: {} occurrences", entry.exception, entry.count);
        }
    }

    let timeline = &metrics.error_timeline;
    if let (Some(peak), Some(quiet)) = (timeline.peak_hour, timeline.quiet_hour) {
        let _ = writeln!(
            out,
            "\nPeak Hour: {} ({} errors)",
            peak.format(HOUR_FORMAT),
            timeline.peak_hour_count
        );
        let _ = writeln!(
            out,
            "Quiet Hour: {} ({} errors)",
            quiet.format(HOUR_FORMAT),
            timeline.quiet_hour_count
        );
    }

    let bursts = metrics.burst_count();
    let repeating = metrics.repeating_count();
    if bursts > 0 || repeating > 0 {
        let _ = writeln!(out);
    }
    if bursts > 0 {
        let _ = writeln!(out, "Detected {bursts} error burst(s)");
    }
    if repeating > 0 {
        let _ = writeln!(out, "Detected {repeating} repeating error pattern(s)");
    }

    out
}

/// The by_location rows as an aligned table
pub fn detailed(analysis: &Analysis) -> String {
    let mut out = String::new();
    let rows: Vec<_> = analysis
        .summary
        .iter()
        .filter(|row| row.summary_type() == SummaryType::ByLocation)
        .collect();
    if rows.is_empty() {
        return out;
    }

    let _ = writeln!(out, "{:<40} {:>6}  {:<40} {:>6}", "filename", "line", "exception", "count");
    for row in rows {
        if let GroupKey::ByLocation {
            filename,
            line,
            exception,
        } = &row.key
        {
            let _ = writeln!(out, "{filename:<40} {line:>6}  {exception:<40} {:>6}", row.count);
        }
    }
    out
}

pub fn json(analysis: &Analysis) -> Result<String> {
    serde_json::to_string_pretty(analysis).context("Failed to serialize analysis")
}

pub fn write_metrics(path: &Path, metrics: &MetricBundle) -> Result<()> {
    let content = serde_json::to_string_pretty(metrics).context("Failed to serialize metrics")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))
}

const TABLE_HEADER: [&str; 7] = [
    "summary_type",
    "filename",
    "line",
    "time_bucket",
    "thread",
    "exception",
    "count",
];

/// Write the long-form summary table as CSV, one row per group.
/// Columns a summary type does not use are left empty.
pub fn write_table(path: &Path, rows: &[GroupedCount]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(TABLE_HEADER)?;

    for row in rows {
        let (filename, line, time_bucket, thread) = match &row.key {
            GroupKey::ByLocation { filename, line, .. } => {
                (filename.clone(), line.clone(), String::new(), String::new())
            }
            GroupKey::Hourly { time_bucket, .. } => (
                String::new(),
                String::new(),
                time_bucket.format("%Y-%m-%d %H:%M:%S").to_string(),
                String::new(),
            ),
            GroupKey::Daily { time_bucket, .. } => (
                String::new(),
                String::new(),
                time_bucket.format("%Y-%m-%d").to_string(),
                String::new(),
            ),
            GroupKey::ByThread { thread, .. } => {
                (String::new(), String::new(), String::new(), thread.clone())
            }
        };
        writer.write_record([
            row.summary_type().as_str().to_string(),
            filename,
            line,
            time_bucket,
            thread,
            row.key.exception().to_string(),
            row.count.to_string(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write summary table to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use faultscope_analysis::{Analyzer, ErrorAnalyzer};
    use faultscope_types::LogLevel;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn records() -> Vec<LogRecord> {
        let mut records: Vec<_> = (0..6)
            .map(|i| {
                LogRecord::new(
                    base() + TimeDelta::minutes(i * 5),
                    LogLevel::Error,
                    "exec-1",
                    "app",
                    "failed",
                    "catalina.log",
                )
                .with_exception(
                    "java.io.IOException",
                    Some("broken pipe".to_string()),
                    "com.example.Net.send",
                    "Net.java:77",
                )
            })
            .collect();
        records.push(LogRecord::new(base(), LogLevel::Info, "main", "app", "ok", "catalina.log"));
        records
    }

    #[test]
    fn test_summary_text() {
        let records = records();
        let analysis = ErrorAnalyzer::new().analyze(&records);
        let text = summary(&records, &analysis);

        assert!(text.contains("Records: 7 (ERROR 6, WARN 0, INFO 1, DEBUG 0)"));
        assert!(text.contains("Total Errors: 6"));
        assert!(text.contains("  - IOException: 6 occurrences"));
        assert!(text.contains("Peak Hour: 2025-06-10 08:00 (6 errors)"));
        assert!(text.contains("Detected 1 repeating error pattern(s)"));
        assert!(!text.contains("burst"));
    }

    #[test]
    fn test_detailed_lists_locations() {
        let analysis = ErrorAnalyzer::new().analyze(&records());
        let text = detailed(&analysis);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Net.java"));
        assert!(text.contains("IOException"));
    }

    #[test]
    fn test_json_has_all_metric_keys() {
        let analysis = ErrorAnalyzer::new().analyze(&[]);
        let value: serde_json::Value = serde_json::from_str(&json(&analysis).unwrap()).unwrap();
        let metrics = &value["metrics"];
        for key in [
            "total_errors",
            "unique_error_types",
            "affected_files",
            "error_rate_per_hour",
            "top_errors",
            "top_error_locations",
            "error_timeline",
            "error_patterns",
        ] {
            assert!(metrics.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["summary"], serde_json::json!([]));
    }

    #[test]
    fn test_write_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let analysis = ErrorAnalyzer::new().analyze(&records());
        write_table(&path, &analysis.summary).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "summary_type,filename,line,time_bucket,thread,exception,count");
        assert_eq!(lines.len(), 1 + analysis.summary.len());
        assert_eq!(lines[1], "by_location,Net.java,77,,,IOException,6");
        assert!(lines.contains(&"hourly,,,2025-06-10 08:00:00,,IOException,6"));
        assert!(lines.contains(&"daily,,,2025-06-10,,IOException,6"));
        assert!(lines.contains(&"by_thread,,,,exec-1,IOException,6"));
    }

    #[test]
    fn test_write_table_without_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_table(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            "summary_type,filename,line,time_bucket,thread,exception,count"
        );
    }

    #[test]
    fn test_write_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let analysis = ErrorAnalyzer::new().analyze(&records());
        write_metrics(&path, &analysis.metrics).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total_errors"], 6);
        assert_eq!(written["error_patterns"][0]["type"], "repeating");
    }
}
