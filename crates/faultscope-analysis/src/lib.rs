//! Error analytics for faultscope
//!
//! Groups exception records into long-form count tables, derives summary
//! metrics, and flags error bursts and repeating faults.

mod engine;
mod event;
mod patterns;

pub use engine::{Analysis, Analyzer, ErrorAnalyzer};
pub use event::ErrorEvent;
pub use patterns::{
    BURST_SPAN_SECS, BURST_WINDOW, MAX_PATTERNS, PatternDetector, REPEAT_THRESHOLD,
};

// Re-export types used in our public API
pub use faultscope_types::{GroupKey, GroupedCount, MetricBundle, Pattern, SummaryType};
