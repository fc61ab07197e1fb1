mod config;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use faultscope_analysis::{Analyzer, ErrorAnalyzer};
use faultscope_logs::RecordFilter;
use faultscope_source::{LogSource, StubRemoteSource, open_source};
use faultscope_types::{LogLevel, TimeRange};

use crate::config::Config;

/// Faultscope - error analytics for application-server logs
#[derive(Parser, Debug)]
#[command(name = "faultscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log file or zip archive of log files
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Where records come from
    #[arg(long, value_enum, default_value_t = SourceArg::File)]
    source: SourceArg,

    /// Config file (defaults to ./faultscope.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Text encoding of file sources, e.g. utf-8 or euc-kr
    #[arg(long)]
    encoding: Option<String>,

    /// Earliest record time (YYYY-MM-DD[ HH:MM:SS])
    #[arg(long, value_parser = parse_datetime)]
    start_time: Option<NaiveDateTime>,

    /// Latest record time (YYYY-MM-DD[ HH:MM:SS])
    #[arg(long, value_parser = parse_datetime)]
    end_time: Option<NaiveDateTime>,

    /// Only records from the last N hours (ignored with --start-time)
    #[arg(long, conflicts_with = "last_days")]
    last_hours: Option<u32>,

    /// Only records from the last N days
    #[arg(long)]
    last_days: Option<u32>,

    /// Only records at this level
    #[arg(long)]
    level: Option<LogLevel>,

    /// Only records whose exception type equals this fully qualified
    /// class name, e.g. java.sql.SQLException
    #[arg(long, value_name = "TYPE")]
    exception: Option<String>,

    /// Only records whose thread matches this regex
    #[arg(long)]
    thread_pattern: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,

    /// Also write the grouped summary table as CSV to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write the metric bundle as JSON to this file
    #[arg(short, long, value_name = "FILE")]
    metrics: Option<PathBuf>,

    /// Parse archive members one after another
    #[arg(long)]
    sequential: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    File,
    Remote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Detailed,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let filter = build_filter(&args, Local::now().naive_local())?;
    debug!(?filter, "record filter");

    let mut source = build_source(&args, &config)?;
    source
        .connect()
        .await
        .with_context(|| format!("Failed to open {}", source.describe()))?;
    info!(source = %source.describe(), "connected");

    let fetched = source.fetch(&filter).await;
    source.close();
    let records = fetched.context("Failed to read log records")?;

    if records.is_empty() {
        println!("No log records matched the given criteria");
        return Ok(());
    }

    let analysis = ErrorAnalyzer::new().analyze(&records);

    match args.format {
        OutputFormat::Summary => print!("{}", report::summary(&records, &analysis)),
        OutputFormat::Detailed => {
            print!("{}", report::summary(&records, &analysis));
            let table = report::detailed(&analysis);
            if !table.is_empty() {
                println!();
                print!("{table}");
            }
        }
        OutputFormat::Json => println!("{}", report::json(&analysis)?),
    }

    if let Some(path) = &args.output {
        report::write_table(path, &analysis.summary)?;
        info!(path = %path.display(), rows = analysis.summary.len(), "summary table written");
    }

    if let Some(path) = &args.metrics {
        report::write_metrics(path, &analysis.metrics)?;
        info!(path = %path.display(), "metrics written");
    }

    Ok(())
}

fn build_source(args: &Args, config: &Config) -> Result<Box<dyn LogSource>> {
    match args.source {
        SourceArg::File => {
            let input = args
                .input
                .as_ref()
                .context("An INPUT path is required for the file source")?;

            let mut options = config.source.to_options();
            if let Some(encoding) = &args.encoding {
                options.encoding = encoding.clone();
            }
            if args.sequential {
                options.parallel = false;
            }
            Ok(open_source(input, options)?)
        }
        SourceArg::Remote => Ok(Box::new(StubRemoteSource::new(config.remote.to_options()))),
    }
}

fn build_filter(args: &Args, now: NaiveDateTime) -> Result<RecordFilter> {
    let range = match (args.start_time, args.last_hours, args.last_days) {
        (Some(start), _, _) => TimeRange::Between {
            start: Some(start),
            end: None,
        },
        (None, Some(hours), _) => TimeRange::LastHours(hours),
        (None, None, Some(days)) => TimeRange::LastDays(days),
        (None, None, None) => TimeRange::All,
    };

    let mut filter = RecordFilter::new().with_time_range(range, now);
    if let Some(end) = args.end_time {
        filter = filter.with_end(end);
    }
    if let Some(level) = args.level {
        filter = filter.with_level(level);
    }
    if let Some(exception) = &args.exception {
        filter = filter.with_exception_type(exception.clone());
    }
    if let Some(pattern) = &args.thread_pattern {
        filter = filter
            .with_thread_pattern(pattern)
            .with_context(|| format!("Invalid thread pattern '{pattern}'"))?;
    }
    Ok(filter)
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date
fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .ok_or_else(|| format!("invalid date/time '{s}', expected YYYY-MM-DD[ HH:MM:SS]"))
}
