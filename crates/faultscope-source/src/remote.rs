use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{Value, json};
use tracing::{debug, info};

use faultscope_logs::RecordFilter;
use faultscope_types::LogRecord;

use crate::{LogSource, SourceError};

/// Search results are capped at this many hits per request
const MAX_HITS: usize = 10_000;

/// Where a remote log store lives
#[derive(Clone, Debug)]
pub struct RemoteOptions {
    pub host: String,
    pub port: u16,
    pub index_pattern: String,
    pub username: Option<String>,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            index_pattern: "logs-*".to_string(),
            username: None,
        }
    }
}

/// Placeholder for a search-backed log store.
///
/// No client is wired up: `fetch` returns whatever records were injected
/// with [`StubRemoteSource::with_records`] (none by default), passed
/// through the same filter a real query would express.
pub struct StubRemoteSource {
    options: RemoteOptions,
    records: Vec<LogRecord>,
    connected: bool,
}

impl StubRemoteSource {
    pub fn new(options: RemoteOptions) -> Self {
        Self {
            options,
            records: Vec::new(),
            connected: false,
        }
    }

    /// Serve records fetched elsewhere
    pub fn with_records(mut self, records: Vec<LogRecord>) -> Self {
        self.records = records;
        self
    }

    /// Build the search request body a store client would send
    pub fn build_query(filter: &RecordFilter) -> Value {
        let mut must = Vec::new();
        let mut filters = Vec::new();

        if filter.start().is_some() || filter.end().is_some() {
            let mut range = serde_json::Map::new();
            if let Some(start) = filter.start() {
                range.insert("gte".to_string(), Value::String(iso(start)));
            }
            if let Some(end) = filter.end() {
                range.insert("lte".to_string(), Value::String(iso(end)));
            }
            filters.push(json!({ "range": { "@timestamp": range } }));
        }
        if let Some(level) = filter.level() {
            must.push(json!({ "match": { "level": level.as_str() } }));
        }
        if let Some(exception_type) = filter.exception_type() {
            must.push(json!({ "match": { "exception_type": exception_type } }));
        }
        if let Some(pattern) = filter.thread_pattern() {
            must.push(json!({ "regexp": { "thread": pattern } }));
        }

        json!({
            "query": { "bool": { "must": must, "filter": filters } },
            "sort": [{ "@timestamp": { "order": "desc" } }],
            "size": MAX_HITS,
        })
    }
}

fn iso(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

#[async_trait]
impl LogSource for StubRemoteSource {
    async fn connect(&mut self) -> Result<(), SourceError> {
        info!(
            host = %self.options.host,
            port = self.options.port,
            index = %self.options.index_pattern,
            user = self.options.username.as_deref().unwrap_or("-"),
            "remote log store is a stub; no network connection made"
        );
        self.connected = true;
        Ok(())
    }

    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<LogRecord>, SourceError> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        debug!(
            index = %self.options.index_pattern,
            query = %Self::build_query(filter),
            "remote query"
        );
        Ok(filter.apply(self.records.clone()))
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn describe(&self) -> String {
        format!(
            "remote {}:{}/{}",
            self.options.host, self.options.port, self.options.index_pattern
        )
    }
}
