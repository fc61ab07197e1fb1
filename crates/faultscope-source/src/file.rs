use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use faultscope_logs::{LogParser, RecordFilter};
use faultscope_types::LogRecord;

use crate::decode::decode;
use crate::{Connection, LogSource, SourceError, SourceOptions};

/// A single plain-text log file
pub struct FileSource {
    path: PathBuf,
    options: SourceOptions,
    connection: Option<Connection>,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, options: SourceOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
            connection: None,
        }
    }

    /// Records are attributed to the file name, not the full path
    fn origin(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

#[async_trait]
impl LogSource for FileSource {
    async fn connect(&mut self) -> Result<(), SourceError> {
        let connection = Connection::open(&self.path, &self.options.encoding)?;
        info!(
            path = %connection.path.display(),
            encoding = connection.encoding.name(),
            "connected to log file"
        );
        self.connection = Some(connection);
        Ok(())
    }

    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<LogRecord>, SourceError> {
        let connection = self.connection.clone().ok_or(SourceError::NotConnected)?;

        let bytes = tokio::fs::read(&connection.path).await.map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::NotFound => SourceError::NotFound(connection.path.clone()),
                _ => SourceError::Io(e),
            }
        })?;

        let origin = Self::origin(&connection.path);
        let records = tokio::task::spawn_blocking(move || {
            let text = decode(&bytes, connection.encoding, &origin);
            LogParser::parse(&text, &origin)
        })
        .await?;

        Ok(filter.apply(records))
    }

    fn close(&mut self) {
        if self.connection.take().is_some() {
            info!(path = %self.path.display(), "closed log file");
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
