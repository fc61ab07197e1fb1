//! Log sources for faultscope
//!
//! This crate reads server logs from single files, zip archives of per-file
//! logs, or a remote log store, and yields parsed records.

mod archive;
mod decode;
mod error;
mod file;
mod remote;
#[cfg(test)]
mod test_fixtures;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use encoding_rs::Encoding;

pub use archive::ArchiveSource;
pub use decode::{SourceKind, decode, resolve_encoding};
pub use error::SourceError;
pub use file::FileSource;
pub use remote::{RemoteOptions, StubRemoteSource};

// Re-export types used in our public API
pub use faultscope_logs::RecordFilter;
pub use faultscope_types::LogRecord;

/// Default archive member suffix
pub const DEFAULT_LOG_SUFFIX: &str = ".log";

/// Capabilities shared by every log source
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Validate and hold the source location and decoding parameters
    async fn connect(&mut self) -> Result<(), SourceError>;

    /// Fetch parsed records that pass `filter`, in source order
    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<LogRecord>, SourceError>;

    /// Release the connection; later fetches fail with `NotConnected`
    fn close(&mut self);

    /// Short human-readable description for logs and reports
    fn describe(&self) -> String;
}

/// Decoding and member selection for file-backed sources
#[derive(Clone, Debug)]
pub struct SourceOptions {
    /// WHATWG encoding label
    pub encoding: String,

    /// Archive members must end with this suffix
    pub log_suffix: String,

    /// Parse archive members on separate blocking tasks
    pub parallel: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            log_suffix: DEFAULT_LOG_SUFFIX.to_string(),
            parallel: true,
        }
    }
}

/// Resolved path and encoding held by a connected file-backed source
#[derive(Clone, Debug)]
struct Connection {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl Connection {
    fn open(path: &Path, encoding: &str) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            encoding: resolve_encoding(encoding)?,
        })
    }
}

/// Pick a file or archive source for `path`
pub fn open_source(
    path: impl AsRef<Path>,
    options: SourceOptions,
) -> Result<Box<dyn LogSource>, SourceError> {
    let path = path.as_ref();
    let source: Box<dyn LogSource> = match SourceKind::detect(path)? {
        SourceKind::File => Box::new(FileSource::new(path, options)),
        SourceKind::Archive => Box::new(ArchiveSource::new(path, options)),
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{CATALINA_LOG, write_zip};

    #[tokio::test]
    async fn test_open_source_picks_variant() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("catalina.log");
        std::fs::write(&text, CATALINA_LOG).unwrap();
        let archive = dir.path().join("logs.zip");
        write_zip(&archive, &[("catalina.log", CATALINA_LOG)]);

        let mut file_source = open_source(&text, SourceOptions::default()).unwrap();
        assert!(file_source.describe().starts_with("file"));
        file_source.connect().await.unwrap();
        let from_file = file_source.fetch(&RecordFilter::new()).await.unwrap();

        let mut archive_source = open_source(&archive, SourceOptions::default()).unwrap();
        assert!(archive_source.describe().starts_with("archive"));
        archive_source.connect().await.unwrap();
        let from_archive = archive_source.fetch(&RecordFilter::new()).await.unwrap();

        assert_eq!(from_file.len(), 4);
        assert_eq!(from_file.len(), from_archive.len());
    }

    #[test]
    fn test_open_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_source(dir.path().join("nope.log"), SourceOptions::default());
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
