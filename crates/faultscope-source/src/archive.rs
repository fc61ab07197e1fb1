use std::path::{Path, PathBuf};

use async_trait::async_trait;
use encoding_rs::Encoding;
use futures::future::try_join_all;
use tracing::{debug, info};

use faultscope_logs::{LogParser, RecordFilter};
use faultscope_types::LogRecord;

use crate::decode::{Member, decode, open_archive, read_members};
use crate::{Connection, LogSource, SourceError, SourceOptions};

/// A zip archive of per-file logs
pub struct ArchiveSource {
    path: PathBuf,
    options: SourceOptions,
    connection: Option<Connection>,
}

impl ArchiveSource {
    pub fn new(path: impl AsRef<Path>, options: SourceOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
            connection: None,
        }
    }

    /// Parse members one per blocking task. Results are joined in member
    /// order, whatever order the tasks finish in.
    async fn parse_parallel(
        members: Vec<Member>,
        encoding: &'static Encoding,
    ) -> Result<Vec<LogRecord>, SourceError> {
        let tasks = members
            .into_iter()
            .map(|member| tokio::task::spawn_blocking(move || parse_member(&member, encoding)));
        let per_member = try_join_all(tasks).await?;
        Ok(per_member.into_iter().flatten().collect())
    }

    /// Parse members in order on a single blocking task
    async fn parse_sequential(
        members: Vec<Member>,
        encoding: &'static Encoding,
    ) -> Result<Vec<LogRecord>, SourceError> {
        let records = tokio::task::spawn_blocking(move || {
            members
                .iter()
                .flat_map(|member| parse_member(member, encoding))
                .collect::<Vec<_>>()
        })
        .await?;
        Ok(records)
    }
}

fn parse_member(member: &Member, encoding: &'static Encoding) -> Vec<LogRecord> {
    let text = decode(&member.bytes, encoding, &member.name);
    LogParser::parse(&text, &member.name)
}

#[async_trait]
impl LogSource for ArchiveSource {
    async fn connect(&mut self) -> Result<(), SourceError> {
        let connection = Connection::open(&self.path, &self.options.encoding)?;

        let path = connection.path.clone();
        let entries = tokio::task::spawn_blocking(move || {
            open_archive(&path).map(|archive| archive.len())
        })
        .await??;

        info!(
            path = %connection.path.display(),
            encoding = connection.encoding.name(),
            entries,
            "connected to log archive"
        );
        self.connection = Some(connection);
        Ok(())
    }

    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<LogRecord>, SourceError> {
        let connection = self.connection.clone().ok_or(SourceError::NotConnected)?;

        let path = connection.path.clone();
        let suffix = self.options.log_suffix.clone();
        let members =
            tokio::task::spawn_blocking(move || read_members(&path, &suffix)).await??;
        debug!(
            members = members.len(),
            parallel = self.options.parallel,
            "parsing archive members"
        );

        let records = if self.options.parallel {
            Self::parse_parallel(members, connection.encoding).await?
        } else {
            Self::parse_sequential(members, connection.encoding).await?
        };

        Ok(filter.apply(records))
    }

    fn close(&mut self) {
        if self.connection.take().is_some() {
            info!(path = %self.path.display(), "closed log archive");
        }
    }

    fn describe(&self) -> String {
        format!("archive {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{CATALINA_LOG, write_zip};
    use faultscope_types::LogLevel;

    const LOCALHOST_LOG: &str = "\
11-Jun-2025 09:00:00.000 ERROR [exec-9] com.example.Api Call failed; nested exception is java.io.IOException: broken pipe
\tat com.example.Net.send(Net.java:77)
11-Jun-2025 09:00:01.000 INFO [exec-9] com.example.Api Retrying
";

    fn archive(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("logs.zip");
        write_zip(
            &path,
            &[
                ("localhost.2025-06-11.log", LOCALHOST_LOG),
                ("manifest.txt", "not a log"),
                ("catalina.2025-06-10.log", CATALINA_LOG),
            ],
        );
        path
    }

    async fn fetch_all(path: &Path, parallel: bool) -> Vec<LogRecord> {
        let options = SourceOptions {
            parallel,
            ..SourceOptions::default()
        };
        let mut source = ArchiveSource::new(path, options);
        source.connect().await.unwrap();
        source.fetch(&RecordFilter::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_members_in_listing_order() {
        let dir = tempfile::tempdir().unwrap();
        let records = fetch_all(&archive(&dir), true).await;

        assert_eq!(records.len(), 6);
        assert_eq!(records[0].origin, "localhost.2025-06-11.log");
        assert_eq!(records[1].origin, "localhost.2025-06-11.log");
        assert!(records[2..].iter().all(|r| r.origin == "catalina.2025-06-10.log"));
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive(&dir);
        let parallel = fetch_all(&path, true).await;
        let sequential = fetch_all(&path, false).await;
        assert_eq!(parallel, sequential);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_sequential_parse_leaves_runtime_free() {
        let dir = tempfile::tempdir().unwrap();
        let members = read_members(&archive(&dir), ".log").unwrap();

        // Only finishes if parsing yields the single runtime thread
        let ticker = tokio::spawn(async { 42 });
        let records = ArchiveSource::parse_sequential(members, encoding_rs::UTF_8)
            .await
            .unwrap();

        assert!(ticker.is_finished());
        assert_eq!(ticker.await.unwrap(), 42);
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].origin, "localhost.2025-06-11.log");
    }

    #[tokio::test]
    async fn test_fetch_applies_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ArchiveSource::new(archive(&dir), SourceOptions::default());
        source.connect().await.unwrap();

        let filter = RecordFilter::new()
            .with_level(LogLevel::Error)
            .with_thread_pattern("^exec-")
            .unwrap();
        let records = source.fetch(&filter).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exception_type.as_deref(), Some("java.io.IOException"));
    }

    #[tokio::test]
    async fn test_custom_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let options = SourceOptions {
            log_suffix: ".txt".to_string(),
            ..SourceOptions::default()
        };
        let mut source = ArchiveSource::new(archive(&dir), options);
        source.connect().await.unwrap();
        assert!(source.fetch(&RecordFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"this is not a zip file").unwrap();

        let mut source = ArchiveSource::new(&path, SourceOptions::default());
        assert!(matches!(
            source.connect().await,
            Err(SourceError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ArchiveSource::new(archive(&dir), SourceOptions::default());
        source.connect().await.unwrap();
        source.close();
        assert!(matches!(
            source.fetch(&RecordFilter::new()).await,
            Err(SourceError::NotConnected)
        ));
    }
}
