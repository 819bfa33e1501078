//! FileSink - appends batch payloads to a file

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contracts::{BatchSink, ContractError};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Truncate the file on open instead of appending
    pub truncate: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        let truncate = match params.get("truncate") {
            Some(v) => v
                .parse()
                .map_err(|_| format!("invalid truncate flag '{}'", v))?,
            None => false,
        };

        Ok(Self { path, truncate })
    }

    /// Same file, opened without truncation
    pub fn appending(self) -> Self {
        Self {
            truncate: false,
            ..self
        }
    }
}

/// Sink that writes batches to a local file
///
/// Compressed payloads are written as consecutive gzip members, which
/// standard tools decode as one stream.
pub struct FileSink {
    name: String,
    path: PathBuf,
    destination: String,
    file: File,
}

impl FileSink {
    /// Open (or create) the output file
    ///
    /// The handle always appends, so several sinks on one path interleave
    /// whole batches. With `truncate` the file is emptied first; when sinks
    /// share a path, truncate it once with [`FileSink::truncate`] and open
    /// every sink with [`FileSinkConfig::appending`].
    #[instrument(
        name = "file_sink_open",
        skip(name, config),
        fields(path = %config.path.display())
    )]
    pub async fn open(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if config.truncate {
            Self::truncate(&config.path).await?;
        } else if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;

        Ok(Self {
            name: name.into(),
            destination: config.path.display().to_string(),
            path: config.path,
            file,
        })
    }

    /// Create or empty the file at `path`
    pub async fn truncate(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        debug!(path = %path.display(), "Output file truncated");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BatchSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn destination(&self) -> &str {
        &self.destination
    }

    #[instrument(
        name = "file_sink_deliver",
        skip(self, payload, _compressed),
        fields(sink = %self.name, bytes = payload.len())
    )]
    async fn deliver(&mut self, payload: &[u8], _compressed: bool) -> Result<usize, ContractError> {
        // tokio hands writes to a background thread; flush to see their errors.
        let written = match self.file.write_all(payload).await {
            Ok(()) => self.file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })?;
        Ok(payload.len())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.file
            .flush()
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("batches.ndjson");
        let config = FileSinkConfig {
            path: path.clone(),
            truncate: false,
        };

        let mut sink = FileSink::open("test_file", config.clone()).await.unwrap();
        assert_eq!(sink.deliver(b"a\nb\n", false).await.unwrap(), 4);
        assert_eq!(sink.deliver(b"c\nd\n", false).await.unwrap(), 4);
        sink.close().await.unwrap();

        let mut again = FileSink::open("test_file", config).await.unwrap();
        again.deliver(b"e\nf\n", false).await.unwrap();
        again.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a\nb\nc\nd\ne\nf\n");
    }

    #[tokio::test]
    async fn test_file_sink_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batches.ndjson");
        std::fs::write(&path, "old\n").unwrap();

        let config = FileSinkConfig {
            path: path.clone(),
            truncate: true,
        };
        let mut sink = FileSink::open("test_file", config).await.unwrap();
        sink.deliver(b"new\n", false).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn test_from_params_requires_path() {
        assert!(FileSinkConfig::from_params(&HashMap::new()).is_err());
        let params = HashMap::from([
            ("path".to_string(), "out.ndjson".to_string()),
            ("truncate".to_string(), "true".to_string()),
        ]);
        let config = FileSinkConfig::from_params(&params).unwrap();
        assert!(config.truncate);
        assert!(!config.appending().truncate);
    }

    #[tokio::test]
    async fn test_sinks_sharing_a_path_keep_every_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.ndjson");
        std::fs::write(&path, "stale\n").unwrap();

        let config = FileSinkConfig {
            path: path.clone(),
            truncate: true,
        };
        FileSink::truncate(&config.path).await.unwrap();
        let mut first = FileSink::open("w0", config.clone().appending()).await.unwrap();
        let mut second = FileSink::open("w1", config.appending()).await.unwrap();

        first.deliver(b"a\n", false).await.unwrap();
        second.deliver(b"bb\n", false).await.unwrap();
        first.deliver(b"ccc\n", false).await.unwrap();
        first.close().await.unwrap();
        second.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nbb\nccc\n");
    }
}
