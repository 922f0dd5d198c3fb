//! FileSink - appends correlated records to a JSONL session file

use contracts::{ContractError, CorrelatedRecord, RecordSink};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Session name (used as subdirectory)
    pub session: String,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        let session = params
            .get("session")
            .cloned()
            .unwrap_or_else(|| "session".to_string());

        Self { base_path, session }
    }
}

/// Sink that appends records to a timestamped JSONL file
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create a new FileSink
    ///
    /// Opens `<base_path>/<session>/records_<timestamp>.jsonl` for append.
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        let session_dir = config.base_path.join(&config.session);
        fs::create_dir_all(&session_dir)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = session_dir.join(format!("records_{stamp}.jsonl"));
        let file = File::options().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Path of the file being written
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append_record(&mut self, record: &CorrelatedRecord) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "sink closed"))?;

        serde_json::to_writer(&mut *writer, record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn persist_record(&mut self, record: &CorrelatedRecord) -> Result<(), ContractError> {
        let name = self.name.clone();
        self.append_record(record).map_err(|e| {
            error!(sink = %name, record_id = record.record_id, error = %e, "Write failed");
            ContractError::sink_write(&name, e.to_string())
        })
    }
}

impl RecordSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, record),
        fields(sink = %self.name, record_id = record.record_id)
    )]
    async fn record(&mut self, record: &CorrelatedRecord) -> Result<(), ContractError> {
        self.persist_record(record)?;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        Ok(())
    }
}
