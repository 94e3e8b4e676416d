//! Audit sinks.
//!
//! - **FileAuditSink**: one plain-text file per run (production)
//! - **MemoryAuditSink**: keeps records in memory (tests, dry runs without disk)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::ports::{AuditError, AuditRecord, AuditSink};

/// Owner/group read-write, nothing else.
pub const AUDIT_FILE_MODE: u32 = 0o640;

/// Writes `collected_garbage-<unix nanos>-run-<run>.txt` into a directory.
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(record: &AuditRecord) -> String {
        let nanos = record.timestamp.timestamp_nanos_opt().unwrap_or_default();
        format!("collected_garbage-{}-run-{}.txt", nanos, record.run)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(AUDIT_FILE_MODE);

        let mut file = options.open(path).await?;
        file.write_all(contents).await?;
        file.flush().await?;

        // mode() is filtered by the umask; pin the final bits explicitly.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(AUDIT_FILE_MODE))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn persist(&self, record: &AuditRecord) -> Result<String, AuditError> {
        let path = self.dir.join(Self::file_name(record));
        self.write(&path, record.render().as_bytes())
            .await
            .map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path.display().to_string())
    }
}

/// Keeps every persisted record.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn persist(&self, record: &AuditRecord) -> Result<String, AuditError> {
        let mut records = self.records.lock().await;
        records.push(record.clone());
        Ok(format!("memory:{}", records.len() - 1))
    }
}
