//! Persistence of the final deployment record.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::errors::StorageError;
use crate::record::DeploymentRecord;

/// Accepts the record of a fully successful run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentRecorder: Send + Sync {
    async fn save(&self, record: &DeploymentRecord) -> Result<(), StorageError>;
}

/// Writes the record as a pretty-printed JSON document, replacing any
/// previous file at the same path.
#[derive(Debug, Clone)]
pub struct JsonFileRecorder {
    path: PathBuf,
}

impl JsonFileRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl DeploymentRecorder for JsonFileRecorder {
    async fn save(&self, record: &DeploymentRecord) -> Result<(), StorageError> {
        let body = serde_json::to_string_pretty(record)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| self.io_error(e))?;

        info!("Deployment info saved to {}", self.path.display());
        Ok(())
    }
}
