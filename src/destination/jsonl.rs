//! JSON lines destination
//!
//! Writes `{"table": ..., "row": {...}}` per row. Downstream loaders are
//! expected to upsert on the row's primary key.

use super::Destination;
use crate::error::{Error, Result};
use crate::types::TableRow;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each emitted row as one line of JSON
pub struct JsonLinesDestination {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl JsonLinesDestination {
    /// Write to stdout
    pub fn stdout() -> Self {
        Self::from_writer(tokio::io::stdout())
    }

    /// Append to a file, creating it if needed
    pub async fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                Error::destination(format!("Failed to open {}: {e}", path.display()))
            })?;
        Ok(Self::from_writer(file))
    }

    /// Write to any async writer
    pub fn from_writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

#[async_trait]
impl Destination for JsonLinesDestination {
    async fn emit(&self, rows: &[TableRow]) -> Result<()> {
        let mut buf = Vec::with_capacity(rows.len() * 128);
        for row in rows {
            serde_json::to_writer(&mut buf, row)
                .map_err(|e| Error::destination(format!("Failed to serialize row: {e}")))?;
            buf.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&buf)
            .await
            .map_err(|e| Error::destination(format!("Failed to write rows: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::destination(format!("Failed to flush rows: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for JsonLinesDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesDestination").finish_non_exhaustive()
    }
}
