//! JSON-lines writer: one object per entry, appended to a file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ledgerstream_core::codec::{decode_base64, encode_base64};
use ledgerstream_core::error::IngestError;
use ledgerstream_core::types::{ChainVersion, Entry};
use ledgerstream_core::writer::Writer;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

/// On-disk form of an `Entry`; blobs are standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLine {
    pub version: ChainVersion,
    pub ledger: u32,
    pub envelope: String,
    pub result: String,
}

impl From<&Entry> for EntryLine {
    fn from(e: &Entry) -> Self {
        Self {
            version: e.version,
            ledger: e.ledger,
            envelope: encode_base64(&e.envelope),
            result: encode_base64(&e.result),
        }
    }
}

impl TryFrom<EntryLine> for Entry {
    type Error = IngestError;

    fn try_from(line: EntryLine) -> Result<Self, Self::Error> {
        Ok(Self {
            version: line.version,
            ledger: line.ledger,
            envelope: decode_base64(&line.envelope)?,
            result: decode_base64(&line.result)?,
        })
    }
}

/// Appends entries to a JSON-lines file.
///
/// Batches are serialised behind one lock, so the lines of a batch are
/// contiguous and the file is flushed before `write` returns.
pub struct JsonLinesWriter {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl JsonLinesWriter {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| IngestError::Storage(format!("open {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "writing entries as JSON lines");
        Ok(Self {
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry in a JSON-lines file.
    pub async fn read_all(path: impl AsRef<Path>) -> Result<Vec<Entry>, IngestError> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .map_err(|e| IngestError::Storage(format!("open {}: {e}", path.display())))?;
        let mut lines = BufReader::new(file).lines();
        let mut entries = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| IngestError::Storage(e.to_string()))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: EntryLine =
                serde_json::from_str(&line).map_err(|e| IngestError::Decode(e.to_string()))?;
            entries.push(Entry::try_from(parsed)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl Writer for JsonLinesWriter {
    async fn write(&self, entries: Vec<Entry>) -> Result<(), IngestError> {
        if entries.is_empty() {
            return Ok(());
        }
        let sequence = entries[0].ledger;
        let mut buf = Vec::new();
        for entry in &entries {
            serde_json::to_writer(&mut buf, &EntryLine::from(entry)).map_err(|e| IngestError::Write {
                sequence,
                reason: e.to_string(),
            })?;
            buf.push(b'\n');
        }

        let mut file = self.file.lock().await;
        let io = |e: std::io::Error| IngestError::Write {
            sequence,
            reason: e.to_string(),
        };
        file.write_all(&buf).await.map_err(io)?;
        file.flush().await.map_err(io)?;
        tracing::trace!(sequence, entries = entries.len(), "appended entries");
        Ok(())
    }
}
