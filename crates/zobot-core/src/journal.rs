//! Append-only JSON journals.
//!
//! Each named journal is a `<name>.jsonl` file holding one
//! `{ "timestamp": ..., "payload": ... }` record per line. Writes happen on a
//! background task so callers on the request path never wait on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, ZobotError};

/// One line of a journal file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

struct Envelope {
    name: String,
    record: JournalRecord,
}

/// Handle to the journal writer task. Cheap to clone.
#[derive(Clone)]
pub struct JsonJournal {
    tx: Option<mpsc::UnboundedSender<Envelope>>,
}

impl JsonJournal {
    /// Spawn the writer task for journals under `dir`.
    ///
    /// Must be called from within a tokio runtime. The task exits once
    /// every clone of the returned handle has been dropped and the queue
    /// is drained.
    pub fn spawn(dir: impl Into<PathBuf>) -> (Self, JoinHandle<()>) {
        let dir = dir.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

        let handle = tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = %e, "Failed to create journal directory");
            }

            while let Some(envelope) = rx.recv().await {
                if let Err(e) = write_record(&dir, &envelope).await {
                    warn!(journal = %envelope.name, error = %e, "Journal write failed");
                }
            }

            debug!(dir = %dir.display(), "Journal writer stopped");
        });

        (Self { tx: Some(tx) }, handle)
    }

    /// A journal that drops every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue `payload` for the journal called `name`.
    ///
    /// Never blocks and never fails the caller.
    pub fn append(&self, name: &str, payload: serde_json::Value) {
        let Some(tx) = &self.tx else {
            return;
        };
        let envelope = Envelope {
            name: name.to_string(),
            record: JournalRecord {
                timestamp: Utc::now(),
                payload,
            },
        };
        if tx.send(envelope).is_err() {
            warn!(journal = %name, "Journal writer is gone; record dropped");
        }
    }
}

/// Path of the journal file called `name` under `dir`.
pub fn journal_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.jsonl", name))
}

async fn write_record(dir: &Path, envelope: &Envelope) -> Result<()> {
    let mut line = serde_json::to_string(&envelope.record)?;
    line.push('\n');

    let path = journal_path(dir, &envelope.name);
    let journal_err = |e: std::io::Error| ZobotError::Journal(format!("{}: {}", path.display(), e));

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(journal_err)?;
    file.write_all(line.as_bytes()).await.map_err(journal_err)?;
    file.flush().await.map_err(journal_err)?;
    Ok(())
}
