//! Append-only JSONL record of failed deliveries, kept for manual replay.
//!
//! Nothing in the dispatch path ever reads this file back; replay is an
//! operator action (`safecityd replay`). Replay first claims the journal by
//! renaming it to `<name>.replaying`, so failures appended by a running
//! daemon while the replay is in flight land in a fresh file. Survivors,
//! unparseable lines and anything written late into the claimed file are
//! appended back to the live journal before the claimed file is removed.

use chrono::{DateTime, Utc};
use safecity_core::types::{DocumentId, EventId, RecordKind};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::TransportError;
use crate::transport::DeliveryTransport;
use crate::types::{DeliveryOptions, NotificationPayload, Topic};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("failed to create journal directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize journal entry: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to append to journal {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read journal {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to claim journal {path} for replay: {source}")]
    Claim {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove claimed journal {path}: {source}")]
    Release {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to resend one failed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelivery {
    pub at: DateTime<Utc>,
    pub event_id: EventId,
    pub kind: RecordKind,
    pub document_id: DocumentId,
    pub topic: Topic,
    pub payload: NotificationPayload,
    pub options: DeliveryOptions,
    pub error: TransportError,
}

#[derive(Debug)]
pub struct ReplayJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReplayJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a replay in progress keeps the entries it took.
    pub fn claim_path(&self) -> PathBuf {
        match self.path.file_name() {
            Some(name) => {
                let mut claimed = name.to_os_string();
                claimed.push(".replaying");
                self.path.with_file_name(claimed)
            }
            None => self.path.with_extension("replaying"),
        }
    }

    pub fn append(&self, entry: &FailedDelivery) -> Result<(), JournalError> {
        let mut line =
            serde_json::to_string(entry).map_err(|source| JournalError::Serialize { source })?;
        line.push('\n');
        self.append_raw(line.as_bytes())
    }

    fn append_raw(&self, bytes: &[u8]) -> Result<(), JournalError> {
        // Concurrent invocations must not interleave partial lines.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| JournalError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| JournalError::Append {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(bytes).map_err(|source| JournalError::Append {
            path: self.path.clone(),
            source,
        })
    }

    /// Read all live entries. A missing file is an empty journal; malformed
    /// lines are skipped with a warning.
    pub fn load(&self) -> Result<Vec<FailedDelivery>, JournalError> {
        let body = read_optional(&self.path)?.unwrap_or_default();
        let (entries, _) = parse_lines(&self.path, &String::from_utf8_lossy(&body));
        Ok(entries)
    }

    /// Take the current entries for replay. An unfinished claim from an
    /// interrupted replay is resumed instead of taking the live file.
    pub fn claim(&self) -> Result<ClaimedJournal, JournalError> {
        let claim_path = self.claim_path();
        if claim_path.exists() {
            tracing::warn!(
                journal = %claim_path.display(),
                "resuming unfinished replay"
            );
        } else {
            let _guard = self
                .write_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match fs::rename(&self.path, &claim_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(JournalError::Claim {
                        path: self.path.clone(),
                        source,
                    })
                }
            }
        }

        let body = read_optional(&claim_path)?.unwrap_or_default();
        let (entries, unparsed) = parse_lines(&claim_path, &String::from_utf8_lossy(&body));
        Ok(ClaimedJournal {
            path: claim_path,
            entries,
            unparsed,
            consumed: body.len(),
        })
    }

    /// Append `survivors`, the claim's unparsed lines and any late writes
    /// back onto the live journal, then drop the claimed file.
    pub fn restore(
        &self,
        claimed: ClaimedJournal,
        survivors: &[FailedDelivery],
    ) -> Result<(), JournalError> {
        let mut out = String::new();
        for entry in survivors {
            out.push_str(
                &serde_json::to_string(entry)
                    .map_err(|source| JournalError::Serialize { source })?,
            );
            out.push('\n');
        }
        for line in &claimed.unparsed {
            out.push_str(line);
            out.push('\n');
        }
        if let Some(body) = read_optional(&claimed.path)? {
            if let Some(late) = body.get(claimed.consumed..).filter(|late| !late.is_empty()) {
                out.push_str(&String::from_utf8_lossy(late));
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        if !out.is_empty() {
            self.append_raw(out.as_bytes())?;
        }
        match fs::remove_file(&claimed.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(JournalError::Release {
                path: claimed.path,
                source,
            }),
        }
    }
}

/// Entries taken out of the live journal by [`ReplayJournal::claim`].
#[derive(Debug)]
pub struct ClaimedJournal {
    path: PathBuf,
    entries: Vec<FailedDelivery>,
    unparsed: Vec<String>,
    consumed: usize,
}

impl ClaimedJournal {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[FailedDelivery] {
        &self.entries
    }

    /// Lines that did not parse as entries. They are written back verbatim.
    pub fn unparsed(&self) -> &[String] {
        &self.unparsed
    }

    pub fn take_entries(&mut self) -> Vec<FailedDelivery> {
        std::mem::take(&mut self.entries)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, JournalError> {
    match fs::read(path) {
        Ok(body) => Ok(Some(body)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(JournalError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_lines(path: &Path, body: &str) -> (Vec<FailedDelivery>, Vec<String>) {
    let mut entries = Vec::new();
    let mut unparsed = Vec::new();
    for (index, line) in body.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FailedDelivery>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(
                    journal = %path.display(),
                    line = index + 1,
                    error = %err,
                    "unparseable journal line"
                );
                unparsed.push(line.to_string());
            }
        }
    }
    (entries, unparsed)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<FailedDelivery>,
}

/// Resend journaled deliveries once each. Still-failing entries are returned
/// with their new error for [`ReplayJournal::restore`].
pub async fn replay(entries: Vec<FailedDelivery>, transport: &dyn DeliveryTransport) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for mut entry in entries {
        summary.attempted += 1;
        match transport
            .send(&entry.topic, &entry.payload, &entry.options)
            .await
        {
            Ok(receipt) => {
                tracing::info!(
                    kind = %entry.kind,
                    document_id = %entry.document_id,
                    topic = %entry.topic,
                    receipt = %receipt,
                    "replayed delivery"
                );
                summary.delivered += 1;
            }
            Err(err) => {
                tracing::error!(
                    kind = %entry.kind,
                    document_id = %entry.document_id,
                    topic = %entry.topic,
                    error = %err,
                    "replay failed"
                );
                entry.at = Utc::now();
                entry.error = err;
                summary.failed.push(entry);
            }
        }
    }
    summary
}
