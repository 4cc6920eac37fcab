//! Durable debate storage — one JSON file per debate id.
//!
//! Last-write-wins: every update overwrites the whole file, no append log,
//! no versioning. The file content is exactly the last snapshot broadcast
//! to observers, so the durable state and the broadcast state never diverge
//! for longer than one write.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use rostrum_core::DebateSnapshot;

const FILE_PREFIX: &str = "debate_";
const FILE_SUFFIX: &str = ".json";

/// Errors from the debate store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No stored file for the requested debate id.
    #[error("debate {0} not found")]
    NotFound(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Listing entry for a persisted debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub topic: String,
}

/// File-backed store of debate snapshots.
pub struct DebateStore {
    dir: PathBuf,
}

impl DebateStore {
    /// Open (and create if needed) the storage directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, id, FILE_SUFFIX))
    }

    /// Persist the full snapshot for `id`, replacing any previous content.
    pub fn save(&self, id: &str, snapshot: &DebateSnapshot) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(snapshot)?;
        fs::write(self.path_for(id), content)?;
        Ok(())
    }

    /// Load the stored snapshot for `id`.
    pub fn load(&self, id: &str) -> Result<DebateSnapshot, StoreError> {
        let path = self.path_for(id);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// List every persisted debate, newest first. Files that fail to parse
    /// are skipped with a warning rather than failing the whole listing.
    pub fn list(&self) -> Result<Vec<DebateSummary>, StoreError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_prefix(FILE_PREFIX))
                .and_then(|n| n.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            match self.load(id) {
                Ok(snapshot) => summaries.push(DebateSummary {
                    id: id.to_string(),
                    timestamp: snapshot.created_at,
                    topic: snapshot.topic,
                }),
                Err(e) => {
                    warn!(id, error = %e, "skipping unreadable debate file");
                }
            }
        }
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }
}
