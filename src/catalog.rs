//! Local library of recorded clips with a most-recent-N retention policy.
//!
//! The catalog only tracks the durable copies made at intake. Evicting a
//! recording deletes its file; the upload queue copes with files vanishing
//! underneath it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::upload::LocalStorage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recording {
    pub id: Uuid,
    pub path: PathBuf,
    pub recorded_at: DateTime<Utc>,
}

pub struct RecordingCatalog {
    /// Oldest first
    recordings: Vec<Recording>,
    retention_limit: usize,
    storage: Arc<dyn LocalStorage>,
}

impl RecordingCatalog {
    pub fn new(retention_limit: usize, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            recordings: Vec::new(),
            retention_limit: retention_limit.max(1),
            storage,
        }
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Register a new recording and evict the oldest ones past the limit.
    ///
    /// Returns what was evicted, oldest first.
    pub async fn insert(&mut self, path: impl Into<PathBuf>) -> Vec<Recording> {
        let recording = Recording {
            id: Uuid::new_v4(),
            path: path.into(),
            recorded_at: Utc::now(),
        };
        tracing::debug!(path = %recording.path.display(), "recording added to catalog");
        self.recordings.push(recording);

        let mut evicted = Vec::new();
        while self.recordings.len() > self.retention_limit {
            if let Some(recording) = self.delete_oldest().await {
                evicted.push(recording);
            }
        }

        evicted
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn oldest(&self) -> Option<&Recording> {
        self.recordings.first()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.recordings.iter().any(|recording| recording.path == path)
    }

    /// Drop the oldest recording from the catalog and from disk.
    pub async fn delete_oldest(&mut self) -> Option<Recording> {
        if self.recordings.is_empty() {
            return None;
        }

        let recording = self.recordings.remove(0);
        if !self.storage.remove(&recording.path).await {
            tracing::debug!(path = %recording.path.display(), "evicted recording had no file");
        }
        tracing::info!(path = %recording.path.display(), "recording evicted by retention policy");

        Some(recording)
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}
