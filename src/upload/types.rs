use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;
use super::errors::{Result, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse classification of why a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    SourceMissing,
    Transport,
    Application { status_code: u16 },
    Internal,
}

/// Diagnostic record attached to a failed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&UploadError> for FailureDetail {
    fn from(err: &UploadError) -> Self {
        let kind = match err {
            UploadError::SourceMissing(_) => FailureKind::SourceMissing,
            UploadError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => FailureKind::SourceMissing,
            UploadError::Transport(_) => FailureKind::Transport,
            UploadError::Application { status_code, .. } => FailureKind::Application {
                status_code: *status_code,
            },
            _ => FailureKind::Internal,
        };

        Self {
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum UploadStatus {
    /// Waiting in the queue
    Pending,
    /// Transfer in flight
    Uploading,
    Completed,
    Failed(FailureDetail),
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Pending or uploading.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Uploading)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

// Failure detail is diagnostic only: any two `Failed` are the same state.
impl PartialEq for UploadStatus {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Eq for UploadStatus {}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadItem {
    pub id: UploadId,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub status: UploadStatus,
    /// Fraction in `[0.0, 1.0]`, only meaningful while uploading
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl UploadItem {
    pub fn new(source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            id: UploadId::new(),
            source_path,
            destination_path,
            status: UploadStatus::Pending,
            progress: 0.0,
            created_at: Utc::now(),
            started_at: None,
        }
    }
}

/// Snapshot published by the manager after every state transition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueState {
    pub items: Vec<UploadItem>,
    pub busy: bool,
    pub current_progress: f64,
}

impl QueueState {
    pub fn active(&self) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.status == UploadStatus::Uploading)
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == UploadStatus::Pending)
            .count()
    }

    pub fn is_uploading(&self, source_path: &Path) -> bool {
        self.items
            .iter()
            .any(|item| item.source_path == source_path && item.status.is_active())
    }

    pub fn is_idle(&self) -> bool {
        !self.busy && self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Enqueued {
        upload_id: UploadId,
        source_path: PathBuf,
    },

    StateChanged {
        upload_id: UploadId,
        old_status: UploadStatus,
        new_status: UploadStatus,
    },

    Progress {
        upload_id: UploadId,
        fraction: f64,
    },

    Completed {
        upload_id: UploadId,
    },

    Failed {
        upload_id: UploadId,
        error: FailureDetail,
    },

    /// Queue ran empty after the last transfer finished
    Drained,
}

impl UploadEvent {
    pub fn upload_id(&self) -> Option<UploadId> {
        match self {
            Self::Enqueued { upload_id, .. }
            | Self::StateChanged { upload_id, .. }
            | Self::Progress { upload_id, .. }
            | Self::Completed { upload_id }
            | Self::Failed { upload_id, .. } => Some(*upload_id),
            Self::Drained => None,
        }
    }
}

pub(crate) enum ManagerCommand {
    AddUpload {
        source_path: PathBuf,
        destination_path: PathBuf,
        reply: oneshot::Sender<Result<UploadId>>,
    },

    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// What a running transfer reports back to the manager.
#[derive(Debug)]
pub(crate) enum TransferEvent {
    Progress(f64),
    Finished(Result<()>),
}

#[derive(Debug)]
pub(crate) struct TransferMessage {
    pub upload_id: UploadId,
    pub event: TransferEvent,
}

const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_types() {
        assert_send::<UploadItem>();
        assert_send::<UploadEvent>();
        assert_send::<QueueState>();
        assert_send::<TransferMessage>();
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(kind: FailureKind, message: &str) -> UploadStatus {
        UploadStatus::Failed(FailureDetail {
            kind,
            message: message.to_string(),
        })
    }

    #[test]
    fn test_failed_status_ignores_detail() {
        let timeout = failed(FailureKind::Transport, "timed out");
        let rejected = failed(FailureKind::Application { status_code: 500 }, "boom");

        assert_eq!(timeout, rejected);
        assert_ne!(timeout, UploadStatus::Completed);
        assert_ne!(UploadStatus::Pending, UploadStatus::Uploading);
    }

    #[test]
    fn test_upload_id_generation() {
        let id1 = UploadId::new();
        let id2 = UploadId::new();

        assert_ne!(id1, id2);
        assert!(!id1.to_string().is_empty());
    }

    #[test]
    fn test_failure_detail_from_error() {
        let detail = FailureDetail::from(&UploadError::application_failure(403, "forbidden"));
        assert_eq!(detail.kind, FailureKind::Application { status_code: 403 });
        assert!(detail.message.contains("403"));

        let missing = FailureDetail::from(&UploadError::SourceMissing(PathBuf::from("a.mov")));
        assert_eq!(missing.kind, FailureKind::SourceMissing);
    }

    #[test]
    fn test_queue_state_queries() {
        let mut pending = UploadItem::new("a.mov".into(), "videos/a.mov".into());
        let mut uploading = UploadItem::new("b.mov".into(), "videos/b.mov".into());
        uploading.status = UploadStatus::Uploading;
        pending.status = UploadStatus::Pending;

        let state = QueueState {
            items: vec![uploading, pending],
            busy: true,
            current_progress: 0.4,
        };

        assert!(state.is_uploading(Path::new("a.mov")));
        assert!(state.is_uploading(Path::new("b.mov")));
        assert!(!state.is_uploading(Path::new("c.mov")));
        assert_eq!(state.pending_count(), 1);
        assert_eq!(state.active().map(|item| item.source_path.clone()), Some(PathBuf::from("b.mov")));
        assert!(!state.is_idle());
        assert!(QueueState::default().is_idle());
    }
}
