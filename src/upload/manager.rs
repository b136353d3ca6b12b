use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use super::errors::{Result, UploadError};
use super::manager_worker::UploadManagerWorker;
use super::storage::TokioStorage;
use super::traits::{LocalStorage, Transport};
use super::types::{ManagerCommand, QueueState, UploadEvent, UploadId};

/// Cheap, cloneable front end to the upload queue.
#[derive(Clone)]
pub struct UploadManager {
    command_tx: mpsc::Sender<ManagerCommand>,
    event_tx: broadcast::Sender<UploadEvent>,
    state_rx: watch::Receiver<QueueState>,
}

/// Owns the worker task behind an [`UploadManager`].
pub struct UploadManagerHandle {
    pub manager: UploadManager,
    pub worker_handle: JoinHandle<()>,
}

impl UploadManagerHandle {
    /// Stop the worker. An in-flight transfer is cancelled and anything
    /// still queued is dropped; the queue is not persisted.
    pub async fn shutdown(self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        // A closed channel means the worker is already gone
        if self.manager
            .command_tx
            .send(ManagerCommand::Shutdown { reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }

        drop(self.manager);
        self.worker_handle.await
            .map_err(|err| UploadError::internal_error(format!("Worker panic: {}", err)))
    }
}

impl UploadManager {
    pub fn new(transport: Arc<dyn Transport>) -> UploadManagerHandle {
        Self::with_storage(transport, Arc::new(TokioStorage))
    }

    pub fn with_storage(transport: Arc<dyn Transport>, storage: Arc<dyn LocalStorage>) -> UploadManagerHandle {
        let (command_tx, command_rx) = mpsc::channel(100);
        // Slow subscribers lag rather than stall the worker
        let (event_tx, _) = broadcast::channel(256);
        let (state_tx, state_rx) = watch::channel(QueueState::default());

        let worker_handle = tokio::spawn(UploadManagerWorker::run(
            transport,
            storage,
            command_rx,
            state_tx,
            event_tx.clone(),
        ));

        let manager = Self {
            command_tx,
            event_tx,
            state_rx,
        };

        UploadManagerHandle {
            manager,
            worker_handle,
        }
    }

    /// Queue `source_path` for upload.
    ///
    /// Fails with `DuplicateSource` when the path is already queued and with
    /// `SourceMissing` when the file does not exist. Returns once the item is
    /// visible in [`snapshot`](Self::snapshot).
    pub async fn add_upload(&self, source_path: PathBuf, destination_path: PathBuf) -> Result<UploadId> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(ManagerCommand::AddUpload {
                source_path,
                destination_path,
                reply: reply_tx,
            })
            .await
            .map_err(|_| UploadError::ManagerShutdown)?;

        reply_rx
            .await
            .map_err(|_| UploadError::ManagerShutdown)?
    }

    /// Pass/fail flavour of [`add_upload`](Self::add_upload).
    pub async fn enqueue(&self, source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> bool {
        self.add_upload(source_path.into(), destination_path.into())
            .await
            .is_ok()
    }

    /// True while `source_path` is pending or uploading.
    pub fn is_uploading(&self, source_path: &Path) -> bool {
        self.state_rx.borrow().is_uploading(source_path)
    }

    pub fn snapshot(&self) -> QueueState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<QueueState> {
        self.state_rx.clone()
    }

    /// Subscribe to queue events.
    ///
    /// Slow receivers may observe `Lagged` and miss events; the state
    /// channel always holds the latest snapshot.
    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.event_tx.subscribe()
    }

    /// Wait until nothing is queued and no transfer is running.
    pub async fn wait_idle(&self) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(QueueState::is_idle)
            .await
            .map_err(|_| UploadError::ManagerShutdown)?;

        Ok(())
    }
}
