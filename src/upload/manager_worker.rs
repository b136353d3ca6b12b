use std::path::PathBuf;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use super::errors::{Result, UploadError};
use super::traits::{LocalStorage, Transport};
use super::types::{
    FailureDetail,
    ManagerCommand,
    QueueState,
    TransferEvent,
    TransferMessage,
    UploadEvent,
    UploadId,
    UploadItem,
    UploadStatus,
};
use super::worker::UploadWorker;

struct ActiveTransfer {
    upload_id: UploadId,
    cancellation_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

/// Owns the queue. All state changes happen inside `run`, one message at a
/// time, and each finished step is published as a whole snapshot before the
/// events describing it go out.
pub struct UploadManagerWorker {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn LocalStorage>,
    queue: Vec<UploadItem>,
    busy: bool,
    current_progress: f64,
    active: Option<ActiveTransfer>,
    /// Events of the step in progress, sent by `publish`
    outbox: Vec<UploadEvent>,

    state_tx: watch::Sender<QueueState>,
    event_tx: broadcast::Sender<UploadEvent>,
    transfer_tx: mpsc::UnboundedSender<TransferMessage>,
}

impl UploadManagerWorker {
    pub(crate) async fn run(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn LocalStorage>,
        mut command_rx: mpsc::Receiver<ManagerCommand>,
        state_tx: watch::Sender<QueueState>,
        event_tx: broadcast::Sender<UploadEvent>,
    ) {
        let (transfer_tx, mut transfer_rx) = mpsc::unbounded_channel();
        let mut worker = Self {
            transport,
            storage,
            queue: Vec::new(),
            busy: false,
            current_progress: 0.0,
            active: None,
            outbox: Vec::new(),
            state_tx,
            event_tx,
            transfer_tx,
        };

        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(ManagerCommand::Shutdown { reply }) => {
                        worker.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => worker.handle_command(command).await,
                    None => {
                        worker.shutdown();
                        break;
                    }
                },
                Some(message) = transfer_rx.recv() => {
                    worker.handle_transfer_message(message).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::AddUpload { source_path, destination_path, reply } => {
                let result = self.add_upload(source_path, destination_path).await;
                let _ = reply.send(result);
            }
            ManagerCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn add_upload(&mut self, source_path: PathBuf, destination_path: PathBuf) -> Result<UploadId> {
        if self.queue.iter().any(|item| item.source_path == source_path) {
            tracing::debug!(path = %source_path.display(), "rejecting duplicate source");
            return Err(UploadError::DuplicateSource(source_path));
        }

        if !self.storage.exists(&source_path).await {
            tracing::debug!(path = %source_path.display(), "rejecting missing source");
            return Err(UploadError::SourceMissing(source_path));
        }

        let item = UploadItem::new(source_path, destination_path);
        let upload_id = item.id;
        tracing::info!(%upload_id, path = %item.source_path.display(), "upload queued");

        self.outbox.push(UploadEvent::Enqueued {
            upload_id,
            source_path: item.source_path.clone(),
        });
        self.queue.push(item);

        if !self.busy {
            self.process_next();
        }
        self.publish();

        Ok(upload_id)
    }

    /// Promote the first pending item, or go idle when there is none.
    fn process_next(&mut self) {
        let Some(index) = self.queue.iter().position(|item| item.status == UploadStatus::Pending) else {
            self.busy = false;
            self.current_progress = 0.0;
            return;
        };

        let item = &mut self.queue[index];
        item.status = UploadStatus::Uploading;
        item.progress = 0.0;
        item.started_at = Some(Utc::now());
        let upload_id = item.id;
        let source_path = item.source_path.clone();

        self.busy = true;
        self.current_progress = 0.0;
        self.emit_state_change(upload_id, UploadStatus::Pending, UploadStatus::Uploading);
        tracing::info!(%upload_id, path = %source_path.display(), "upload started");

        let cancellation_token = CancellationToken::new();
        let worker = UploadWorker {
            transport: self.transport.clone(),
            cancellation_token: cancellation_token.clone(),
        };
        let join_handle = tokio::spawn(worker.run(upload_id, source_path, self.transfer_tx.clone()));

        self.active = Some(ActiveTransfer {
            upload_id,
            cancellation_token,
            join_handle,
        });
    }

    async fn handle_transfer_message(&mut self, message: TransferMessage) {
        let TransferMessage { upload_id, event } = message;

        if self.active.as_ref().map(|active| active.upload_id) != Some(upload_id) {
            tracing::trace!(%upload_id, "ignoring message from inactive transfer");
            return;
        }

        match event {
            TransferEvent::Progress(fraction) => self.apply_progress(upload_id, fraction),
            TransferEvent::Finished(result) => self.finish_transfer(upload_id, result).await,
        }
    }

    fn apply_progress(&mut self, upload_id: UploadId, fraction: f64) {
        let Some(item) = self.queue.iter_mut().find(|item| item.id == upload_id) else {
            return;
        };

        if fraction < item.progress {
            tracing::trace!(%upload_id, fraction, current = item.progress, "dropping stale progress");
            return;
        }

        item.progress = fraction;
        self.current_progress = fraction;
        self.outbox.push(UploadEvent::Progress { upload_id, fraction });
        self.publish();
    }

    /// Terminal step: record the outcome, delete the source, drop the item
    /// and hand the slot to the next pending upload.
    async fn finish_transfer(&mut self, upload_id: UploadId, result: Result<()>) {
        self.active = None;

        let Some(index) = self.queue.iter().position(|item| item.id == upload_id) else {
            return;
        };

        let mut item = self.queue.remove(index);
        item.status = match &result {
            Ok(()) => UploadStatus::Completed,
            Err(err) => UploadStatus::Failed(FailureDetail::from(err)),
        };

        if !self.storage.remove(&item.source_path).await {
            tracing::debug!(%upload_id, path = %item.source_path.display(), "source already gone");
        }

        self.emit_state_change(upload_id, UploadStatus::Uploading, item.status.clone());
        match result {
            Ok(()) => {
                tracing::info!(%upload_id, "upload completed");
                self.outbox.push(UploadEvent::Completed { upload_id });
            }
            Err(err) => {
                tracing::warn!(%upload_id, error = %err, "upload failed");
                self.outbox.push(UploadEvent::Failed {
                    upload_id,
                    error: FailureDetail::from(&err),
                });
            }
        }

        self.process_next();
        if !self.busy {
            tracing::info!("upload queue drained");
            self.outbox.push(UploadEvent::Drained);
        }
        self.publish();
    }

    fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!(upload_id = %active.upload_id, "cancelling in-flight upload");
            active.cancellation_token.cancel();
            drop(active.join_handle);
        }

        if !self.queue.is_empty() {
            tracing::warn!(dropped = self.queue.len(), "shutting down with uploads still queued");
        }
    }

    fn emit_state_change(&mut self, upload_id: UploadId, old_status: UploadStatus, new_status: UploadStatus) {
        self.outbox.push(UploadEvent::StateChanged {
            upload_id,
            old_status,
            new_status,
        });
    }

    fn publish(&mut self) {
        self.state_tx.send_replace(QueueState {
            items: self.queue.clone(),
            busy: self.busy,
            current_progress: self.current_progress,
        });

        for event in self.outbox.drain(..) {
            let _ = self.event_tx.send(event);
        }
    }
}
