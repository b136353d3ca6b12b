use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use super::errors::{Result, UploadError};
use super::progress::ProgressReporter;
use super::traits::Transport;
use super::types::{TransferEvent, TransferMessage, UploadId};

/// Runs one transfer and reports its progress and outcome to the manager.
pub(crate) struct UploadWorker {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cancellation_token: CancellationToken,
}

impl UploadWorker {
    /// Every transfer ends with exactly one `Finished` message, sent after
    /// all of its progress messages.
    pub async fn run(
        self,
        upload_id: UploadId,
        source_path: PathBuf,
        events: mpsc::UnboundedSender<TransferMessage>,
    ) {
        let reporter = ProgressReporter::new(upload_id, events.clone());
        let transport = self.transport;
        let mut transfer = tokio::spawn(async move {
            transport.upload(&source_path, reporter).await
        });

        let result: Result<()> = tokio::select! {
            joined = &mut transfer => match joined {
                Ok(result) => result,
                Err(err) => Err(UploadError::internal_error(format!("Transfer task panicked: {}", err))),
            },
            _ = self.cancellation_token.cancelled() => {
                transfer.abort();
                Err(UploadError::Cancelled)
            }
        };

        let _ = events.send(TransferMessage {
            upload_id,
            event: TransferEvent::Finished(result),
        });
    }
}
