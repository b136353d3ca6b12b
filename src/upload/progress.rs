use tokio::sync::mpsc;
use super::types::{TransferEvent, TransferMessage, UploadId};

/// Fraction of a transfer completed, clamped to `[0.0, 1.0]`.
///
/// An empty file counts as fully sent.
pub fn fraction_completed(bytes_sent: u64, total_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 1.0;
    }

    (bytes_sent as f64 / total_bytes as f64).min(1.0)
}

/// Handed to a [`Transport`](super::traits::Transport) for each transfer.
///
/// Forwards progress to the manager tagged with the upload id. Values that
/// would move backwards are dropped, so the manager only ever sees a
/// non-decreasing sequence.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    upload_id: UploadId,
    events: mpsc::UnboundedSender<TransferMessage>,
    last_fraction: f64,
}

impl ProgressReporter {
    pub(crate) fn new(upload_id: UploadId, events: mpsc::UnboundedSender<TransferMessage>) -> Self {
        Self {
            upload_id,
            events,
            last_fraction: 0.0,
        }
    }

    pub fn upload_id(&self) -> UploadId {
        self.upload_id
    }

    pub fn report(&mut self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }

        let fraction = fraction.clamp(0.0, 1.0);
        if fraction < self.last_fraction {
            return;
        }

        self.last_fraction = fraction;
        let _ = self.events.send(TransferMessage {
            upload_id: self.upload_id,
            event: TransferEvent::Progress(fraction),
        });
    }

    pub fn report_bytes(&mut self, bytes_sent: u64, total_bytes: u64) {
        self.report(fraction_completed(bytes_sent, total_bytes));
    }
}
