use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use super::progress::ProgressReporter;

pin_project! {
    /// Wraps a file body stream and reports how much of it has been handed
    /// to the HTTP client.
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        reporter: ProgressReporter,
        bytes_sent: u64,
        total_bytes: u64,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, total_bytes: u64, reporter: ProgressReporter) -> Self {
        Self {
            inner,
            reporter,
            bytes_sent: 0,
            total_bytes,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.bytes_sent += chunk.len() as u64;
                    this.reporter.report_bytes(*this.bytes_sent, *this.total_bytes);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                // Covers empty files, which never yield a chunk
                this.reporter.report_bytes(*this.bytes_sent, *this.total_bytes);
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::sync::mpsc;
    use crate::upload::types::{TransferEvent, UploadId};

    #[tokio::test]
    async fn test_reports_fraction_per_chunk() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(UploadId::new(), tx);
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"defgh")),
            Ok(Bytes::from_static(b"ij")),
        ];

        let stream = ProgressStream::new(futures::stream::iter(chunks), 10, reporter);
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 4);

        let mut fractions = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let TransferEvent::Progress(fraction) = message.event {
                fractions.push(fraction);
            }
        }

        assert_eq!(fractions, vec![0.3, 0.8, 1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_empty_body_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(UploadId::new(), tx);
        let stream = ProgressStream::new(futures::stream::empty::<std::io::Result<Bytes>>(), 0, reporter);

        let collected: Vec<_> = stream.collect().await;
        assert!(collected.is_empty());

        let message = rx.try_recv().unwrap();
        assert!(matches!(message.event, TransferEvent::Progress(fraction) if fraction == 1.0));
    }
}
