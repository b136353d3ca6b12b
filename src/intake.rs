use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use crate::catalog::{Recording, RecordingCatalog};
use crate::upload::{Result, UploadError, UploadId, UploadManager};

const DEFAULT_EXTENSION: &str = "mov";

#[derive(Debug)]
pub enum SubmitOutcome {
    Queued {
        upload_id: UploadId,
        /// Durable copy registered in the catalog
        destination: PathBuf,
        /// Recordings pushed out by the retention policy
        evicted: Vec<Recording>,
    },
    /// The recording is already pending or uploading
    AlreadyUploading,
}

/// Hands finished recordings to the upload queue.
///
/// The recording is copied into the library directory, queued, and only then
/// registered in the catalog. The queue owns the original file from then on
/// and deletes it once the upload finishes either way. Submits are serialized
/// on the catalog lock, and a submit the queue refuses leaves no copy behind.
#[derive(Clone)]
pub struct RecordingIntake {
    manager: UploadManager,
    catalog: Arc<Mutex<RecordingCatalog>>,
    library_dir: PathBuf,
}

impl RecordingIntake {
    pub fn new(manager: UploadManager, catalog: Arc<Mutex<RecordingCatalog>>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager,
            catalog,
            library_dir: library_dir.into(),
        }
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub async fn submit(&self, recording: &Path) -> Result<SubmitOutcome> {
        // Held until the recording is registered so concurrent submits of the
        // same file cannot both pass the uploading check
        let mut catalog = self.catalog.lock().await;

        if self.manager.is_uploading(recording) {
            return Ok(SubmitOutcome::AlreadyUploading);
        }

        match tokio::fs::metadata(recording).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => return Err(UploadError::SourceMissing(recording.to_path_buf())),
        }

        tokio::fs::create_dir_all(&self.library_dir).await?;
        let destination = self.destination_for(recording);
        tokio::fs::copy(recording, &destination).await?;

        let upload_id = match self.manager
            .add_upload(recording.to_path_buf(), destination.clone())
            .await
        {
            Ok(upload_id) => upload_id,
            Err(err) => {
                tracing::warn!(path = %recording.display(), error = %err, "upload refused, discarding copy");
                if let Err(remove_err) = tokio::fs::remove_file(&destination).await {
                    tracing::debug!(path = %destination.display(), error = %remove_err, "could not remove copy");
                }
                return Err(err);
            }
        };

        let evicted = catalog.insert(destination.clone()).await;

        tracing::info!(
            %upload_id,
            source = %recording.display(),
            destination = %destination.display(),
            evicted = evicted.len(),
            "recording submitted"
        );

        Ok(SubmitOutcome::Queued {
            upload_id,
            destination,
            evicted,
        })
    }

    fn destination_for(&self, recording: &Path) -> PathBuf {
        let extension = recording
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION);

        self.library_dir.join(format!("{}.{}", Uuid::new_v4(), extension))
    }
}
