mod client;
mod errors;
mod manager;
mod manager_worker;
mod progress;
mod progress_stream;
mod storage;
mod traits;
mod worker;
pub mod types;

pub use client::HttpTransport;
pub use errors::{Result, UploadError};
pub use manager::{UploadManager, UploadManagerHandle};
pub use progress::{fraction_completed, ProgressReporter};
pub use progress_stream::ProgressStream;
pub use storage::TokioStorage;
pub use traits::{LocalStorage, Transport};
pub use types::{
    FailureDetail,
    FailureKind,
    QueueState,
    UploadEvent,
    UploadId,
    UploadItem,
    UploadStatus,
};
