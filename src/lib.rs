pub mod catalog;
pub mod config;
pub mod intake;
pub mod upload;

pub use catalog::{Recording, RecordingCatalog};
pub use config::{Config, LibraryConfig, UploadConfig};
pub use intake::{RecordingIntake, SubmitOutcome};
pub use upload::{
    FailureDetail,
    FailureKind,
    HttpTransport,
    LocalStorage,
    ProgressReporter,
    QueueState,
    Result,
    TokioStorage,
    Transport,
    UploadError,
    UploadEvent,
    UploadId,
    UploadItem,
    UploadManager,
    UploadManagerHandle,
    UploadStatus,
};
