use std::path::Path;
use async_trait::async_trait;
use super::errors::Result;
use super::progress::ProgressReporter;

/// Network side of an upload. Implementations push a single file to the
/// remote service and report byte-level progress as they go.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transfer `source`, returning once the remote side has accepted or
    /// rejected it.
    async fn upload(&self, source: &Path, progress: ProgressReporter) -> Result<()>;
}

/// Local filesystem operations the queue needs.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Best-effort delete, `false` when nothing was removed.
    async fn remove(&self, path: &Path) -> bool;
}
