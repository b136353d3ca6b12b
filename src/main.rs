use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing_subscriber::EnvFilter;
use uplink::{
    Config,
    FailureDetail,
    HttpTransport,
    RecordingCatalog,
    RecordingIntake,
    SubmitOutcome,
    TokioStorage,
    UploadEvent,
    UploadId,
    UploadManager,
};

/// Upload recorded clips one at a time, deleting each local file afterwards.
#[derive(Parser, Debug)]
#[command(name = "uplink", version)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,

    /// Recordings to upload, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    rejected: Vec<PathBuf>,
    completed: Vec<UploadId>,
    failed: Vec<(UploadId, FailureDetail)>,
    /// Events dropped because the collector fell behind. Any loss means an
    /// outcome may be missing, so the run cannot be reported as clean.
    lost_events: u64,
}

impl Summary {
    fn succeeded(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty() && self.lost_events == 0
    }
}

async fn collect_outcomes(mut events: broadcast::Receiver<UploadEvent>) -> Summary {
    let mut summary = Summary::default();

    loop {
        match events.recv().await {
            Ok(UploadEvent::Progress { upload_id, fraction }) => {
                tracing::debug!(%upload_id, fraction, "progress");
            }
            Ok(UploadEvent::Completed { upload_id }) => summary.completed.push(upload_id),
            Ok(UploadEvent::Failed { upload_id, error }) => summary.failed.push((upload_id, error)),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::error!(skipped, "event receiver lagged, upload outcomes may be missing");
                summary.lost_events += skipped;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    summary
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let transport = HttpTransport::new(&config.upload).context("building HTTP transport")?;
    let storage = Arc::new(TokioStorage);
    let handle = UploadManager::with_storage(Arc::new(transport), storage.clone());

    let catalog = Arc::new(Mutex::new(RecordingCatalog::new(config.library.retention_limit, storage)));
    let intake = RecordingIntake::new(handle.manager.clone(), catalog, config.library.dir.clone());
    let collector = tokio::spawn(collect_outcomes(handle.manager.subscribe_events()));

    let mut rejected = Vec::new();
    for file in &cli.files {
        match intake.submit(file).await {
            Ok(SubmitOutcome::Queued { upload_id, .. }) => {
                tracing::debug!(%upload_id, path = %file.display(), "queued");
            }
            Ok(SubmitOutcome::AlreadyUploading) => {
                tracing::warn!(path = %file.display(), "already uploading, skipped");
                rejected.push(file.clone());
            }
            Err(err) => {
                tracing::error!(path = %file.display(), error = %err, "could not submit recording");
                rejected.push(file.clone());
            }
        }
    }

    handle.manager.wait_idle().await?;
    drop(intake);
    handle.shutdown().await?;

    let mut summary = collector.await.context("event collector panicked")?;
    summary.rejected = rejected;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "completed: {}, failed: {}, rejected: {}, lost events: {}",
            summary.completed.len(),
            summary.failed.len(),
            summary.rejected.len(),
            summary.lost_events
        );
    }

    if summary.lost_events > 0 {
        anyhow::bail!("lost {} upload events, outcomes are unknown", summary.lost_events)
    }
    if !summary.succeeded() {
        anyhow::bail!("some recordings were not uploaded")
    }
    Ok(())
}
