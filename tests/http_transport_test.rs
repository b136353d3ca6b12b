use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use tokio::sync::broadcast;
use tokio::time::timeout;
use uplink::{
    FailureKind,
    HttpTransport,
    UploadConfig,
    UploadEvent,
    UploadManager,
};

#[derive(Clone, Default)]
struct Received {
    requests: Arc<Mutex<Vec<(HeaderMap, Bytes)>>>,
}

async fn accept(State(received): State<Received>, headers: HeaderMap, body: Bytes) -> StatusCode {
    received.requests.lock().unwrap().push((headers, body));
    StatusCode::OK
}

async fn reject(_body: Bytes) -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "disk full")
}

async fn serve(received: Received) -> SocketAddr {
    let app = Router::new()
        .route("/upload", post(accept))
        .route("/reject", post(reject))
        .with_state(received);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

fn config(addr: SocketAddr, path: &str) -> UploadConfig {
    UploadConfig {
        endpoint: format!("http://{}{}", addr, path),
        content_type: "video/quicktime".to_string(),
        token: "s3cret".to_string(),
        timeout_secs: 10,
        chunk_size: 1024,
    }
}

async fn events_until_drained(events: &mut broadcast::Receiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut collected = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event channel closed");
        let drained = matches!(event, UploadEvent::Drained);
        collected.push(event);
        if drained {
            return collected;
        }
    }
}

#[tokio::test]
async fn test_uploads_file_with_configured_headers() {
    let received = Received::default();
    let addr = serve(received.clone()).await;
    let transport = HttpTransport::new(&config(addr, "/upload")).unwrap();
    let handle = UploadManager::new(Arc::new(transport));
    let mut events = handle.manager.subscribe_events();

    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mov");
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    tokio::fs::write(&clip, &payload).await.unwrap();

    assert!(handle.manager.enqueue(&clip, dir.path().join("copy.mov")).await);
    let collected = events_until_drained(&mut events).await;

    assert!(collected.iter().any(|event| matches!(event, UploadEvent::Completed { .. })));

    let fractions: Vec<f64> = collected
        .iter()
        .filter_map(|event| match event {
            UploadEvent::Progress { fraction, .. } => Some(*fraction),
            _ => None,
        })
        .collect();
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(fractions.last(), Some(&1.0));

    let requests = received.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (headers, body) = &requests[0];
    assert_eq!(headers["content-type"], "video/quicktime");
    assert_eq!(headers["authorization"], "Bearer s3cret");
    assert_eq!(body.as_ref(), payload.as_slice());

    assert!(!clip.exists());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_error_fails_item() {
    let addr = serve(Received::default()).await;
    let transport = HttpTransport::new(&config(addr, "/reject")).unwrap();
    let handle = UploadManager::new(Arc::new(transport));
    let mut events = handle.manager.subscribe_events();

    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mov");
    tokio::fs::write(&clip, b"frames").await.unwrap();

    assert!(handle.manager.enqueue(&clip, dir.path().join("copy.mov")).await);
    let collected = events_until_drained(&mut events).await;

    let failure = collected.iter().find_map(|event| match event {
        UploadEvent::Failed { error, .. } => Some(error.clone()),
        _ => None,
    });
    let failure = failure.expect("upload should fail");
    assert_eq!(failure.kind, FailureKind::Application { status_code: 500 });
    assert!(failure.message.contains("disk full"));

    assert!(!clip.exists());
    assert!(handle.manager.snapshot().is_idle());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_failure() {
    // Grab a free port, then close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(&config(addr, "/upload")).unwrap();
    let handle = UploadManager::new(Arc::new(transport));
    let mut events = handle.manager.subscribe_events();

    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mov");
    tokio::fs::write(&clip, b"frames").await.unwrap();

    assert!(handle.manager.enqueue(&clip, dir.path().join("copy.mov")).await);
    let collected = events_until_drained(&mut events).await;

    assert!(collected.iter().any(|event| matches!(
        event,
        UploadEvent::Failed { error, .. } if error.kind == FailureKind::Transport
    )));
    assert!(!clip.exists());

    handle.shutdown().await.unwrap();
}
