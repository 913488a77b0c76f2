//! Tests for `HttpImageProbe` against a throwaway local HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use plexgram::telegram::delivery::{
    Deliverer, HttpImageProbe, ImageError, ImageProbe, PhotoOutcome,
};
use plexgram::telegram::markdown::EscapedBody;

use crate::support::{Call, RecordingTransport, CHAT};

/// Serve `response` verbatim to the first connection and return its URL.
async fn serve_once(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/thumb.jpg")
}

fn probe() -> HttpImageProbe {
    HttpImageProbe::new(Duration::from_secs(2), 1024).expect("probe should build")
}

#[tokio::test]
async fn accepts_image_response() {
    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\nConnection: close\r\n\r\nJPEG",
    )
    .await;

    let photo = probe().fetch(&url).await.expect("image should be usable");
    assert_eq!(photo.content_type, "image/jpeg");
    assert_eq!(photo.bytes, b"JPEG");
}

#[tokio::test]
async fn rejects_not_found() {
    let url = serve_once(
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;

    let err = probe().fetch(&url).await.expect_err("404 is unusable");
    assert!(matches!(err, ImageError::Status(404)));
}

#[tokio::test]
async fn rejects_non_image_content_type() {
    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi",
    )
    .await;

    let err = probe().fetch(&url).await.expect_err("html is unusable");
    assert!(matches!(err, ImageError::NotAnImage(ref ct) if ct == "text/html"));
}

#[tokio::test]
async fn rejects_oversized_image() {
    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 999999\r\nConnection: close\r\n\r\n",
    )
    .await;

    let err = probe().fetch(&url).await.expect_err("too large");
    assert!(matches!(err, ImageError::TooLarge { limit: 1024 }));
}

#[tokio::test]
async fn unreachable_host_is_unusable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let result = probe().fetch(&format!("http://{addr}/x.jpg")).await;
    assert!(matches!(result, Err(ImageError::Request(_))));
}

#[tokio::test]
async fn not_found_thumbnail_delivers_text_only() {
    let url = serve_once(
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let transport = Arc::new(RecordingTransport::default());
    let deliverer = Deliverer::new(transport.clone(), Arc::new(probe()));

    let report = deliverer
        .deliver(CHAT, &EscapedBody::from_markup("*Heat* \\(1995\\)"), Some(&url))
        .await
        .expect("delivery should succeed");

    assert_eq!(report.photo, PhotoOutcome::Unusable);
    assert!(!transport
        .calls()
        .iter()
        .any(|call| matches!(call, Call::Photo { .. })));
}
