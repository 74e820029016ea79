#![allow(missing_docs)]

use std::time::Duration;

use omni_retrieval::backends::HttpEmbeddingClient;
use omni_retrieval::{ClientError, EmbeddingClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response after an optional delay; returns the base URL.
async fn serve_once(status_line: &'static str, body: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0_u8; 8192];
        let _ = socket.read(&mut buf).await;
        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn successful_response_yields_vector() {
    let base = serve_once(
        "200 OK",
        r#"{"vectors": [[0.5, 0.25]], "model": "bge-m3"}"#,
        Duration::ZERO,
    )
    .await;
    let client = HttpEmbeddingClient::new(&base, Duration::from_secs(2)).expect("client");
    let embedding = client.embed("hello").await.expect("embedding");
    assert_eq!(embedding.vector, vec![0.5, 0.25]);
    assert_eq!(embedding.model_id, "bge-m3");
}

#[tokio::test]
async fn status_429_maps_to_rate_limited() {
    let base = serve_once("429 Too Many Requests", "{}", Duration::ZERO).await;
    let client = HttpEmbeddingClient::new(&base, Duration::from_secs(2)).expect("client");
    assert_eq!(client.embed("hello").await, Err(ClientError::RateLimited));
}

#[tokio::test]
async fn server_error_maps_to_unavailable() {
    let base = serve_once("503 Service Unavailable", "{}", Duration::ZERO).await;
    let client = HttpEmbeddingClient::new(&base, Duration::from_secs(2)).expect("client");
    assert!(matches!(
        client.embed("hello").await,
        Err(ClientError::Unavailable(_))
    ));
}

#[tokio::test]
async fn empty_vector_list_is_malformed() {
    let base = serve_once("200 OK", r#"{"vectors": []}"#, Duration::ZERO).await;
    let client = HttpEmbeddingClient::new(&base, Duration::from_secs(2)).expect("client");
    assert!(matches!(
        client.embed("hello").await,
        Err(ClientError::Malformed(_))
    ));
}

#[tokio::test]
async fn slow_server_maps_to_timeout() {
    let base = serve_once("200 OK", r#"{"vectors": [[1.0]]}"#, Duration::from_secs(2)).await;
    let timeout = Duration::from_millis(100);
    let client = HttpEmbeddingClient::new(&base, timeout).expect("client");
    assert_eq!(client.embed("hello").await, Err(ClientError::Timeout(timeout)));
}
