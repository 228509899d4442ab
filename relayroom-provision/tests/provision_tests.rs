//! Integration tests for the room provisioning client
//!
//! A throwaway HTTP/1.1 responder on a local TcpListener stands in for the
//! vendor API so the full request path (headers, body, status handling) runs.

use relayroom_core::RelayRoomError;
use relayroom_provision::{ProvisionConfig, RoomsClient};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug)]
struct CapturedRequest {
    head: String,
    body: String,
}

async fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|v| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending body");
        buf.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        body: String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string(),
    }
}

/// Serve exactly one request with the given status line and JSON body
async fn start_fake_api(
    status_line: &'static str,
    body: &'static str,
) -> (SocketAddr, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        let _ = tx.send(captured);
    });

    (addr, rx)
}

fn client_for(addr: SocketAddr) -> RoomsClient {
    let config = ProvisionConfig::new("test-token")
        .with_api_base(format!("http://{}", addr))
        .with_request_timeout(Duration::from_secs(5));
    RoomsClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_create_room_returns_room_id() {
    let (addr, captured) = start_fake_api("200 OK", r#"{"roomId":"r1","disabled":false}"#).await;
    let client = client_for(addr);

    let room_id = assert_ok!(client.create_room().await);
    assert_eq!(room_id.as_str(), "r1");

    let request = captured.await.unwrap();
    assert!(request.head.starts_with("post /v2/rooms http/1.1"));
    assert!(request.head.contains("authorization: test-token"));
    assert!(request.head.contains("content-type: application/json"));
    assert_eq!(request.body, "{}");
}

#[tokio::test]
async fn test_non_success_status_is_provisioning_error() {
    let (addr, _captured) = start_fake_api("401 Unauthorized", r#"{"error":"invalid token"}"#).await;
    let client = client_for(addr);

    let err = assert_err!(client.create_room().await);
    match err {
        RelayRoomError::Provisioning { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid token"));
        }
        other => panic!("expected provisioning error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_room_field_is_malformed() {
    let (addr, _captured) = start_fake_api("200 OK", r#"{"id":"r1"}"#).await;
    let client = client_for(addr);

    let err = assert_err!(client.create_room().await);
    assert!(matches!(err, RelayRoomError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_resolve_room_prefers_entered_id() {
    // Nothing listens here; an entered id must not trigger a request
    let config = ProvisionConfig::new("test-token").with_api_base("http://127.0.0.1:9");
    let client = RoomsClient::new(&config).unwrap();

    let room_id = assert_ok!(client.resolve_room(Some("  typed-room ")).await);
    assert_eq!(room_id.as_str(), "typed-room");
}

#[tokio::test]
async fn test_resolve_room_creates_when_blank() {
    let (addr, _captured) = start_fake_api("200 OK", r#"{"roomId":"fresh"}"#).await;
    let client = client_for(addr);

    let room_id = assert_ok!(client.resolve_room(Some("")).await);
    assert_eq!(room_id.as_str(), "fresh");
}

#[tokio::test]
async fn test_unresponsive_api_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let config = ProvisionConfig::new("test-token")
        .with_api_base(format!("http://{}", addr))
        .with_request_timeout(Duration::from_millis(200));
    let client = RoomsClient::new(&config).unwrap();

    let err = assert_err!(client.create_room().await);
    assert_eq!(err.error_code(), "TIMEOUT");
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr);

    let err = assert_err!(client.create_room().await);
    assert!(matches!(err, RelayRoomError::Transport { .. }));
    assert!(err.is_provisioning_error());
}
