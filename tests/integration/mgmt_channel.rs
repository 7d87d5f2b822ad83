//! Management channel integration tests
//!
//! Exercises the server/client pair over real Unix domain sockets:
//! request/response round trips, many concurrent clients, and isolation
//! from misbehaving peers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use vxfld::mgmt::{MgmtClient, MgmtHandler, MgmtResponse, MgmtServer};

struct EchoHandler;

#[async_trait]
impl MgmtHandler for EchoHandler {
    type Request = String;
    type Reply = String;

    async fn process(&self, request: String) -> MgmtResponse<String> {
        if request == "ping" {
            MgmtResponse::ok("pong".to_string())
        } else {
            MgmtResponse::ok(format!("echo: {request}"))
        }
    }
}

#[tokio::test]
async fn test_ping_pong_round_trip() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("vxfld.sock");

    let server = MgmtServer::bind(&socket_path, Arc::new(EchoHandler)).unwrap();
    let handle = server.start();

    let mut client = MgmtClient::connect(&socket_path).await.unwrap();
    let response: MgmtResponse<String> = client.send(&"ping".to_string()).await.unwrap();

    assert_eq!(response.result.as_deref(), Some("pong"));
    assert!(response.error.is_none());

    handle.shutdown();
    handle.stopped().await;
}

#[tokio::test]
async fn test_concurrent_clients_get_matching_responses() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("vxfld.sock");

    let server = MgmtServer::bind(&socket_path, Arc::new(EchoHandler)).unwrap();
    let handle = server.start();

    let clients = (0..8).map(|i| {
        let path = socket_path.clone();
        tokio::spawn(async move {
            let mut client = MgmtClient::connect(&path).await.unwrap();
            for round in 0..10 {
                let request = format!("client-{i}-round-{round}");
                let response: MgmtResponse<String> = client.send(&request).await.unwrap();
                assert_eq!(response.result, Some(format!("echo: {request}")));
            }
        })
    });

    for result in join_all(clients).await {
        result.unwrap();
    }

    handle.shutdown();
    handle.stopped().await;
}

#[tokio::test]
async fn test_early_close_does_not_affect_other_connections() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("vxfld.sock");

    let server = MgmtServer::bind(&socket_path, Arc::new(EchoHandler)).unwrap();
    let handle = server.start();

    // A well-behaved client with an exchange in flight throughout
    let path = socket_path.clone();
    let steady = tokio::spawn(async move {
        let mut client = MgmtClient::connect(&path).await.unwrap();
        for round in 0..20 {
            let request = format!("steady-{round}");
            let response: MgmtResponse<String> = client.send(&request).await.unwrap();
            assert_eq!(response.result, Some(format!("echo: {request}")));
        }
    });

    // A saboteur that keeps hanging up mid-request: length prefix promises
    // 100 payload bytes, far fewer arrive.
    for _ in 0..5 {
        let mut raw = UnixStream::connect(&socket_path).await.unwrap();
        raw.write_all(&100u32.to_be_bytes()).await.unwrap();
        raw.write_all(b"partial").await.unwrap();
        drop(raw);
    }

    steady.await.unwrap();

    // The server still accepts fresh connections afterwards
    let mut client = MgmtClient::connect(&socket_path).await.unwrap();
    let response: MgmtResponse<String> = client.send(&"ping".to_string()).await.unwrap();
    assert_eq!(response.result.as_deref(), Some("pong"));

    handle.shutdown();
    handle.stopped().await;
}

#[tokio::test]
async fn test_socket_file_removed_on_shutdown() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("vxfld.sock");

    let server = MgmtServer::bind(&socket_path, Arc::new(EchoHandler)).unwrap();
    let handle = server.start();

    // Force the run loop to be live before shutting down
    let mut client = MgmtClient::connect(&socket_path).await.unwrap();
    let _: MgmtResponse<String> = client.send(&"ping".to_string()).await.unwrap();

    handle.shutdown();
    handle.stopped().await;

    assert!(!socket_path.exists());
}
