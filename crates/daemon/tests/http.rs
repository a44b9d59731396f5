//! Integration tests for the HTTP surface: capability redemption on
//! `/addRoom`, the `/id` identity endpoint, status probes, extension
//! dispatch, and a live sync session over a real WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::{SinkExt, Stream, StreamExt};
use http::{header, Method, Request, StatusCode};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use common::prelude::*;
use common::sync::messages::{DocSummary, SyncMessage};
use common::testkit::{eventually, memory_peer, memory_peer_with_room, room_tokens, test_room};

use burrow_daemon::http_server::rooms::RoomsExtension;
use burrow_daemon::http_server::status::StatusExtension;
use burrow_daemon::http_server::{self, ServerExtension};
use burrow_daemon::identity::ensure_identity;
use burrow_daemon::sessions::SessionManager;
use burrow_daemon::{ServiceConfig, ServiceState};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    sessions: Arc<SessionManager>,
    router: axum::Router,
}

/// Build the extension set the daemon serves, registered against `peer`.
async fn test_server(peer: Peer) -> TestServer {
    let sessions = Arc::new(SessionManager::new());
    let rooms = Arc::new(RoomsExtension::new(sessions.clone()));
    rooms.register(peer.clone()).await.unwrap();
    let status = Arc::new(StatusExtension::new());
    status.register(peer).await.unwrap();
    let extensions: Vec<Arc<dyn ServerExtension>> = vec![rooms, status];
    TestServer {
        sessions,
        router: http_server::router(extensions),
    }
}

async fn get(router: &axum::Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Percent-encode a binary capability token the way a browser URL does.
fn token_segment(token: &[u8]) -> String {
    utf8_percent_encode(&BASE64.encode(token), NON_ALPHANUMERIC).to_string()
}

fn add_room_path(read: &[u8], write: &[u8]) -> String {
    format!(
        "/addRoom/{}/{}",
        token_segment(read),
        token_segment(write)
    )
}

#[tokio::test]
async fn test_id_requires_an_identity() {
    let server = test_server(memory_peer()).await;

    let (status, _) = get(&server.router, "/id").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_id_reports_the_server_identity() {
    let peer = memory_peer();
    let tag = ensure_identity(&peer).await.unwrap();
    let server = test_server(peer).await;

    let (status, body) = get(&server.router, "/id").await;
    assert_eq!(status, StatusCode::OK);
    let public_key = body["publicKey"].as_str().unwrap();
    assert!(public_key.starts_with("@srvr."));
    assert_eq!(public_key, tag.to_string());

    // Stable across calls.
    let (_, body) = get(&server.router, "/id").await;
    assert_eq!(body["publicKey"].as_str().unwrap(), tag.to_string());
}

#[tokio::test]
async fn test_extensions_answer_500_before_registration() {
    let sessions = Arc::new(SessionManager::new());
    let rooms: Arc<dyn ServerExtension> = Arc::new(RoomsExtension::new(sessions));
    let router = http_server::router(vec![rooms]);

    let (status, _) = get(&router, "/id").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_add_room_imports_both_capabilities() {
    let peer = memory_peer();
    let server = test_server(peer.clone()).await;
    let room = test_room("kitchen");
    let (read, write) = room_tokens(&room);

    let (status, body) = get(&server.router, &add_room_path(&read, &write)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    assert_eq!(peer.shares().await.unwrap(), vec![room.tag()]);
    assert_eq!(peer.auth().capabilities().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_room_is_idempotent() {
    let peer = memory_peer();
    let server = test_server(peer.clone()).await;
    let room = test_room("kitchen");
    let (read, write) = room_tokens(&room);
    let path = add_room_path(&read, &write);

    let (first, _) = get(&server.router, &path).await;
    let (second, _) = get(&server.router, &path).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    assert_eq!(peer.shares().await.unwrap().len(), 1);
    assert_eq!(peer.auth().capabilities().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_room_rejects_bad_base64_without_importing() {
    let peer = memory_peer();
    let server = test_server(peer.clone()).await;
    let room = test_room("kitchen");
    let (_, write) = room_tokens(&room);

    // First segment decodes to "!!!", which is not base64. The valid write
    // token must not be imported on its own.
    let path = format!("/addRoom/%21%21%21/{}", token_segment(&write));
    let (status, _) = get(&server.router, &path).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(peer.shares().await.unwrap().is_empty());
    assert!(peer.auth().capabilities().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_room_rejects_a_tampered_token() {
    let peer = memory_peer();
    let server = test_server(peer.clone()).await;
    let room = test_room("kitchen");
    let (mut read, write) = room_tokens(&room);
    *read.last_mut().unwrap() ^= 1;

    let (status, _) = get(&server.router, &add_room_path(&read, &write)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(peer.shares().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unclaimed_requests_answer_404() {
    let server = test_server(memory_peer()).await;

    let (status, body) = get(&server.router, "/somewhere/else").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "msg": "not found" }));

    // Extensions only claim GET requests.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/id")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // An addRoom path with a missing segment is not claimed either.
    let (status, _) = get(&server.router, "/addRoom/only-one").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_probes_track_readiness() {
    let peer = memory_peer();
    let server = test_server(peer.clone()).await;

    let (status, body) = get(&server.router, "/_status/livez").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    // Not ready until the server identity exists.
    let (status, body) = get(&server.router, "/_status/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("failure"));

    ensure_identity(&peer).await.unwrap();
    let (status, body) = get(&server.router, "/_status/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_sync_requires_a_websocket_handshake() {
    let server = test_server(memory_peer()).await;

    let (status, _) = get(&server.router, "/sync").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Read frames until a binary sync message arrives.
async fn next_frame<S>(ws: &mut S) -> SyncMessage
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a sync frame")
            .expect("socket closed while waiting for a sync frame")
            .expect("websocket error");
        match message {
            Message::Binary(frame) => {
                return SyncMessage::decode(&frame).expect("valid sync frame")
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected websocket message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_sync_session_exchanges_documents() {
    let room = test_room("attic");
    let server_peer = memory_peer_with_room(&room).await.unwrap();
    let server = test_server(server_peer.clone()).await;

    let existing = DocPath::new(["greeting"]).unwrap();
    let store = server_peer.get_store(&room.tag()).await.unwrap();
    store.set(existing.clone(), "hello").await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = server.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let (mut ws, _) = connect_async(format!("ws://{addr}/sync")).await.unwrap();

    // The session opens by announcing what the server holds.
    match next_frame(&mut ws).await {
        SyncMessage::Announce { share, docs } => {
            assert_eq!(share, room.tag());
            assert_eq!(docs.len(), 1);
            assert_eq!(docs[0].path, existing);
        }
        other => panic!("expected an announce, got {other:?}"),
    }

    // Ask for the document and receive its payload.
    let want = SyncMessage::Want {
        share: room.tag(),
        paths: vec![existing.clone()],
    };
    ws.send(Message::Binary(want.encode().unwrap()))
        .await
        .unwrap();
    match next_frame(&mut ws).await {
        SyncMessage::Chunk {
            share,
            path,
            offset,
            total_len,
            data,
            ..
        } => {
            assert_eq!(share, room.tag());
            assert_eq!(path, existing);
            assert_eq!(offset, 0);
            assert_eq!(total_len, 5);
            assert_eq!(data, b"hello");
        }
        other => panic!("expected a chunk, got {other:?}"),
    }

    // Push a document the other way: announce it, answer the server's want.
    let incoming = DocPath::new(["reply"]).unwrap();
    let timestamp = Document::now_micros();
    let announce = SyncMessage::Announce {
        share: room.tag(),
        docs: vec![DocSummary {
            path: incoming.clone(),
            timestamp,
        }],
    };
    ws.send(Message::Binary(announce.encode().unwrap()))
        .await
        .unwrap();
    match next_frame(&mut ws).await {
        SyncMessage::Want { share, paths } => {
            assert_eq!(share, room.tag());
            assert_eq!(paths, vec![incoming.clone()]);
        }
        other => panic!("expected a want, got {other:?}"),
    }

    let chunk = SyncMessage::Chunk {
        share: room.tag(),
        path: incoming.clone(),
        timestamp,
        offset: 0,
        total_len: 4,
        data: b"pong".to_vec(),
    };
    ws.send(Message::Binary(chunk.encode().unwrap()))
        .await
        .unwrap();

    eventually(WAIT, || async {
        Ok(store.document(&incoming).await?.is_some())
    })
    .await
    .unwrap();
    let doc = store.document(&incoming).await.unwrap().unwrap();
    assert_eq!(doc.payload.as_ref(), b"pong");

    // The session registry saw the connection; hanging up retires it on the
    // next prune.
    assert_eq!(server.sessions.len(), 1);
    drop(ws);
    eventually(WAIT, || async {
        server.sessions.prune();
        Ok(server.sessions.is_empty())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_sync_session_without_rooms_idles_cleanly() {
    // A peer with no imported rooms still accepts sync sessions; the
    // interest set is just empty.
    let server = test_server(memory_peer()).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = server.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let (mut ws, _) = connect_async(format!("ws://{addr}/sync")).await.unwrap();
    eventually(WAIT, || async { Ok(server.sessions.len() == 1) })
        .await
        .unwrap();

    // Nothing to announce, so a reconcile pass sends nothing, and frames
    // for shares outside the interest set are ignored. Neither may end the
    // session.
    server.sessions.force_reconcile_all();
    let announce = SyncMessage::Announce {
        share: test_room("elsewhere").tag(),
        docs: vec![],
    };
    ws.send(Message::Binary(announce.encode().unwrap()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    server.sessions.prune();
    assert_eq!(server.sessions.len(), 1);

    drop(ws);
    eventually(WAIT, || async {
        server.sessions.prune();
        Ok(server.sessions.is_empty())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_identity_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        port: 0,
        sqlite_path: Some(dir.path().join("burrow.sqlite")),
        log_level: tracing::Level::INFO,
        log_dir: None,
    };

    let state = ServiceState::from_config(&config).await.unwrap();
    let first = ensure_identity(state.peer()).await.unwrap();
    let server = test_server(state.peer().clone()).await;
    let (status, body) = get(&server.router, "/id").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"].as_str().unwrap(), first.to_string());
    drop(server);
    drop(state);

    // A second boot over the same database adopts the stored identity.
    let state = ServiceState::from_config(&config).await.unwrap();
    let second = ensure_identity(state.peer()).await.unwrap();
    assert_eq!(second, first);
    let server = test_server(state.peer().clone()).await;
    let (_, body) = get(&server.router, "/id").await;
    assert_eq!(body["publicKey"].as_str().unwrap(), first.to_string());
}
