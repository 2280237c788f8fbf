//! Feeds and control requests against in-process servers on loopback.

use distrotrack_core::config::TrackingConfig;
use distrotrack_core::render::DiscreteFrameRenderer;
use distrotrack_core::{CameraSession, ConnectionState, ServerUrl};
use distrotrack_net::{CameraFeed, CommandClient, HomographyRequest, NetError};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

// ── Helpers ────────────────────────────────────────────────────

async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn frame(ts: f64, gid: i64) -> Message {
    Message::Text(
        json!({
            "frame_w": 640, "frame_h": 480, "timestamp": ts,
            "tracks": [{ "track_id": 1, "global_id": gid, "bbox": [10, 10, 20, 40] }]
        })
        .to_string(),
    )
}

#[derive(Debug)]
struct Request {
    method: String,
    path: String,
    body: Value,
}

async fn read_request(sock: &mut TcpStream) -> Request {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = sock.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client hung up mid-request");
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    while buf.len() < head_end + length {
        let n = sock.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
    }
    let mut first = head.lines().next().unwrap().split(' ');
    let body = &buf[head_end..head_end + length];
    Request {
        method: first.next().unwrap().to_string(),
        path: first.next().unwrap().to_string(),
        body: if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body).unwrap()
        },
    }
}

/// HTTP server answering every request through `route`, one connection per
/// request. Requests are reported on the returned channel.
async fn http_server(
    route: fn(&Request) -> (u16, String),
) -> (ServerUrl, mpsc::UnboundedReceiver<Request>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let request = read_request(&mut sock).await;
            let (status, body) = route(&request);
            let reply = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            tx.send(request).ok();
        }
    });
    (ServerUrl::parse(&format!("http://{addr}")).unwrap(), rx)
}

// ── Tracking socket ────────────────────────────────────────────

#[tokio::test]
async fn feed_follows_websocket_across_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = ServerUrl::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    tokio::spawn(async move {
        // First connection: two frames, then the server goes away.
        let (sock, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();
        ws.send(frame(1.0, 7)).await.unwrap();
        ws.send(frame(2.0, 7)).await.unwrap();
        ws.close(None).await.ok();
        drop(ws);

        // Second connection stays open after one more frame.
        let (sock, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();
        ws.send(frame(3.0, 7)).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let session = CameraSession::new(
        "cam1",
        TrackingConfig::default(),
        Box::new(DiscreteFrameRenderer::new(Duration::from_millis(50))),
    );
    let mut feed = CameraFeed::new(&server, session, Duration::from_millis(50)).spawn();

    eventually(|| {
        let snap = feed.snapshot();
        snap.len() == 1 && snap[0].history.len() == 3
    })
    .await;
    assert!(feed.attempts() >= 2);
    assert_eq!(feed.status(), ConnectionState::Connected);
    assert_eq!(feed.session().lock().frame_info().ts, 3.0);

    feed.close();
    assert!(feed.is_closed());
    assert!(feed.snapshot().is_empty());
}

#[tokio::test]
async fn feed_keeps_retrying_while_server_is_down() {
    // Bind then drop so the port refuses connections.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let server = ServerUrl::parse(&format!("http://{addr}")).unwrap();
    let session = CameraSession::new(
        "cam9",
        TrackingConfig::default(),
        Box::new(DiscreteFrameRenderer::new(Duration::from_millis(50))),
    );
    let feed = CameraFeed::new(&server, session, Duration::from_millis(20)).spawn();

    eventually(|| feed.attempts() >= 3).await;
    assert_ne!(feed.status(), ConnectionState::Connected);
    assert!(feed.snapshot().is_empty());
}

// ── Control API ────────────────────────────────────────────────

fn control_routes(req: &Request) -> (u16, String) {
    match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/cameras/actions/stop-all") => (500, "camera busy".into()),
        ("GET", "/api/zones") => (
            200,
            json!({ "zones": [{ "name": "door", "points": [[0, 0], [5, 5]] }] }).to_string(),
        ),
        ("POST", "/api/homography") => (200, json!({ "ok": false, "error": "singular" }).to_string()),
        ("GET", "/api/cameras") => (200, json!([{ "id": "cam1" }, { "id": "cam2" }]).to_string()),
        _ => (200, String::new()),
    }
}

#[tokio::test]
async fn control_requests_reach_the_server() {
    let (server, mut requests) = http_server(control_routes).await;
    let client = CommandClient::new(server, Duration::from_secs(2)).unwrap();

    assert_eq!(client.start_camera("lobby cam").await.unwrap(), json!({}));
    let req = requests.recv().await.unwrap();
    assert_eq!((req.method.as_str(), req.path.as_str()), ("POST", "/api/cameras/lobby%20cam/start"));

    client.record_camera("cam2", true).await.unwrap();
    let req = requests.recv().await.unwrap();
    assert_eq!(req.path, "/api/cameras/cam2/record");
    assert_eq!(req.body, json!({ "enable": true }));

    match client.stop_all().await {
        Err(NetError::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "camera busy");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    requests.recv().await.unwrap();

    let zones = client.list_zones().await.unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].name, "door");
    assert_eq!(zones[0].attributes["points"], json!([[0, 0], [5, 5]]));
    requests.recv().await.unwrap();

    client.delete_zone("door").await.unwrap();
    let req = requests.recv().await.unwrap();
    assert_eq!((req.method.as_str(), req.path.as_str()), ("DELETE", "/api/zones/door"));

    let calibration = HomographyRequest {
        camera_id: "cam1".into(),
        image_xy: vec![[0.0, 0.0], [640.0, 0.0], [640.0, 480.0], [0.0, 480.0]],
        world_xy: vec![[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0]],
    };
    match client.submit_homography(&calibration).await {
        Err(NetError::Rejected(reason)) => assert_eq!(reason, "singular"),
        other => panic!("expected rejection, got {other:?}"),
    }
    let req = requests.recv().await.unwrap();
    assert_eq!(req.body["camera_id"], "cam1");
    assert_eq!(req.body["world_xy"][2], json!([4.0, 3.0]));
}

#[tokio::test]
async fn switching_servers_redirects_requests() {
    let (first, mut first_requests) = http_server(control_routes).await;
    let (second, mut second_requests) = http_server(control_routes).await;
    let client = CommandClient::new(first, Duration::from_secs(2)).unwrap();

    assert_eq!(client.list_cameras().await.unwrap().as_array().unwrap().len(), 2);
    first_requests.recv().await.unwrap();

    assert!(client.set_server(&format!("{second}/")).unwrap());
    assert!(!client.set_server("   ").unwrap());
    assert_eq!(client.server(), second);

    client.start_all().await.unwrap();
    let req = second_requests.recv().await.unwrap();
    assert_eq!(req.path, "/api/cameras/actions/start-all");
    assert!(first_requests.try_recv().is_err());
}
