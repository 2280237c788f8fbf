//! Long-lived HTTP bodies: the `/events` push stream and per-camera MJPEG.

use crate::api::CommandClient;
use crate::error::{NetError, Result};
use bytes::Bytes;
use distrotrack_core::mjpeg::{boundary_from_content_type, MjpegParser};
use distrotrack_core::sse::SseParser;
use futures::future::ready;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::{header, Url};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Decoded JSON payloads from `/events`, in arrival order.
pub type EventStream = BoxStream<'static, Value>;

/// JPEG images from `/stream/<camera id>`.
pub type JpegStream = BoxStream<'static, Bytes>;

const DEFAULT_BOUNDARY: &str = "frame";

async fn open(client: &reqwest::Client, url: &Url, accept: &str) -> Result<reqwest::Response> {
    let resp = client
        .get(url.clone())
        .header(header::ACCEPT, accept)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(NetError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

impl CommandClient {
    /// Subscribe to server-pushed snapshots. Malformed payloads are skipped;
    /// the stream ends when the connection does.
    pub async fn subscribe_events(&self) -> Result<EventStream> {
        let url = self.endpoint(&["events"])?;
        let resp = open(self.streaming(), &url, "text/event-stream").await?;
        debug!(%url, "Event stream open");

        let events = resp
            .bytes_stream()
            .scan(SseParser::new(), move |parser, chunk| {
                ready(match chunk {
                    Ok(bytes) => Some(parser.push(&bytes)),
                    Err(e) => {
                        warn!(%url, error = %e, "Event stream interrupted");
                        None
                    }
                })
            })
            .flat_map(stream::iter)
            .filter_map(|event| {
                ready(match event.json() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        trace!(error = %e, "Dropping malformed event");
                        None
                    }
                })
            });
        Ok(events.boxed())
    }

    /// Subscribe to a camera's MJPEG stream.
    pub async fn subscribe_mjpeg(&self, camera_id: &str) -> Result<JpegStream> {
        let url = self.endpoint(&["stream", camera_id])?;
        let resp = open(self.streaming(), &url, "multipart/x-mixed-replace").await?;
        let boundary = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(boundary_from_content_type)
            .unwrap_or_else(|| DEFAULT_BOUNDARY.to_string());
        debug!(%url, %boundary, "MJPEG stream open");

        let frames = resp
            .bytes_stream()
            .scan(MjpegParser::new(&boundary), move |parser, chunk| {
                ready(match chunk {
                    Ok(bytes) => Some(parser.push(&bytes)),
                    Err(e) => {
                        warn!(%url, error = %e, "MJPEG stream interrupted");
                        None
                    }
                })
            })
            .flat_map(stream::iter);
        Ok(frames.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distrotrack_core::ServerUrl;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One connection: read the request head, write `head` then each body
    /// chunk, then close.
    async fn serve_once(head: &'static str, chunks: Vec<Vec<u8>>) -> CommandClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let mut seen = Vec::new();
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                seen.extend_from_slice(&buf[..n]);
            }
            sock.write_all(head.as_bytes()).await.unwrap();
            for chunk in chunks {
                sock.write_all(&chunk).await.unwrap();
                sock.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            sock.shutdown().await.ok();
        });
        let server = ServerUrl::parse(&format!("http://{addr}")).unwrap();
        CommandClient::new(server, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_events_decoded_in_order() {
        let client = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
            vec![
                b"data: {\"cameras\":4}\n\n: ping\n\nda".to_vec(),
                b"ta: not json\n\ndata: {\"alerts\":\n".to_vec(),
                b"data: []}\n\n".to_vec(),
            ],
        )
        .await;
        let events: Vec<Value> = client.subscribe_events().await.unwrap().collect().await;
        assert_eq!(events, vec![json!({"cameras": 4}), json!({"alerts": []})]);
    }

    #[tokio::test]
    async fn test_events_http_error() {
        let client = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\nConnection: close\r\n\r\nnope",
            vec![],
        )
        .await;
        match client.subscribe_events().await {
            Err(NetError::Http { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "nope");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_mjpeg_parts() {
        let part = |body: &[u8]| {
            let mut out =
                format!("--cam\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n", body.len())
                    .into_bytes();
            out.extend_from_slice(body);
            out.extend_from_slice(b"\r\n");
            out
        };
        let mut stream = part(b"\xff\xd8AAAA\xff\xd9");
        stream.extend(part(b"\xff\xd8BB\xff\xd9"));
        let (first, second) = stream.split_at(20);
        let client = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary=cam\r\nConnection: close\r\n\r\n",
            vec![first.to_vec(), second.to_vec()],
        )
        .await;
        let frames: Vec<Bytes> = client.subscribe_mjpeg("cam1").await.unwrap().collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[1][..], b"\xff\xd8BB\xff\xd9");
    }
}
