//! Minimal loopback HTTP responder for exercising the reqwest-backed clients.

use std::time::Duration;

use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned response: status line, content type, and body pieces written with a
/// short pause between them so the client sees several chunks.
pub(crate) struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<String>,
}

impl Canned {
    pub fn ok(content_type: &'static str, body: Vec<String>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }
}

/// Serves one connection per canned response, in order.
///
/// The join handle yields the raw request bodies that were received.
pub(crate) async fn serve(responses: Vec<Canned>) -> (url::Url, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let mut bodies = Vec::new();
        for canned in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            bodies.push(read_request_body(&mut socket).await);
            let head = format!(
                "HTTP/1.1 {} X\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
                canned.status, canned.content_type
            );
            socket.write_all(head.as_bytes()).await.expect("write head");
            for piece in canned.body {
                socket.write_all(piece.as_bytes()).await.expect("write body");
                socket.flush().await.expect("flush");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = socket.shutdown().await;
        }
        bodies
    });
    let url = url::Url::parse(&format!("http://{addr}/")).expect("loopback url");
    (url, handle)
}

/// Address that refuses connections.
pub(crate) async fn closed_port_url() -> url::Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    url::Url::parse(&format!("http://{addr}/")).expect("closed url")
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf[header_end..]).into_owned()
}
