//! A one-shot HTTP server standing in for the chat completions endpoint.

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// The request as the server saw it.
pub struct Captured {
    pub head: String,
    pub body: serde_json::Value,
}

impl Captured {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Serve exactly one request, replying with `status`, `content_type` and `body`.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    extra_headers: &'static str,
    body: String,
) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8(buf[..header_end].to_vec()).unwrap();
        let length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().unwrap())
            })
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body was complete");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\n{extra_headers}\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        Captured {
            head,
            body: request_body,
        }
    });
    (format!("http://{addr}"), handle)
}

pub fn sse(fragments: &[&str]) -> String {
    let mut body = String::new();
    let mut event = |choice: serde_json::Value| {
        let chunk = serde_json::json!({"id": "chatcmpl-1", "choices": [choice]});
        body.push_str(&format!("data: {chunk}\n\n"));
    };
    event(serde_json::json!({"index": 0, "delta": {"role": "assistant"}}));
    for fragment in fragments {
        event(serde_json::json!({"index": 0, "delta": {"content": fragment}}));
    }
    event(serde_json::json!({"index": 0, "delta": {}, "finish_reason": "stop"}));
    body.push_str("data: [DONE]\n\n");
    body
}
