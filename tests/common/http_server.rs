//! A tiny HTTP/1.1 server for exercising the fetch and import paths.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// Send `Content-Length`; otherwise the body goes out chunked.
    pub content_length: bool,
    /// Body is written in pieces of this size.
    pub chunk_size: usize,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: true,
            chunk_size: 1024,
        }
    }

    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.content_length = false;
        self.chunk_size = chunk_size;
        self
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: true,
            chunk_size: 1024,
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn serve(routes: Vec<(&str, Route)>) -> TestServer {
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let _ = handle_connection(socket, &routes).await;
            });
        }
    });

    TestServer { addr, handle }
}

/// An address nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/records.jsonl", addr)
}

async fn handle_connection(
    mut socket: TcpStream,
    routes: &HashMap<String, Route>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }
    let request = String::from_utf8_lossy(&request);
    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));
    let reason = if route.status == 200 { "OK" } else { "Error" };
    let mut head = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", route.status, reason);
    if route.content_length {
        head.push_str(&format!("Content-Length: {}\r\n", route.body.len()));
    } else {
        head.push_str("Transfer-Encoding: chunked\r\n");
    }
    head.push_str("\r\n");
    socket.write_all(head.as_bytes()).await?;

    for piece in route.body.chunks(route.chunk_size.max(1)) {
        if route.content_length {
            socket.write_all(piece).await?;
        } else {
            socket.write_all(format!("{:x}\r\n", piece.len()).as_bytes()).await?;
            socket.write_all(piece).await?;
            socket.write_all(b"\r\n").await?;
        }
        socket.flush().await?;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    if !route.content_length {
        socket.write_all(b"0\r\n\r\n").await?;
    }
    socket.shutdown().await
}
