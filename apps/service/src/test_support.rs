//! Shared fixtures: a throwaway registry and a tiny HTTP stub server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::database::{DatabaseImpl, initialize_database};
use crate::pool::{self, LibsqlPool};

/// Registry backed by a libsql file in a temp dir
pub struct TestRegistry {
    pub database: Arc<DatabaseImpl>,
    pool: LibsqlPool,
    path: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestRegistry {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("registry.db");
        let pool = pool::connect(&path.to_string_lossy(), None, 2).await?;
        initialize_database(&*pool.get().await?).await?;

        Ok(Self {
            database: Arc::new(DatabaseImpl::new_from_pool(pool.clone(), Duration::from_secs(30))),
            pool,
            path,
            _dir: dir,
        })
    }

    pub fn path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub async fn insert(
        &self,
        id: &str,
        url: &str,
        method: &str,
        enabled: bool,
        last_checked: Option<i64>,
    ) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            "INSERT INTO monitors (id, user_id, name, url, method, timeout_seconds, enabled, last_checked) VALUES (?, 'user-1', ?, ?, ?, 5, ?, ?)",
            libsql::params![id, id, url, method, if enabled { 1 } else { 0 }, last_checked],
        )
        .await?;
        Ok(())
    }
}

/// Canned response served by `StubServer`
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub delay: Duration,
    pub location: Option<String>,
}

impl StubResponse {
    pub fn status(status: u16) -> Self {
        Self { status, delay: Duration::ZERO, location: None }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self { status: 302, delay: Duration::ZERO, location: Some(location.into()) }
    }
}

/// HTTP/1.1 server answering every request with the same response and
/// recording request bodies.
pub struct StubServer {
    pub addr: SocketAddr,
    bodies: mpsc::UnboundedReceiver<String>,
}

impl StubServer {
    pub async fn start(response: StubResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let (tx, bodies) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let response = response.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, response, tx).await;
                });
            }
        });

        Self { addr, bodies }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Bodies of all requests received so far
    pub fn received(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(body) = self.bodies.try_recv() {
            out.push(body);
        }
        out
    }
}

/// Listener that writes `payload` as soon as a connection is accepted,
/// without waiting for a request, then closes.
pub async fn eager_server(payload: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind eager listener");
    let addr = listener.local_addr().expect("eager address");

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = stream.write_all(payload).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe listener");
    listener.local_addr().expect("probe address")
}

async fn serve(
    mut stream: TcpStream,
    response: StubResponse,
    bodies: mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let _ = bodies.send(String::from_utf8_lossy(&buf[header_end..body_end]).into_owned());

    tokio::time::sleep(response.delay).await;

    let mut head = format!("HTTP/1.1 {} Stub\r\nContent-Length: 0\r\nConnection: close\r\n", response.status);
    if let Some(location) = &response.location {
        head.push_str(&format!("Location: {location}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.shutdown().await
}
