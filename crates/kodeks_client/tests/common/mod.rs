//! Minimal in-process HTTP/1.1 server for the integration tests. Runs on its
//! own thread and runtime so both `#[test]` and `#[tokio::test]` can use it.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kodeks_client::{Client, Config};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn question(&self) -> String {
        let value: serde_json::Value = serde_json::from_str(&self.body).unwrap();
        value["question"].as_str().unwrap().to_string()
    }
}

pub enum Reply {
    /// Chunked transfer; each element is written and flushed separately.
    Chunked { status: u16, chunks: Vec<Vec<u8>> },
    Full { status: u16, body: String },
    /// Headers first, then the body after `delay`.
    SlowBody {
        status: u16,
        body: String,
        delay: Duration,
    },
}

impl Reply {
    pub fn ndjson(chunks: &[&str]) -> Self {
        Reply::Chunked {
            status: 200,
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Reply::Full {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Default)]
struct Counters {
    connections: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct StubServer {
    pub port: u16,
    counters: Arc<Counters>,
}

impl StubServer {
    pub fn start<H>(handler: H) -> Self
    where
        H: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        Self::start_with_delay(Duration::ZERO, handler)
    }

    /// Like `start`, but waits `delay` before answering each request.
    pub fn start_with_delay<H>(delay: Duration, handler: H) -> Self
    where
        H: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();
        let counters = Arc::new(Counters::default());
        let handler = Arc::new(handler);

        let server_counters = counters.clone();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                loop {
                    let Ok((tcp, _)) = listener.accept().await else {
                        continue;
                    };
                    server_counters.connections.fetch_add(1, Ordering::SeqCst);
                    let counters = server_counters.clone();
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        serve(tcp, delay, counters, handler).await;
                    });
                }
            });
        });

        StubServer { port, counters }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn client(&self) -> Client {
        client_for(&self.base_url())
    }

    pub fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.counters.requests.lock().unwrap().clone()
    }
}

pub fn client_for(base_url: &str) -> Client {
    let mut config = Config::default();
    config.api.base_url = Some(base_url.to_string());
    Client::new(&config, "test-key").unwrap()
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(tcp: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = tcp.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let len: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + len {
        let n = tcp.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + len]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

async fn serve<H>(mut tcp: TcpStream, delay: Duration, counters: Arc<Counters>, handler: Arc<H>)
where
    H: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
{
    let Some(request) = read_request(&mut tcp).await else {
        return;
    };
    let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    counters.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    counters.requests.lock().unwrap().push(request.clone());

    let reply = handler(&request);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let _ = write_reply(&mut tcp, reply).await;
    counters.in_flight.fetch_sub(1, Ordering::SeqCst);
}

async fn write_reply(tcp: &mut TcpStream, reply: Reply) -> std::io::Result<()> {
    match reply {
        Reply::Chunked { status, chunks } => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                status,
                reason(status)
            );
            tcp.write_all(head.as_bytes()).await?;
            tcp.flush().await?;
            for chunk in chunks.iter().filter(|c| !c.is_empty()) {
                tcp.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
                tcp.write_all(chunk).await?;
                tcp.write_all(b"\r\n").await?;
                tcp.flush().await?;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tcp.write_all(b"0\r\n\r\n").await?;
        }
        Reply::Full { status, body } => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                body.len()
            );
            tcp.write_all(head.as_bytes()).await?;
            tcp.write_all(body.as_bytes()).await?;
        }
        Reply::SlowBody {
            status,
            body,
            delay,
        } => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                body.len()
            );
            tcp.write_all(head.as_bytes()).await?;
            tcp.flush().await?;
            tokio::time::sleep(delay).await;
            tcp.write_all(body.as_bytes()).await?;
        }
    }
    tcp.flush().await?;
    tcp.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
