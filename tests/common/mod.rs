//! Shared helpers for the scan integration tests.
//!
//! Import via `mod common;` in integration test files:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ferrite_scan::resp::decode_value;
use ferrite_scan::{ConnectionConfig, CursorId, Error, Result, ScanExecutor, ScanIteration, ScanOptions};

// ============================================================================
// Tracing
// ============================================================================

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ferrite_scan=trace")
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Scripted RESP server
// ============================================================================

struct ServerState {
    replies: Mutex<VecDeque<(Duration, Vec<u8>)>>,
    received: Mutex<Vec<Vec<String>>>,
    accepted: AtomicUsize,
}

/// An in-process server that answers each incoming command with the next
/// canned reply and records every command it sees.
pub struct ScriptedServer {
    port: u16,
    state: Arc<ServerState>,
}

impl ScriptedServer {
    /// Bind to a random local port and start answering with `replies`.
    pub async fn start(replies: Vec<Vec<u8>>) -> Self {
        Self::start_timed(replies.into_iter().map(|r| (Duration::ZERO, r)).collect()).await
    }

    /// Like [`start`](Self::start), but each reply is held back for its delay.
    pub async fn start_timed(replies: Vec<(Duration, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind to random port");
        let port = listener.local_addr().expect("should have local addr").port();
        let state = Arc::new(ServerState {
            replies: Mutex::new(replies.into()),
            received: Mutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
        });

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_state.accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, accept_state.clone()));
            }
        });

        Self { port, state }
    }

    /// Connection settings pointing at this server.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::from_addr("127.0.0.1", self.port)
    }

    /// Every command received so far, one `Vec` of arguments per command.
    pub fn received(&self) -> Vec<Vec<String>> {
        self.state.received.lock().clone()
    }

    /// Number of commands received so far.
    pub fn round_trips(&self) -> usize {
        self.state.received.lock().len()
    }

    /// Number of TCP connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }
}

async fn serve(mut stream: TcpStream, state: Arc<ServerState>) {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        while let Some(command) = decode_value(&mut buf).expect("client should send valid RESP") {
            let args = command
                .into_array()
                .expect("command should be an array")
                .into_iter()
                .map(|arg| {
                    let raw = arg.into_bytes().expect("argument should be a bulk string");
                    String::from_utf8_lossy(&raw).into_owned()
                })
                .collect();
            state.received.lock().push(args);

            let reply = state.replies.lock().pop_front();
            match reply {
                Some((delay, reply)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if stream.write_all(&reply).await.is_err() {
                        return;
                    }
                }
                None => return,
            }
        }

        match stream.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

// ============================================================================
// Reply builders
// ============================================================================

/// Encode a bulk string.
pub fn bulk(s: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", s.len(), s).into_bytes()
}

/// Encode a `[cursor, [items...]]` scan reply.
pub fn scan_reply(cursor: &str, items: &[&str]) -> Vec<u8> {
    let mut out = b"*2\r\n".to_vec();
    out.extend(bulk(cursor));
    out.extend(format!("*{}\r\n", items.len()).into_bytes());
    for item in items {
        out.extend(bulk(item));
    }
    out
}

/// `+OK`.
pub fn ok() -> Vec<u8> {
    b"+OK\r\n".to_vec()
}

/// `-<message>`.
pub fn error(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}

/// Arguments of a command as owned strings, for comparing with
/// [`ScriptedServer::received`].
pub fn cmd(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

// ============================================================================
// Scripted executor
// ============================================================================

/// A [`ScanExecutor`] that replays canned rounds without any network.
pub struct ScriptedExecutor<T> {
    rounds: VecDeque<Result<ScanIteration<T>>>,
    /// `(key, token)` of every fetch, in call order.
    pub requests: Arc<Mutex<Vec<(Option<Bytes>, CursorId)>>>,
    /// How many times `release` ran.
    pub released: Arc<AtomicUsize>,
}

impl<T> ScriptedExecutor<T> {
    /// Rounds given as `(token, items)`.
    pub fn new(rounds: Vec<(&str, Vec<T>)>) -> Self {
        Self {
            rounds: rounds
                .into_iter()
                .map(|(token, items)| {
                    Ok(ScanIteration::new(
                        CursorId::of(Bytes::copy_from_slice(token.as_bytes())),
                        items,
                    ))
                })
                .collect(),
            requests: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Append one more successful round.
    pub fn then_round(mut self, token: &str, items: Vec<T>) -> Self {
        self.rounds.push_back(Ok(ScanIteration::new(
            CursorId::of(Bytes::copy_from_slice(token.as_bytes())),
            items,
        )));
        self
    }

    /// Append a round that fails with `err`.
    pub fn then_fail(mut self, err: Error) -> Self {
        self.rounds.push_back(Err(err));
        self
    }

    /// Number of fetches performed so far.
    pub fn fetches(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl<T: Send> ScanExecutor for ScriptedExecutor<T> {
    type Item = T;

    async fn fetch_next(
        &mut self,
        key: Option<&Bytes>,
        cursor_id: &CursorId,
        _options: &ScanOptions,
    ) -> Result<ScanIteration<T>> {
        self.requests.lock().push((key.cloned(), cursor_id.clone()));
        self.rounds
            .pop_front()
            .unwrap_or_else(|| Err(Error::Protocol("script exhausted".into())))
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
