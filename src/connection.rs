//! TCP connection with buffered RESP I/O.
//!
//! Besides plain request/response, a connection tracks whether it is queueing
//! commands inside `MULTI` or buffering them as a pipeline. Cursor scans
//! consult that mode before every round-trip.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resp;
use crate::types::Value;

/// Default read/write buffer size (8 KB).
const DEFAULT_BUF_SIZE: usize = 8 * 1024;

/// Where to connect and how to size the I/O buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database index to SELECT on connect.
    pub database: u8,
    /// Read/write buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            database: 0,
            buffer_size: DEFAULT_BUF_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Create a config for `host:port` with default settings.
    pub fn from_addr(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// The `host:port` string used to dial the server.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A single server connection.
pub struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    /// Inside `MULTI`; the server answers `QUEUED` until `EXEC`/`DISCARD`.
    queueing: bool,
    /// Number of commands buffered by an open pipeline, `None` when closed.
    pipeline: Option<usize>,
    /// A request went out without its complete reply being read back.
    broken: bool,
}

impl Connection {
    /// Open a new connection using the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let stream = TcpStream::connect(config.addr()).await?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream,
            read_buf: BytesMut::with_capacity(config.buffer_size),
            write_buf: BytesMut::with_capacity(config.buffer_size),
            queueing: false,
            pipeline: None,
            broken: false,
        };

        if config.database != 0 {
            let reply = conn
                .execute(&[Bytes::from("SELECT"), Bytes::from(config.database.to_string())])
                .await?;
            if !reply.is_ok() {
                return Err(Error::Protocol(format!(
                    "unexpected SELECT response: {}",
                    reply
                )));
            }
        }

        debug!(addr = %config.addr(), db = config.database, "connected");
        Ok(conn)
    }

    /// Send a command and read its reply.
    ///
    /// While a pipeline is open the command is only buffered and `Nil` is
    /// returned; the real reply comes back from [`Connection::close_pipeline`].
    ///
    /// Fails without sending anything once the connection is
    /// [broken](Connection::is_broken).
    pub async fn execute(&mut self, args: &[Bytes]) -> Result<Value> {
        if let Some(queued) = self.pipeline.as_mut() {
            resp::encode_command(args, &mut self.write_buf);
            *queued += 1;
            return Ok(Value::Nil);
        }

        self.ensure_in_sync()?;
        self.write_buf.clear();
        resp::encode_command(args, &mut self.write_buf);

        // Stays set if this future is dropped or the reply never arrives whole.
        self.broken = true;
        self.flush().await?;
        let reply = self.read_response().await;
        self.settle(&reply);
        reply
    }

    /// `true` once a request was interrupted or a reply could not be framed.
    ///
    /// The stream may then hold a stale or partial reply, so the connection
    /// must not be used again.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    fn ensure_in_sync(&self) -> Result<()> {
        if self.broken {
            return Err(Error::Protocol(
                "connection out of sync after an interrupted request".into(),
            ));
        }
        Ok(())
    }

    /// Clear the in-flight mark when a whole reply frame was read.
    fn settle(&mut self, reply: &Result<Value>) {
        if matches!(reply, Ok(_) | Err(Error::Server(_))) {
            self.broken = false;
        } else {
            debug!("connection marked broken");
        }
    }

    /// `true` while inside `MULTI`.
    pub fn is_queueing(&self) -> bool {
        self.queueing
    }

    /// `true` while a pipeline is open.
    pub fn is_pipelined(&self) -> bool {
        self.pipeline.is_some()
    }

    /// `true` if either a transaction or a pipeline is in progress.
    pub fn is_in_transaction_or_pipeline(&self) -> bool {
        self.is_queueing() || self.is_pipelined()
    }

    /// MULTI: start queueing commands for a transaction.
    pub async fn multi(&mut self) -> Result<()> {
        if self.queueing {
            return Err(Error::InvalidOperation(
                "MULTI calls can not be nested".into(),
            ));
        }
        let reply = self.execute(&[Bytes::from("MULTI")]).await?;
        if !reply.is_ok() && !self.is_pipelined() {
            return Err(Error::Protocol(format!("unexpected MULTI response: {}", reply)));
        }
        self.queueing = true;
        debug!("transaction started");
        Ok(())
    }

    /// EXEC: run the queued transaction and return its replies.
    pub async fn exec(&mut self) -> Result<Value> {
        self.require_queueing("EXEC")?;
        self.queueing = false;
        debug!("transaction executed");
        self.execute(&[Bytes::from("EXEC")]).await
    }

    /// DISCARD: drop the queued transaction.
    pub async fn discard(&mut self) -> Result<()> {
        self.require_queueing("DISCARD")?;
        self.queueing = false;
        debug!("transaction discarded");
        self.execute(&[Bytes::from("DISCARD")]).await.map(drop)
    }

    fn require_queueing(&self, command: &str) -> Result<()> {
        if self.queueing {
            Ok(())
        } else {
            Err(Error::InvalidOperation(format!("{} without MULTI", command)))
        }
    }

    /// Start buffering commands instead of sending them one by one.
    pub fn open_pipeline(&mut self) {
        if self.pipeline.is_none() {
            self.write_buf.clear();
            self.pipeline = Some(0);
            debug!("pipeline opened");
        }
    }

    /// Flush every buffered command and read their replies in order.
    ///
    /// All replies are drained even when some of them are errors, so the
    /// connection stays in sync; the per-command outcome is returned.
    pub async fn close_pipeline(&mut self) -> Result<Vec<Result<Value>>> {
        let Some(queued) = self.pipeline.take() else {
            return Ok(Vec::new());
        };
        debug!(commands = queued, "pipeline closed");
        if queued == 0 {
            return Ok(Vec::new());
        }

        self.ensure_in_sync()?;
        self.broken = true;
        self.flush().await?;
        let mut replies = Vec::with_capacity(queued);
        for _ in 0..queued {
            match self.read_response().await {
                Err(Error::Server(msg)) => replies.push(Err(Error::Server(msg))),
                other => replies.push(Ok(other?)),
            }
        }
        self.broken = false;
        Ok(replies)
    }

    async fn flush(&mut self) -> Result<()> {
        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;
        self.write_buf.clear();
        Ok(())
    }

    /// Read a single reply from the connection.
    async fn read_response(&mut self) -> Result<Value> {
        loop {
            if let Some(value) = resp::decode_value(&mut self.read_buf)? {
                return Ok(value);
            }

            if self.stream.read_buf(&mut self.read_buf).await? == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.stream.peer_addr().ok())
            .field("queueing", &self.queueing)
            .field("pipeline", &self.pipeline)
            .field("broken", &self.broken)
            .finish()
    }
}
