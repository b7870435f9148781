//! # ferrite-scan: resumable SCAN cursors for Ferrite
//!
//! Lazy, closeable iteration over the SCAN family (`SCAN`, `HSCAN`, `SSCAN`,
//! `ZSCAN`) of [Ferrite](https://github.com/ferritelabs/ferrite) and other
//! Redis-compatible servers.
//!
//! ## Features
//!
//! - **Lazy**: one round-trip per exhausted batch, never ahead of the consumer
//! - **Opaque cursor tokens**: sent back byte-for-byte, resumable via `*_from`
//! - **Key-bound cursors**: hash fields, set members, sorted-set members with scores
//! - **Safe lifecycle**: idempotent `close()`, release on drop, errors on use after close
//! - **Mode guard**: scanning inside `MULTI` or a pipeline is rejected before any I/O
//! - **Async and blocking**: `futures::Stream` adapter and a `std::iter::Iterator` wrapper
//!
//! ## Quick Start (async)
//!
//! ```ignore
//! use ferrite_scan::{AsyncClient, ScanOptions};
//!
//! #[tokio::main]
//! async fn main() -> ferrite_scan::Result<()> {
//!     let client = AsyncClient::connect("127.0.0.1", 6379).await?;
//!
//!     let options = ScanOptions::builder().pattern("user:*").count(100).build()?;
//!     let mut cursor = client.scan(options).await?;
//!     while let Some(key) = cursor.next().await? {
//!         println!("{:?}", key);
//!     }
//!     cursor.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Quick Start (blocking)
//!
//! ```ignore
//! use ferrite_scan::{Client, ScanOptions};
//!
//! fn main() -> ferrite_scan::Result<()> {
//!     let client = Client::connect("127.0.0.1", 6379)?;
//!     for entry in client.hscan("user:1", ScanOptions::none())? {
//!         let entry = entry?;
//!         println!("{:?} = {:?}", entry.field, entry.value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod resp;
pub mod scan;
pub mod types;

// ── Re-exports for ergonomic top-level usage ────────────────────────────────

pub use client::{AsyncClient, BlockingCursor, Client};
pub use config::{ClientConfig, ScanConfig};
pub use connection::{Connection, ConnectionConfig};
pub use error::{Error, Result};
pub use pool::PoolConfig;
pub use scan::{
    CursorId, CursorState, DataType, HashEntry, KeyBoundCursor, ScanCursor, ScanExecutor,
    ScanIteration, ScanOptions, ScoredMember,
};
pub use types::{ToArg, Value};
