//! Connection checkout.
//!
//! Connections are created lazily up to `max_size` and handed out behind a
//! guard. Dropping the guard releases the connection back to the pool, which
//! is how a scan cursor gives up its connection when it is closed.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::connection::{Connection, ConnectionConfig};
use crate::error::{Error, Result};

/// Sizing for the connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of connections checked out at once.
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_size: 8 }
    }
}

/// A pool of reusable connections.
pub struct Pool {
    config: ConnectionConfig,
    idle: parking_lot::Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    max_size: usize,
}

impl Pool {
    /// Create an empty pool; no connection is opened until the first checkout.
    pub fn new(connection: ConnectionConfig, config: PoolConfig) -> Self {
        Self {
            config: connection,
            idle: parking_lot::Mutex::new(Vec::with_capacity(config.max_size)),
            permits: Arc::new(Semaphore::new(config.max_size)),
            max_size: config.max_size,
        }
    }

    /// Check out a connection, waiting for a permit if all are in use.
    pub async fn get(&self) -> Result<PooledConnection<'_>> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolExhausted {
                max_size: self.max_size,
            })?;

        let reused = self.idle.lock().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => Connection::connect(&self.config).await?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    /// Number of idle connections waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of connections that could be checked out right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn put_back(&self, conn: Connection) {
        // A connection mid-transaction or mid-pipeline would leak that state
        // into the next checkout.
        if conn.is_in_transaction_or_pipeline() {
            warn!(?conn, "discarding connection returned in transaction/pipeline mode");
            return;
        }
        if conn.is_broken() {
            warn!(?conn, "discarding connection with an unfinished or unreadable reply");
            return;
        }
        self.idle.lock().push(conn);
    }
}

/// A connection checked out from a [`Pool`], returned to it on drop.
pub struct PooledConnection<'a> {
    conn: Option<Connection>,
    pool: &'a Pool,
    _permit: OwnedSemaphorePermit,
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the connection out.
        self.conn.as_ref().expect("pooled connection already released")
    }
}

impl std::ops::DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("pooled connection already released")
    }
}
