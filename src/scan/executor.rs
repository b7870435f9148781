use async_trait::async_trait;
use bytes::Bytes;
use std::marker::PhantomData;
use std::ops::DerefMut;
use tracing::trace;

use super::{CursorId, ScanItem, ScanIteration, ScanOptions};
use crate::commands;
use crate::connection::Connection;
use crate::error::{Error, Result};

/// Performs one scan round-trip on behalf of a cursor.
///
/// A cursor owns exactly one executor and never calls it concurrently.
#[async_trait]
pub trait ScanExecutor: Send {
    /// Item produced by each round.
    type Item: Send;

    /// Fetch the batch that follows `cursor_id`.
    ///
    /// `key` is the container key for hash/set/sorted-set scans and `None`
    /// for key-space scans. Errors are returned unchanged; nothing is retried.
    async fn fetch_next(
        &mut self,
        key: Option<&Bytes>,
        cursor_id: &CursorId,
        options: &ScanOptions,
    ) -> Result<ScanIteration<Self::Item>>;

    /// Give back whatever the executor holds for the duration of the scan.
    /// Called at most once, when the cursor closes.
    fn release(&mut self) {}
}

/// Which member of the SCAN family a cursor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// `SCAN` over the whole key space.
    Keys,
    /// `HSCAN` over one hash.
    Hash,
    /// `SSCAN` over one set.
    Set,
    /// `ZSCAN` over one sorted set.
    SortedSet,
}

impl ScanKind {
    /// Command name on the wire.
    pub fn command(&self) -> &'static str {
        match self {
            ScanKind::Keys => "SCAN",
            ScanKind::Hash => "HSCAN",
            ScanKind::Set => "SSCAN",
            ScanKind::SortedSet => "ZSCAN",
        }
    }

    /// `true` when the command takes a container key.
    pub fn is_key_bound(&self) -> bool {
        !matches!(self, ScanKind::Keys)
    }
}

/// [`ScanExecutor`] that sends the SCAN family over a [`Connection`].
///
/// `C` is anything that dereferences to a connection: a `&mut Connection`
/// the caller keeps, or a [`PooledConnection`](crate::pool::PooledConnection)
/// that goes back to its pool once the cursor is closed and dropped.
pub struct ConnectionScanner<C, T> {
    conn: C,
    kind: ScanKind,
    _item: PhantomData<fn() -> T>,
}

impl<C, T> ConnectionScanner<C, T>
where
    C: DerefMut<Target = Connection> + Send,
    T: ScanItem,
{
    /// Drive `kind` scans over `conn`.
    pub fn new(conn: C, kind: ScanKind) -> Self {
        Self {
            conn,
            kind,
            _item: PhantomData,
        }
    }

    /// The command this scanner sends.
    pub fn kind(&self) -> ScanKind {
        self.kind
    }

    fn check_request(&self, key: Option<&Bytes>, options: &ScanOptions) -> Result<()> {
        let command = self.kind.command();
        if self.conn.is_in_transaction_or_pipeline() {
            return Err(Error::InvalidOperation(format!(
                "'{}' cannot be called in pipeline / transaction mode",
                command
            )));
        }
        if self.kind.is_key_bound() != key.is_some() {
            return Err(Error::InvalidArgument(format!(
                "'{}' {} a container key",
                command,
                if self.kind.is_key_bound() { "requires" } else { "does not take" }
            )));
        }
        if self.kind.is_key_bound() && options.data_type().is_some() {
            return Err(Error::InvalidArgument(format!(
                "'{}' does not support a TYPE filter",
                command
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<C, T> ScanExecutor for ConnectionScanner<C, T>
where
    C: DerefMut<Target = Connection> + Send,
    T: ScanItem,
{
    type Item = T;

    async fn fetch_next(
        &mut self,
        key: Option<&Bytes>,
        cursor_id: &CursorId,
        options: &ScanOptions,
    ) -> Result<ScanIteration<T>> {
        self.check_request(key, options)?;

        let command = self.kind.command();
        let (next, values) =
            commands::scan::send(&mut self.conn, command, key.cloned(), cursor_id, options)
                .await?;
        trace!(command, cursor = %cursor_id, next = %next, batch = values.len(), "scan round-trip");

        let items = T::from_batch(values)?;
        Ok(ScanIteration::new(next, items))
    }

    fn release(&mut self) {
        trace!(command = self.kind.command(), "releasing scan connection");
    }
}
