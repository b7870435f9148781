//! Async and blocking clients exposing the scan entry points.
//!
//! Every scan checks a connection out of the client's pool and holds it for
//! the lifetime of the cursor. Closing (or dropping) the cursor gives the
//! connection back.

use bytes::Bytes;

use crate::config::{ClientConfig, ScanConfig};
use crate::connection::ConnectionConfig;
use crate::error::{Error, Result};
use crate::pool::{Pool, PoolConfig, PooledConnection};
use crate::scan::{
    self, CursorId, HashCursor, KeyCursor, ScanCursor, ScanExecutor, ScanOptions, SetCursor,
    SortedSetCursor,
};
use crate::types::ToArg;

/// An asynchronous scan client.
///
/// # Examples
///
/// ```ignore
/// use ferrite_scan::{AsyncClient, ScanOptions};
///
/// let client = AsyncClient::connect("127.0.0.1", 6379).await?;
/// let options = ScanOptions::builder().pattern("user:*").count(100).build()?;
/// let mut cursor = client.scan(options).await?;
/// while let Some(key) = cursor.next().await? {
///     println!("{:?}", key);
/// }
/// cursor.close();
/// ```
pub struct AsyncClient {
    pool: Pool,
    scan: ScanConfig,
}

impl AsyncClient {
    /// Client for `host:port` with default settings.
    pub async fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::connect_with(ClientConfig {
            connection: ConnectionConfig::from_addr(host, port),
            ..Default::default()
        })
        .await
    }

    /// Client from a full [`ClientConfig`].
    ///
    /// Connections are opened lazily, on the first scan.
    pub async fn connect_with(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: Pool::new(config.connection, config.pool),
            scan: config.scan,
        })
    }

    /// Pool backing this client.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    fn options(&self, options: ScanOptions) -> ScanOptions {
        options.with_default_count(self.scan.default_count)
    }

    // ── Key space ───────────────────────────────────────────────────────

    /// SCAN: iterate the whole key space.
    pub async fn scan(&self, options: ScanOptions) -> Result<KeyCursor<PooledConnection<'_>>> {
        self.scan_from(CursorId::initial(), options).await
    }

    /// SCAN resuming at a token returned by an earlier cursor.
    pub async fn scan_from(
        &self,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<KeyCursor<PooledConnection<'_>>> {
        let conn = self.pool.get().await?;
        scan::keys(conn, cursor_id, self.options(options)).await
    }

    // ── Key bound ───────────────────────────────────────────────────────

    /// HSCAN: iterate the fields and values of the hash at `key`.
    pub async fn hscan(
        &self,
        key: impl ToArg,
        options: ScanOptions,
    ) -> Result<HashCursor<PooledConnection<'_>>> {
        self.hscan_from(key, CursorId::initial(), options).await
    }

    /// HSCAN resuming at a known token.
    pub async fn hscan_from(
        &self,
        key: impl ToArg,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<HashCursor<PooledConnection<'_>>> {
        let conn = self.pool.get().await?;
        scan::hash_entries(conn, key, cursor_id, self.options(options)).await
    }

    /// SSCAN: iterate the members of the set at `key`.
    pub async fn sscan(
        &self,
        key: impl ToArg,
        options: ScanOptions,
    ) -> Result<SetCursor<PooledConnection<'_>>> {
        self.sscan_from(key, CursorId::initial(), options).await
    }

    /// SSCAN resuming at a known token.
    pub async fn sscan_from(
        &self,
        key: impl ToArg,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<SetCursor<PooledConnection<'_>>> {
        let conn = self.pool.get().await?;
        scan::set_members(conn, key, cursor_id, self.options(options)).await
    }

    /// ZSCAN: iterate the members and scores of the sorted set at `key`.
    pub async fn zscan(
        &self,
        key: impl ToArg,
        options: ScanOptions,
    ) -> Result<SortedSetCursor<PooledConnection<'_>>> {
        self.zscan_from(key, CursorId::initial(), options).await
    }

    /// ZSCAN resuming at a known token.
    pub async fn zscan_from(
        &self,
        key: impl ToArg,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<SortedSetCursor<PooledConnection<'_>>> {
        let conn = self.pool.get().await?;
        scan::sorted_set_entries(conn, key, cursor_id, self.options(options)).await
    }
}

/// A blocking scan client.
///
/// Owns a single-threaded Tokio runtime and drives [`AsyncClient`] on it.
/// Cursors come back as [`BlockingCursor`], a plain [`Iterator`].
///
/// ```ignore
/// use ferrite_scan::{Client, ScanOptions};
///
/// let client = Client::connect("127.0.0.1", 6379)?;
/// for key in client.scan(ScanOptions::none())? {
///     println!("{:?}", key?);
/// }
/// ```
pub struct Client {
    inner: AsyncClient,
    rt: tokio::runtime::Runtime,
}

impl Client {
    /// Client for `host:port` with default settings.
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::connect_with(ClientConfig {
            connection: ConnectionConfig::from_addr(host, port),
            ..Default::default()
        })
    }

    /// Client from a full [`ClientConfig`].
    pub fn connect_with(config: ClientConfig) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Io)?;
        let inner = rt.block_on(AsyncClient::connect_with(config))?;
        Ok(Self { inner, rt })
    }

    /// Client with a single connection, e.g. for scripts.
    pub fn connect_single(connection: ConnectionConfig) -> Result<Self> {
        Self::connect_with(ClientConfig {
            connection,
            pool: PoolConfig { max_size: 1 },
            ..Default::default()
        })
    }

    /// SCAN: iterate the whole key space.
    pub fn scan(
        &self,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, KeyCursorExecutor<'_>>> {
        self.scan_from(CursorId::initial(), options)
    }

    /// SCAN resuming at a known token.
    pub fn scan_from(
        &self,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, KeyCursorExecutor<'_>>> {
        let cursor = self.rt.block_on(self.inner.scan_from(cursor_id, options))?;
        Ok(BlockingCursor::new(&self.rt, cursor))
    }

    /// HSCAN: iterate the fields and values of the hash at `key`.
    pub fn hscan(
        &self,
        key: impl ToArg,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, HashCursorExecutor<'_>>> {
        self.hscan_from(key, CursorId::initial(), options)
    }

    /// HSCAN resuming at a known token.
    pub fn hscan_from(
        &self,
        key: impl ToArg,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, HashCursorExecutor<'_>>> {
        let cursor = self
            .rt
            .block_on(self.inner.hscan_from(key, cursor_id, options))?;
        Ok(BlockingCursor::new(&self.rt, cursor.into_inner()))
    }

    /// SSCAN: iterate the members of the set at `key`.
    pub fn sscan(
        &self,
        key: impl ToArg,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, SetCursorExecutor<'_>>> {
        self.sscan_from(key, CursorId::initial(), options)
    }

    /// SSCAN resuming at a known token.
    pub fn sscan_from(
        &self,
        key: impl ToArg,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, SetCursorExecutor<'_>>> {
        let cursor = self
            .rt
            .block_on(self.inner.sscan_from(key, cursor_id, options))?;
        Ok(BlockingCursor::new(&self.rt, cursor.into_inner()))
    }

    /// ZSCAN: iterate the members and scores of the sorted set at `key`.
    pub fn zscan(
        &self,
        key: impl ToArg,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, SortedSetCursorExecutor<'_>>> {
        self.zscan_from(key, CursorId::initial(), options)
    }

    /// ZSCAN resuming at a known token.
    pub fn zscan_from(
        &self,
        key: impl ToArg,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Result<BlockingCursor<'_, SortedSetCursorExecutor<'_>>> {
        let cursor = self
            .rt
            .block_on(self.inner.zscan_from(key, cursor_id, options))?;
        Ok(BlockingCursor::new(&self.rt, cursor.into_inner()))
    }
}

/// Executor behind [`Client::scan`].
pub type KeyCursorExecutor<'a> = scan::ConnectionScanner<PooledConnection<'a>, Bytes>;
/// Executor behind [`Client::hscan`].
pub type HashCursorExecutor<'a> = scan::ConnectionScanner<PooledConnection<'a>, scan::HashEntry>;
/// Executor behind [`Client::sscan`].
pub type SetCursorExecutor<'a> = scan::ConnectionScanner<PooledConnection<'a>, Bytes>;
/// Executor behind [`Client::zscan`].
pub type SortedSetCursorExecutor<'a> =
    scan::ConnectionScanner<PooledConnection<'a>, scan::ScoredMember>;

/// A [`ScanCursor`] driven to completion on a blocking runtime.
///
/// Yields `Err` for a failed round-trip; iteration may be resumed after a
/// transport error. Dropping the iterator closes the cursor.
pub struct BlockingCursor<'r, E: ScanExecutor> {
    rt: &'r tokio::runtime::Runtime,
    cursor: ScanCursor<E>,
}

impl<'r, E: ScanExecutor> BlockingCursor<'r, E> {
    fn new(rt: &'r tokio::runtime::Runtime, cursor: ScanCursor<E>) -> Self {
        Self { rt, cursor }
    }

    /// Close the cursor and release its connection. Idempotent.
    pub fn close(&mut self) {
        self.cursor.close();
    }

    /// Blocking [`ScanCursor::next_page`].
    pub fn next_page(&mut self, limit: usize) -> Result<Vec<E::Item>> {
        self.rt.block_on(self.cursor.next_page(limit))
    }

    /// The underlying async cursor.
    pub fn cursor(&self) -> &ScanCursor<E> {
        &self.cursor
    }
}

impl<E: ScanExecutor> Iterator for BlockingCursor<'_, E> {
    type Item = Result<E::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rt.block_on(self.cursor.next()).transpose()
    }
}
