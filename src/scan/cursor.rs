use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

use super::{CursorId, ScanExecutor, ScanOptions};
use crate::error::{Error, Result};

/// Lifecycle of a [`ScanCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Constructed, no round-trip yet.
    Created,
    /// Opened; items may still arrive.
    Open,
    /// The server finished the scan and every item has been delivered.
    Exhausted,
    /// Closed; the executor has been released.
    Closed,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CursorState::Created => "created",
            CursorState::Open => "open",
            CursorState::Exhausted => "exhausted",
            CursorState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A lazy, resumable iterator over a server-side scan.
///
/// Items are buffered per round-trip and handed out one at a time. A new
/// round-trip happens only when the buffer is empty and the server has not
/// yet returned the terminal token. Items come out exactly in the order the
/// server sent them; duplicates that the server produces under concurrent
/// writes are passed through.
///
/// The cursor is meant for one owner pulling sequentially. Closing releases
/// the executor; dropping the cursor closes it.
pub struct ScanCursor<E: ScanExecutor> {
    executor: Option<E>,
    key: Option<Bytes>,
    options: ScanOptions,
    cursor_id: CursorId,
    pending: VecDeque<E::Item>,
    state: CursorState,
    /// The server has returned the terminal token.
    finished: bool,
    position: u64,
    round_trips: u64,
}

impl<E: ScanExecutor> ScanCursor<E> {
    /// A key-space cursor starting at `cursor_id`. Call [`open`](Self::open)
    /// before pulling.
    pub fn new(executor: E, cursor_id: CursorId, options: ScanOptions) -> Self {
        Self::with_key(executor, None, cursor_id, options)
    }

    pub(crate) fn with_key(
        executor: E,
        key: Option<Bytes>,
        cursor_id: CursorId,
        options: ScanOptions,
    ) -> Self {
        Self {
            executor: Some(executor),
            key,
            options,
            cursor_id,
            pending: VecDeque::new(),
            state: CursorState::Created,
            finished: false,
            position: 0,
            round_trips: 0,
        }
    }

    /// Open the cursor and fetch the first batch.
    ///
    /// Fails with [`Error::IllegalState`] unless the cursor is freshly
    /// created. If the first fetch fails the cursor stays open with nothing
    /// fetched, so a later pull retries from the starting token.
    pub async fn open(&mut self) -> Result<()> {
        if self.state != CursorState::Created {
            return Err(Error::IllegalState(format!(
                "cursor already {}; cannot (re)open it",
                self.state
            )));
        }
        self.state = CursorState::Open;
        debug!(key = ?self.key, cursor = %self.cursor_id, "opening scan cursor");
        self.fetch().await
    }

    /// `true` if another item is available, fetching as many rounds as
    /// needed to find one. Rounds that return an empty batch with a
    /// non-terminal token are followed by another round.
    pub async fn has_next(&mut self) -> Result<bool> {
        self.assert_open()?;
        loop {
            if !self.pending.is_empty() {
                return Ok(true);
            }
            if self.finished {
                self.state = CursorState::Exhausted;
                return Ok(false);
            }
            self.fetch().await?;
        }
    }

    /// The next item, or `None` once the scan is exhausted.
    pub async fn next(&mut self) -> Result<Option<E::Item>> {
        if !self.has_next().await? {
            return Ok(None);
        }
        let item = self.pending.pop_front();
        if item.is_some() {
            self.position += 1;
        }
        Ok(item)
    }

    /// Pull every remaining item.
    pub async fn collect_remaining(&mut self) -> Result<Vec<E::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Pull up to `limit` items, then the rest of the batch the last one
    /// came from.
    ///
    /// Afterwards nothing is buffered, so [`cursor_id`](Self::cursor_id) is
    /// the exact point to resume from. The page is longer than `limit` when
    /// the limit falls inside a batch and shorter when the scan ends first.
    pub async fn next_page(&mut self, limit: usize) -> Result<Vec<E::Item>> {
        self.assert_open()?;
        let mut items = Vec::new();
        while items.len() < limit {
            match self.next().await? {
                Some(item) => items.push(item),
                None => return Ok(items),
            }
        }
        self.position += self.pending.len() as u64;
        items.extend(self.pending.drain(..));
        Ok(items)
    }

    /// Close the cursor and release its executor. Safe to call repeatedly;
    /// only the first call has an effect.
    pub fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }
        self.state = CursorState::Closed;
        self.pending.clear();
        if let Some(mut executor) = self.executor.take() {
            executor.release();
        }
        debug!(
            key = ?self.key,
            position = self.position,
            round_trips = self.round_trips,
            "scan cursor closed"
        );
    }

    /// Turn the cursor into a stream of items. Dropping the stream closes
    /// the cursor.
    pub fn into_stream(self) -> impl Stream<Item = Result<E::Item>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let item = cursor.next().await?;
            Ok::<_, Error>(item.map(|item| (item, cursor)))
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// The last token received (or the starting token before the first
    /// round-trip). Pass it to a `*_from` entry point to resume later.
    pub fn cursor_id(&self) -> &CursorId {
        &self.cursor_id
    }

    /// Number of items handed out so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Items fetched but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Number of successful round-trips so far.
    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }

    /// Container key for key-bound scans.
    pub fn key(&self) -> Option<&Bytes> {
        self.key.as_ref()
    }

    /// Options sent with every round-trip.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn assert_open(&self) -> Result<()> {
        match self.state {
            CursorState::Open | CursorState::Exhausted => Ok(()),
            CursorState::Created => Err(Error::IllegalState(
                "cursor has not been opened".into(),
            )),
            CursorState::Closed => Err(Error::IllegalState(
                "cannot access a closed cursor".into(),
            )),
        }
    }

    /// One round-trip. On failure nothing about the cursor changes.
    async fn fetch(&mut self) -> Result<()> {
        let executor = self
            .executor
            .as_mut()
            .ok_or_else(|| Error::IllegalState("cannot access a closed cursor".into()))?;
        let iteration = executor
            .fetch_next(self.key.as_ref(), &self.cursor_id, &self.options)
            .await?;

        let (cursor_id, items) = iteration.into_parts();
        self.round_trips += 1;
        self.finished = cursor_id.is_finished();
        self.cursor_id = cursor_id;
        self.pending.extend(items);
        Ok(())
    }
}

impl<E: ScanExecutor> Drop for ScanCursor<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: ScanExecutor> fmt::Debug for ScanCursor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanCursor")
            .field("key", &self.key)
            .field("cursor_id", &self.cursor_id)
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("position", &self.position)
            .finish()
    }
}
