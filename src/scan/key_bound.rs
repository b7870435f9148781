use bytes::Bytes;
use futures::Stream;
use std::ops::{Deref, DerefMut};

use super::{CursorId, ScanCursor, ScanExecutor, ScanOptions};
use crate::error::Result;

/// A [`ScanCursor`] pinned to one container key.
///
/// Every round-trip carries the same hash, set or sorted-set key, and the
/// items are entries of that container rather than top-level keys. The key
/// is fixed at construction. All cursor operations are available through
/// `Deref`.
pub struct KeyBoundCursor<E: ScanExecutor> {
    key: Bytes,
    inner: ScanCursor<E>,
}

impl<E: ScanExecutor> KeyBoundCursor<E> {
    /// A cursor over the entries stored under `key`, starting at `cursor_id`.
    pub fn new(key: Bytes, executor: E, cursor_id: CursorId, options: ScanOptions) -> Self {
        Self {
            inner: ScanCursor::with_key(executor, Some(key.clone()), cursor_id, options),
            key,
        }
    }

    /// The container key this cursor scans.
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    /// Unwrap into the plain cursor.
    pub fn into_inner(self) -> ScanCursor<E> {
        self.inner
    }

    /// Turn the cursor into a stream of entries.
    pub fn into_stream(self) -> impl Stream<Item = Result<E::Item>> {
        self.inner.into_stream()
    }
}

impl<E: ScanExecutor> Deref for KeyBoundCursor<E> {
    type Target = ScanCursor<E>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<E: ScanExecutor> DerefMut for KeyBoundCursor<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<E: ScanExecutor> std::fmt::Debug for KeyBoundCursor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyBoundCursor").field(&self.inner).finish()
    }
}
