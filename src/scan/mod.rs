//! Cursor-based iteration over the SCAN family.
//!
//! The server keeps no per-client state for a scan: each round-trip sends
//! the last token it returned and gets back the next token plus a batch of
//! items. [`ScanCursor`] turns that protocol into a lazy pull iterator,
//! [`KeyBoundCursor`] does the same for the entries of one hash, set or
//! sorted set, and [`ScanExecutor`] is the single round-trip capability a
//! cursor is built on.
//!
//! The functions below open cursors directly on a connection. They fetch
//! the first batch before returning, so a connection in `MULTI` or pipeline
//! mode is reported right away.
//!
//! Scans inherit the server's weak guarantees: elements added or removed
//! while a scan runs may be missed or returned more than once.

mod cursor;
mod cursor_id;
mod entry;
mod executor;
mod iteration;
mod key_bound;
mod options;

pub use cursor::{CursorState, ScanCursor};
pub use cursor_id::CursorId;
pub use entry::{HashEntry, ScanItem, ScoredMember};
pub use executor::{ConnectionScanner, ScanExecutor, ScanKind};
pub use iteration::ScanIteration;
pub use key_bound::KeyBoundCursor;
pub use options::{DataType, ScanOptions, ScanOptionsBuilder};

use bytes::Bytes;
use std::ops::DerefMut;

use crate::connection::Connection;
use crate::error::Result;
use crate::types::ToArg;

/// Cursor over top-level keys.
pub type KeyCursor<C> = ScanCursor<ConnectionScanner<C, Bytes>>;

/// Cursor over the field/value pairs of a hash.
pub type HashCursor<C> = KeyBoundCursor<ConnectionScanner<C, HashEntry>>;

/// Cursor over the members of a set.
pub type SetCursor<C> = KeyBoundCursor<ConnectionScanner<C, Bytes>>;

/// Cursor over the member/score pairs of a sorted set.
pub type SortedSetCursor<C> = KeyBoundCursor<ConnectionScanner<C, ScoredMember>>;

/// Open a `SCAN` cursor over the key space.
pub async fn keys<C>(conn: C, cursor_id: CursorId, options: ScanOptions) -> Result<KeyCursor<C>>
where
    C: DerefMut<Target = Connection> + Send,
{
    let mut cursor = ScanCursor::new(
        ConnectionScanner::new(conn, ScanKind::Keys),
        cursor_id,
        options,
    );
    cursor.open().await?;
    Ok(cursor)
}

/// Open an `HSCAN` cursor over the hash stored at `key`.
pub async fn hash_entries<C>(
    conn: C,
    key: impl ToArg,
    cursor_id: CursorId,
    options: ScanOptions,
) -> Result<HashCursor<C>>
where
    C: DerefMut<Target = Connection> + Send,
{
    open_key_bound(conn, ScanKind::Hash, key.to_arg(), cursor_id, options).await
}

/// Open an `SSCAN` cursor over the set stored at `key`.
pub async fn set_members<C>(
    conn: C,
    key: impl ToArg,
    cursor_id: CursorId,
    options: ScanOptions,
) -> Result<SetCursor<C>>
where
    C: DerefMut<Target = Connection> + Send,
{
    open_key_bound(conn, ScanKind::Set, key.to_arg(), cursor_id, options).await
}

/// Open a `ZSCAN` cursor over the sorted set stored at `key`.
pub async fn sorted_set_entries<C>(
    conn: C,
    key: impl ToArg,
    cursor_id: CursorId,
    options: ScanOptions,
) -> Result<SortedSetCursor<C>>
where
    C: DerefMut<Target = Connection> + Send,
{
    open_key_bound(conn, ScanKind::SortedSet, key.to_arg(), cursor_id, options).await
}

async fn open_key_bound<C, T>(
    conn: C,
    kind: ScanKind,
    key: Bytes,
    cursor_id: CursorId,
    options: ScanOptions,
) -> Result<KeyBoundCursor<ConnectionScanner<C, T>>>
where
    C: DerefMut<Target = Connection> + Send,
    T: ScanItem,
{
    let mut cursor = KeyBoundCursor::new(key, ConnectionScanner::new(conn, kind), cursor_id, options);
    cursor.open().await?;
    Ok(cursor)
}
