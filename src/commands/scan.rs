//! SCAN family senders (SCAN, HSCAN, SSCAN, ZSCAN).
//!
//! One call is one round-trip: the cursor token goes out exactly as given
//! and the token in the reply comes back untouched.

use bytes::Bytes;

use crate::commands::{arg, exec};
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::scan::{CursorId, ScanOptions};
use crate::types::{ToArg, Value};

/// SCAN cursor [MATCH pattern] [COUNT count] [TYPE type]: iterate the key space.
pub async fn scan(
    conn: &mut Connection,
    cursor_id: &CursorId,
    options: &ScanOptions,
) -> Result<(CursorId, Vec<Value>)> {
    send(conn, "SCAN", None, cursor_id, options).await
}

/// HSCAN key cursor [MATCH pattern] [COUNT count]: iterate fields of a hash.
pub async fn hscan(
    conn: &mut Connection,
    key: impl ToArg,
    cursor_id: &CursorId,
    options: &ScanOptions,
) -> Result<(CursorId, Vec<Value>)> {
    send(conn, "HSCAN", Some(arg(key)), cursor_id, options).await
}

/// SSCAN key cursor [MATCH pattern] [COUNT count]: iterate members of a set.
pub async fn sscan(
    conn: &mut Connection,
    key: impl ToArg,
    cursor_id: &CursorId,
    options: &ScanOptions,
) -> Result<(CursorId, Vec<Value>)> {
    send(conn, "SSCAN", Some(arg(key)), cursor_id, options).await
}

/// ZSCAN key cursor [MATCH pattern] [COUNT count]: iterate members of a sorted set.
pub async fn zscan(
    conn: &mut Connection,
    key: impl ToArg,
    cursor_id: &CursorId,
    options: &ScanOptions,
) -> Result<(CursorId, Vec<Value>)> {
    send(conn, "ZSCAN", Some(arg(key)), cursor_id, options).await
}

pub(crate) async fn send(
    conn: &mut Connection,
    command: &'static str,
    key: Option<Bytes>,
    cursor_id: &CursorId,
    options: &ScanOptions,
) -> Result<(CursorId, Vec<Value>)> {
    let mut args = Vec::with_capacity(3 + 6);
    args.push(Bytes::from_static(command.as_bytes()));
    args.extend(key);
    args.push(cursor_id.to_bytes());
    args.extend(options.to_args());

    let reply = exec(conn, args).await?;
    parse_reply(command, reply)
}

/// Split a `[cursor, [elements...]]` reply.
pub fn parse_reply(command: &str, reply: Value) -> Result<(CursorId, Vec<Value>)> {
    let malformed = |detail: String| Error::Protocol(format!("{} reply {}", command, detail));

    let parts = match reply {
        Value::Array(parts) => parts,
        other => return Err(malformed(format!("must be an array, got {}", other.kind()))),
    };
    let [cursor, items]: [Value; 2] = parts
        .try_into()
        .map_err(|parts: Vec<Value>| malformed(format!("must have 2 elements, got {}", parts.len())))?;

    let cursor_id = match cursor {
        Value::String(token) if !token.is_empty() => CursorId::of(token),
        Value::Integer(n) if n >= 0 => CursorId::from(n as u64),
        other => return Err(malformed(format!("has an invalid cursor: {}", other))),
    };
    let items = match items {
        Value::Array(items) => items,
        other => return Err(malformed(format!("has a non-array batch: {}", other.kind()))),
    };
    Ok((cursor_id, items))
}
