//! Raw command senders.
//!
//! Each function here performs exactly one round-trip and returns the
//! decoded reply; higher-level state such as scan cursors lives elsewhere.

pub mod scan;

use bytes::Bytes;

use crate::connection::Connection;
use crate::error::Result;
use crate::types::{ToArg, Value};

/// Execute a fully built argument vector.
pub(crate) async fn exec(conn: &mut Connection, args: Vec<Bytes>) -> Result<Value> {
    conn.execute(&args).await
}

#[inline]
pub(crate) fn arg<T: ToArg>(val: T) -> Bytes {
    val.to_arg()
}
