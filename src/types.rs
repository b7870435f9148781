//! Reply values and command argument conversion.

use bytes::Bytes;
use std::fmt;

use crate::error::{Error, Result, ValueKind};

/// A decoded RESP2 reply.
///
/// Error replies never become a `Value`; the decoder turns them into
/// [`Error::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A bulk string, kept as raw bytes.
    String(Bytes),

    /// A simple string such as `+OK` or `+QUEUED`.
    Status(String),

    /// An integer reply.
    Integer(i64),

    /// An array of nested replies.
    Array(Vec<Value>),

    /// A null bulk string or null array.
    Nil,
}

impl Value {
    /// Shape of this value, for error messages.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::Bulk,
            Value::Status(_) => ValueKind::Status,
            Value::Integer(_) => ValueKind::Integer,
            Value::Array(_) => ValueKind::Array,
            Value::Nil => ValueKind::Nil,
        }
    }

    /// Returns the value as a UTF-8 string slice, if it is one.
    ///
    /// # Examples
    /// ```
    /// # use ferrite_scan::types::Value;
    /// let val = Value::String(bytes::Bytes::from("hello"));
    /// assert_eq!(val.as_str(), Some("hello"));
    /// ```
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(b) => std::str::from_utf8(b).ok(),
            Value::Status(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if the value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns `true` for the `+OK` status reply.
    pub fn is_ok(&self) -> bool {
        matches!(self, Value::Status(s) if s == "OK")
    }

    /// Converts a bulk string into its raw bytes.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Value::String(b) => Ok(b),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    /// Converts the value into an `i64`.
    pub fn into_integer(self) -> Result<i64> {
        match self {
            Value::Integer(n) => Ok(n),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Converts the value into a `Vec<Value>`. A nil array becomes empty.
    pub fn into_array(self) -> Result<Vec<Value>> {
        match self {
            Value::Array(arr) => Ok(arr),
            Value::Nil => Ok(Vec::new()),
            other => Err(unexpected("array", &other)),
        }
    }
}

fn unexpected(expected: &'static str, actual: &Value) -> Error {
    Error::UnexpectedResponse {
        expected,
        actual: actual.kind().to_string(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "<binary {} bytes>", b.len()),
            },
            Value::Status(s) => write!(f, "{}", s),
            Value::Integer(n) => write!(f, "(integer) {}", n),
            Value::Array(arr) => {
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, val)?;
                }
                Ok(())
            }
            Value::Nil => write!(f, "(nil)"),
        }
    }
}

/// Types that can be sent as a command argument.
pub trait ToArg {
    /// Encode this value as a bulk string argument.
    fn to_arg(&self) -> Bytes;
}

impl ToArg for &str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl ToArg for &[u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for u64 {
    fn to_arg(&self) -> Bytes {
        Bytes::from(self.to_string())
    }
}
