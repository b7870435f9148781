//! RESP2 command encoder and reply decoder.
//!
//! Commands go out as arrays of bulk strings. Replies are decoded in a single
//! pass over the read buffer; a frame is only consumed once it is complete.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::types::Value;

/// A fully parsed reply: a value, or the message of an error reply.
type Reply = std::result::Result<Value, String>;

/// Deepest array nesting accepted in a reply.
const MAX_DEPTH: usize = 32;

/// Append a command to `buf` as a RESP2 array of bulk strings.
///
/// ```text
/// *2\r\n$4\r\nSCAN\r\n$1\r\n0\r\n
/// ```
pub fn encode_command(args: &[Bytes], buf: &mut BytesMut) {
    put_header(buf, b'*', args.len());
    for arg in args {
        put_header(buf, b'$', arg.len());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}

fn put_header(buf: &mut BytesMut, tag: u8, len: usize) {
    buf.put_u8(tag);
    buf.put_slice(len.to_string().as_bytes());
    buf.put_slice(b"\r\n");
}

/// Decode one reply from the front of `buf`.
///
/// Returns `Ok(None)` when more bytes are needed. A complete error reply is
/// consumed from the buffer and surfaced as [`Error::Server`], so the next
/// call starts at the following frame.
pub fn decode_value(buf: &mut BytesMut) -> Result<Option<Value>> {
    let Some((reply, consumed)) = parse(&buf[..], 0, 0)? else {
        return Ok(None);
    };
    buf.advance(consumed);
    reply.map(Some).map_err(Error::Server)
}

/// Parse the frame starting at `start`, returning it with its end offset.
fn parse(buf: &[u8], start: usize, depth: usize) -> Result<Option<(Reply, usize)>> {
    let Some(&tag) = buf.get(start) else {
        return Ok(None);
    };
    let Some((line, next)) = read_line(buf, start + 1) else {
        return Ok(None);
    };

    match tag {
        b'+' => Ok(Some((Ok(Value::Status(utf8(line)?)), next))),
        b'-' => Ok(Some((Err(utf8(line)?), next))),
        b':' => Ok(Some((Ok(Value::Integer(decimal(line)?)), next))),
        b'$' => {
            let Some(len) = length(line, "bulk string")? else {
                return Ok(Some((Ok(Value::Nil), next)));
            };
            let end = next + len;
            if buf.len() < end + 2 {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(Error::Protocol("expected CRLF after bulk string".into()));
            }
            let data = Bytes::copy_from_slice(&buf[next..end]);
            Ok(Some((Ok(Value::String(data)), end + 2)))
        }
        b'*' => {
            let Some(count) = length(line, "array")? else {
                return Ok(Some((Ok(Value::Nil), next)));
            };
            if depth >= MAX_DEPTH {
                return Err(Error::Protocol(format!(
                    "reply nested deeper than {} levels",
                    MAX_DEPTH
                )));
            }
            let mut items = Vec::with_capacity(count.min(1024));
            let mut first_error = None;
            let mut pos = next;
            for _ in 0..count {
                let Some((reply, end)) = parse(buf, pos, depth + 1)? else {
                    return Ok(None);
                };
                pos = end;
                match reply {
                    Ok(value) => items.push(value),
                    Err(msg) => {
                        first_error.get_or_insert(msg);
                    }
                }
            }
            let reply = match first_error {
                Some(msg) => Err(msg),
                None => Ok(Value::Array(items)),
            };
            Ok(Some((reply, pos)))
        }
        byte => Err(Error::Protocol(format!("unexpected byte: 0x{:02x}", byte))),
    }
}

/// Find the CRLF-terminated line starting at `start`.
fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(start..)?;
    let idx = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..idx], start + idx + 2))
}

fn utf8(line: &[u8]) -> Result<String> {
    String::from_utf8(line.to_vec()).map_err(|e| Error::Protocol(format!("invalid UTF-8: {}", e)))
}

fn decimal(line: &[u8]) -> Result<i64> {
    let s = std::str::from_utf8(line)
        .map_err(|_| Error::Protocol("invalid UTF-8 in integer".into()))?;
    s.parse::<i64>()
        .map_err(|_| Error::Protocol(format!("invalid integer: {}", s)))
}

/// Decode a length header; `-1` is the null marker.
fn length(line: &[u8], what: &str) -> Result<Option<usize>> {
    match decimal(line)? {
        -1 => Ok(None),
        n => usize::try_from(n)
            .map(Some)
            .map_err(|_| Error::Protocol(format!("negative {} length", what))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scan_command() {
        let args = vec![
            Bytes::from("SCAN"),
            Bytes::from("0"),
            Bytes::from("MATCH"),
            Bytes::from("user:*"),
        ];
        let mut buf = BytesMut::new();
        encode_command(&args, &mut buf);
        assert_eq!(
            &buf[..],
            b"*4\r\n$4\r\nSCAN\r\n$1\r\n0\r\n$5\r\nMATCH\r\n$6\r\nuser:*\r\n"
        );
    }

    #[test]
    fn test_decode_status_and_integer() {
        let mut buf = BytesMut::from("+OK\r\n:42\r\n");
        assert!(decode_value(&mut buf).unwrap().unwrap().is_ok());
        assert_eq!(decode_value(&mut buf).unwrap(), Some(Value::Integer(42)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_error_reply_is_consumed() {
        let mut buf = BytesMut::from("-ERR unknown\r\n+OK\r\n");
        match decode_value(&mut buf).unwrap_err() {
            Error::Server(msg) => assert_eq!(msg, "ERR unknown"),
            other => panic!("expected Server error, got {other:?}"),
        }
        assert!(decode_value(&mut buf).unwrap().unwrap().is_ok());
    }

    #[test]
    fn test_decode_scan_reply() {
        let mut buf = BytesMut::from("*2\r\n$3\r\n117\r\n*2\r\n$6\r\nuser:1\r\n$6\r\nuser:2\r\n");
        let val = decode_value(&mut buf).unwrap().unwrap();
        assert_eq!(
            val,
            Value::Array(vec![
                Value::String(Bytes::from("117")),
                Value::Array(vec![
                    Value::String(Bytes::from("user:1")),
                    Value::String(Bytes::from("user:2")),
                ]),
            ])
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_binary_bulk_string() {
        let mut buf = BytesMut::from(&b"$4\r\n\x00\r\n\xff\r\n"[..]);
        let val = decode_value(&mut buf).unwrap().unwrap();
        assert_eq!(val, Value::String(Bytes::from_static(b"\x00\r\n\xff")));
    }

    #[test]
    fn test_nulls() {
        let mut buf = BytesMut::from("$-1\r\n*-1\r\n");
        assert_eq!(decode_value(&mut buf).unwrap(), Some(Value::Nil));
        assert_eq!(decode_value(&mut buf).unwrap(), Some(Value::Nil));
    }

    #[test]
    fn test_incomplete_leaves_buffer_untouched() {
        for partial in ["+OK", "$5\r\nhel", "*2\r\n$1\r\na\r\n", "*2\r\n$1\r\na\r\n$1\r\nb\r"] {
            let mut buf = BytesMut::from(partial);
            assert!(decode_value(&mut buf).unwrap().is_none(), "{partial:?}");
            assert_eq!(buf.len(), partial.len());
        }
    }

    #[test]
    fn test_nested_error_consumes_whole_array() {
        let mut buf = BytesMut::from("*2\r\n:1\r\n-WRONGTYPE bad\r\n:7\r\n");
        assert!(matches!(decode_value(&mut buf), Err(Error::Server(ref m)) if m == "WRONGTYPE bad"));
        assert_eq!(decode_value(&mut buf).unwrap(), Some(Value::Integer(7)));
    }

    #[test]
    fn test_malformed_input() {
        let mut buf = BytesMut::from("?what\r\n");
        assert!(matches!(decode_value(&mut buf), Err(Error::Protocol(_))));

        let mut buf = BytesMut::from("$-5\r\n");
        assert!(matches!(decode_value(&mut buf), Err(Error::Protocol(_))));

        let mut buf = BytesMut::from("$2\r\nabXY");
        assert!(matches!(decode_value(&mut buf), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let nested = |levels: usize| {
            let mut frame = "*1\r\n".repeat(levels);
            frame.push_str(":1\r\n");
            BytesMut::from(frame.as_str())
        };

        let mut ok = nested(MAX_DEPTH);
        assert!(decode_value(&mut ok).unwrap().is_some());

        let mut too_deep = nested(10_000);
        match decode_value(&mut too_deep) {
            Err(Error::Protocol(msg)) => assert!(msg.contains("nested"), "{msg}"),
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }
}
