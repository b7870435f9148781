//! Decoding of scan batches into typed items.
//!
//! `SCAN` and `SSCAN` return a flat list of keys or members. `HSCAN` and
//! `ZSCAN` return alternating field/value and member/score elements.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::Value;

/// An item type a scan batch can be decoded into.
pub trait ScanItem: Sized + Send {
    /// Decode one batch, preserving reply order.
    fn from_batch(values: Vec<Value>) -> Result<Vec<Self>>;
}

/// Keys (`SCAN`) and set members (`SSCAN`).
impl ScanItem for Bytes {
    fn from_batch(values: Vec<Value>) -> Result<Vec<Self>> {
        values.into_iter().map(Value::into_bytes).collect()
    }
}

/// A field and its value, as yielded by `HSCAN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashEntry {
    /// Hash field.
    pub field: Bytes,
    /// Value stored under the field.
    pub value: Bytes,
}

impl ScanItem for HashEntry {
    fn from_batch(values: Vec<Value>) -> Result<Vec<Self>> {
        pairs(values, "HSCAN")?
            .map(|(field, value)| {
                Ok(HashEntry {
                    field: field.into_bytes()?,
                    value: value.into_bytes()?,
                })
            })
            .collect()
    }
}

/// A sorted-set member and its score, as yielded by `ZSCAN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    /// Member.
    pub member: Bytes,
    /// Score of the member.
    pub score: f64,
}

impl ScanItem for ScoredMember {
    fn from_batch(values: Vec<Value>) -> Result<Vec<Self>> {
        pairs(values, "ZSCAN")?
            .map(|(member, score)| {
                Ok(ScoredMember {
                    member: member.into_bytes()?,
                    score: parse_score(score)?,
                })
            })
            .collect()
    }
}

fn pairs(values: Vec<Value>, command: &str) -> Result<impl Iterator<Item = (Value, Value)>> {
    if values.len() % 2 != 0 {
        return Err(Error::Protocol(format!(
            "{} reply has an odd number of elements ({})",
            command,
            values.len()
        )));
    }
    let mut iter = values.into_iter();
    Ok(std::iter::from_fn(move || Some((iter.next()?, iter.next()?))))
}

/// Scores travel as text; `inf`, `-inf` and `+inf` are valid.
fn parse_score(value: Value) -> Result<f64> {
    let raw = value.into_bytes()?;
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|score| !score.is_nan())
        .ok_or_else(|| {
            Error::Protocol(format!(
                "invalid ZSCAN score: {}",
                String::from_utf8_lossy(&raw)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::String(Bytes::copy_from_slice(s.as_bytes()))
    }

    #[test]
    fn keys_keep_reply_order() {
        let keys = Bytes::from_batch(vec![bulk("b"), bulk("a"), bulk("b")]).unwrap();
        assert_eq!(keys, vec![Bytes::from("b"), Bytes::from("a"), Bytes::from("b")]);
    }

    #[test]
    fn non_bulk_key_is_rejected() {
        assert!(Bytes::from_batch(vec![Value::Integer(1)]).is_err());
    }

    #[test]
    fn hash_entries_are_paired() {
        let entries =
            HashEntry::from_batch(vec![bulk("name"), bulk("ada"), bulk("lang"), bulk("rust")])
                .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].field, Bytes::from("lang"));
        assert_eq!(entries[1].value, Bytes::from("rust"));
    }

    #[test]
    fn odd_pair_batch_is_a_protocol_error() {
        let err = HashEntry::from_batch(vec![bulk("dangling")]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn scores_accept_infinities() {
        let members = ScoredMember::from_batch(vec![
            bulk("low"),
            bulk("-inf"),
            bulk("mid"),
            bulk("1.5"),
            bulk("high"),
            bulk("inf"),
        ])
        .unwrap();
        assert_eq!(members[0].score, f64::NEG_INFINITY);
        assert_eq!(members[1].score, 1.5);
        assert_eq!(members[2].score, f64::INFINITY);
    }

    #[test]
    fn garbage_score_is_rejected() {
        let err = ScoredMember::from_batch(vec![bulk("m"), bulk("high")]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
