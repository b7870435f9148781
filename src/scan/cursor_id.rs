use bytes::Bytes;
use std::fmt;

/// Token the server hands back to mark the position of a scan.
///
/// The token is opaque: it is never parsed, ordered or modified, only sent
/// back byte-for-byte on the next round-trip. `"0"` starts a scan and, when
/// the server returns it again, marks the end of the traversal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CursorId(Bytes);

impl CursorId {
    const INITIAL: &'static [u8] = b"0";

    /// The token that starts a new scan.
    pub fn initial() -> Self {
        CursorId(Bytes::from_static(Self::INITIAL))
    }

    /// Wrap a token exactly as received from the server.
    pub fn of(token: impl Into<Bytes>) -> Self {
        CursorId(token.into())
    }

    /// `true` for the starting token.
    pub fn is_initial(&self) -> bool {
        self.0 == Self::INITIAL
    }

    /// `true` when this token, returned by the server, ends the scan.
    pub fn is_finished(&self) -> bool {
        self.is_initial()
    }

    /// The raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The raw token as a command argument.
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl Default for CursorId {
    fn default() -> Self {
        Self::initial()
    }
}

impl From<u64> for CursorId {
    fn from(value: u64) -> Self {
        CursorId(Bytes::from(value.to_string()))
    }
}

impl From<&'static str> for CursorId {
    fn from(value: &'static str) -> Self {
        CursorId(Bytes::from_static(value.as_bytes()))
    }
}

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CursorId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_doubles_as_finished() {
        let id = CursorId::initial();
        assert!(id.is_initial());
        assert!(id.is_finished());
        assert_eq!(id, CursorId::from(0u64));
    }

    #[test]
    fn tokens_are_not_normalized() {
        // "00" is a different token than "0" and must not end the scan.
        let id = CursorId::of(Bytes::from_static(b"00"));
        assert!(!id.is_finished());
        assert_eq!(id.as_bytes(), b"00");
        assert_ne!(CursorId::from("117"), CursorId::from("0117"));
    }
}
