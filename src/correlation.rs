use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier used to match JSON-RPC responses to their requests.
///
/// Ids are plain unsigned integers on the wire. They are handed out by the
/// correlator in increasing order and are never reused for the lifetime of a
/// client, across reconnects included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    // ---

    /// Wrap a raw numeric id.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The numeric value sent on the wire.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub(crate) fn successor(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_successor_increments() {
        // ---
        let id = RequestId::new(41);
        assert_eq!(id.successor(), RequestId::new(42));
        assert!(id < id.successor());
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        // ---
        let json = serde_json::to_string(&RequestId::new(7)).unwrap();
        assert_eq!(json, "7");

        let back: RequestId = serde_json::from_str("7").unwrap();
        assert_eq!(back.get(), 7);
    }
}
