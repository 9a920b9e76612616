//! Correlation keys.

use serde::{Deserialize, Serialize};

/// Caller-supplied value (`ref` on connect, `ref2` on a callback) that pairs
/// an asynchronous callback with the connections waiting for it.
///
/// Keys compare exactly, byte for byte. A connection opened without `ref`
/// holds the empty key and receives callbacks whose `ref2` is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key of a connection that did not supply one.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Whether this is the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a record stored under `self` should receive traffic for `other`.
    pub fn matches(&self, other: &CorrelationKey) -> bool {
        self.0 == other.0
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(CorrelationKey::from("tx1").matches(&"tx1".into()));
    }

    #[test]
    fn different_keys_do_not_match() {
        assert!(!CorrelationKey::from("tx1").matches(&"tx2".into()));
    }

    #[test]
    fn comparison_is_exact() {
        let key = CorrelationKey::from("TX1");
        assert!(!key.matches(&"tx1".into()));
        assert!(!key.matches(&" TX1".into()));
    }

    #[test]
    fn empty_key_matches_only_empty() {
        assert!(CorrelationKey::empty().matches(&CorrelationKey::empty()));
        assert!(CorrelationKey::empty().matches(&"".into()));
        assert!(!CorrelationKey::empty().matches(&"tx1".into()));
        assert!(!CorrelationKey::from("tx1").matches(&CorrelationKey::empty()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&CorrelationKey::from("tx9")).unwrap();
        assert_eq!(json, "\"tx9\"");
    }
}
