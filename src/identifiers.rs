//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing a request correlation id with a
//! browser window id at compile time.
//!
//! | Type | Wraps | Assigned by |
//! |------|-------|-------------|
//! | [`CallId`] | `u64` | This crate, per RPC session |
//! | [`WinId`] | `String` | The browser |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// CallId
// ============================================================================

/// Correlation id of a request sent over the RPC channel.
///
/// Unique per session and assigned in increasing order by [`CallIdSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Extracts a call id from a JSON `id` field.
    ///
    /// Returns `None` for string or negative ids, which this crate never
    /// issues.
    #[inline]
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().map(Self)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`CallId`]s for one session.
#[derive(Debug, Default)]
pub struct CallIdSequence {
    next: AtomicU64,
}

impl CallIdSequence {
    /// Creates a sequence whose first id is 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next unused id.
    #[inline]
    pub fn next_id(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// WinId
// ============================================================================

/// Opaque identifier of a browser window.
///
/// The browser sends window ids as JSON numbers; strings are accepted too
/// and both are normalized to their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WinId(String);

impl WinId {
    /// Creates a window id from its textual form.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the textual form.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts a window id from a JSON value.
    ///
    /// Numbers and non-empty strings are accepted; anything else is `None`.
    /// Integral floats (`7.0`) map to the same id as their integer form.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_f64() => {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 2f64.powi(53) {
                    Some(Self(format!("{f:.0}")))
                } else {
                    Some(Self(n.to_string()))
                }
            }
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for WinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for WinId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for WinId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for WinId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Numeric ids go back out as numbers so the browser sees what it sent.
        match self.0.parse::<u64>() {
            Ok(n) => serializer.serialize_u64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for WinId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid win-id: {value}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_call_id_sequence_is_monotonic() {
        let seq = CallIdSequence::new();
        let a = seq.next_id();
        let b = seq.next_id();
        let c = seq.next_id();
        assert_eq!(a.as_u64(), 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_call_id_from_value() {
        assert_eq!(CallId::from_value(&json!(5)), Some(CallId::new(5)));
        assert_eq!(CallId::from_value(&json!("5")), None);
        assert_eq!(CallId::from_value(&json!(-1)), None);
    }

    #[test]
    fn test_win_id_from_number_and_string() {
        assert_eq!(WinId::from_value(&json!(7)), Some(WinId::new("7")));
        assert_eq!(WinId::from_value(&json!("main")), Some(WinId::new("main")));
        assert_eq!(WinId::from_value(&json!("")), None);
        assert_eq!(WinId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_win_id_integral_float_matches_integer() {
        assert_eq!(WinId::from_value(&json!(7.0)), WinId::from_value(&json!(7)));
        assert_eq!(WinId::from_value(&json!(7.5)), Some(WinId::new("7.5")));
    }

    #[test]
    fn test_win_id_serializes_numeric_as_number() {
        assert_eq!(serde_json::to_value(WinId::from(7_u64)).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(WinId::from("a")).unwrap(), json!("a"));
    }

    #[test]
    fn test_win_id_deserialize() {
        let id: WinId = serde_json::from_value(json!(12)).expect("numeric win-id");
        assert_eq!(id.as_str(), "12");
        assert!(serde_json::from_value::<WinId>(json!([1])).is_err());
    }
}
