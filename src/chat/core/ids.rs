//! Identifier types for chat sessions and messages.
//!
//! Identifiers are opaque strings on the wire so that blobs written by older
//! clients (millisecond timestamps, the `"fallback"` placeholder) still load.
//! Fresh identifiers are time-derived: the text form of a `UUIDv7`, which sorts
//! by creation time and never repeats in practice.

use core::fmt;
use core::str::FromStr;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a time-ordered identifier string.
#[inline]
#[must_use]
fn time_derived_id() -> String {
    Uuid::now_v7().to_string()
}

/// Declare a string-backed identifier newtype with a consistent API.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Create a new time-derived identifier.
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(time_derived_id())
            }

            /// Wrap an existing identifier string as-is.
            #[inline]
            #[must_use]
            pub fn from_raw(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into `String`.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }
    };
}

define_string_id!(
    /// Identifier for a chat session.
    SessionId
);

define_string_id!(
    /// Identifier for a single message inside a session.
    MessageId
);

impl SessionId {
    /// Identifier carried by the transient placeholder session.
    pub const FALLBACK: &'static str = "fallback";

    /// Identifier of the transient placeholder session.
    #[must_use]
    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_owned())
    }

    /// Whether this is the placeholder identifier.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.0 == Self::FALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_ids_are_unique() {
        let ids: HashSet<SessionId> = (0..1000).map(|_| SessionId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_legacy_ids_deserialize() {
        let parsed: Result<SessionId, _> = serde_json::from_str("\"1718000000000\"");
        assert_eq!(parsed.ok(), Some(SessionId::from_raw("1718000000000")));
    }

    #[test]
    fn test_fallback_id() {
        assert!(SessionId::fallback().is_fallback());
        assert!(!SessionId::new().is_fallback());
    }
}
