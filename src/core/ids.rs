// File: src/core/ids.rs

//! Identifier types for conversations and messages.
//!
//! Conversation ids are **opaque**: the backend assigns them and the client
//! never inspects their shape. Message ids originate in the host framework.
//! Both are wrapped in string newtypes so the two cannot be swapped by
//! accident at call sites.
//!
//! ## Cargo features used by this module
//! - `uuid_v7`: locally generated ids use `UUIDv7` (time-ordered).

use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate an ID intended to have good DB insert locality.
///
/// With feature `uuid_v7` enabled, this uses `Uuid::now_v7()`.
/// Otherwise it falls back to `Uuid::new_v4()`.
#[inline]
#[must_use]
fn uuid_time_ordered() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Declare an opaque string identifier with a consistent API.
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

        impl $name {
            /// Wrap an existing identifier.
            #[inline]
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Generate a fresh identifier locally.
            #[inline]
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid_time_ordered().to_string())
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

            /// Whether the identifier is empty (never valid on the wire).
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
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

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
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
    /// Identifier of a conversation.
    ///
    /// Assigned by the backend on creation and immutable afterwards.
    ConversationId
);

define_string_id!(
    /// Identifier of a chat message, as known to the host framework.
    MessageId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = ConversationId::new("conv-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"conv-1\"");

        let back: ConversationId = serde_json::from_str("\"conv-1\"").expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_blank_id_is_empty() {
        assert!(ConversationId::new("   ").is_empty());
        assert!(!ConversationId::from("abc").is_empty());
    }
}
