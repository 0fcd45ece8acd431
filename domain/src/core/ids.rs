//! Opaque identifiers.
//!
//! All identifiers are string newtypes that serialize transparently, so the
//! wire format stays a plain string (`"turnId": "…"`).

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a conversation. Supplied by the caller, never generated here.
    ConversationId
);

define_id!(
    /// Identity of a single turn.
    TurnId
);

define_id!(
    /// Identity of a worker agent in the registry.
    WorkerId
);

define_id!(
    /// Identity of a human-approval request.
    ApprovalRequestId
);

define_id!(
    /// Opaque checkpoint handle handed back to clients for resuming.
    CheckpointId
);

impl TurnId {
    /// Generates a new random turn id.
    pub fn generate() -> Self {
        Self(format!("turn-{}", uuid::Uuid::new_v4()))
    }
}

impl ApprovalRequestId {
    /// Generates a new random approval request id.
    pub fn generate() -> Self {
        Self(format!("apr-{}", uuid::Uuid::new_v4()))
    }
}

impl CheckpointId {
    /// Generates a new random checkpoint id.
    pub fn generate() -> Self {
        Self(format!("ckpt-{}", uuid::Uuid::new_v4()))
    }
}
