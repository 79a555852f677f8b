//! Newtype wrappers around `u64` for the chat core's numeric identifiers.
//!
//! Using distinct types prevents accidentally passing a `UserId` where a
//! `MessageId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `u64`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner numeric value.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Stable identifier for a registered chat user.
    UserId
);

define_id!(
    /// Position of a message in the log. Assigned on append, starting at 1.
    MessageId
);

impl MessageId {
    /// Sentinel that sorts before every assigned message id.
    pub const BEGINNING: MessageId = MessageId(0);

    /// The id following this one.
    pub fn next(self) -> MessageId {
        MessageId(self.0 + 1)
    }
}
