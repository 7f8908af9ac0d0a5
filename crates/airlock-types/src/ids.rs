//! Type-safe identifier wrappers for the small, fixed entity sets.
//!
//! Players, rooms, and tasks are dense index spaces assigned once at game
//! initialization (the ship map and the roster never grow mid-game), so the
//! identifiers wrap plain integers instead of UUIDs. The newtypes exist to
//! prevent accidental mixing of index spaces at compile time.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a dense index with standard derives.
macro_rules! define_index_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the inner index value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }
    };
}

define_index_id! {
    /// Identifier of a player (index into the game roster).
    PlayerId(u32)
}

define_index_id! {
    /// Identifier of a room (index assigned by the ship map on load).
    RoomId(u16)
}

define_index_id! {
    /// Identifier of an assigned task instance.
    TaskId(u32)
}
