//! Room and player identifiers.
//!
//! Rooms and players share one bounded id space, `1..=999_999`. The
//! newtypes below can only be built through [`validate_id`] (via
//! `parse`/`TryFrom`) or through an [`IdGenerator`], so holding a
//! `RoomId` or `PlayerId` means holding an in-range value.
//!
//! Generation gives no uniqueness guarantee on its own. Callers that
//! need unique ids must check against what they already have.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Smallest valid id.
pub const MIN_ID: u32 = 1;

/// Largest valid id.
pub const MAX_ID: u32 = 999_999;

/// Checks that `value` lies in `MIN_ID..=MAX_ID`.
pub fn validate_id(value: i64) -> Result<u32, ProtocolError> {
    if value < i64::from(MIN_ID) || value > i64::from(MAX_ID) {
        return Err(ProtocolError::InvalidId {
            value: value.to_string(),
            reason: "must be between 1 and 999999",
        });
    }
    Ok(value as u32)
}

/// Parses a textual id (path segment, query value) and range-checks it.
pub fn parse_id(raw: &str) -> Result<u32, ProtocolError> {
    let value: i64 = raw.parse().map_err(|_| ProtocolError::InvalidId {
        value: raw.to_string(),
        reason: "must be an integer",
    })?;
    validate_id(value)
}

/// Samples an id uniformly from the valid range.
pub fn generate_id() -> u32 {
    rand::rng().random_range(MIN_ID..=MAX_ID)
}

macro_rules! bounded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        #[serde(try_from = "u32", into = "u32")]
        pub struct $name(u32);

        impl $name {
            /// Returns the raw numeric id.
            pub fn get(self) -> u32 {
                self.0
            }

            /// Parses and validates a textual id.
            pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
                parse_id(raw).map(Self)
            }
        }

        impl TryFrom<u32> for $name {
            type Error = ProtocolError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                validate_id(i64::from(value)).map(Self)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

bounded_id!(
    /// Identifies a room. Serialized as a bare integer.
    RoomId,
    "R"
);

bounded_id!(
    /// Identifies a player within a room. Serialized as a bare integer.
    PlayerId,
    "P"
);

/// Source of fresh ids.
///
/// Implementations return raw values; the typed helpers clamp into the
/// valid range so a misbehaving generator can never mint an invalid id.
pub trait IdGenerator: Send + Sync + 'static {
    /// Returns the next raw id.
    fn next_raw(&self) -> u32;

    /// Draws a room id.
    fn room_id(&self) -> RoomId {
        RoomId(self.next_raw().clamp(MIN_ID, MAX_ID))
    }

    /// Draws a player id.
    fn player_id(&self) -> PlayerId {
        PlayerId(self.next_raw().clamp(MIN_ID, MAX_ID))
    }
}

/// Uniform random ids from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_raw(&self) -> u32 {
        generate_id()
    }
}

/// Replays a fixed list of ids, cycling when exhausted.
///
/// Useful for forcing collisions in tests.
#[derive(Debug)]
pub struct SequenceIds {
    values: Vec<u32>,
    cursor: AtomicUsize,
}

impl SequenceIds {
    /// Creates a generator that yields `values` in order, forever.
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_raw(&self) -> u32 {
        if self.values.is_empty() {
            return MIN_ID;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_bounds() {
        assert_eq!(validate_id(1).unwrap(), 1);
        assert_eq!(validate_id(999_999).unwrap(), 999_999);
        assert!(validate_id(0).is_err());
        assert!(validate_id(-3).is_err());
        assert!(validate_id(1_000_000).is_err());
    }

    #[test]
    fn test_parse_id_rejects_non_integers() {
        for raw in ["abc", "1.5", "", " 7", "99999999999999999999999"] {
            let err = parse_id(raw).unwrap_err();
            assert!(
                matches!(err, ProtocolError::InvalidId { .. }),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(parse_id("42").unwrap(), 42);
    }

    #[test]
    fn test_generate_id_stays_in_range() {
        for _ in 0..10_000 {
            let id = generate_id();
            assert!((MIN_ID..=MAX_ID).contains(&id));
        }
    }

    #[test]
    fn test_room_id_serializes_as_bare_integer() {
        let id = RoomId::parse("123").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "123");
        let back: RoomId = serde_json::from_str("123").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_out_of_range_id_fails_to_deserialize() {
        assert!(serde_json::from_str::<PlayerId>("0").is_err());
        assert!(serde_json::from_str::<PlayerId>("1000000").is_err());
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(RoomId::parse("5").unwrap().to_string(), "R-5");
        assert_eq!(PlayerId::parse("9").unwrap().to_string(), "P-9");
    }

    #[test]
    fn test_sequence_ids_cycle_and_clamp() {
        let ids = SequenceIds::new(vec![7, 0, 2_000_000]);
        assert_eq!(ids.player_id().get(), 7);
        assert_eq!(ids.player_id().get(), MIN_ID);
        assert_eq!(ids.player_id().get(), MAX_ID);
        assert_eq!(ids.room_id().get(), 7);
    }
}
