//! Shared vocabulary for Killroom.
//!
//! - **Ids** ([`RoomId`], [`PlayerId`], [`IdGenerator`]): the bounded
//!   `1..=999999` id space and how fresh ids are drawn.
//! - **Types** ([`Player`], [`RoomRecord`], [`RoomEvent`],
//!   [`ChannelMessage`]): persisted records and real-time messages.
//! - **Codec** ([`Codec`], [`JsonCodec`]): text framing for the
//!   real-time channel.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (ChannelMessage) → Gateway (subscribers)
//! ```

mod codec;
mod error;
mod ids;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use ids::{
    IdGenerator, MAX_ID, MIN_ID, PlayerId, RandomIds, RoomId, SequenceIds,
    generate_id, parse_id, validate_id,
};
pub use types::{ChannelMessage, Player, RoomEvent, RoomRecord};
