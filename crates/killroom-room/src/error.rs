//! Error types for the room layer.

use killroom_protocol::{PlayerId, RoomId};

/// Errors reported by a [`RoomStore`](crate::RoomStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during room, player, and kill operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A caller-supplied value could not be used, e.g. a latitude that
    /// is not a finite number.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The room exists but holds no player with this id.
    #[error("player {player_id} not found in room {room_id}")]
    PlayerNotFound { room_id: RoomId, player_id: PlayerId },

    /// Every drawn id collided with an existing one.
    #[error("no free id after {0} attempts")]
    IdSpaceExhausted(usize),

    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Errors from the notification hub.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The hub task has stopped; no subscriptions can be made.
    #[error("notification hub stopped")]
    HubStopped,
}
