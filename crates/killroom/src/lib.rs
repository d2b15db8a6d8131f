//! # Killroom
//!
//! Room and player coordination for location-based elimination games.
//!
//! Clients create rooms, join them as players, stream their positions,
//! and report kills over a small HTTP API. Observers follow a room over a
//! WebSocket and receive `kill_event` and `game_over` messages as they
//! happen.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use killroom::prelude::*;
//!
//! # async fn start() -> Result<(), KillroomError> {
//! let server = KillroomServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod gateway;
pub mod http;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, KillroomError};
pub use gateway::SUBSCRIBE_TIMEOUT;
pub use server::{KillroomServer, KillroomServerBuilder};

/// Re-exports for applications embedding the server.
pub mod prelude {
    pub use crate::{ApiError, ConfigError, KillroomError, KillroomServer, ServerConfig};

    pub use killroom_protocol::{
        ChannelMessage, Codec, IdGenerator, JsonCodec, Player, PlayerId, ProtocolError,
        RandomIds, RoomEvent, RoomId, RoomRecord, SequenceIds,
    };
    pub use killroom_room::{
        FixedOffsetClock, FrozenClock, KillClock, KillOutcome, MemoryStore, Notifier,
        NotifyHandle, PlayerUpdate, RoomError, RoomService, RoomStore, ServiceConfig, StoreError,
    };
    pub use killroom_transport::TransportError;
}
