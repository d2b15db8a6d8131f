//! Room lifecycle for Killroom.
//!
//! Rooms are documents in a [`RoomStore`]; each holds an ordered list of
//! players. [`RoomService`] runs every operation against the store under
//! a per-room lock and publishes kill outcomes through a [`Notifier`].
//!
//! # Key types
//!
//! - [`RoomStore`] / [`MemoryStore`]: persistence seam and the
//!   in-process store
//! - [`RoomService`]: rooms, players, and kills
//! - [`KillOutcome`] / [`resolve_kill`]: the kill state machine
//! - [`NotifyHandle`]: per-room event broadcast hub
//! - [`ServiceConfig`]: id retry budget and kill-time offset

mod config;
mod error;
mod kill;
mod locks;
mod notify;
mod service;
mod store;

pub use config::{DEFAULT_ID_ATTEMPTS, DEFAULT_KILL_TIME_OFFSET_HOURS, ServiceConfig};
pub use error::{NotifyError, RoomError, StoreError};
pub use kill::{
    FixedOffsetClock, FrozenClock, KILL_TIME_FORMAT, KillClock, KillOutcome, KillResolution,
    resolve_kill,
};
pub use notify::{Notifier, NotifyHandle, SUBSCRIBER_BUFFER, SubscriberId, Subscription};
pub use service::{PlayerUpdate, RoomService};
pub use store::{MemoryStore, RoomStore};
