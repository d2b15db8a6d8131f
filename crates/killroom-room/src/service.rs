//! Room service: room CRUD and the player lifecycle.
//!
//! [`RoomService`] is the entry point for every operation from the HTTP
//! layer. Each mutation follows the same shape:
//!
//! ```text
//! lock room → read room → mutate local copy → replace players → unlock
//! ```
//!
//! The store only ever sees whole player lists. The per-room lock is what
//! keeps two concurrent mutations of one room from overwriting each
//! other; without it the later write would silently win.

use killroom_protocol::{IdGenerator, Player, PlayerId, RandomIds, RoomId, RoomRecord};
use serde_json::Value;

use crate::kill::{FixedOffsetClock, KillClock};
use crate::locks::RoomLocks;
use crate::{Notifier, NotifyHandle, RoomError, RoomStore, ServiceConfig};

/// A validated position/status update for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerUpdate {
    pub lat: f64,
    pub lng: f64,
    pub spec: Value,
}

impl PlayerUpdate {
    /// Builds an update from raw query values.
    ///
    /// `lat` and `lng` are required and must be finite numbers. A missing
    /// `spec` is stored as `null`; a present one is kept verbatim as a
    /// string.
    pub fn parse(
        lat: Option<&str>,
        lng: Option<&str>,
        spec: Option<String>,
    ) -> Result<Self, RoomError> {
        Ok(Self {
            lat: parse_coordinate("lat", lat)?,
            lng: parse_coordinate("lng", lng)?,
            spec: spec.map_or(Value::Null, Value::String),
        })
    }
}

fn parse_coordinate(name: &str, raw: Option<&str>) -> Result<f64, RoomError> {
    let raw = raw.ok_or_else(|| RoomError::InvalidArgument(format!("{name} is required")))?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(RoomError::InvalidArgument(format!(
            "{name} must be a finite number, got {raw:?}"
        ))),
    }
}

/// Rooms, players, and kills over an injected store and notifier.
pub struct RoomService<S: RoomStore, N: Notifier = NotifyHandle> {
    pub(crate) store: S,
    pub(crate) notifier: N,
    pub(crate) ids: Box<dyn IdGenerator>,
    pub(crate) clock: Box<dyn KillClock>,
    pub(crate) locks: RoomLocks,
    config: ServiceConfig,
}

impl<S: RoomStore, N: Notifier> RoomService<S, N> {
    /// Creates a service with random ids and a wall clock at the
    /// configured offset.
    pub fn new(store: S, notifier: N, config: ServiceConfig) -> Self {
        Self {
            store,
            notifier,
            ids: Box::new(RandomIds),
            clock: Box::new(FixedOffsetClock::new(config.kill_time_offset)),
            locks: RoomLocks::default(),
            config,
        }
    }

    /// Replaces the id generator.
    pub fn with_ids(mut self, ids: impl IdGenerator) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Replaces the clock used to stamp kills.
    pub fn with_clock(mut self, clock: impl KillClock) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The notifier events are published through.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // -- Rooms --------------------------------------------------------------

    /// All room ids, ascending.
    pub async fn list_rooms(&self) -> Result<Vec<RoomId>, RoomError> {
        Ok(self.store.list_rooms().await?)
    }

    /// Creates an empty room under a fresh id.
    ///
    /// Ids are drawn at random; a draw that hits an existing room is
    /// discarded and another is tried, up to `id_attempts` times.
    pub async fn create_room(&self) -> Result<RoomId, RoomError> {
        for _ in 0..self.config.id_attempts {
            let room_id = self.ids.room_id();
            let _guard = self.locks.lock(room_id).await;
            if self.store.insert_room(room_id, RoomRecord::default()).await? {
                tracing::info!(%room_id, "room created");
                return Ok(room_id);
            }
            tracing::debug!(%room_id, "room id collision, redrawing");
        }
        Err(RoomError::IdSpaceExhausted(self.config.id_attempts))
    }

    /// Reads a room.
    pub async fn get_room(&self, room_id: RoomId) -> Result<RoomRecord, RoomError> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound(room_id))
    }

    /// Returns `true` if the room exists.
    pub async fn room_exists(&self, room_id: RoomId) -> Result<bool, RoomError> {
        Ok(self.store.get_room(room_id).await?.is_some())
    }

    /// Deletes a room and releases its observers.
    pub async fn delete_room(&self, room_id: RoomId) -> Result<(), RoomError> {
        let _guard = self.locks.lock(room_id).await;
        if !self.store.delete_room(room_id).await? {
            return Err(RoomError::RoomNotFound(room_id));
        }
        self.room_removed(room_id);
        tracing::info!(%room_id, "room deleted");
        Ok(())
    }

    // -- Players ------------------------------------------------------------

    /// The room's players in insertion order.
    pub async fn get_players(&self, room_id: RoomId) -> Result<Vec<Player>, RoomError> {
        Ok(self.get_room(room_id).await?.players)
    }

    /// One player. If ids collide, the earliest entry wins.
    pub async fn get_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<Player, RoomError> {
        self.get_room(room_id)
            .await?
            .player(player_id)
            .cloned()
            .ok_or(RoomError::PlayerNotFound { room_id, player_id })
    }

    /// Appends a new living player at the origin and returns its id.
    ///
    /// The id is unique within the room: draws that match an existing
    /// player are discarded.
    pub async fn add_player(&self, room_id: RoomId, name: &str) -> Result<PlayerId, RoomError> {
        let _guard = self.locks.lock(room_id).await;
        let mut room = self.get_room(room_id).await?;

        let player_id = self.draw_player_id(&room)?;
        room.players.push(Player::new(player_id, name));
        self.write_players(room_id, room.players).await?;

        tracing::info!(%room_id, %player_id, name, "player added");
        Ok(player_id)
    }

    /// Moves a player and replaces its status. The name never changes.
    pub async fn update_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        update: PlayerUpdate,
    ) -> Result<(), RoomError> {
        let _guard = self.locks.lock(room_id).await;
        let mut room = self.get_room(room_id).await?;

        let player = room
            .player_mut(player_id)
            .ok_or(RoomError::PlayerNotFound { room_id, player_id })?;
        player.update(update.lat, update.lng, update.spec);
        self.write_players(room_id, room.players).await?;

        tracing::debug!(%room_id, %player_id, "player updated");
        Ok(())
    }

    /// Removes every player carrying `player_id`.
    ///
    /// Removing the last player deletes the room itself.
    pub async fn remove_player(&self, room_id: RoomId, player_id: PlayerId) -> Result<(), RoomError> {
        let _guard = self.locks.lock(room_id).await;
        let mut room = self.get_room(room_id).await?;

        let before = room.players.len();
        room.players.retain(|p| p.player_id != player_id);
        if room.players.len() == before {
            return Err(RoomError::PlayerNotFound { room_id, player_id });
        }

        if room.players.is_empty() {
            self.store.delete_room(room_id).await?;
            self.room_removed(room_id);
            tracing::info!(%room_id, %player_id, "last player removed, room deleted");
        } else {
            self.write_players(room_id, room.players).await?;
            tracing::info!(%room_id, %player_id, "player removed");
        }
        Ok(())
    }

    // -- Helpers ------------------------------------------------------------

    /// Whole-list replace. The caller must hold the room's lock.
    pub(crate) async fn write_players(
        &self,
        room_id: RoomId,
        players: Vec<Player>,
    ) -> Result<(), RoomError> {
        if self.store.replace_players(room_id, players).await? {
            Ok(())
        } else {
            Err(RoomError::RoomNotFound(room_id))
        }
    }

    fn draw_player_id(&self, room: &RoomRecord) -> Result<PlayerId, RoomError> {
        (0..self.config.id_attempts)
            .map(|_| self.ids.player_id())
            .find(|id| !room.contains(*id))
            .ok_or(RoomError::IdSpaceExhausted(self.config.id_attempts))
    }

    /// Releases the observers of a room that is gone.
    fn room_removed(&self, room_id: RoomId) {
        self.notifier.room_closed(room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, kill::FrozenClock};
    use killroom_protocol::SequenceIds;
    use serde_json::json;

    fn rid(raw: u32) -> RoomId {
        RoomId::try_from(raw).unwrap()
    }

    fn pid(raw: u32) -> PlayerId {
        PlayerId::try_from(raw).unwrap()
    }

    fn service(ids: Vec<u32>) -> RoomService<MemoryStore> {
        RoomService::new(MemoryStore::new(), NotifyHandle::spawn(), ServiceConfig::default())
            .with_ids(SequenceIds::new(ids))
            .with_clock(FrozenClock("T".into()))
    }

    #[tokio::test]
    async fn test_missing_rooms_leave_no_lock_entries() {
        let svc = service(vec![1]);
        let update = PlayerUpdate::parse(Some("1"), Some("2"), None).unwrap();

        for raw in 1..=200 {
            let room = rid(raw);
            assert!(svc.add_player(room, "ghost").await.is_err());
            assert!(svc.update_player(room, pid(1), update.clone()).await.is_err());
            assert!(svc.remove_player(room, pid(1)).await.is_err());
            assert!(svc.kill(room, pid(1), pid(2)).await.is_err());
            assert!(svc.delete_room(room).await.is_err());
        }
        assert_eq!(svc.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_colliding_and_finished_rooms_leave_no_lock_entries() {
        let svc = service(vec![7, 7, 8, 1]);
        assert_eq!(svc.create_room().await.unwrap(), rid(7));
        // Draws 7 (taken), then 8.
        assert_eq!(svc.create_room().await.unwrap(), rid(8));
        svc.add_player(rid(7), "a").await.unwrap();
        svc.remove_player(rid(7), pid(1)).await.unwrap();
        svc.delete_room(rid(8)).await.unwrap();

        assert_eq!(svc.locks.len(), 0);
        assert!(svc.list_rooms().await.unwrap().is_empty());
    }

    #[test]
    fn test_player_update_parses_coordinates() {
        let update =
            PlayerUpdate::parse(Some("35.68"), Some(" 139.76 "), Some("hunter".into())).unwrap();
        assert_eq!(update.lat, 35.68);
        assert_eq!(update.lng, 139.76);
        assert_eq!(update.spec, json!("hunter"));
    }

    #[test]
    fn test_player_update_missing_spec_is_null() {
        let update = PlayerUpdate::parse(Some("1"), Some("2"), None).unwrap();
        assert_eq!(update.spec, Value::Null);
    }

    #[test]
    fn test_player_update_rejects_bad_coordinates() {
        for (lat, lng) in [
            (Some("abc"), Some("1")),
            (Some("1"), Some("")),
            (None, Some("1")),
            (Some("1"), None),
            (Some("NaN"), Some("1")),
            (Some("1"), Some("inf")),
        ] {
            let err = PlayerUpdate::parse(lat, lng, None).unwrap_err();
            assert!(
                matches!(err, RoomError::InvalidArgument(_)),
                "{lat:?}/{lng:?} should be rejected"
            );
        }
    }
}
