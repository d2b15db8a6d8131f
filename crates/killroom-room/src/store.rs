//! Room persistence.
//!
//! [`RoomStore`] is the narrow seam to whatever document database holds
//! the rooms. It stores whole room documents and replaces a room's player
//! list wholesale; it never merges. [`MemoryStore`] is the in-process
//! implementation the server runs with by default.

use std::collections::BTreeMap;
use std::future::Future;

use killroom_protocol::{Player, RoomId, RoomRecord};
use tokio::sync::RwLock;

use crate::StoreError;

/// A document store keyed by room id.
///
/// Methods return `Send` futures so the service can be driven from
/// spawned tasks and HTTP handlers. Implementations may be written with
/// plain `async fn`.
///
/// The store is last-writer-wins. Callers that read, modify, and write
/// back a room must serialize those steps themselves.
pub trait RoomStore: Send + Sync + 'static {
    /// All room ids, ascending.
    fn list_rooms(&self) -> impl Future<Output = Result<Vec<RoomId>, StoreError>> + Send;

    /// Creates `room_id` if it is free. Returns `false` (and changes
    /// nothing) if a room with that id already exists.
    fn insert_room(
        &self,
        room_id: RoomId,
        room: RoomRecord,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Reads a room document.
    fn get_room(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Option<RoomRecord>, StoreError>> + Send;

    /// Deletes a room. Returns `false` if it did not exist.
    fn delete_room(&self, room_id: RoomId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Overwrites the room's entire player list. Returns `false` if the
    /// room does not exist.
    fn replace_players(
        &self,
        room_id: RoomId,
        players: Vec<Player>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Rooms held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<BTreeMap<RoomId, RoomRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    async fn list_rooms(&self) -> Result<Vec<RoomId>, StoreError> {
        Ok(self.rooms.read().await.keys().copied().collect())
    }

    async fn insert_room(&self, room_id: RoomId, room: RoomRecord) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room_id) {
            return Ok(false);
        }
        rooms.insert(room_id, room);
        Ok(true)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomRecord>, StoreError> {
        Ok(self.rooms.read().await.get(&room_id).cloned())
    }

    async fn delete_room(&self, room_id: RoomId) -> Result<bool, StoreError> {
        Ok(self.rooms.write().await.remove(&room_id).is_some())
    }

    async fn replace_players(
        &self,
        room_id: RoomId,
        players: Vec<Player>,
    ) -> Result<bool, StoreError> {
        match self.rooms.write().await.get_mut(&room_id) {
            Some(room) => {
                room.players = players;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killroom_protocol::PlayerId;

    fn rid(raw: u32) -> RoomId {
        RoomId::try_from(raw).unwrap()
    }

    #[tokio::test]
    async fn test_insert_refuses_existing_room() {
        let store = MemoryStore::new();
        assert!(store.insert_room(rid(5), RoomRecord::default()).await.unwrap());

        let other = RoomRecord {
            players: vec![Player::new(PlayerId::try_from(1).unwrap(), "x")],
        };
        assert!(!store.insert_room(rid(5), other).await.unwrap());
        assert!(store.get_room(rid(5)).await.unwrap().unwrap().players.is_empty());
    }

    #[tokio::test]
    async fn test_list_rooms_is_sorted() {
        let store = MemoryStore::new();
        for raw in [30, 10, 20] {
            store.insert_room(rid(raw), RoomRecord::default()).await.unwrap();
        }
        assert_eq!(store.list_rooms().await.unwrap(), vec![rid(10), rid(20), rid(30)]);
    }

    #[tokio::test]
    async fn test_replace_players_overwrites_whole_list() {
        let store = MemoryStore::new();
        let p = |raw| Player::new(PlayerId::try_from(raw).unwrap(), format!("p{raw}"));
        store
            .insert_room(rid(1), RoomRecord { players: vec![p(1), p(2)] })
            .await
            .unwrap();

        assert!(store.replace_players(rid(1), vec![p(3)]).await.unwrap());
        let room = store.get_room(rid(1)).await.unwrap().unwrap();
        assert_eq!(room.players, vec![p(3)]);
    }

    #[tokio::test]
    async fn test_missing_room_operations_report_false() {
        let store = MemoryStore::new();
        assert!(store.get_room(rid(9)).await.unwrap().is_none());
        assert!(!store.delete_room(rid(9)).await.unwrap());
        assert!(!store.replace_players(rid(9), Vec::new()).await.unwrap());
    }
}
