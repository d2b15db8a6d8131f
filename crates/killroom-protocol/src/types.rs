//! Records and messages that cross a process boundary.
//!
//! - [`Player`] and [`RoomRecord`] are the persisted document shape and
//!   also what the HTTP surface returns.
//! - [`RoomEvent`] is a notification pushed to a room's observers.
//! - [`ChannelMessage`] is the envelope spoken on the real-time channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PlayerId, RoomId};

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A participant in a room.
///
/// The JSON keys keep the historical document layout: longitude is
/// stored under `lag`, and the death fields are camelCase. The kill
/// metadata is private so it can only change through
/// [`mark_dead`](Self::mark_dead), which writes it at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub name: String,
    pub lat: f64,
    #[serde(rename = "lag")]
    pub lng: f64,
    /// Opaque caller-supplied status.
    pub spec: Value,
    #[serde(rename = "isDead")]
    is_dead: bool,
    #[serde(rename = "killedTime")]
    killed_time: Option<String>,
    #[serde(rename = "killPlayerName")]
    kill_player_name: String,
}

impl Player {
    /// A fresh, living player at the origin with status `0`.
    pub fn new(player_id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            player_id,
            name: name.into(),
            lat: 0.0,
            lng: 0.0,
            spec: Value::from(0),
            is_dead: false,
            killed_time: None,
            kill_player_name: String::new(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// When the player died, formatted by the kill clock.
    pub fn killed_time(&self) -> Option<&str> {
        self.killed_time.as_deref()
    }

    /// Name credited with the kill. Empty while alive.
    pub fn kill_player_name(&self) -> &str {
        &self.kill_player_name
    }

    /// Moves the player and replaces its status. The name is untouched.
    pub fn update(&mut self, lat: f64, lng: f64, spec: Value) {
        self.lat = lat;
        self.lng = lng;
        self.spec = spec;
    }

    /// Transitions `Alive -> Dead`, stamping the kill metadata.
    ///
    /// Returns `false` and leaves the record untouched if the player is
    /// already dead: death is terminal and its metadata is written once.
    pub fn mark_dead(
        &mut self,
        killed_time: impl Into<String>,
        kill_player_name: impl Into<String>,
    ) -> bool {
        if self.is_dead {
            return false;
        }
        self.is_dead = true;
        self.killed_time = Some(killed_time.into());
        self.kill_player_name = kill_player_name.into();
        true
    }
}

/// A room document: an ordered list of players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    #[serde(default)]
    pub players: Vec<Player>,
}

impl RoomRecord {
    /// First player whose id matches. Ids can collide in legacy data,
    /// in which case the earliest entry wins.
    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Mutable variant of [`player`](Self::player).
    pub fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    /// Returns `true` if any player carries `player_id`.
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.player(player_id).is_some()
    }

    /// Number of players not yet dead.
    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_dead()).count()
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Something that happened in a room, pushed to its observers.
///
/// Serialized with an `event` tag: `{"event": "kill_event", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A player died.
    ///
    /// `killed_*` is the player marked dead (the route's path player);
    /// `killer_*` is the player named by the `killed_id` query value,
    /// whose name was credited on the dead record.
    KillEvent {
        room_id: RoomId,
        killer_id: PlayerId,
        killer_name: String,
        killed_id: PlayerId,
        killed_name: String,
        killed_time: String,
    },

    /// At most one player remains alive.
    GameOver {
        room_id: RoomId,
        survivor_id: Option<PlayerId>,
        survivor_name: Option<String>,
    },
}

impl RoomEvent {
    /// The room this event belongs to.
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::KillEvent { room_id, .. } | Self::GameOver { room_id, .. } => {
                *room_id
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Real-time channel envelope
// ---------------------------------------------------------------------------

/// Messages on the real-time channel, tagged by `type`.
///
/// ```text
/// client → {"type":"Subscribe","room_id":42}
/// server ← {"type":"Subscribed","room_id":42}
/// server ← {"type":"Event","event":{"event":"kill_event",...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelMessage {
    /// Client → Server: observe one room.
    Subscribe { room_id: RoomId },

    /// Server → Client: subscription is active.
    Subscribed { room_id: RoomId },

    /// Server → Client: a room event.
    Event { event: RoomEvent },

    /// Server → Client: the last client message was rejected.
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pid(raw: u32) -> PlayerId {
        PlayerId::try_from(raw).unwrap()
    }

    #[test]
    fn test_new_player_uses_legacy_document_shape() {
        let player = Player::new(pid(12), "Alice");
        let value = serde_json::to_value(&player).unwrap();
        assert_eq!(
            value,
            json!({
                "player_id": 12,
                "name": "Alice",
                "lat": 0.0,
                "lag": 0.0,
                "spec": 0,
                "isDead": false,
                "killedTime": null,
                "killPlayerName": "",
            })
        );
    }

    #[test]
    fn test_mark_dead_is_one_way_and_write_once() {
        let mut player = Player::new(pid(1), "Alice");
        assert!(player.mark_dead("2024/01/01 09:00:00", "Bob"));
        assert!(player.is_dead());

        assert!(!player.mark_dead("2030/01/01 00:00:00", "Carol"));
        assert!(player.is_dead());
        assert_eq!(player.killed_time(), Some("2024/01/01 09:00:00"));
        assert_eq!(player.kill_player_name(), "Bob");
    }

    #[test]
    fn test_update_keeps_name() {
        let mut player = Player::new(pid(1), "Alice");
        player.update(35.6, 139.7, json!("running"));
        assert_eq!(player.name, "Alice");
        assert_eq!(player.lat, 35.6);
        assert_eq!(player.lng, 139.7);
        assert_eq!(player.spec, json!("running"));
    }

    #[test]
    fn test_first_match_wins_on_duplicate_ids() {
        let room = RoomRecord {
            players: vec![Player::new(pid(3), "first"), Player::new(pid(3), "second")],
        };
        assert_eq!(room.player(pid(3)).unwrap().name, "first");
    }

    #[test]
    fn test_alive_count() {
        let mut room = RoomRecord {
            players: vec![Player::new(pid(1), "a"), Player::new(pid(2), "b")],
        };
        assert_eq!(room.alive_count(), 2);
        room.player_mut(pid(1)).unwrap().mark_dead("t", "b");
        assert_eq!(room.alive_count(), 1);
    }

    #[test]
    fn test_room_record_defaults_missing_players() {
        let room: RoomRecord = serde_json::from_str("{}").unwrap();
        assert!(room.players.is_empty());
    }

    #[test]
    fn test_room_event_tagging() {
        let event = RoomEvent::GameOver {
            room_id: RoomId::try_from(7).unwrap(),
            survivor_id: None,
            survivor_name: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "game_over");
        assert_eq!(value["room_id"], 7);
        assert_eq!(event.room_id().get(), 7);
    }

    #[test]
    fn test_channel_subscribe_round_trip() {
        let msg: ChannelMessage =
            serde_json::from_str(r#"{"type":"Subscribe","room_id":42}"#).unwrap();
        assert_eq!(
            msg,
            ChannelMessage::Subscribe {
                room_id: RoomId::try_from(42).unwrap()
            }
        );
    }

    #[test]
    fn test_channel_subscribe_rejects_out_of_range_room() {
        let result =
            serde_json::from_str::<ChannelMessage>(r#"{"type":"Subscribe","room_id":0}"#);
        assert!(result.is_err());
    }
}
