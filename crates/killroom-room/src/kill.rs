//! Kill resolution.
//!
//! A player is `Alive` until a kill lands on it, then `Dead` for good.
//! After every kill the room's alive count decides the outcome: more than
//! one survivor keeps the game going, one or none ends it.
//!
//! # Parameter roles
//!
//! The kill route is `/rooms/{room}/players/{player_id}/kill?killed_id=`.
//! Despite the names, the record marked dead is `player_id`, and the name
//! written into its `killPlayerName` is the name of `killed_id`. In other
//! words the path player is the victim and `killed_id` is the attacker.
//! Clients depend on this, so it is kept; events name the roles by what
//! actually happened (`killed_*` is the dead player).

use chrono::{FixedOffset, Utc};
use killroom_protocol::{PlayerId, RoomEvent, RoomId, RoomRecord};
use serde::Serialize;

use crate::{Notifier, RoomError, RoomService, RoomStore};

/// `chrono` format of `killedTime`, e.g. `2024/05/01 21:03:09`.
pub const KILL_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Source of kill timestamps.
pub trait KillClock: Send + Sync + 'static {
    /// The current time, formatted for `killedTime`.
    fn stamp(&self) -> String;
}

/// Wall-clock time at a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock {
    offset: FixedOffset,
}

impl FixedOffsetClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl KillClock for FixedOffsetClock {
    fn stamp(&self) -> String {
        Utc::now()
            .with_timezone(&self.offset)
            .format(KILL_TIME_FORMAT)
            .to_string()
    }
}

/// Always returns the same stamp.
#[derive(Debug, Clone)]
pub struct FrozenClock(pub String);

impl KillClock for FrozenClock {
    fn stamp(&self) -> String {
        self.0.clone()
    }
}

/// Result of a kill, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KillOutcome {
    /// More than one player is still alive.
    Killed,
    /// At most one player is alive.
    GameOver,
}

impl KillOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Killed => "KILLED",
            Self::GameOver => "GAME_OVER",
        }
    }
}

impl std::fmt::Display for KillOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What applying a kill to a room copy produced.
#[derive(Debug, Clone, PartialEq)]
pub struct KillResolution {
    pub outcome: KillOutcome,
    /// `false` when the target was already dead and nothing changed.
    pub changed: bool,
    /// Events to publish, in order.
    pub events: Vec<RoomEvent>,
}

/// Applies a kill to `room` in place.
///
/// Marks `player_id` dead, crediting the name of `killed_id` (empty if
/// no such player), then derives the outcome from the alive count. A
/// target that is already dead keeps its original kill metadata and
/// produces no events.
pub fn resolve_kill(
    room_id: RoomId,
    room: &mut RoomRecord,
    player_id: PlayerId,
    killed_id: PlayerId,
    stamp: &str,
) -> Result<KillResolution, RoomError> {
    let credited = room
        .player(killed_id)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let target = room
        .player_mut(player_id)
        .ok_or(RoomError::PlayerNotFound { room_id, player_id })?;
    let changed = target.mark_dead(stamp, credited.clone());
    let target_name = target.name.clone();

    let outcome = if room.alive_count() <= 1 {
        KillOutcome::GameOver
    } else {
        KillOutcome::Killed
    };

    let mut events = Vec::new();
    if changed {
        events.push(RoomEvent::KillEvent {
            room_id,
            killer_id: killed_id,
            killer_name: credited,
            killed_id: player_id,
            killed_name: target_name,
            killed_time: stamp.to_string(),
        });
        if outcome == KillOutcome::GameOver {
            let survivor = room.players.iter().find(|p| !p.is_dead());
            events.push(RoomEvent::GameOver {
                room_id,
                survivor_id: survivor.map(|p| p.player_id),
                survivor_name: survivor.map(|p| p.name.clone()),
            });
        }
    }

    Ok(KillResolution {
        outcome,
        changed,
        events,
    })
}

impl<S: RoomStore, N: Notifier> RoomService<S, N> {
    /// Marks `player_id` dead, credited to `killed_id`; see the module
    /// docs for why the roles read backwards.
    ///
    /// The updated player list is persisted before any event is emitted.
    /// If emitting fails the state change stands.
    pub async fn kill(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        killed_id: PlayerId,
    ) -> Result<KillOutcome, RoomError> {
        let _guard = self.locks.lock(room_id).await;
        let mut room = self.get_room(room_id).await?;

        let stamp = self.clock.stamp();
        let resolution = resolve_kill(room_id, &mut room, player_id, killed_id, &stamp)?;

        if !resolution.changed {
            tracing::debug!(%room_id, %player_id, "kill on dead player ignored");
            return Ok(resolution.outcome);
        }

        self.write_players(room_id, room.players).await?;
        tracing::info!(
            %room_id,
            dead = %player_id,
            credited = %killed_id,
            outcome = %resolution.outcome,
            "player killed"
        );

        for event in resolution.events {
            self.notifier.emit(event);
        }
        Ok(resolution.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killroom_protocol::Player;

    fn rid(raw: u32) -> RoomId {
        RoomId::try_from(raw).unwrap()
    }

    fn pid(raw: u32) -> PlayerId {
        PlayerId::try_from(raw).unwrap()
    }

    fn room_of(names: &[(u32, &str)]) -> RoomRecord {
        RoomRecord {
            players: names
                .iter()
                .map(|(id, name)| Player::new(pid(*id), *name))
                .collect(),
        }
    }

    #[test]
    fn test_two_players_kill_is_game_over() {
        let mut room = room_of(&[(1, "Alice"), (2, "Bob")]);
        let res = resolve_kill(rid(9), &mut room, pid(1), pid(2), "T").unwrap();

        assert_eq!(res.outcome, KillOutcome::GameOver);
        let alice = room.player(pid(1)).unwrap();
        assert!(alice.is_dead());
        assert_eq!(alice.kill_player_name(), "Bob");
        assert_eq!(alice.killed_time(), Some("T"));
        assert!(!room.player(pid(2)).unwrap().is_dead());

        assert_eq!(
            res.events,
            vec![
                RoomEvent::KillEvent {
                    room_id: rid(9),
                    killer_id: pid(2),
                    killer_name: "Bob".into(),
                    killed_id: pid(1),
                    killed_name: "Alice".into(),
                    killed_time: "T".into(),
                },
                RoomEvent::GameOver {
                    room_id: rid(9),
                    survivor_id: Some(pid(2)),
                    survivor_name: Some("Bob".into()),
                },
            ]
        );
    }

    #[test]
    fn test_three_players_kill_keeps_game_going() {
        let mut room = room_of(&[(1, "a"), (2, "b"), (3, "c")]);
        let res = resolve_kill(rid(1), &mut room, pid(3), pid(1), "T").unwrap();
        assert_eq!(res.outcome, KillOutcome::Killed);
        assert_eq!(res.events.len(), 1);
    }

    #[test]
    fn test_unknown_credited_player_gives_empty_name() {
        let mut room = room_of(&[(1, "a"), (2, "b"), (3, "c")]);
        resolve_kill(rid(1), &mut room, pid(1), pid(777), "T").unwrap();
        assert_eq!(room.player(pid(1)).unwrap().kill_player_name(), "");
    }

    #[test]
    fn test_missing_target_is_player_not_found() {
        let mut room = room_of(&[(1, "a")]);
        let err = resolve_kill(rid(1), &mut room, pid(5), pid(1), "T").unwrap_err();
        assert!(matches!(err, RoomError::PlayerNotFound { player_id, .. } if player_id == pid(5)));
        assert!(!room.player(pid(1)).unwrap().is_dead());
    }

    #[test]
    fn test_second_kill_on_dead_player_changes_nothing() {
        let mut room = room_of(&[(1, "a"), (2, "b"), (3, "c")]);
        resolve_kill(rid(1), &mut room, pid(1), pid(2), "first").unwrap();
        let res = resolve_kill(rid(1), &mut room, pid(1), pid(3), "second").unwrap();

        assert!(!res.changed);
        assert!(res.events.is_empty());
        assert_eq!(res.outcome, KillOutcome::Killed);
        let a = room.player(pid(1)).unwrap();
        assert_eq!(a.killed_time(), Some("first"));
        assert_eq!(a.kill_player_name(), "b");
    }

    #[test]
    fn test_last_player_dying_has_no_survivor() {
        let mut room = room_of(&[(1, "solo")]);
        let res = resolve_kill(rid(1), &mut room, pid(1), pid(1), "T").unwrap();
        assert_eq!(res.outcome, KillOutcome::GameOver);
        assert_eq!(
            res.events[1],
            RoomEvent::GameOver {
                room_id: rid(1),
                survivor_id: None,
                survivor_name: None,
            }
        );
    }

    #[test]
    fn test_clock_format() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let stamp = FixedOffsetClock::new(offset).stamp();
        // YYYY/MM/DD HH:MM:SS
        assert_eq!(stamp.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, KILL_TIME_FORMAT).is_ok());
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(KillOutcome::Killed.to_string(), "KILLED");
        assert_eq!(
            serde_json::to_value(KillOutcome::GameOver).unwrap(),
            serde_json::json!("GAME_OVER")
        );
    }
}
