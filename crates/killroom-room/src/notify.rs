//! Room notifications: the [`Notifier`] seam and the broadcast hub.
//!
//! The hub is an isolated Tokio task that owns the room → subscribers
//! table. Everything else talks to it through a [`NotifyHandle`] over an
//! unbounded channel, so emitting never blocks a request.
//!
//! Each subscriber gets a queue of [`SUBSCRIBER_BUFFER`] events. A
//! subscriber whose queue is full has stopped reading; it is dropped
//! from the table, which ends its stream.

use std::collections::HashMap;

use killroom_protocol::{RoomEvent, RoomId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::NotifyError;

/// Events a subscriber may fall behind by before it is dropped.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Push delivery of room events to observers.
///
/// Fire-and-forget: no acknowledgement, no delivery guarantee, and no
/// ordering relative to the HTTP response of the request that caused
/// the event.
pub trait Notifier: Send + Sync + 'static {
    /// Publishes `event` to the observers of `event.room_id()`.
    fn emit(&self, event: RoomEvent);

    /// The room is gone; its observers can be released. Default: no-op.
    fn room_closed(&self, _room_id: RoomId) {}
}

/// Identifies one subscription within the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A live subscription to one room's events.
///
/// `events` yields `None` once the room is closed, the subscriber fell
/// too far behind, or the hub stops.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub room_id: RoomId,
    pub events: mpsc::Receiver<RoomEvent>,
}

type EventSender = mpsc::Sender<RoomEvent>;

/// Commands sent to the hub task.
enum HubCommand {
    Emit(RoomEvent),
    Subscribe {
        room_id: RoomId,
        reply: oneshot::Sender<Subscription>,
    },
    Unsubscribe {
        room_id: RoomId,
        id: SubscriberId,
    },
    CloseRoom(RoomId),
    Count {
        room_id: RoomId,
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the hub task. Cheap to clone.
///
/// The hub stops once every handle has been dropped.
#[derive(Clone)]
pub struct NotifyHandle {
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl NotifyHandle {
    /// Spawns a hub task on the current runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Hub {
            rooms: HashMap::new(),
            next_id: 1,
            receiver: rx,
        };
        tokio::spawn(hub.run());
        Self { sender: tx }
    }

    /// Starts observing `room_id`. The room does not have to exist.
    pub async fn subscribe(&self, room_id: RoomId) -> Result<Subscription, NotifyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Subscribe {
                room_id,
                reply: reply_tx,
            })
            .map_err(|_| NotifyError::HubStopped)?;
        reply_rx.await.map_err(|_| NotifyError::HubStopped)
    }

    /// Ends a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, room_id: RoomId, id: SubscriberId) {
        let _ = self.sender.send(HubCommand::Unsubscribe { room_id, id });
    }

    /// Number of live subscriptions on `room_id`.
    pub async fn subscriber_count(&self, room_id: RoomId) -> Result<usize, NotifyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Count {
                room_id,
                reply: reply_tx,
            })
            .map_err(|_| NotifyError::HubStopped)?;
        reply_rx.await.map_err(|_| NotifyError::HubStopped)
    }
}

impl Notifier for NotifyHandle {
    fn emit(&self, event: RoomEvent) {
        if self.sender.send(HubCommand::Emit(event)).is_err() {
            tracing::debug!("notification hub stopped, event dropped");
        }
    }

    fn room_closed(&self, room_id: RoomId) {
        let _ = self.sender.send(HubCommand::CloseRoom(room_id));
    }
}

/// The hub task state.
struct Hub {
    rooms: HashMap<RoomId, Vec<(SubscriberId, EventSender)>>,
    next_id: u64,
    receiver: mpsc::UnboundedReceiver<HubCommand>,
}

impl Hub {
    async fn run(mut self) {
        tracing::debug!("notification hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Emit(event) => self.broadcast(event),
                HubCommand::Subscribe { room_id, reply } => {
                    let subscription = self.subscribe(room_id);
                    let id = subscription.id;
                    // Caller gave up waiting; undo.
                    if reply.send(subscription).is_err() {
                        self.unsubscribe(room_id, id);
                    }
                }
                HubCommand::Unsubscribe { room_id, id } => self.unsubscribe(room_id, id),
                HubCommand::CloseRoom(room_id) => {
                    if let Some(subs) = self.rooms.remove(&room_id) {
                        tracing::debug!(%room_id, released = subs.len(), "room closed");
                    }
                }
                HubCommand::Count { room_id, reply } => {
                    let count = self.rooms.get(&room_id).map_or(0, Vec::len);
                    let _ = reply.send(count);
                }
            }
        }

        tracing::debug!("notification hub stopped");
    }

    fn subscribe(&mut self, room_id: RoomId) -> Subscription {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.rooms.entry(room_id).or_default().push((id, tx));
        tracing::debug!(%room_id, subscriber = %id, "subscribed");
        Subscription {
            id,
            room_id,
            events: rx,
        }
    }

    fn unsubscribe(&mut self, room_id: RoomId, id: SubscriberId) {
        if let Some(subs) = self.rooms.get_mut(&room_id) {
            subs.retain(|(sid, _)| *sid != id);
            if subs.is_empty() {
                self.rooms.remove(&room_id);
            }
        }
    }

    /// Sends to every subscriber of the event's room without waiting,
    /// pruning the ones whose receiver is gone or whose queue is full.
    fn broadcast(&mut self, event: RoomEvent) {
        let room_id = event.room_id();
        let Some(subs) = self.rooms.get_mut(&room_id) else {
            return;
        };
        subs.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%room_id, subscriber = %id, "subscriber lagging, dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
        tracing::debug!(%room_id, delivered = subs.len(), "event broadcast");
        if subs.is_empty() {
            self.rooms.remove(&room_id);
        }
    }
}
