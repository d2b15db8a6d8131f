//! Event channel: one task per WebSocket observer.
//!
//! The flow is:
//!   1. Receive `Subscribe` within [`SUBSCRIBE_TIMEOUT`]
//!   2. Register with the hub, send `Subscribed`
//!   3. Forward room events until the client leaves, the room is deleted,
//!      or the observer falls too far behind

use std::time::Duration;

use killroom_protocol::{ChannelMessage, Codec, ProtocolError, RoomId};
use killroom_room::{NotifyHandle, SubscriberId, Subscription};
use killroom_transport::{Connection, WebSocketConnection};

use crate::KillroomError;

/// How long a new connection may stay silent before it is dropped.
pub const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Unsubscribes from the hub when the handler exits, however it exits.
struct SubscriptionGuard {
    hub: NotifyHandle,
    room_id: RoomId,
    id: SubscriberId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.room_id, self.id);
    }
}

/// Handles a single observer connection from accept to close.
pub(crate) async fn handle_observer<C: Codec>(
    conn: WebSocketConnection,
    hub: NotifyHandle,
    codec: C,
) -> Result<(), KillroomError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "observer connected");

    let room_id = match await_subscribe(&conn, &codec).await {
        Ok(room_id) => room_id,
        Err(e) => {
            send_error(&conn, &codec, 400, &e.to_string()).await;
            return Err(e);
        }
    };

    let Subscription {
        id,
        room_id,
        mut events,
    } = hub.subscribe(room_id).await?;
    let _guard = SubscriptionGuard {
        hub: hub.clone(),
        room_id,
        id,
    };

    let ack = codec.encode(&ChannelMessage::Subscribed { room_id })?;
    conn.send_text(&ack).await?;
    tracing::info!(%conn_id, %room_id, subscriber = %id, "observer subscribed");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let frame = codec.encode(&ChannelMessage::Event { event })?;
                    conn.send_text(&frame).await?;
                }
                None => {
                    tracing::info!(%conn_id, %room_id, "subscription ended, releasing observer");
                    let _ = conn.close().await;
                    break;
                }
            },
            incoming = conn.recv() => match incoming {
                // Observers have nothing more to say; ignore chatter.
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!(%conn_id, %room_id, "observer left");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
        }
    }

    Ok(())
}

/// Waits for the client's `Subscribe` and returns the room it names.
async fn await_subscribe<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
) -> Result<RoomId, KillroomError> {
    let data = match tokio::time::timeout(SUBSCRIBE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("closed before subscribing".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("no Subscribe within timeout".into()).into());
        }
    };

    match codec.decode::<ChannelMessage>(&data)? {
        ChannelMessage::Subscribe { room_id } => Ok(room_id),
        other => Err(ProtocolError::InvalidMessage(format!(
            "expected Subscribe, got {other:?}"
        ))
        .into()),
    }
}

/// Best-effort error frame; the connection may already be gone.
async fn send_error<C: Codec>(conn: &WebSocketConnection, codec: &C, code: u16, message: &str) {
    let msg = ChannelMessage::Error {
        code,
        message: message.to_string(),
    };
    if let Ok(text) = codec.encode(&msg) {
        let _ = conn.send_text(&text).await;
    }
}
