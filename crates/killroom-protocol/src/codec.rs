//! Codec trait and the JSON implementation used on the real-time channel.
//!
//! A codec converts between Rust types and the text frames sent to
//! subscribers. The gateway only depends on the [`Codec`] trait, so a
//! different encoding can be swapped in without touching it.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to text frames and decodes received frames.
///
/// `Send + Sync + 'static` because a codec is shared by every
/// connection task the gateway spawns.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// (e.g. a non-finite float inside an opaque status value).
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a received frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or does
    /// not match `T` (including out-of-range ids).
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ## Example
///
/// ```rust
/// use killroom_protocol::{ChannelMessage, Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let msg = ChannelMessage::Subscribed { room_id: RoomId::parse("42").unwrap() };
///
/// let text = codec.encode(&msg).unwrap();
/// assert_eq!(text, r#"{"type":"Subscribed","room_id":42}"#);
///
/// let decoded: ChannelMessage = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(decoded, msg);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelMessage, PlayerId, RoomEvent, RoomId};

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = JsonCodec.decode::<ChannelMessage>(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_unknown_type_is_decode_error() {
        let err = JsonCodec
            .decode::<ChannelMessage>(br#"{"type":"Teleport","room_id":1}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_event_envelope_layout() {
        let msg = ChannelMessage::Event {
            event: RoomEvent::KillEvent {
                room_id: RoomId::parse("10").unwrap(),
                killer_id: PlayerId::parse("2").unwrap(),
                killer_name: "Bob".into(),
                killed_id: PlayerId::parse("1").unwrap(),
                killed_name: "Alice".into(),
                killed_time: "2024/05/01 12:00:00".into(),
            },
        };
        let text = JsonCodec.encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "Event");
        assert_eq!(value["event"]["event"], "kill_event");
        assert_eq!(value["event"]["killer_name"], "Bob");
        assert_eq!(value["event"]["killed_id"], 1);
    }
}
