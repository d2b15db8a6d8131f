//! Error types for the protocol layer.

/// Errors raised while validating ids or converting wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An id was not an integer or fell outside `1..=999999`.
    #[error("invalid id {value:?}: {reason}")]
    InvalidId {
        value: String,
        reason: &'static str,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown message type,
    /// missing fields, or an id that fails validation.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks channel rules, e.g. anything other
    /// than `Subscribe` as the first client message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
