//! Unified error type for the Killroom server, and the HTTP error body.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use killroom_protocol::ProtocolError;
use killroom_room::{NotifyError, RoomError};
use killroom_transport::TransportError;
use serde::Serialize;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KillroomError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (bad id, encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, bad argument, storage).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The notification hub is gone.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The environment held an unusable setting.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or serving the HTTP listener failed.
    #[error("http listener: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed HTTP request.
///
/// Rendered as `{"message": ..., "code": ...}` with the matching status.
/// `detail` is logged but never sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_ID", message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message)
    }

    /// A 500 whose cause is logged, not returned.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal Server Error",
            )
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidId { .. } => Self::invalid_id(err.to_string()),
            other => Self::invalid_argument(other.to_string()),
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::InvalidArgument(msg) => Self::invalid_argument(msg),
            RoomError::RoomNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", err.to_string())
            }
            RoomError::PlayerNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "PLAYER_NOT_FOUND", err.to_string())
            }
            RoomError::IdSpaceExhausted(_) | RoomError::Storage(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_argument(rejection.body_text())
    }
}

/// Path parameters are all ids, so an unreadable one is an invalid id.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_id(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                error = self.detail.as_deref().unwrap_or(&self.message),
                "request failed"
            );
        } else {
            tracing::warn!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                "request rejected"
            );
        }
        let body = ErrorBody {
            message: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
