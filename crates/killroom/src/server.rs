//! `KillroomServer` builder and server loop.
//!
//! Ties the layers together: HTTP API → room service → notification hub
//! → WebSocket observers. Both listeners are bound by
//! [`KillroomServerBuilder::build`], so their addresses are known (and
//! port `0` resolved) before [`KillroomServer::run`] is called.

use std::net::SocketAddr;
use std::sync::Arc;

use killroom_protocol::{Codec, JsonCodec};
use killroom_room::{MemoryStore, NotifyHandle, RoomService, RoomStore};
use killroom_transport::{Pending, Transport, WebSocketTransport};
use tokio::net::TcpListener;

use crate::gateway::handle_observer;
use crate::{KillroomError, ServerConfig, http};

/// Builder for configuring and starting a Killroom server.
///
/// # Example
///
/// ```rust,ignore
/// use killroom::prelude::*;
///
/// let server = KillroomServer::builder()
///     .bind_http("0.0.0.0:8080")
///     .bind_events("0.0.0.0:8081")
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct KillroomServerBuilder {
    config: ServerConfig,
}

impl KillroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once, e.g. with [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP API address.
    pub fn bind_http(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    /// Sets the WebSocket event channel address.
    pub fn bind_events(mut self, addr: &str) -> Self {
        self.config.events_addr = addr.to_string();
        self
    }

    /// Binds both listeners and wires a fresh service over `store`.
    ///
    /// Spawns the notification hub, so this must run inside a Tokio
    /// runtime.
    pub async fn build<S: RoomStore>(self, store: S) -> Result<KillroomServer<S>, KillroomError> {
        let hub = NotifyHandle::spawn();
        let service = RoomService::new(store, hub, self.config.service);
        self.build_with_service(service).await
    }

    /// Binds both listeners around an already configured service.
    ///
    /// Observers subscribe through the service's own notifier, so the
    /// service's events reach them.
    pub async fn build_with_service<S: RoomStore>(
        self,
        service: RoomService<S>,
    ) -> Result<KillroomServer<S>, KillroomError> {
        let http = TcpListener::bind(&self.config.http_addr).await?;
        tracing::info!(addr = %self.config.http_addr, "HTTP API listening");
        let events = WebSocketTransport::bind(&self.config.events_addr).await?;

        Ok(KillroomServer {
            http,
            events,
            hub: service.notifier().clone(),
            service: Arc::new(service),
            codec: JsonCodec,
        })
    }
}

impl Default for KillroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Killroom server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct KillroomServer<S: RoomStore = MemoryStore, C: Codec = JsonCodec> {
    http: TcpListener,
    events: WebSocketTransport,
    service: Arc<RoomService<S>>,
    hub: NotifyHandle,
    codec: C,
}

impl KillroomServer {
    /// Creates a new builder.
    pub fn builder() -> KillroomServerBuilder {
        KillroomServerBuilder::new()
    }
}

impl<S: RoomStore, C: Codec + Clone> KillroomServer<S, C> {
    /// Address of the HTTP API.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// Address of the WebSocket event channel.
    pub fn events_addr(&self) -> std::io::Result<SocketAddr> {
        self.events.local_addr()
    }

    /// The service behind the API.
    pub fn service(&self) -> &Arc<RoomService<S>> {
        &self.service
    }

    /// Serves HTTP and the event channel until either fails.
    pub async fn run(self) -> Result<(), KillroomError> {
        let Self {
            http: listener,
            events,
            service,
            hub,
            codec,
        } = self;
        tracing::info!("Killroom server running");

        let api = axum::serve(listener, http::router(service)).into_future();

        tokio::select! {
            result = api => result.map_err(KillroomError::from),
            () = accept_observers(events, hub, codec) => Ok(()),
        }
    }
}

/// Accepts observer connections and spawns a handler task for each.
///
/// The WebSocket handshake runs inside that task, so a peer that never
/// completes it only ties up its own task until the handshake times out.
async fn accept_observers<C: Codec + Clone>(
    mut transport: WebSocketTransport,
    hub: NotifyHandle,
    codec: C,
) {
    loop {
        match transport.accept().await {
            Ok(pending) => {
                let hub = hub.clone();
                let codec = codec.clone();
                tokio::spawn(async move {
                    let peer = pending.peer_addr();
                    let conn = match pending.upgrade().await {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::debug!(%peer, error = %e, "handshake failed");
                            return;
                        }
                    };
                    if let Err(e) = handle_observer(conn, hub, codec).await {
                        tracing::debug!(error = %e, "observer ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}
