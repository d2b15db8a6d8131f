//! HTTP API.
//!
//! Ids arrive as raw path segments and query values and are validated
//! here, before the service is called, so every route answers 400
//! `INVALID_ID` for anything outside `1..=999999`. Extractors are taken
//! as `Result`s so their rejections also get the JSON error body.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use killroom_protocol::{Player, PlayerId, RoomId};
use killroom_room::{PlayerUpdate, RoomService, RoomStore};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::ApiError;

type Shared<S> = State<Arc<RoomService<S>>>;

/// Builds the API router over a shared service.
pub fn router<S: RoomStore>(service: Arc<RoomService<S>>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/rooms", get(list_rooms::<S>).post(create_room::<S>))
        .route("/rooms/{room_id}", get(room_exists::<S>).delete(delete_room::<S>))
        .route(
            "/rooms/{room_id}/players",
            get(list_players::<S>).post(add_player::<S>),
        )
        .route(
            "/rooms/{room_id}/players/{player_id}",
            get(get_player::<S>)
                .put(update_player::<S>)
                .delete(remove_player::<S>),
        )
        .route("/rooms/{room_id}/players/{player_id}/kill", put(kill::<S>))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

// -- Bodies ------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Ack {
    message: &'static str,
}

const OK: Ack = Ack { message: "OK" };

#[derive(Debug, Serialize)]
struct RoomsBody {
    rooms: Vec<RoomId>,
}

#[derive(Debug, Serialize)]
struct ExistsBody {
    exists: bool,
}

#[derive(Debug, Serialize)]
struct RoomCreated {
    message: &'static str,
    room_id: RoomId,
}

#[derive(Debug, Serialize)]
struct PlayersBody {
    players: Vec<Player>,
}

#[derive(Debug, Serialize)]
struct PlayerAdded {
    message: &'static str,
    player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
struct AddPlayerParams {
    player_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    lat: Option<String>,
    lng: Option<String>,
    spec: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KillParams {
    killed_id: Option<String>,
}

// -- Handlers ----------------------------------------------------------------

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn list_rooms<S: RoomStore>(State(service): Shared<S>) -> Result<Json<RoomsBody>, ApiError> {
    let rooms = service.list_rooms().await?;
    Ok(Json(RoomsBody { rooms }))
}

async fn create_room<S: RoomStore>(
    State(service): Shared<S>,
) -> Result<Json<RoomCreated>, ApiError> {
    let room_id = service.create_room().await?;
    Ok(Json(RoomCreated {
        message: "OK",
        room_id,
    }))
}

async fn room_exists<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(room_id) = path?;
    let room_id = RoomId::parse(&room_id)?;
    let exists = service.room_exists(room_id).await?;
    let status = if exists {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(ExistsBody { exists })))
}

async fn delete_room<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Path(room_id) = path?;
    let room_id = RoomId::parse(&room_id)?;
    service.delete_room(room_id).await?;
    Ok(Json(OK))
}

async fn list_players<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<PlayersBody>, ApiError> {
    let Path(room_id) = path?;
    let room_id = RoomId::parse(&room_id)?;
    let players = service.get_players(room_id).await?;
    Ok(Json(PlayersBody { players }))
}

async fn add_player<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AddPlayerParams>, QueryRejection>,
) -> Result<Json<PlayerAdded>, ApiError> {
    let Path(room_id) = path?;
    let Query(params) = query?;
    let room_id = RoomId::parse(&room_id)?;
    let name = params
        .player_name
        .ok_or_else(|| ApiError::invalid_argument("player_name is required"))?;
    let player_id = service.add_player(room_id, &name).await?;
    Ok(Json(PlayerAdded {
        message: "OK",
        player_id,
    }))
}

async fn get_player<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Player>, ApiError> {
    let (room_id, player_id) = parse_pair(path?)?;
    Ok(Json(service.get_player(room_id, player_id).await?))
}

async fn update_player<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<UpdateParams>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let (room_id, player_id) = parse_pair(path?)?;
    let Query(params) = query?;
    let update = PlayerUpdate::parse(params.lat.as_deref(), params.lng.as_deref(), params.spec)?;
    service.update_player(room_id, player_id, update).await?;
    Ok(Json(OK))
}

async fn remove_player<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Ack>, ApiError> {
    let (room_id, player_id) = parse_pair(path?)?;
    service.remove_player(room_id, player_id).await?;
    Ok(Json(OK))
}

async fn kill<S: RoomStore>(
    State(service): Shared<S>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<KillParams>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let (room_id, player_id) = parse_pair(path?)?;
    let Query(params) = query?;
    let killed_id = params
        .killed_id
        .ok_or_else(|| ApiError::invalid_id("killed_id is required"))?;
    let killed_id = PlayerId::parse(&killed_id)?;

    let outcome = service.kill(room_id, player_id, killed_id).await?;
    Ok(Json(Ack {
        message: outcome.as_str(),
    }))
}

fn parse_pair(Path((room_id, player_id)): Path<(String, String)>) -> Result<(RoomId, PlayerId), ApiError> {
    Ok((RoomId::parse(&room_id)?, PlayerId::parse(&player_id)?))
}
