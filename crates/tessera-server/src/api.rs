//! HTTP API for a tessera node.
//!
//! Round lifecycle (create, join, mark solved) and read-side views
//! (hints, leaderboard, contributions, action log) live here; vote
//! traffic runs over the WebSocket at `/api/v1/ws`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tessera_consensus::{PlayerId, UnsureHint};
use tessera_grid::GridDims;
use tessera_store::{ActionRecord, RoundId, RoundMeta};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::error::Error;
use crate::service::RoundService;
use crate::ws::{hints_to_wire, ws_handler};

type AppState = Arc<RoundService>;

/// Build the API router.
pub fn build_router(service: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/rounds", post(create_round))
        .route("/api/v1/rounds/:id", get(get_round))
        .route("/api/v1/rounds/:id/join", post(join_round))
        .route("/api/v1/rounds/:id/solved", post(mark_solved))
        .route("/api/v1/rounds/:id/hints", get(get_hints))
        .route("/api/v1/rounds/:id/leaderboard", get(get_leaderboard))
        .route("/api/v1/rounds/:id/contributions", get(get_contributions))
        .route("/api/v1/rounds/:id/actions", get(get_actions))
        .route("/api/v1/ws", get(ws_handler))
        .layer(cors)
        .with_state(service)
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn internal<E: std::fmt::Display>(e: E) -> StatusCode {
    error!("api error: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct CreateRoundRequest {
    round_id: RoundId,
    cols: usize,
    rows: usize,
}

async fn create_round(
    State(service): State<AppState>,
    Json(req): Json<CreateRoundRequest>,
) -> Result<(StatusCode, Json<RoundMeta>), StatusCode> {
    if req.cols < 1 || req.rows < 1 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let storage = service.storage();
    if storage.get_round(req.round_id).map_err(internal)?.is_some() {
        return Err(StatusCode::CONFLICT);
    }
    let meta = RoundMeta::new(req.round_id, GridDims::new(req.cols, req.rows));
    storage.put_round(&meta).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(meta)))
}

async fn get_round(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
) -> Result<Json<RoundMeta>, StatusCode> {
    match service.storage().get_round(id) {
        Ok(Some(meta)) => Ok(Json(meta)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => Err(internal(e)),
    }
}

#[derive(Debug, Deserialize)]
struct JoinRoundRequest {
    player: PlayerId,
}

#[derive(Debug, Serialize)]
struct JoinRoundResponse {
    joined: bool,
    players: Vec<PlayerId>,
}

async fn join_round(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
    Json(req): Json<JoinRoundRequest>,
) -> Result<Json<JoinRoundResponse>, StatusCode> {
    let storage = service.storage();
    if storage.get_round(id).map_err(internal)?.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let joined = storage.join_round(id, &req.player).map_err(internal)?;
    let meta = storage
        .get_round(id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(JoinRoundResponse {
        joined,
        players: meta.players,
    }))
}

async fn mark_solved(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
) -> Result<Json<RoundMeta>, StatusCode> {
    let storage = service.storage();
    if storage.get_round(id).map_err(internal)?.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    storage.incr_solved(id).map_err(internal)?;
    let meta = storage
        .get_round(id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(meta))
}

#[derive(Debug, Serialize)]
struct HintsResponseBody {
    sure: Vec<[i64; 4]>,
    unsure: Vec<UnsureHint>,
}

async fn get_hints(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
) -> Result<Json<HintsResponseBody>, StatusCode> {
    let hints = service.hints(id).await.map_err(|e| status_for(&e))?;
    Ok(Json(HintsResponseBody {
        sure: hints_to_wire(&hints.sure),
        unsure: hints.unsure,
    }))
}

#[derive(Debug, Serialize)]
struct LeaderboardEntry {
    player: PlayerId,
    score: i64,
}

async fn get_leaderboard(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
) -> Result<Json<Vec<LeaderboardEntry>>, StatusCode> {
    let storage = service.storage();
    if storage.get_round(id).map_err(internal)?.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let entries = storage
        .leaderboard(id)
        .map_err(internal)?
        .into_iter()
        .map(|(player, score)| LeaderboardEntry { player, score })
        .collect();
    Ok(Json(entries))
}

async fn get_contributions(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
) -> Result<Json<std::collections::BTreeMap<PlayerId, f64>>, StatusCode> {
    let shares = service.contributions(id).await.map_err(|e| status_for(&e))?;
    Ok(Json(shares))
}

async fn get_actions(
    State(service): State<AppState>,
    Path(id): Path<RoundId>,
) -> Result<Json<Vec<ActionRecord>>, StatusCode> {
    let storage = service.storage();
    if storage.get_round(id).map_err(internal)?.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let actions = storage.list_actions(id).map_err(internal)?;
    Ok(Json(actions))
}
