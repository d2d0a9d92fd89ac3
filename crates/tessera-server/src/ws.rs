//! WebSocket transport for round traffic.
//!
//! Clients hold one socket per session and exchange JSON frames tagged
//! by `type`. Votes are fire-and-forget acknowledged; hint requests get
//! a reply frame. On the wire a hint grid is a flat array of four-slot
//! rows with `-1` standing in for "no hint", matching what the board UI
//! renders directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tessera_consensus::{HintGrid, PlayerId, UnsureHint};
use tessera_grid::{EdgeKey, TileId};
use tessera_store::{PeerEdges, RoundId};
use tracing::{debug, error, info, warn};

use crate::service::{RoundService, VoteMessage};

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A vote batch against the live ledger.
    Vote(VoteMessage),
    /// A vote batch against the solver-side ledger.
    SolverVote(VoteMessage),
    /// Replace the solver's confirmed edge list.
    SolverMerge {
        round_id: RoundId,
        edges: Vec<EdgeKey>,
    },
    /// Current hints for a round.
    Hints { round_id: RoundId },
    /// Edge sets of two sampled co-players.
    PeerHints {
        round_id: RoundId,
        player: PlayerId,
    },
    /// Per-player hint contribution shares.
    Contributions { round_id: RoundId },
}

/// Frames the server sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack,
    Hints {
        sure: Vec<[i64; 4]>,
        unsure: Vec<UnsureHint>,
    },
    PeerHints {
        peers: Vec<PeerEdges>,
    },
    Contributions {
        shares: BTreeMap<PlayerId, f64>,
    },
    Error {
        message: String,
    },
}

/// Encode a hint grid in its wire form, `-1` for empty slots.
pub fn hints_to_wire(hints: &HintGrid) -> Vec<[i64; 4]> {
    hints
        .iter()
        .map(|slots| {
            let mut row = [-1i64; 4];
            for (i, slot) in slots.iter().enumerate() {
                if let Some(tile) = slot {
                    row[i] = *tile as i64;
                }
            }
            row
        })
        .collect()
}

/// Decode a wire hint grid back into indexed form. Negative entries
/// become empty slots.
pub fn hints_from_wire(wire: &[[i64; 4]]) -> HintGrid {
    wire.iter()
        .map(|row| {
            let mut slots = [None; 4];
            for (i, v) in row.iter().enumerate() {
                if *v >= 0 {
                    slots[i] = Some(*v as TileId);
                }
            }
            slots
        })
        .collect()
}

/// WebSocket upgrade endpoint.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<Arc<RoundService>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, service))
}

async fn handle_socket(mut socket: WebSocket, service: Arc<RoundService>) {
    info!("websocket client connected");

    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => dispatch(&service, msg).await,
                    Err(e) => {
                        debug!("unparseable client frame: {e}");
                        ServerMessage::Error {
                            message: format!("bad message: {e}"),
                        }
                    }
                };
                if let Err(e) = send_message(&mut socket, reply).await {
                    warn!("failed to send reply: {e}");
                    break;
                }
            }
            Some(Ok(Message::Ping(data))) => {
                if let Err(e) = socket.send(Message::Pong(data)).await {
                    warn!("failed to send pong: {e}");
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!("websocket client disconnected");
                break;
            }
            Some(Err(e)) => {
                error!("websocket error: {e}");
                break;
            }
            _ => {}
        }
    }
}

async fn dispatch(service: &RoundService, msg: ClientMessage) -> ServerMessage {
    let result = match msg {
        ClientMessage::Vote(vote) => service.process_vote(vote).await.map(|()| ServerMessage::Ack),
        ClientMessage::SolverVote(vote) => {
            service.solver_vote(vote).await.map(|()| ServerMessage::Ack)
        }
        ClientMessage::SolverMerge { round_id, edges } => service
            .solver_merge(round_id, edges)
            .await
            .map(|()| ServerMessage::Ack),
        ClientMessage::Hints { round_id } => {
            service.hints(round_id).await.map(|hints| ServerMessage::Hints {
                sure: hints_to_wire(&hints.sure),
                unsure: hints.unsure,
            })
        }
        ClientMessage::PeerHints { round_id, player } => service
            .peer_hints(round_id, &player)
            .await
            .map(|peers| ServerMessage::PeerHints { peers }),
        ClientMessage::Contributions { round_id } => service
            .contributions(round_id)
            .await
            .map(|shares| ServerMessage::Contributions { shares }),
    };
    result.unwrap_or_else(|e| ServerMessage::Error {
        message: e.to_string(),
    })
}

async fn send_message(socket: &mut WebSocket, msg: ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&msg).map_err(|e| {
        axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;
    socket.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_grid::Orientation;

    #[test]
    fn vote_frame_parses() {
        let json = r#"{
            "type": "vote",
            "round_id": 7,
            "player": "alice",
            "hinted": true,
            "edges": [
                {"x": 3, "y": 4, "tag": "L-R", "size": 2.0, "hinted": true, "from": "bob"}
            ]
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        let ClientMessage::Vote(vote) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(vote.round_id, 7);
        assert!(vote.hinted);
        assert_eq!(vote.edges[0].orientation, Orientation::Horizontal);
        assert_eq!(vote.edges[0].from.as_deref(), Some("bob"));
    }

    #[test]
    fn wire_grid_uses_minus_one_sentinel() {
        let hints: HintGrid = vec![[None, Some(1), None, None], [None, None, None, Some(0)]];
        let wire = hints_to_wire(&hints);
        assert_eq!(wire, vec![[-1, 1, -1, -1], [-1, -1, -1, 0]]);
        assert_eq!(hints_from_wire(&wire), hints);
    }

    #[test]
    fn error_frame_shape() {
        let msg = ServerMessage::Error {
            message: "round 9 not found".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"error\""));
    }
}
