use crate::game::round::Snapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TYPE_JOIN: &str = "join";
pub const TYPE_JOINED: &str = "joined";
pub const TYPE_WAITING_ROOM: &str = "waiting_room";
pub const TYPE_START_GAME: &str = "start_game";
pub const TYPE_UPDATE_DIRECTION: &str = "update_direction";
pub const TYPE_GAME_STATE: &str = "game_state";
pub const TYPE_PLAYER_ELIMINATED: &str = "player_eliminated";
pub const TYPE_SCOREBOARD: &str = "scoreboard";
pub const TYPE_RESTART_GAME: &str = "restart_game";
pub const TYPE_RETURN_TO_LOGIN: &str = "return_to_login";

const CLIENT_TYPES: [&str; 6] = [
    TYPE_JOIN,
    TYPE_START_GAME,
    TYPE_UPDATE_DIRECTION,
    TYPE_PLAYER_ELIMINATED,
    TYPE_RESTART_GAME,
    TYPE_RETURN_TO_LOGIN,
];

const SERVER_TYPES: [&str; 6] = [
    TYPE_JOINED,
    TYPE_WAITING_ROOM,
    TYPE_START_GAME,
    TYPE_GAME_STATE,
    TYPE_PLAYER_ELIMINATED,
    TYPE_SCOREBOARD,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { name: String },
    StartGame,
    UpdateDirection { id: String, direction: String },
    PlayerEliminated { id: String },
    RestartGame,
    ReturnToLogin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent only to the joining socket, carrying the id it now owns.
    Joined { id: String },
    WaitingRoom { players: Vec<String> },
    StartGame,
    GameState(Snapshot),
    PlayerEliminated { id: String },
    Scoreboard { players: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message has no string `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("malformed `{kind}` message: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Unknown types are tolerated so newer clients can talk to older servers.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, ProtocolError::UnknownType(_))
    }
}

pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    decode_tagged(text, &CLIENT_TYPES)
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    decode_tagged(text, &SERVER_TYPES)
}

pub fn encode_server_message(message: &ServerMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn encode_client_message(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

fn decode_tagged<T>(text: &str, known: &[&str]) -> Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(|kind| kind.as_str())
        .ok_or(ProtocolError::MissingType)?
        .to_string();
    if !known.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownType(kind));
    }
    serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { kind, source })
}
