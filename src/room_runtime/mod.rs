use crate::app::config::GameConfig;
use crate::game::room::Room;
use crate::transport::ws_session::handle_socket;
use axum::{
    extract::{State, WebSocketUpgrade},
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct ServerState {
    room: Arc<Room>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    sessions: usize,
    players: usize,
    #[serde(rename = "roundActive")]
    round_active: bool,
    tick: u64,
}

pub fn router(room: Arc<Room>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);
    Router::new()
        .route("/api/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(Arc::new(ServerState { room }))
}

/// Serves one room until ctrl-c.
pub async fn run_server(address: SocketAddr, config: GameConfig) -> anyhow::Result<()> {
    tracing::info!(
        width = config.board_width,
        height = config.board_height,
        tick_ms = config.tick_ms,
        max_players = config.max_players,
        "room configured"
    );
    let room = Arc::new(Room::new(config));
    let app = router(room);

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let room = Arc::clone(&state.room);
    ws.on_upgrade(move |socket| handle_socket(socket, room))
}

async fn health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let stats = state.room.stats().await;
    Json(HealthResponse {
        ok: true,
        sessions: stats.sessions,
        players: stats.participants,
        round_active: stats.round_active,
        tick: stats.tick,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{self, ServerMessage};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    #[tokio::test]
    async fn websocket_join_round_trip() {
        let room = Arc::new(Room::new(GameConfig {
            tick_ms: 60_000,
            ..GameConfig::default()
        }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let address = listener.local_addr().expect("address");
        let server = tokio::spawn(async move {
            axum::serve(listener, router(room)).await.expect("serve");
        });

        let (mut stream, _) = connect_async(format!("ws://{address}/ws"))
            .await
            .expect("connect");
        stream
            .send(Message::Text(r#"{"type":"join","name":"ana"}"#.to_string()))
            .await
            .expect("send");

        let mut replies = Vec::new();
        while replies.len() < 2 {
            if let Message::Text(text) = stream.next().await.expect("frame").expect("message") {
                replies.push(protocol::decode_server_message(&text).expect("decode"));
            }
        }
        assert_eq!(
            replies,
            vec![
                ServerMessage::Joined {
                    id: "ana".to_string()
                },
                ServerMessage::WaitingRoom {
                    players: vec!["ana".to_string()]
                },
            ]
        );
        server.abort();
    }
}
