use crate::game::constants::OUTBOUND_QUEUE_CAPACITY;
use crate::game::room::Room;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drives one socket: a writer task drains the session's outbound queue
/// while this task feeds inbound text frames to the room. Either side ending
/// tears the session down. The room drops the queue of a reader that falls
/// too far behind, which ends the writer and with it this loop.
pub async fn handle_socket(socket: WebSocket, room: Arc<Room>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);
    let session_id = room.add_session(tx).await;
    tracing::info!(session_id = %session_id, "websocket connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    loop {
        let result = tokio::select! {
            _ = &mut send_task => {
                tracing::debug!(session_id = %session_id, "outbound side closed");
                break;
            }
            next = receiver.next() => match next {
                Some(result) => result,
                None => break,
            },
        };
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(session_id = %session_id, %error, "websocket read failed");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                room.handle_text_message(&session_id, &text).await;
            }
            Message::Binary(_) => {
                tracing::debug!(session_id = %session_id, "ignoring binary frame");
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    room.remove_session(&session_id).await;
    send_task.abort();
    tracing::info!(session_id = %session_id, "websocket disconnected");
}
