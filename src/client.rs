//! Headless terminal client: joins the lobby, turns stdin lines into
//! commands and prints a one-line summary of every server message.

use crate::game::types::Direction;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::shared::names::sanitize_player_name;
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Steer(Direction),
    Forfeit,
    Restart,
    Login,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim().to_ascii_lowercase();
    let command = match word.as_str() {
        "start" => Command::Start,
        "w" | "up" => Command::Steer(Direction::Up),
        "s" | "down" => Command::Steer(Direction::Down),
        "a" | "left" => Command::Steer(Direction::Left),
        "d" | "right" => Command::Steer(Direction::Right),
        "forfeit" => Command::Forfeit,
        "restart" => Command::Restart,
        "login" => Command::Login,
        "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Only the server's direct reply names this socket's id; roster broadcasts
/// may hold other players with the same display name.
fn assigned_id(message: &ServerMessage) -> Option<&str> {
    match message {
        ServerMessage::Joined { id } => Some(id),
        _ => None,
    }
}

fn describe(message: &ServerMessage, me: Option<&str>) -> String {
    match message {
        ServerMessage::Joined { id } => format!("you are {id}"),
        ServerMessage::WaitingRoom { players } => format!("waiting room: {}", players.join(", ")),
        ServerMessage::StartGame => "round started".to_string(),
        ServerMessage::GameState(snapshot) => {
            let mine = me.and_then(|id| {
                let head = snapshot.snakes.get(id)?.first().copied()?;
                let score = snapshot.scores.get(id).copied().unwrap_or_default();
                Some(format!("; you at ({}, {}) score {}", head.x, head.y, score))
            });
            format!(
                "tick {}: {} alive, {} food{}",
                snapshot.tick,
                snapshot.snakes.len(),
                snapshot.food.len(),
                mine.unwrap_or_default()
            )
        }
        ServerMessage::PlayerEliminated { id } => format!("{id} was eliminated"),
        ServerMessage::Scoreboard { players } => {
            let ranking = players
                .iter()
                .enumerate()
                .map(|(index, id)| format!("{}. {id}", index + 1))
                .collect::<Vec<_>>()
                .join("  ");
            format!("scoreboard: {ranking}")
        }
    }
}

fn command_message(command: Command, me: Option<&str>) -> Option<ClientMessage> {
    match command {
        Command::Start => Some(ClientMessage::StartGame),
        Command::Steer(direction) => Some(ClientMessage::UpdateDirection {
            id: me?.to_string(),
            direction: direction.as_str().to_string(),
        }),
        Command::Forfeit => Some(ClientMessage::PlayerEliminated {
            id: me?.to_string(),
        }),
        Command::Restart => Some(ClientMessage::RestartGame),
        Command::Login => Some(ClientMessage::ReturnToLogin),
        Command::Quit => None,
    }
}

pub async fn run_client(url: &str, name: &str) -> anyhow::Result<()> {
    let (stream, _) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    tracing::info!(url, "connected");
    let (mut ws_sender, mut ws_receiver) = stream.split();

    let name = sanitize_player_name(name, "Player");
    let join = protocol::encode_client_message(&ClientMessage::Join { name: name.clone() })?;
    ws_sender.send(Message::Text(join)).await?;
    println!("joined as {name}; commands: start, w/a/s/d, forfeit, restart, login, quit");

    let mut me: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => return Err(error).context("websocket read failed"),
                    Some(Ok(_)) => continue,
                };
                match protocol::decode_server_message(&text) {
                    Ok(message) => {
                        if let Some(id) = assigned_id(&message) {
                            me = Some(id.to_string());
                        }
                        println!("{}", describe(&message, me.as_deref()));
                    }
                    Err(error) => tracing::debug!(%error, "ignoring server message"),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = parse_command(&line) else {
                    println!("unknown command `{}`", line.trim());
                    continue;
                };
                if command == Command::Quit {
                    break;
                }
                let Some(message) = command_message(command, me.as_deref()) else {
                    println!("not in the lobby yet");
                    continue;
                };
                let payload = protocol::encode_client_message(&message)?;
                ws_sender.send(Message::Text(payload)).await?;
            }
        }
    }

    if let Err(error) = ws_sender.close().await {
        tracing::debug!(%error, "websocket close failed");
    }
    tracing::info!("disconnected");
    Ok(())
}
