use super::collision::DeathCause;
#[cfg(test)]
use super::round::Snapshot;
use super::round::Round;
use super::types::Direction;
use crate::app::config::GameConfig;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::shared::names::{sanitize_player_name, unique_participant_id};
use broadcast::Outbox;
use session::SessionEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

mod broadcast;
mod session;


const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug)]
pub struct Room {
  state: Mutex<RoomState>,
  intents: UnboundedSender<Intent>,
  tick_interval: Duration,
  running: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomStats {
  pub sessions: usize,
  pub participants: usize,
  pub round_active: bool,
  pub tick: u64,
}

/// A direction request waiting for the next tick. Ownership of the
/// participant is checked against the session when intents are drained.
#[derive(Debug)]
struct Intent {
  session_id: String,
  participant_id: String,
  direction: Direction,
}

#[derive(Debug)]
struct RoomState {
  config: GameConfig,
  sessions: HashMap<String, SessionEntry>,
  roster: Vec<String>,
  round: Option<Round>,
  last_scoreboard: Vec<String>,
  intents: UnboundedReceiver<Intent>,
}

/// Messages produced under the lock together with the senders to deliver
/// them to once the lock is released. `reply` goes to a single session
/// ahead of the broadcast.
#[derive(Debug, Default)]
struct Pending {
  messages: Vec<ServerMessage>,
  outbox: Outbox,
  reply: Option<(Outbox, Vec<ServerMessage>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
  Idle,
  Ticked { tick: u64, finished: bool },
}

impl Room {
  pub fn new(config: GameConfig) -> Self {
    let (intents, intents_rx) = mpsc::unbounded_channel();
    Self {
      tick_interval: config.tick_interval(),
      state: Mutex::new(RoomState {
        config,
        sessions: HashMap::new(),
        roster: Vec::new(),
        round: None,
        last_scoreboard: Vec::new(),
        intents: intents_rx,
      }),
      intents,
      running: AtomicBool::new(false),
    }
  }

  /// Registers a socket. `sender` should be bounded: a session whose queue
  /// fills up is treated as gone.
  pub async fn add_session(&self, sender: Sender<String>) -> String {
    let session_id = Uuid::new_v4().to_string();
    let mut state = self.state.lock().await;
    state.sessions.insert(session_id.clone(), SessionEntry::new(sender));
    tracing::debug!(session_id = %session_id, sessions = state.sessions.len(), "session added");
    session_id
  }

  pub async fn remove_session(&self, session_id: &str) {
    let participant_id = {
      let mut state = self.state.lock().await;
      let Some(mut entry) = state.sessions.remove(session_id) else { return };
      tracing::debug!(session_id, sessions = state.sessions.len(), "session removed");
      entry.unbind()
    };
    if let Some(participant_id) = participant_id {
      self.remove_participant(&participant_id).await;
    }
  }

  pub async fn handle_text_message(self: &Arc<Self>, session_id: &str, text: &str) {
    match protocol::decode_client_message(text) {
      Ok(message) => self.handle_client_message(session_id, message).await,
      Err(error) if error.is_ignorable() => {
        tracing::debug!(session_id, %error, "ignoring client message");
      }
      Err(error) => {
        tracing::warn!(session_id, %error, "dropping malformed client message");
      }
    }
  }

  async fn handle_client_message(self: &Arc<Self>, session_id: &str, message: ClientMessage) {
    if let ClientMessage::UpdateDirection { id, direction } = message {
      let Some(direction) = Direction::parse(&direction) else {
        tracing::debug!(session_id, direction = %direction, "ignoring unknown direction");
        return;
      };
      self.apply_direction_intent(session_id, &id, direction);
      return;
    }

    let mut started = false;
    let mut reply = Vec::new();
    let pending = {
      let mut state = self.state.lock().await;
      let messages = match message {
        ClientMessage::Join { name } => match state.handle_join(session_id, &name) {
          Some(participant_id) => {
            reply.push(ServerMessage::Joined { id: participant_id });
            if state.round.is_none() && !state.last_scoreboard.is_empty() {
              reply.push(ServerMessage::Scoreboard {
                players: state.last_scoreboard.clone(),
              });
            }
            vec![state.waiting_room()]
          }
          None => Vec::new(),
        },
        ClientMessage::StartGame => {
          let messages = state.start_round();
          started = !messages.is_empty();
          messages
        }
        ClientMessage::PlayerEliminated { id } => state.handle_forfeit(session_id, &id),
        ClientMessage::RestartGame => {
          state.stop_round();
          let messages = state.start_round();
          started = !messages.is_empty();
          messages
        }
        ClientMessage::ReturnToLogin => state.return_to_login(),
        ClientMessage::UpdateDirection { .. } => Vec::new(),
      };
      let mut pending = state.pending(messages);
      pending.reply = state.reply_to(session_id, reply);
      pending
    };
    self.publish(pending).await;
    if started {
      self.ensure_loop();
    }
  }

  /// Queues a direction for the next tick without touching the room lock.
  /// Dropped at drain time unless `session_id` is bound to `participant_id`.
  pub fn apply_direction_intent(&self, session_id: &str, participant_id: &str, direction: Direction) {
    let intent = Intent {
      session_id: session_id.to_string(),
      participant_id: participant_id.to_string(),
      direction,
    };
    // The receiver lives inside the room, so this only fails during teardown.
    if self.intents.send(intent).is_err() {
      tracing::debug!("intent channel closed");
    }
  }

  /// Removes a participant from the lobby and the live round. Takes the same
  /// lock as a tick, so the removal lands between two ticks.
  pub async fn remove_participant(&self, participant_id: &str) {
    let pending = {
      let mut state = self.state.lock().await;
      for session in state.sessions.values_mut() {
        if session.is_bound_to(participant_id) {
          session.unbind();
        }
      }
      let messages = state.remove_participant(participant_id, DeathCause::Disconnected);
      state.pending(messages)
    };
    self.publish(pending).await;
  }

  pub async fn stats(&self) -> RoomStats {
    let state = self.state.lock().await;
    RoomStats {
      sessions: state.sessions.len(),
      participants: state.roster.len(),
      round_active: state.round.is_some(),
      tick: state.round.as_ref().map_or(0, Round::tick_count),
    }
  }

  #[cfg(test)]
  pub async fn snapshot(&self) -> Option<Snapshot> {
    let state = self.state.lock().await;
    state.round.as_ref().map(Round::snapshot)
  }

  /// Ranking of the most recently finished round, empty once a new round
  /// starts or the lobby resets.
  #[cfg(test)]
  pub async fn last_scoreboard(&self) -> Vec<String> {
    let state = self.state.lock().await;
    state.last_scoreboard.clone()
  }

  #[cfg(test)]
  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::SeqCst)
  }

  /// One scheduler step. Clears the running flag under the lock when there is
  /// nothing to drive so a concurrent start can claim a fresh loop.
  pub(crate) async fn run_tick(&self) -> TickOutcome {
    let (pending, outcome) = {
      let mut state = self.state.lock().await;
      let Some((messages, outcome)) = state.tick() else {
        self.running.store(false, Ordering::SeqCst);
        return TickOutcome::Idle;
      };
      (state.pending(messages), outcome)
    };
    self.publish(pending).await;
    outcome
  }

  fn ensure_loop(self: &Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return;
    }

    let room = Arc::clone(self);
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(room.tick_interval);
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      interval.tick().await;
      loop {
        interval.tick().await;
        match room.run_tick().await {
          TickOutcome::Idle => {
            tracing::debug!("tick loop stopped");
            break;
          }
          TickOutcome::Ticked { tick, finished: true } => {
            tracing::info!(tick, "round finished");
          }
          TickOutcome::Ticked { .. } => {}
        }
      }
    });
  }

  /// Fans messages out without holding the lock, then prunes sessions whose
  /// queue is closed or full. Pruning can itself produce messages, so repeat
  /// until a delivery succeeds everywhere.
  async fn publish(&self, mut pending: Pending) {
    loop {
      let mut stale = Vec::new();
      if let Some((target, reply)) = pending.reply.take() {
        stale.extend(target.deliver(&broadcast::encode_all(&reply)));
      }
      if !pending.messages.is_empty() {
        stale.extend(pending.outbox.deliver(&broadcast::encode_all(&pending.messages)));
      }
      if stale.is_empty() {
        return;
      }
      stale.sort();
      stale.dedup();

      let mut state = self.state.lock().await;
      let mut messages = Vec::new();
      for session_id in stale {
        tracing::debug!(session_id = %session_id, "pruning stale session");
        messages.extend(state.disconnect_session(&session_id));
      }
      pending = state.pending(messages);
    }
  }
}

impl RoomState {
  fn pending(&self, messages: Vec<ServerMessage>) -> Pending {
    let mut outbox = Outbox::default();
    if !messages.is_empty() {
      for (session_id, session) in &self.sessions {
        outbox.push(session_id.clone(), session.sender());
      }
    }
    Pending {
      messages,
      outbox,
      reply: None,
    }
  }

  fn reply_to(&self, session_id: &str, messages: Vec<ServerMessage>) -> Option<(Outbox, Vec<ServerMessage>)> {
    if messages.is_empty() {
      return None;
    }
    let session = self.sessions.get(session_id)?;
    let mut target = Outbox::default();
    target.push(session_id.to_string(), session.sender());
    Some((target, messages))
  }

  fn waiting_room(&self) -> ServerMessage {
    ServerMessage::WaitingRoom {
      players: self.roster.clone(),
    }
  }

  fn disconnect_session(&mut self, session_id: &str) -> Vec<ServerMessage> {
    let Some(mut entry) = self.sessions.remove(session_id) else { return Vec::new() };
    tracing::debug!(session_id, sessions = self.sessions.len(), "session removed");
    match entry.unbind() {
      Some(participant_id) => self.remove_participant(&participant_id, DeathCause::Disconnected),
      None => Vec::new(),
    }
  }

  /// Binds the session to a fresh participant id and returns it.
  fn handle_join(&mut self, session_id: &str, name: &str) -> Option<String> {
    let session = self.sessions.get(session_id)?;
    if let Some(existing) = session.participant_id() {
      tracing::debug!(session_id, participant_id = existing, "session already joined");
      return None;
    }
    if self.roster.len() >= self.config.max_players {
      tracing::warn!(session_id, max_players = self.config.max_players, "lobby is full");
      return None;
    }

    let display_name = sanitize_player_name(name, DEFAULT_PLAYER_NAME);
    let participant_id = unique_participant_id(&display_name, &self.roster);
    self.roster.push(participant_id.clone());
    if let Some(session) = self.sessions.get_mut(session_id) {
      session.bind(participant_id.clone());
    }
    tracing::info!(session_id, participant_id = %participant_id, players = self.roster.len(), "player joined");
    Some(participant_id)
  }

  /// Builds a round from the roster. Returns nothing when a round is already
  /// live or the roster cannot be placed.
  fn start_round(&mut self) -> Vec<ServerMessage> {
    if self.round.is_some() {
      tracing::debug!("round already running");
      return Vec::new();
    }
    while self.intents.try_recv().is_ok() {}

    let round = match Round::new(&self.config, &self.roster) {
      Ok(round) => round,
      Err(error) => {
        tracing::warn!(%error, players = self.roster.len(), "round not started");
        return Vec::new();
      }
    };
    let snapshot = round.snapshot();
    self.round = Some(round);
    self.last_scoreboard.clear();
    tracing::info!(players = self.roster.len(), "round started");
    vec![ServerMessage::StartGame, ServerMessage::GameState(snapshot)]
  }

  fn stop_round(&mut self) {
    if self.round.take().is_some() {
      tracing::info!("round stopped");
    }
  }

  fn return_to_login(&mut self) -> Vec<ServerMessage> {
    self.stop_round();
    self.last_scoreboard.clear();
    vec![self.waiting_room()]
  }

  /// A client may only forfeit the participant its own session is bound to.
  fn handle_forfeit(&mut self, session_id: &str, participant_id: &str) -> Vec<ServerMessage> {
    let owns = self
      .sessions
      .get(session_id)
      .is_some_and(|session| session.is_bound_to(participant_id));
    if !owns {
      tracing::debug!(session_id, participant_id, "ignoring forfeit for another participant");
      return Vec::new();
    }
    self.remove_participant(participant_id, DeathCause::Forfeit)
  }

  /// Forfeits keep the participant in the roster for the next round;
  /// disconnects drop them from the lobby as well.
  fn remove_participant(&mut self, participant_id: &str, cause: DeathCause) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    let leaves_lobby = cause == DeathCause::Disconnected;

    if let Some(round) = self.round.as_mut() {
      if let Some(elimination) = round.remove(participant_id, cause) {
        tracing::info!(
          participant_id,
          cause = %elimination.cause,
          score = elimination.score,
          "player left the round"
        );
        messages.push(ServerMessage::PlayerEliminated {
          id: participant_id.to_string(),
        });
      }
    }
    messages.extend(self.finish_round_if_over());

    if leaves_lobby {
      let before = self.roster.len();
      self.roster.retain(|id| id != participant_id);
      if self.roster.len() != before && self.round.is_none() {
        messages.push(self.waiting_room());
      }
    }
    messages
  }

  fn finish_round_if_over(&mut self) -> Vec<ServerMessage> {
    let Some(round) = self.round.as_ref() else { return Vec::new() };
    if !round.is_finished() {
      return Vec::new();
    }
    let players = round.scoreboard();
    let tick = round.tick_count();
    self.round = None;
    self.last_scoreboard = players.clone();
    tracing::info!(tick, ranking = ?players, "scoreboard published");
    vec![ServerMessage::Scoreboard { players }]
  }

  fn tick(&mut self) -> Option<(Vec<ServerMessage>, TickOutcome)> {
    let round = self.round.as_mut()?;

    while let Ok(intent) = self.intents.try_recv() {
      let owns = self
        .sessions
        .get(&intent.session_id)
        .is_some_and(|session| session.is_bound_to(&intent.participant_id));
      if !owns {
        tracing::debug!(
          session_id = %intent.session_id,
          participant_id = %intent.participant_id,
          "ignoring intent for another participant"
        );
        continue;
      }
      if !round.set_direction(&intent.participant_id, intent.direction) {
        tracing::debug!(
          participant_id = %intent.participant_id,
          direction = %intent.direction,
          "direction rejected"
        );
      }
    }

    let report = round.tick();
    let tick = report.snapshot.tick;
    let mut messages = Vec::with_capacity(report.eliminated.len() + 2);
    messages.push(ServerMessage::GameState(report.snapshot));
    for elimination in report.eliminated {
      messages.push(ServerMessage::PlayerEliminated { id: elimination.id });
    }
    messages.extend(self.finish_round_if_over());

    Some((
      messages,
      TickOutcome::Ticked {
        tick,
        finished: report.finished,
      },
    ))
  }
}
