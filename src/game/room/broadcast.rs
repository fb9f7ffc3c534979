use crate::protocol::{self, ServerMessage};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

/// Senders copied out of the room so fan-out never runs under the room lock.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    targets: Vec<(String, Sender<String>)>,
}

impl Outbox {
    pub(crate) fn push(&mut self, session_id: String, sender: Sender<String>) {
        self.targets.push((session_id, sender));
    }

    /// Sends every payload, in order, to every target without waiting.
    /// Returns the sessions whose queue is closed or full; a reader that
    /// stopped draining is as gone as one that hung up.
    pub(crate) fn deliver(&self, payloads: &[String]) -> Vec<String> {
        let mut stale = Vec::new();
        for (session_id, sender) in &self.targets {
            for payload in payloads {
                match sender.try_send(payload.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(session_id = %session_id, "outbound queue full");
                        stale.push(session_id.clone());
                        break;
                    }
                    Err(TrySendError::Closed(_)) => {
                        stale.push(session_id.clone());
                        break;
                    }
                }
            }
        }
        stale
    }
}

/// Messages that fail to encode are logged and skipped.
pub(crate) fn encode_all(messages: &[ServerMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|message| match protocol::encode_server_message(message) {
            Ok(payload) => Some(payload),
            Err(error) => {
                tracing::error!(%error, "failed to encode server message");
                None
            }
        })
        .collect()
}
