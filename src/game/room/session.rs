use tokio::sync::mpsc::Sender;

/// One connected socket. A session becomes a participant once it joins.
#[derive(Debug)]
pub(crate) struct SessionEntry {
    sender: Sender<String>,
    participant_id: Option<String>,
}

impl SessionEntry {
    pub(crate) fn new(sender: Sender<String>) -> Self {
        Self {
            sender,
            participant_id: None,
        }
    }

    pub(crate) fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    pub(crate) fn bind(&mut self, participant_id: String) {
        self.participant_id = Some(participant_id);
    }

    pub(crate) fn unbind(&mut self) -> Option<String> {
        self.participant_id.take()
    }

    pub(crate) fn sender(&self) -> Sender<String> {
        self.sender.clone()
    }

    pub(crate) fn is_bound_to(&self, participant_id: &str) -> bool {
        self.participant_id.as_deref() == Some(participant_id)
    }
}
