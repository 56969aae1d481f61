use crate::error::ChatError;
use chrono::Utc;
use duet_core::{ChatEntry, ChatPayload, CompositeConnectionState, EntryId, Origin};
use tracing::debug;

/// Sender name used when a remote message does not carry one.
pub const REMOTE_SENDER: &str = "Remote";

/// Append-only log of the conversation, in arrival order.
#[derive(Debug, Default)]
pub struct ChatMailbox {
    entries: Vec<ChatEntry>,
    next_id: u64,
}

impl ChatMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message typed locally. Text is trimmed; the session must be
    /// connected and the trimmed text non-empty.
    pub fn append_local(
        &mut self,
        text: &str,
        sender: &str,
        state: CompositeConnectionState,
    ) -> Result<ChatEntry, ChatError> {
        if !state.is_connected() {
            return Err(ChatError::NotReady(state));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Empty);
        }
        Ok(self.push(text.to_owned(), sender.to_owned(), None, Origin::Local))
    }

    /// Records a message relayed from the remote participant. Missing
    /// sender or timestamp are filled in locally.
    pub fn append_remote(&mut self, payload: ChatPayload) -> ChatEntry {
        let sender = payload
            .username
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| REMOTE_SENDER.to_owned());
        self.push(payload.text, sender, payload.timestamp, Origin::Remote)
    }

    pub fn all(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(
        &mut self,
        text: String,
        sender: String,
        timestamp: Option<chrono::DateTime<Utc>>,
        origin: Origin,
    ) -> ChatEntry {
        self.next_id += 1;
        let entry = ChatEntry {
            id: EntryId(self.next_id),
            text,
            sender,
            timestamp: timestamp.unwrap_or_else(Utc::now),
            origin,
        };
        debug!("Chat entry {} from {} ({:?})", entry.id, entry.sender, origin);
        self.entries.push(entry.clone());
        entry
    }
}
