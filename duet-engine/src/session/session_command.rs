use crate::error::ChatError;
use duet_core::{ChatEntry, TrackKind};
use tokio::sync::oneshot;

/// Requests from a [`crate::SessionHandle`] to the coordinator task.
#[derive(Debug)]
pub enum SessionCommand {
    SendChat {
        text: String,
        reply: oneshot::Sender<Result<ChatEntry, ChatError>>,
    },
    Messages {
        reply: oneshot::Sender<Vec<ChatEntry>>,
    },
    Reconnect,
    ToggleAudio {
        reply: oneshot::Sender<bool>,
    },
    ToggleVideo {
        reply: oneshot::Sender<bool>,
    },
    SwitchDevice {
        kind: TrackKind,
        device_id: String,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}
