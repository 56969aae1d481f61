use duet_core::{
    ChannelConnectionState, ChatEntry, CompositeConnectionState, PeerConnectionState, PeerStats,
    RemoteTrack,
};

/// Observable state of a session, republished after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: CompositeConnectionState,
    pub channel: ChannelConnectionState,
    pub peer: PeerConnectionState,
    pub remote_username: Option<String>,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub last_error: Option<String>,
    pub stats: Option<PeerStats>,
    pub chat_len: usize,
    pub ended: bool,
}

/// A message meant for the user. `retryable` means an explicit reconnect
/// may help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub retryable: bool,
}

impl Notice {
    pub fn new(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            message: message.into(),
            retryable,
        }
    }
}

/// One-off happenings the UI should render.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    RemoteStream(RemoteTrack),
    Chat(ChatEntry),
    Notice(Notice),
}
