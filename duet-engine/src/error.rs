use duet_core::{CompositeConnectionState, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Address(#[from] CoreError),

    #[error("failed to connect to relay: {0}")]
    Connect(String),

    #[error("failed to send on relay link: {0}")]
    Send(String),

    #[error("channel has not been opened")]
    NotOpened,
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer backend error: {0}")]
    Backend(String),

    #[error("unsupported session description type {0:?}")]
    UnsupportedDescription(duet_core::SdpType),
}

impl PeerError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Capture failures, split by cause so callers can pick a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("permission to capture was denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device found: {0}")]
    DeviceNotFound(String),

    #[error("capture constraints cannot be satisfied: {0}")]
    Constraint(String),

    #[error("capture failed: {0}")]
    Other(String),
}

impl MediaError {
    /// Causes after which an audio-only request is still worth making.
    pub fn allows_audio_fallback(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::DeviceNotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("session is {0}, chat needs a connected session")]
    NotReady(CompositeConnectionState),

    #[error("message is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Room(#[from] CoreError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("session has ended")]
    Closed,
}
