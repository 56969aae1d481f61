use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the peer link. Owned by the peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

/// Lifecycle of the signaling transport. Owned by the signaling channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
    Failed,
}

/// User-facing summary of both layers. Never stored, always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeConnectionState {
    Connected,
    Connecting,
    #[default]
    Disconnected,
    Failed,
}

impl CompositeConnectionState {
    /// `Connected` only when both layers are connected. Otherwise the worse of
    /// the two wins: failed, then disconnected, then connecting.
    ///
    /// A transport in `Error` counts as disconnected (it is about to close),
    /// and a peer that has not started yet counts as connecting.
    pub fn derive(channel: ChannelConnectionState, peer: PeerConnectionState) -> Self {
        let from_channel = match channel {
            ChannelConnectionState::Connected => Self::Connected,
            ChannelConnectionState::Connecting => Self::Connecting,
            ChannelConnectionState::Disconnected | ChannelConnectionState::Error => {
                Self::Disconnected
            }
            ChannelConnectionState::Failed => Self::Failed,
        };
        let from_peer = match peer {
            PeerConnectionState::Connected => Self::Connected,
            PeerConnectionState::New | PeerConnectionState::Connecting => Self::Connecting,
            PeerConnectionState::Disconnected => Self::Disconnected,
            PeerConnectionState::Failed => Self::Failed,
        };

        if from_channel.severity() >= from_peer.severity() {
            from_channel
        } else {
            from_peer
        }
    }

    fn severity(self) -> u8 {
        match self {
            Self::Connected => 0,
            Self::Connecting => 1,
            Self::Disconnected => 2,
            Self::Failed => 3,
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ChannelConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl fmt::Display for CompositeConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
