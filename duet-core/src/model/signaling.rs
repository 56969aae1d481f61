use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Browser-shaped session description: `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// Session id from the `o=` line. Stays constant across renegotiations
    /// of one peer connection and changes when the remote side starts over.
    pub fn origin_session_id(&self) -> Option<&str> {
        self.sdp
            .lines()
            .find_map(|line| line.trim().strip_prefix("o="))
            .and_then(|origin| origin.split_whitespace().nth(1))
    }
}

/// Browser-shaped ICE candidate (`RTCIceCandidateInit` JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Chat body as it travels through the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub text: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Every message exchanged with the signaling relay.
///
/// Wire form is a JSON object with a `type` tag in kebab-case plus the fields
/// of the variant. Tags this enum does not know decode to
/// [`SignalMessage::Unknown`] instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    Offer {
        offer: SessionDescription,
    },
    Answer {
        answer: SessionDescription,
    },
    IceCandidate {
        candidate: IceCandidate,
    },
    ChatMessage {
        message: ChatPayload,
    },
    JoinRoom {
        username: String,
    },
    UserConnected {
        #[serde(default)]
        username: Option<String>,
    },
    UserDisconnected {
        #[serde(default)]
        username: Option<String>,
    },
    Heartbeat,
    HeartbeatAck,
    Error {
        error: String,
    },
    #[serde(other)]
    Unknown,
}

impl SignalMessage {
    pub fn decode(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(CoreError::Decode)
    }

    pub fn encode(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(CoreError::Encode)
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            error: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ChatMessage { .. } => "chat-message",
            Self::JoinRoom { .. } => "join-room",
            Self::UserConnected { .. } => "user-connected",
            Self::UserDisconnected { .. } => "user-disconnected",
            Self::Heartbeat => "heartbeat",
            Self::HeartbeatAck => "heartbeat-ack",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }
}
