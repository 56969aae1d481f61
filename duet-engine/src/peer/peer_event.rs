use crate::error::PeerError;
use crate::peer::{PeerConnection, PeerSignal};
use duet_core::{PeerStats, RemoteTrack, SessionDescription, SignalMessage};
use std::fmt;
use std::sync::Arc;

/// Result of one negotiation step that ran in the background.
#[derive(Debug, Clone, PartialEq)]
pub enum Negotiation {
    LocalOffer(SessionDescription),
    LocalAnswer {
        answer: SessionDescription,
        remote_session: Option<String>,
    },
    RemoteAnswerApplied {
        remote_session: Option<String>,
    },
    CandidateApplied,
    TracksAttached,
}

/// Events that drive the peer session. Every variant carrying a
/// `generation` is dropped once that connection has been replaced.
pub enum PeerEvent {
    Signal {
        generation: u64,
        signal: PeerSignal,
    },
    Negotiated {
        generation: u64,
        connection: Option<Arc<dyn PeerConnection>>,
        outcome: Result<Negotiation, PeerError>,
    },
    StatsDue {
        token: u64,
    },
    Stats {
        generation: u64,
        stats: Result<PeerStats, PeerError>,
    },
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal { generation, signal } => f
                .debug_struct("Signal")
                .field("generation", generation)
                .field("signal", signal)
                .finish(),
            Self::Negotiated {
                generation,
                connection,
                outcome,
            } => f
                .debug_struct("Negotiated")
                .field("generation", generation)
                .field("has_connection", &connection.is_some())
                .field("outcome", outcome)
                .finish(),
            Self::StatsDue { token } => f.debug_struct("StatsDue").field("token", token).finish(),
            Self::Stats { generation, stats } => f
                .debug_struct("Stats")
                .field("generation", generation)
                .field("stats", stats)
                .finish(),
        }
    }
}

/// What the peer session hands back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerOutput {
    /// Must be relayed to the remote participant.
    Signal(SignalMessage),
    /// First sighting of a remote stream on the current connection.
    RemoteStream(RemoteTrack),
}
