mod peer_backend;
mod peer_event;
mod peer_session;

pub use peer_backend::{
    IceConnectionState, PeerBackend, PeerConnection, PeerSignal, TransportState,
};
pub use peer_event::{Negotiation, PeerEvent, PeerOutput};
pub use peer_session::{CallRole, PeerSession};
