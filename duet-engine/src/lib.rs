pub mod chat;
mod error;
mod event_sink;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
mod timer;
pub mod transport;

pub use chat::ChatMailbox;
pub use error::{ChannelError, ChatError, MediaError, PeerError, SessionError};
pub use event_sink::EventSink;
pub use media::{LocalMedia, MediaDevices, MediaIssue};
pub use peer::{PeerBackend, PeerConnection, PeerSession};
pub use session::{
    Notice, SessionCoordinator, SessionDeps, SessionHandle, SessionSnapshot, SessionUpdate,
    SessionUpdates,
};
pub use signaling::{LinkFrame, SendOutcome, SignalConnector, SignalLink, SignalingChannel};
pub use transport::{RtcBackend, WsConnector};
