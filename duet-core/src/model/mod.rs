mod chat;
mod media;
mod room;
mod session;
mod signaling;
mod state;
mod stats;

pub use chat::{ChatEntry, EntryId, Origin};
pub use media::{
    AudioConstraints, MediaConstraints, MediaTrack, MediaTrackSet, RemoteTrack, TrackKind,
    VideoConstraints,
};
pub use room::{RoomId, sanitize_room_id};
pub use session::SessionId;
pub use signaling::{ChatPayload, IceCandidate, SdpType, SessionDescription, SignalMessage};
pub use state::{ChannelConnectionState, CompositeConnectionState, PeerConnectionState};
pub use stats::PeerStats;
