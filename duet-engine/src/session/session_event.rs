use crate::media::MediaEvent;
use crate::peer::PeerEvent;
use crate::signaling::ChannelEvent;

/// Everything the coordinator reacts to besides commands. Components and
/// their background tasks post here; the coordinator handles one event at
/// a time.
#[derive(Debug)]
pub enum SessionEvent {
    Channel(ChannelEvent),
    Peer(PeerEvent),
    Media(MediaEvent),
    PeerRetryDue { token: u64 },
}
