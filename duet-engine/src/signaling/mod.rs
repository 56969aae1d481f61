mod channel_event;
mod signal_link;
mod signaling_channel;

pub use channel_event::ChannelEvent;
pub use signal_link::{LinkFrame, LinkFrames, SignalConnector, SignalLink};
pub use signaling_channel::{
    INVALID_MESSAGE_FORMAT, LINK_ERROR, RECONNECT_EXHAUSTED, SendOutcome, SignalingChannel,
};
