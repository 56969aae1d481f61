use crate::signaling::{LinkFrame, SignalLink};
use std::fmt;

/// Everything that can move the signaling channel forward.
///
/// `generation` identifies the connection attempt that produced the event;
/// events of a superseded attempt are dropped.
pub enum ChannelEvent {
    Opened {
        generation: u64,
        link: Box<dyn SignalLink>,
    },
    Frame {
        generation: u64,
        frame: LinkFrame,
    },
    ReconnectDue {
        token: u64,
    },
    HeartbeatDue {
        token: u64,
    },
}

impl fmt::Debug for ChannelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened { generation, .. } => {
                f.debug_struct("Opened").field("generation", generation).finish()
            }
            Self::Frame { generation, frame } => f
                .debug_struct("Frame")
                .field("generation", generation)
                .field("frame", frame)
                .finish(),
            Self::ReconnectDue { token } => {
                f.debug_struct("ReconnectDue").field("token", token).finish()
            }
            Self::HeartbeatDue { token } => {
                f.debug_struct("HeartbeatDue").field("token", token).finish()
            }
        }
    }
}
