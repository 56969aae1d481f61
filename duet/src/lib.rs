pub use duet_core::{CompositeConnectionState, RoomId, SignalMessage};

pub mod model {
    pub use duet_core::model::*;
}

pub mod config {
    pub use duet_core::config::*;
}

#[cfg(feature = "engine")]
pub mod engine {
    pub use duet_engine::*;
}

#[cfg(feature = "engine")]
pub use duet_engine::{SessionCoordinator, SessionDeps, SessionHandle, SessionUpdate};
