mod channel_config;
mod peer_config;
mod relay_config;
mod session_config;

pub use channel_config::ChannelConfig;
pub use peer_config::{IceServerConfig, PeerConfig, PeerRetryPolicy};
pub use relay_config::RelayConfig;
pub use session_config::SessionConfig;
