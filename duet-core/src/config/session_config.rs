use crate::config::{ChannelConfig, IceServerConfig, PeerConfig, PeerRetryPolicy, RelayConfig};
use crate::model::MediaConstraints;
use std::env;

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub relay: RelayConfig,
    pub channel: ChannelConfig,
    pub peer: PeerConfig,
    pub peer_retry: PeerRetryPolicy,
    pub media: MediaConstraints,
}

impl SessionConfig {
    /// Defaults overlaid with `DUET_RELAY_URL` and, when `DUET_TURN_URL` is
    /// set, a TURN server built from `DUET_TURN_URL`, `DUET_TURN_USERNAME` and
    /// `DUET_TURN_CREDENTIAL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("DUET_RELAY_URL") {
            config.relay = RelayConfig::new(url);
        }

        if let Some(turn_url) = lookup("DUET_TURN_URL") {
            config.peer.ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: lookup("DUET_TURN_USERNAME"),
                credential: lookup("DUET_TURN_CREDENTIAL"),
            });
        }

        config
    }
}
