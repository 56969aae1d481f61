use crate::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
    DEFAULT_STUN_ADDR_5, DEFAULT_TURN_ADDR, DEFAULT_TURN_ADDR_TLS, DEFAULT_TURN_CREDENTIAL,
    DEFAULT_TURN_USERNAME, ICE_CANDIDATE_POOL_SIZE, PEER_RETRY_DELAY, PEER_RETRY_LIMIT,
    STATS_INTERVAL,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: Vec<String>) -> Self {
        Self {
            urls,
            username: None,
            credential: None,
        }
    }

    pub fn turn(url: impl Into<String>, username: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub ice_candidate_pool_size: u8,
    /// Period of stats sampling while the link is connected.
    pub stats_interval: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        let stun = [
            DEFAULT_STUN_ADDR,
            DEFAULT_STUN_ADDR_2,
            DEFAULT_STUN_ADDR_3,
            DEFAULT_STUN_ADDR_4,
            DEFAULT_STUN_ADDR_5,
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        Self {
            ice_servers: vec![
                IceServerConfig::stun(stun),
                IceServerConfig::turn(DEFAULT_TURN_ADDR, DEFAULT_TURN_USERNAME, DEFAULT_TURN_CREDENTIAL),
                IceServerConfig::turn(
                    DEFAULT_TURN_ADDR_TLS,
                    DEFAULT_TURN_USERNAME,
                    DEFAULT_TURN_CREDENTIAL,
                ),
            ],
            ice_candidate_pool_size: ICE_CANDIDATE_POOL_SIZE,
            stats_interval: STATS_INTERVAL,
        }
    }
}

/// Coordinator-level retry of a failed peer link. Slower than the channel's
/// own backoff and bounded per failure streak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRetryPolicy {
    pub delay: Duration,
    pub limit: u32,
}

impl Default for PeerRetryPolicy {
    fn default() -> Self {
        Self {
            delay: PEER_RETRY_DELAY,
            limit: PEER_RETRY_LIMIT,
        }
    }
}
