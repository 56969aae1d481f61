use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One sample of transport statistics, taken while the peer link is up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_lost: i64,
    pub round_trip_time: Option<Duration>,
}
