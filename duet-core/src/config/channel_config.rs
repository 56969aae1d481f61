use crate::utils::{
    HEARTBEAT_INTERVAL, INITIAL_RECONNECT_DELAY, MAX_RECONNECT_DELAY, RECONNECT_ATTEMPTS,
    RECONNECT_JITTER,
};
use std::time::Duration;

/// Reconnect and heartbeat policy of the signaling channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Consecutive abnormal closes tolerated before the channel gives up.
    pub reconnect_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to every backoff.
    pub jitter: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: RECONNECT_ATTEMPTS,
            initial_delay: INITIAL_RECONNECT_DELAY,
            max_delay: MAX_RECONNECT_DELAY,
            jitter: RECONNECT_JITTER,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }
}

impl ChannelConfig {
    /// `min(initial * 2^attempt, max)`, before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
