use std::time::Duration;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_4: &str = "stun:stun3.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_5: &str = "stun:stun4.l.google.com:19302";

pub const DEFAULT_TURN_ADDR: &str = "turn:openrelay.metered.ca:80";
pub const DEFAULT_TURN_ADDR_TLS: &str = "turn:openrelay.metered.ca:443";
pub const DEFAULT_TURN_USERNAME: &str = "openrelayproject";
pub const DEFAULT_TURN_CREDENTIAL: &str = "openrelayproject";

pub const DEFAULT_RELAY_URL: &str = "ws://localhost:8000";

/// WebSocket close code for an intentional shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;
/// WebSocket close code for a connection that dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

pub const RECONNECT_ATTEMPTS: u32 = 5;
pub const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30_000);
pub const RECONNECT_JITTER: Duration = Duration::from_millis(1000);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub const PEER_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const PEER_RETRY_LIMIT: u32 = 3;
pub const STATS_INTERVAL: Duration = Duration::from_secs(5);
pub const ICE_CANDIDATE_POOL_SIZE: u8 = 10;
