use crate::{CoreError, RoomId};
use crate::utils::DEFAULT_RELAY_URL;
use url::Url;

/// Where the signaling relay lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// `ws://` or `wss://` origin of the relay.
    pub base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELAY_URL.to_owned(),
        }
    }
}

impl RelayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// `{base}/ws/chat/{room}/`
    pub fn address_for(&self, room: &RoomId) -> Result<Url, CoreError> {
        let raw = format!("{}/ws/chat/{}/", self.base_url.trim_end_matches('/'), room);
        Url::parse(&raw).map_err(|source| CoreError::RelayUrl { url: raw, source })
    }
}
