use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Nothing usable was left after stripping disallowed characters.
    #[error("room id {raw:?} is empty after sanitization")]
    EmptyRoomId { raw: String },

    #[error("invalid relay url {url:?}: {source}")]
    RelayUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("malformed signal payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode signal message: {0}")]
    Encode(#[source] serde_json::Error),
}
