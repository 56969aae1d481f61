use crate::error::ChannelError;
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// What the relay transport reports after a link is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFrame {
    Text(String),
    Error(String),
    /// Always the last frame of a link.
    Closed { code: u16, reason: String },
}

pub type LinkFrames = mpsc::UnboundedReceiver<LinkFrame>;

/// Write half of one relay connection.
pub trait SignalLink: Send + Sync + 'static {
    fn send_text(&self, text: String) -> Result<(), ChannelError>;

    fn close(&self, code: u16, reason: &str);
}

/// Opens relay connections. The production implementation is
/// [`crate::transport::WsConnector`].
#[async_trait]
pub trait SignalConnector: Send + Sync + 'static {
    async fn connect(&self, address: &Url) -> Result<(Box<dyn SignalLink>, LinkFrames), ChannelError>;
}
