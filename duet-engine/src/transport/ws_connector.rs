use crate::error::ChannelError;
use crate::signaling::{LinkFrame, LinkFrames, SignalConnector, SignalLink};
use async_trait::async_trait;
use duet_core::utils::ABNORMAL_CLOSURE;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};
use url::Url;

/// Relay connector over a WebSocket.
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

struct WsLink {
    tx: mpsc::UnboundedSender<Message>,
}

impl SignalLink for WsLink {
    fn send_text(&self, text: String) -> Result<(), ChannelError> {
        self.tx
            .send(Message::text(text))
            .map_err(|_| ChannelError::Send("socket writer has stopped".to_owned()))
    }

    fn close(&self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_owned().into(),
        };
        let _ = self.tx.send(Message::Close(Some(frame)));
    }
}

#[async_trait]
impl SignalConnector for WsConnector {
    async fn connect(&self, address: &Url) -> Result<(Box<dyn SignalLink>, LinkFrames), ChannelError> {
        let (ws_stream, _) = connect_async(address.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        info!("WebSocket connected to {}", address);

        let (mut sender, mut receiver) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<LinkFrame>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sender.send(msg).await {
                    debug!("WebSocket writer stopped: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                let frame = match result {
                    Ok(Message::Text(text)) => LinkFrame::Text(text.as_str().to_owned()),
                    Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => LinkFrame::Text(text),
                        Err(_) => {
                            warn!("Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(close)) => {
                        let (code, reason) = close
                            .map(|c| (u16::from(c.code), c.reason.as_str().to_owned()))
                            .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                        let _ = frame_tx.send(LinkFrame::Closed { code, reason });
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = frame_tx.send(LinkFrame::Error(e.to_string()));
                        let _ = frame_tx.send(LinkFrame::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: e.to_string(),
                        });
                        return;
                    }
                };
                if frame_tx.send(frame).is_err() {
                    return;
                }
            }
            let _ = frame_tx.send(LinkFrame::Closed {
                code: ABNORMAL_CLOSURE,
                reason: "stream ended".to_owned(),
            });
        });

        Ok((Box::new(WsLink { tx: out_tx }), frame_rx))
    }
}
