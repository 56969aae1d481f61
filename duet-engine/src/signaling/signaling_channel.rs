use crate::error::ChannelError;
use crate::event_sink::EventSink;
use crate::signaling::{ChannelEvent, LinkFrame, SignalConnector, SignalLink};
use crate::timer::{Ticker, Timer};
use duet_core::config::{ChannelConfig, RelayConfig};
use duet_core::utils::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use duet_core::{ChannelConnectionState, RoomId, SignalMessage};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

pub const INVALID_MESSAGE_FORMAT: &str = "Invalid message format";
pub const RECONNECT_EXHAUSTED: &str = "Maximum reconnection attempts reached";
pub const LINK_ERROR: &str = "WebSocket connection error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    Queued,
}

/// Reconnecting relay connection for one room.
///
/// The channel never blocks: connecting runs in a background task whose
/// results come back as [`ChannelEvent`]s through the sink given at
/// construction, and the owner feeds them to [`SignalingChannel::on_event`].
/// Inbound messages are returned from `on_event`.
///
/// Messages sent while the link is down wait in a FIFO queue that is flushed
/// the moment the next link opens, before anything sent afterwards.
pub struct SignalingChannel {
    connector: Arc<dyn SignalConnector>,
    relay: RelayConfig,
    config: ChannelConfig,
    events: EventSink<ChannelEvent>,
    address: Option<Url>,
    state: ChannelConnectionState,
    link: Option<Box<dyn SignalLink>>,
    generation: u64,
    failures: u32,
    queue: VecDeque<SignalMessage>,
    reconnect_timer: Timer,
    heartbeat: Ticker,
    connect_task: Option<JoinHandle<()>>,
}

impl SignalingChannel {
    pub fn new(
        connector: Arc<dyn SignalConnector>,
        relay: RelayConfig,
        config: ChannelConfig,
        events: EventSink<ChannelEvent>,
    ) -> Self {
        Self {
            connector,
            relay,
            config,
            events,
            address: None,
            state: ChannelConnectionState::Disconnected,
            link: None,
            generation: 0,
            failures: 0,
            queue: VecDeque::new(),
            reconnect_timer: Timer::new(),
            heartbeat: Ticker::new(),
            connect_task: None,
        }
    }

    /// Connects to the relay endpoint of `room`. Refuses room ids that are
    /// empty once sanitized.
    pub fn open(&mut self, room: &str) -> Result<(), ChannelError> {
        let room = RoomId::parse(room)?;
        let address = self.relay.address_for(&room)?;
        info!("Opening signaling channel to {}", address);

        self.address = Some(address);
        self.failures = 0;
        self.connect()
    }

    /// Sends now when the link is up and nothing is waiting, otherwise queues.
    pub fn send(&mut self, message: SignalMessage) -> SendOutcome {
        if self.state == ChannelConnectionState::Connected && self.queue.is_empty() {
            match self.transmit(&message) {
                Ok(()) => return SendOutcome::Accepted,
                Err(e) => warn!("Send failed, queueing {}: {}", message.kind(), e),
            }
        } else {
            debug!("Channel is {}, queueing {}", self.state, message.kind());
        }
        self.queue.push_back(message);
        SendOutcome::Queued
    }

    /// Starts over with a fresh link and a reset failure budget.
    pub fn reconnect(&mut self) -> Result<(), ChannelError> {
        info!("Manual reconnect requested");
        self.failures = 0;
        self.connect()
    }

    /// Closes with a normal closure. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.reconnect_timer.cancel();
        self.heartbeat.stop();
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Some(link) = self.link.take() {
            link.close(NORMAL_CLOSURE, "client closed");
        }
        if self.state != ChannelConnectionState::Disconnected {
            info!("Signaling channel closed");
        }
        self.generation += 1;
        self.failures = 0;
        self.queue.clear();
        self.state = ChannelConnectionState::Disconnected;
    }

    pub fn on_event(&mut self, event: ChannelEvent) -> Option<SignalMessage> {
        match event {
            ChannelEvent::Opened { generation, link } => {
                if generation != self.generation {
                    debug!("Discarding link from superseded attempt {}", generation);
                    link.close(NORMAL_CLOSURE, "superseded");
                    return None;
                }
                self.on_opened(link);
                None
            }
            ChannelEvent::Frame { generation, frame } => {
                if generation != self.generation {
                    debug!("Ignoring frame from superseded attempt {}", generation);
                    return None;
                }
                self.on_frame(frame)
            }
            ChannelEvent::ReconnectDue { token } => {
                if self.reconnect_timer.fire(token)
                    && let Err(e) = self.connect()
                {
                    error!("Scheduled reconnect failed: {}", e);
                }
                None
            }
            ChannelEvent::HeartbeatDue { token } => {
                if self.heartbeat.accepts(token) && self.state == ChannelConnectionState::Connected
                {
                    if let Err(e) = self.transmit(&SignalMessage::Heartbeat) {
                        debug!("Heartbeat not sent: {}", e);
                    }
                }
                None
            }
        }
    }

    pub fn state(&self) -> ChannelConnectionState {
        self.state
    }

    pub fn address(&self) -> Option<&Url> {
        self.address.as_ref()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay of the scheduled reconnect, if one is pending.
    pub fn pending_reconnect(&self) -> Option<Duration> {
        self.reconnect_timer.delay()
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    fn connect(&mut self) -> Result<(), ChannelError> {
        let address = self.address.clone().ok_or(ChannelError::NotOpened)?;

        self.reconnect_timer.cancel();
        self.heartbeat.stop();
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Some(link) = self.link.take() {
            link.close(NORMAL_CLOSURE, "reconnecting");
        }

        self.generation += 1;
        self.state = ChannelConnectionState::Connecting;

        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let events = self.events.clone();
        self.connect_task = Some(tokio::spawn(async move {
            let (link, mut frames) = match connector.connect(&address).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Connecting to {} failed: {}", address, e);
                    events.emit(ChannelEvent::Frame {
                        generation,
                        frame: LinkFrame::Error(e.to_string()),
                    });
                    events.emit(ChannelEvent::Frame {
                        generation,
                        frame: LinkFrame::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: e.to_string(),
                        },
                    });
                    return;
                }
            };

            if !events.emit(ChannelEvent::Opened { generation, link }) {
                return;
            }

            while let Some(frame) = frames.recv().await {
                let last = matches!(frame, LinkFrame::Closed { .. });
                if !events.emit(ChannelEvent::Frame { generation, frame }) || last {
                    return;
                }
            }

            events.emit(ChannelEvent::Frame {
                generation,
                frame: LinkFrame::Closed {
                    code: ABNORMAL_CLOSURE,
                    reason: "link dropped".to_owned(),
                },
            });
        }));

        Ok(())
    }

    fn on_opened(&mut self, link: Box<dyn SignalLink>) {
        info!("Signaling channel connected");
        self.link = Some(link);
        self.state = ChannelConnectionState::Connected;
        self.failures = 0;
        self.reconnect_timer.cancel();
        self.heartbeat
            .start(self.config.heartbeat_interval, &self.events, |token| {
                ChannelEvent::HeartbeatDue { token }
            });
        self.flush();
    }

    fn on_frame(&mut self, frame: LinkFrame) -> Option<SignalMessage> {
        match frame {
            LinkFrame::Text(text) => match SignalMessage::decode(&text) {
                Ok(SignalMessage::HeartbeatAck) => None,
                Ok(SignalMessage::Unknown) => {
                    debug!("Ignoring message of unknown type");
                    None
                }
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Malformed signaling payload: {}", e);
                    Some(SignalMessage::error(INVALID_MESSAGE_FORMAT))
                }
            },
            LinkFrame::Error(reason) => {
                error!("Signaling link error: {}", reason);
                self.state = ChannelConnectionState::Error;
                Some(SignalMessage::error(LINK_ERROR))
            }
            LinkFrame::Closed { code, reason } => self.on_closed(code, &reason),
        }
    }

    fn on_closed(&mut self, code: u16, reason: &str) -> Option<SignalMessage> {
        self.link = None;
        self.heartbeat.stop();
        self.connect_task = None;

        if code == NORMAL_CLOSURE {
            info!("Signaling channel closed normally");
            self.state = ChannelConnectionState::Disconnected;
            return None;
        }

        self.failures += 1;
        if self.failures >= self.config.reconnect_attempts {
            error!(
                "Signaling channel closed ({} {}), giving up after {} attempts",
                code, reason, self.failures
            );
            self.state = ChannelConnectionState::Failed;
            return Some(SignalMessage::error(RECONNECT_EXHAUSTED));
        }

        let delay = self.config.backoff(self.failures - 1) + self.jitter();
        info!(
            "Signaling channel closed ({} {}), reconnecting in {:?} (attempt {}/{})",
            code, reason, delay, self.failures, self.config.reconnect_attempts
        );
        self.state = ChannelConnectionState::Disconnected;
        self.reconnect_timer
            .arm(delay, &self.events, |token| ChannelEvent::ReconnectDue { token });
        None
    }

    fn flush(&mut self) {
        while let Some(message) = self.queue.pop_front() {
            if let Err(e) = self.transmit(&message) {
                warn!("Flush interrupted at {}: {}", message.kind(), e);
                self.queue.push_front(message);
                return;
            }
        }
    }

    fn transmit(&self, message: &SignalMessage) -> Result<(), ChannelError> {
        let link = self.link.as_ref().ok_or(ChannelError::NotOpened)?;
        let text = message
            .encode()
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        link.send_text(text)
    }

    fn jitter(&self) -> Duration {
        let max = self.config.jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
    }
}
