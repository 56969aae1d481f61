use crate::utils::{FakeBackend, FakeConnector};
use duet_core::config::{ChannelConfig, PeerConfig, RelayConfig, SessionConfig};
use duet_core::{SessionDescription, SignalMessage};
use duet_engine::peer::{PeerEvent, PeerOutput};
use duet_engine::signaling::ChannelEvent;
use duet_engine::{PeerSession, SignalingChannel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const STEP_TIMEOUT: Duration = Duration::from_secs(600);

/// Defaults with jitter off and a relay address that is never dialed.
pub fn fast_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.relay = RelayConfig::new("ws://relay.test");
    config.channel.jitter = Duration::ZERO;
    config
}

/// An offer as a remote browser would send it.
pub fn remote_offer(session_id: u64) -> SessionDescription {
    SessionDescription::offer(format!(
        "v=0\r\no=- {session_id} 2 IN IP4 10.0.0.2\r\ns=-\r\n"
    ))
}

/// Drives a [`SignalingChannel`] the way the coordinator does: one event at
/// a time, collecting what comes out.
pub struct ChannelHarness {
    pub channel: SignalingChannel,
    pub inbound: Vec<SignalMessage>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl ChannelHarness {
    pub fn new(connector: FakeConnector, config: ChannelConfig) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let channel = SignalingChannel::new(
            Arc::new(connector),
            fast_config().relay,
            config,
            tx.into(),
        );
        Self {
            channel,
            inbound: Vec::new(),
            events,
        }
    }

    pub async fn step(&mut self) {
        let event = tokio::time::timeout(STEP_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for a channel event")
            .expect("event sink dropped");
        if let Some(message) = self.channel.on_event(event) {
            self.inbound.push(message);
        }
    }

    pub async fn step_until(&mut self, done: impl Fn(&Self) -> bool) {
        while !done(self) {
            self.step().await;
        }
    }
}

/// Drives a [`PeerSession`] over a [`FakeBackend`].
pub struct PeerHarness {
    pub session: PeerSession,
    pub outputs: Vec<PeerOutput>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
}

impl PeerHarness {
    pub fn new(backend: FakeBackend) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let mut config = PeerConfig::default();
        config.stats_interval = Duration::from_secs(5);
        Self {
            session: PeerSession::new(Arc::new(backend), config, tx.into()),
            outputs: Vec::new(),
            events,
        }
    }

    pub async fn step(&mut self) {
        let event = tokio::time::timeout(STEP_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for a peer event")
            .expect("event sink dropped");
        let outputs = self.session.on_event(event);
        self.outputs.extend(outputs);
    }

    pub async fn step_until(&mut self, done: impl Fn(&Self) -> bool) {
        while !done(self) {
            self.step().await;
        }
    }

    /// Applies whatever is already queued without waiting for more. Runs a
    /// few rounds so that work spawned while handling events also lands.
    pub async fn settle(&mut self) {
        for _ in 0..3 {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            while let Ok(event) = self.events.try_recv() {
                let outputs = self.session.on_event(event);
                self.outputs.extend(outputs);
            }
        }
    }

    pub fn signals(&self) -> Vec<SignalMessage> {
        self.outputs
            .iter()
            .filter_map(|output| match output {
                PeerOutput::Signal(message) => Some(message.clone()),
                PeerOutput::RemoteStream(_) => None,
            })
            .collect()
    }

    pub fn has_signal(&self, kind: &str) -> bool {
        self.signals().iter().any(|m| m.kind() == kind)
    }
}
