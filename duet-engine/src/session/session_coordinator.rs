use crate::chat::{ChatMailbox, REMOTE_SENDER};
use crate::error::{ChatError, SessionError};
use crate::event_sink::EventSink;
use crate::media::{LocalMedia, MediaDevices, MediaEvent};
use crate::peer::{PeerBackend, PeerOutput, PeerSession};
use crate::session::{
    Notice, SessionCommand, SessionEvent, SessionHandle, SessionSnapshot, SessionUpdate,
    SessionUpdates,
};
use crate::signaling::{SignalConnector, SignalingChannel};
use crate::timer::Timer;
use crate::transport::{RtcBackend, WsConnector};
use duet_core::config::SessionConfig;
use duet_core::{
    ChannelConnectionState, ChatEntry, ChatPayload, CompositeConnectionState, PeerConnectionState,
    RoomId, SessionId, SignalMessage,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

/// The platform pieces a session runs on.
#[derive(Clone)]
pub struct SessionDeps {
    pub connector: Arc<dyn SignalConnector>,
    pub peers: Arc<dyn PeerBackend>,
    pub devices: Arc<dyn MediaDevices>,
}

impl SessionDeps {
    /// WebSocket relay and `webrtc` peers around the given capture platform.
    pub fn production(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            connector: Arc::new(WsConnector::new()),
            peers: Arc::new(RtcBackend::new()),
            devices,
        }
    }
}

/// Owns the channel, the peer session, the chat mailbox and the local media
/// of one participant in one room, and routes between them.
///
/// Runs as a single task. Commands from [`SessionHandle`]s and events from
/// the components are handled one at a time, so no two state changes ever
/// interleave.
pub struct SessionCoordinator {
    room: RoomId,
    username: String,
    config: SessionConfig,
    channel: SignalingChannel,
    peer: PeerSession,
    chat: ChatMailbox,
    media: LocalMedia,
    remote_username: Option<String>,
    last_error: Option<String>,
    peer_retry: Timer,
    peer_retries: u32,
    retries_exhausted: bool,
    call_after_media: bool,
    failure_notified: bool,
    left: bool,
    events: EventSink<SessionEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionCoordinator {
    /// Joins `room` as `username` and starts the session task.
    pub fn spawn(
        config: SessionConfig,
        room: &str,
        username: impl Into<String>,
        deps: SessionDeps,
    ) -> Result<(SessionHandle, SessionUpdates), SessionError> {
        let room = RoomId::parse(room)?;
        let username = username.into();
        let id = SessionId::new();

        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let events: EventSink<SessionEvent> = event_tx.into();

        let channel = SignalingChannel::new(
            deps.connector,
            config.relay.clone(),
            config.channel.clone(),
            events.map(SessionEvent::Channel),
        );
        let peer = PeerSession::new(
            deps.peers,
            config.peer.clone(),
            events.map(SessionEvent::Peer),
        );
        let media = LocalMedia::new(
            deps.devices,
            config.media.clone(),
            events.map(SessionEvent::Media),
        );

        let span = info_span!("session", %id, room = %room, user = %username);
        let coordinator = Self {
            room,
            username,
            config,
            channel,
            peer,
            chat: ChatMailbox::new(),
            media,
            remote_username: None,
            last_error: None,
            peer_retry: Timer::new(),
            peer_retries: 0,
            retries_exhausted: false,
            call_after_media: false,
            failure_notified: false,
            left: false,
            events,
            command_rx,
            event_rx,
            snapshot_tx,
            updates_tx,
        };

        tokio::spawn(coordinator.run().instrument(span));
        Ok((SessionHandle::new(id, command_tx, snapshot_rx), updates_rx))
    }

    async fn run(mut self) {
        info!("Session event loop started");
        self.start();

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if self.handle_command(c).is_break() {
                                break;
                            }
                        }
                        None => {
                            info!("All session handles dropped. Leaving.");
                            self.leave();
                            break;
                        }
                    }
                }

                Some(event) = self.event_rx.recv() => self.handle_event(event),
            }
        }

        info!("Session event loop finished");
    }

    fn start(&mut self) {
        self.media.request();
        if let Err(e) = self.channel.open(self.room.as_str()) {
            error!("Failed to open signaling channel: {}", e);
            self.last_error = Some(e.to_string());
        }
        self.publish();
    }

    fn handle_command(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        match cmd {
            SessionCommand::SendChat { text, reply } => {
                let result = self.send_chat(&text);
                let _ = reply.send(result);
            }
            SessionCommand::Messages { reply } => {
                let _ = reply.send(self.chat.all().to_vec());
            }
            SessionCommand::Reconnect => self.reconnect(),
            SessionCommand::ToggleAudio { reply } => {
                let enabled = self.media.toggle_audio();
                info!("Audio {}", if enabled { "enabled" } else { "muted" });
                let _ = reply.send(enabled);
            }
            SessionCommand::ToggleVideo { reply } => {
                let enabled = self.media.toggle_video();
                info!("Video {}", if enabled { "enabled" } else { "muted" });
                let _ = reply.send(enabled);
            }
            SessionCommand::SwitchDevice { kind, device_id } => {
                if !self.left {
                    self.media.switch_device(kind, &device_id);
                }
            }
            SessionCommand::Leave { reply } => {
                self.leave();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        self.publish();
        ControlFlow::Continue(())
    }

    fn handle_event(&mut self, event: SessionEvent) {
        if self.left {
            return;
        }
        let channel_before = self.channel.state();

        match event {
            SessionEvent::Channel(event) => {
                if let Some(message) = self.channel.on_event(event) {
                    self.route(message);
                }
            }
            SessionEvent::Peer(event) => {
                let peer_before = self.peer.state();
                for output in self.peer.on_event(event) {
                    self.forward(output);
                }
                let peer_after = self.peer.state();
                if peer_after != peer_before {
                    self.on_peer_transition(peer_after);
                }
            }
            SessionEvent::Media(event) => self.on_media(event),
            SessionEvent::PeerRetryDue { token } => self.on_peer_retry(token),
        }

        if channel_before != ChannelConnectionState::Connected
            && self.channel.state() == ChannelConnectionState::Connected
        {
            info!("Announcing {} to room {}", self.username, self.room);
            self.channel.send(SignalMessage::JoinRoom {
                username: self.username.clone(),
            });
        }
        self.publish();
    }

    /// Dispatches one inbound relay message.
    fn route(&mut self, message: SignalMessage) {
        match message {
            SignalMessage::UserConnected { username } => {
                let username = username.unwrap_or_else(|| REMOTE_SENDER.to_owned());
                info!("{} joined, calling", username);
                self.remote_username = Some(username);
                self.peer_retry.cancel();
                self.peer_retries = 0;
                self.retries_exhausted = false;
                self.peer.initiate_call();
            }
            SignalMessage::UserDisconnected { username } => {
                info!("{} left", username.as_deref().unwrap_or(REMOTE_SENDER));
                self.remote_username = None;
                self.peer_retry.cancel();
                self.peer.teardown();
            }
            SignalMessage::Offer { offer } => self.peer.handle_offer(offer),
            SignalMessage::Answer { answer } => self.peer.handle_answer(answer),
            SignalMessage::IceCandidate { candidate } => self.peer.handle_ice_candidate(candidate),
            SignalMessage::ChatMessage { message } => {
                let entry = self.chat.append_remote(message);
                let _ = self.updates_tx.send(SessionUpdate::Chat(entry));
            }
            SignalMessage::Error { error } => {
                warn!("Session error: {}", error);
                self.last_error = Some(error);
                self.schedule_peer_retry();
            }
            other => debug!("Ignoring {} from relay", other.kind()),
        }
    }

    fn forward(&mut self, output: PeerOutput) {
        match output {
            PeerOutput::Signal(message) => {
                let outcome = self.channel.send(message);
                debug!("Peer signal handed to channel: {:?}", outcome);
            }
            PeerOutput::RemoteStream(track) => {
                let _ = self.updates_tx.send(SessionUpdate::RemoteStream(track));
            }
        }
    }

    fn on_peer_transition(&mut self, state: PeerConnectionState) {
        match state {
            PeerConnectionState::Connected => {
                if self.peer_retries > 0 {
                    info!("Peer link restored after {} retries", self.peer_retries);
                }
                self.peer_retry.cancel();
                self.peer_retries = 0;
                self.retries_exhausted = false;
            }
            PeerConnectionState::Failed | PeerConnectionState::Disconnected => {
                self.schedule_peer_retry();
            }
            PeerConnectionState::New | PeerConnectionState::Connecting => {}
        }
    }

    /// Arms the single peer retry timer unless one is already pending.
    fn schedule_peer_retry(&mut self) {
        let Some(remote) = self.remote_username.clone() else {
            debug!("No remote participant known, not retrying");
            return;
        };
        if self.channel.state() == ChannelConnectionState::Failed {
            debug!("Signaling has failed, not retrying the peer link");
            return;
        }
        if self.peer_retry.is_armed() {
            debug!("Peer retry already scheduled");
            return;
        }

        let policy = &self.config.peer_retry;
        if self.peer_retries >= policy.limit {
            if !self.retries_exhausted {
                self.retries_exhausted = true;
                warn!("Giving up on {} after {} retries", remote, self.peer_retries);
                self.notify(Notice::new(
                    format!("Could not reconnect to {remote}. Try reconnecting manually."),
                    true,
                ));
            }
            return;
        }

        self.peer_retries += 1;
        info!(
            "Retrying peer connection in {:?} (attempt {}/{})",
            policy.delay, self.peer_retries, policy.limit
        );
        self.peer_retry.arm(policy.delay, &self.events, |token| {
            SessionEvent::PeerRetryDue { token }
        });
    }

    fn on_peer_retry(&mut self, token: u64) {
        if !self.peer_retry.fire(token) || self.remote_username.is_none() {
            return;
        }
        if self.media.has_issue() || self.media.is_acquiring() {
            info!("Re-acquiring local media before calling again");
            self.call_after_media = true;
            if !self.media.is_acquiring() {
                self.media.request();
            }
            return;
        }
        self.peer.initiate_call();
    }

    fn on_media(&mut self, event: MediaEvent) {
        if !self.media.on_event(event) {
            return;
        }
        if let Some(issue) = self.media.issue() {
            let notice = Notice::new(issue.to_string(), false);
            self.notify(notice);
        }
        if let Some(tracks) = self.media.tracks() {
            self.peer.attach_local_media(tracks.clone());
        }
        if std::mem::take(&mut self.call_after_media) && self.remote_username.is_some() {
            self.peer.initiate_call();
        }
    }

    fn send_chat(&mut self, text: &str) -> Result<ChatEntry, ChatError> {
        let entry = self.chat.append_local(text, &self.username, self.state())?;
        let outcome = self.channel.send(SignalMessage::ChatMessage {
            message: ChatPayload {
                text: entry.text.clone(),
                username: Some(self.username.clone()),
                timestamp: Some(entry.timestamp),
            },
        });
        debug!("Chat message {} handed to channel: {:?}", entry.id, outcome);
        let _ = self.updates_tx.send(SessionUpdate::Chat(entry.clone()));
        Ok(entry)
    }

    fn reconnect(&mut self) {
        if self.left {
            warn!("Reconnect requested after leaving");
            return;
        }
        info!("Reconnecting session");
        self.peer_retry.cancel();
        self.peer_retries = 0;
        self.retries_exhausted = false;
        self.call_after_media = false;
        self.last_error = None;

        self.peer.teardown();
        if self.media.has_issue() && !self.media.is_acquiring() {
            self.media.request();
        }
        if let Err(e) = self.channel.reconnect() {
            error!("Failed to reconnect signaling channel: {}", e);
            self.last_error = Some(e.to_string());
        }
    }

    /// Tears everything down. Safe to call repeatedly.
    fn leave(&mut self) {
        if self.left {
            return;
        }
        info!("Leaving room {}", self.room);
        self.left = true;
        self.peer_retry.cancel();
        self.call_after_media = false;
        self.peer.teardown();
        self.channel.close();
        self.chat.clear();
        self.media.release();
        self.remote_username = None;
        self.publish();
    }

    fn state(&self) -> CompositeConnectionState {
        CompositeConnectionState::derive(self.channel.state(), self.peer.state())
    }

    fn notify(&self, notice: Notice) {
        info!("Notice: {}", notice.message);
        let _ = self.updates_tx.send(SessionUpdate::Notice(notice));
    }

    fn publish(&mut self) {
        let state = self.state();
        if state == CompositeConnectionState::Failed {
            if !self.failure_notified {
                self.failure_notified = true;
                let message = if self.channel.state() == ChannelConnectionState::Failed {
                    "Lost connection to the signaling server".to_owned()
                } else {
                    let remote = self.remote_username.as_deref().unwrap_or(REMOTE_SENDER);
                    format!("Connection to {remote} failed")
                };
                self.notify(Notice::new(message, true));
            }
        } else {
            self.failure_notified = false;
        }

        let snapshot = SessionSnapshot {
            state,
            channel: self.channel.state(),
            peer: self.peer.state(),
            remote_username: self.remote_username.clone(),
            audio_enabled: self.media.is_audio_enabled(),
            video_enabled: self.media.is_video_enabled(),
            last_error: self.last_error.clone(),
            stats: self.peer.last_stats().cloned(),
            chat_len: self.chat.len(),
            ended: self.left,
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
