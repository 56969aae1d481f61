use crate::error::PeerError;
use crate::event_sink::EventSink;
use crate::peer::{
    IceConnectionState, Negotiation, PeerBackend, PeerConnection, PeerEvent, PeerOutput,
    PeerSignal, TransportState,
};
use crate::timer::Ticker;
use duet_core::config::PeerConfig;
use duet_core::{
    IceCandidate, MediaTrackSet, PeerConnectionState, PeerStats, SessionDescription, SignalMessage,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One operation against a connection. Steps of a generation run strictly
/// one after another, in the order they were queued.
type Step = Box<
    dyn FnOnce(Arc<dyn PeerConnection>) -> BoxFuture<'static, Result<Negotiation, PeerError>>
        + Send,
>;

fn step<F, Fut>(f: F) -> Step
where
    F: FnOnce(Arc<dyn PeerConnection>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Negotiation, PeerError>> + Send + 'static,
{
    Box::new(move |connection| f(connection).boxed())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    /// Sent the first offer.
    Caller,
    /// Answered the remote side's offer.
    Callee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Creating,
    HaveLocalOffer,
    ApplyingAnswer,
    Stable,
    Renegotiating,
}

struct ActivePeer {
    generation: u64,
    role: CallRole,
    connection: Option<Arc<dyn PeerConnection>>,
    steps: mpsc::UnboundedSender<Step>,
    phase: Phase,
    /// A remote description has been queued. Anything queued later runs
    /// after it is applied.
    remote_description_set: bool,
    local_description_sent: bool,
    remote_session: Option<String>,
    ice_restart_attempted: bool,
    media_stream: Option<String>,
    remote_streams: HashSet<String>,
    pending_candidates: Vec<IceCandidate>,
}

impl ActivePeer {
    fn new(
        generation: u64,
        role: CallRole,
        media_stream: Option<String>,
        steps: mpsc::UnboundedSender<Step>,
    ) -> Self {
        Self {
            generation,
            role,
            connection: None,
            steps,
            phase: Phase::Creating,
            remote_description_set: false,
            local_description_sent: false,
            remote_session: None,
            ice_restart_attempted: false,
            media_stream,
            remote_streams: HashSet::new(),
            pending_candidates: Vec::new(),
        }
    }

    fn enqueue(&self, step: Step) {
        if self.steps.send(step).is_err() {
            debug!("Connection of generation {} is gone, step dropped", self.generation);
        }
    }

    fn flush_candidates(&mut self, out: &mut Vec<PeerOutput>) {
        out.extend(
            self.pending_candidates
                .drain(..)
                .map(|candidate| PeerOutput::Signal(SignalMessage::IceCandidate { candidate })),
        );
    }
}

/// The single peer link of a two-party call.
///
/// At most one connection exists at a time. Starting a call or accepting a
/// fresh offer closes the previous connection and opens a new generation;
/// every background result and backend notification is stamped with the
/// generation it belongs to, and anything from an older one is dropped.
///
/// Each connection has a single worker that creates it and then runs its
/// steps in queue order, so a candidate queued after a remote description
/// is applied after that description.
///
/// Inbound candidates are accepted once a remote description has been
/// queued. Earlier ones are dropped without touching state. Local candidates
/// are held back until our own offer or answer has been handed out.
pub struct PeerSession {
    backend: Arc<dyn PeerBackend>,
    config: PeerConfig,
    events: EventSink<PeerEvent>,
    state: PeerConnectionState,
    generation: u64,
    active: Option<ActivePeer>,
    local_media: Option<MediaTrackSet>,
    stats_ticker: Ticker,
    last_stats: Option<PeerStats>,
}

impl PeerSession {
    pub fn new(
        backend: Arc<dyn PeerBackend>,
        config: PeerConfig,
        events: EventSink<PeerEvent>,
    ) -> Self {
        Self {
            backend,
            config,
            events,
            state: PeerConnectionState::New,
            generation: 0,
            active: None,
            local_media: None,
            stats_ticker: Ticker::new(),
            last_stats: None,
        }
    }

    /// Opens a fresh connection and produces an offer. The offer comes back
    /// from [`PeerSession::on_event`] once it is ready.
    pub fn initiate_call(&mut self) {
        let tracks = self.local_media.clone();
        let generation = self.open_connection(
            CallRole::Caller,
            step(move |connection| async move {
                if let Some(tracks) = &tracks {
                    connection.add_tracks(tracks).await?;
                }
                let offer = connection.create_offer(false).await?;
                connection.set_local_description(offer.clone()).await?;
                Ok::<_, PeerError>(Negotiation::LocalOffer(offer))
            }),
        );
        info!("Initiating call (generation {})", generation);
    }

    /// Answers a remote offer. An offer from the same remote session on a
    /// settled connection renegotiates in place (ICE restart, added tracks);
    /// anything else replaces the connection.
    pub fn handle_offer(&mut self, offer: SessionDescription) {
        let origin = offer.origin_session_id().map(str::to_owned);

        if let Some(active) = self.active.as_mut()
            && active.phase == Phase::Stable
            && origin.is_some()
            && active.remote_session == origin
        {
            info!("Renegotiating with the current remote session");
            active.phase = Phase::Renegotiating;
            active.enqueue(answer_step(offer, origin));
            return;
        }

        let tracks = self.local_media.clone();
        let answer = answer_step(offer, origin);
        let generation = self.open_connection(
            CallRole::Callee,
            step(move |connection| async move {
                if let Some(tracks) = &tracks {
                    connection.add_tracks(tracks).await?;
                }
                answer(connection).await
            }),
        );
        if let Some(active) = self.active.as_mut() {
            active.remote_description_set = true;
        }
        info!("Answering remote offer (generation {})", generation);
    }

    /// Applies the answer to our pending offer. Dropped if no offer is
    /// pending.
    pub fn handle_answer(&mut self, answer: SessionDescription) {
        let Some(active) = self.active.as_mut() else {
            warn!("Dropping answer: no active connection");
            return;
        };
        if active.phase != Phase::HaveLocalOffer {
            warn!("Dropping answer: no local offer pending ({:?})", active.phase);
            return;
        }

        active.phase = Phase::ApplyingAnswer;
        active.remote_description_set = true;
        let remote_session = answer.origin_session_id().map(str::to_owned);
        active.enqueue(step(move |connection| async move {
            connection.set_remote_description(answer).await?;
            Ok::<_, PeerError>(Negotiation::RemoteAnswerApplied { remote_session })
        }));
    }

    pub fn handle_ice_candidate(&mut self, candidate: IceCandidate) {
        let Some(active) = self.active.as_ref() else {
            debug!("Dropping ICE candidate: no active connection");
            return;
        };
        if !active.remote_description_set {
            debug!("Dropping ICE candidate: remote description not set");
            return;
        }

        active.enqueue(step(move |connection| async move {
            connection.add_ice_candidate(candidate).await?;
            Ok::<_, PeerError>(Negotiation::CandidateApplied)
        }));
    }

    /// Tracks used by every connection from now on. Also added to the live
    /// connection, which then asks for renegotiation.
    pub fn attach_local_media(&mut self, tracks: MediaTrackSet) {
        self.local_media = Some(tracks);
        self.sync_local_media();
    }

    /// Closes the connection and stops sampling. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.stats_ticker.stop();
        self.last_stats = None;
        if let Some(active) = self.active.take() {
            info!("Tearing down peer connection (generation {})", active.generation);
            if let Some(connection) = active.connection {
                close_in_background(connection);
            }
        }
        self.set_state(PeerConnectionState::Disconnected);
    }

    pub fn on_event(&mut self, event: PeerEvent) -> Vec<PeerOutput> {
        match event {
            PeerEvent::Signal { generation, signal } => {
                if generation != self.generation {
                    debug!("Ignoring {:?} from superseded generation {}", signal, generation);
                    return Vec::new();
                }
                self.on_signal(signal)
            }
            PeerEvent::Negotiated {
                generation,
                connection,
                outcome,
            } => self.on_negotiated(generation, connection, outcome),
            PeerEvent::StatsDue { token } => {
                if self.stats_ticker.accepts(token) {
                    self.sample_stats();
                }
                Vec::new()
            }
            PeerEvent::Stats { generation, stats } => {
                if generation == self.generation {
                    match stats {
                        Ok(stats) => {
                            debug!("Peer stats: {:?}", stats);
                            self.last_stats = Some(stats);
                        }
                        Err(e) => debug!("Stats unavailable: {}", e),
                    }
                }
                Vec::new()
            }
        }
    }

    pub fn state(&self) -> PeerConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn role(&self) -> Option<CallRole> {
        self.active.as_ref().map(|a| a.role)
    }

    pub fn has_connection(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.connection.is_some())
    }

    pub fn remote_description_set(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.remote_description_set)
    }

    pub fn last_stats(&self) -> Option<&PeerStats> {
        self.last_stats.as_ref()
    }

    pub fn is_sampling_stats(&self) -> bool {
        self.stats_ticker.is_running()
    }

    fn on_negotiated(
        &mut self,
        generation: u64,
        connection: Option<Arc<dyn PeerConnection>>,
        outcome: Result<Negotiation, PeerError>,
    ) -> Vec<PeerOutput> {
        let current = generation == self.generation;
        let Some(active) = self
            .active
            .as_mut()
            .filter(|active| current && active.generation == generation)
        else {
            debug!("Discarding negotiation result of superseded generation {}", generation);
            if let Some(connection) = connection {
                close_in_background(connection);
            }
            return Vec::new();
        };

        if active.connection.is_none() && connection.is_some() {
            active.connection = connection;
        }

        let mut out = Vec::new();
        match outcome {
            Err(e) => {
                error!("Negotiation failed: {}", e);
                self.fail();
                return out;
            }
            Ok(Negotiation::LocalOffer(offer)) => {
                active.phase = Phase::HaveLocalOffer;
                active.local_description_sent = true;
                out.push(PeerOutput::Signal(SignalMessage::Offer { offer }));
                active.flush_candidates(&mut out);
            }
            Ok(Negotiation::LocalAnswer {
                answer,
                remote_session,
            }) => {
                active.phase = Phase::Stable;
                active.local_description_sent = true;
                active.remote_session = remote_session;
                out.push(PeerOutput::Signal(SignalMessage::Answer { answer }));
                active.flush_candidates(&mut out);
            }
            Ok(Negotiation::RemoteAnswerApplied { remote_session }) => {
                debug!("Remote answer applied");
                active.phase = Phase::Stable;
                if remote_session.is_some() {
                    active.remote_session = remote_session;
                }
            }
            Ok(Negotiation::CandidateApplied | Negotiation::TracksAttached) => {}
        }
        out
    }

    fn on_signal(&mut self, signal: PeerSignal) -> Vec<PeerOutput> {
        match signal {
            PeerSignal::IceConnectionState(ice) => {
                debug!("ICE connection state: {:?}", ice);
                match ice {
                    IceConnectionState::Checking => self.set_state(PeerConnectionState::Connecting),
                    IceConnectionState::Connected | IceConnectionState::Completed => {
                        self.set_state(PeerConnectionState::Connected);
                        self.start_stats();
                    }
                    IceConnectionState::Failed => self.fail(),
                    IceConnectionState::Disconnected => {
                        self.set_state(PeerConnectionState::Disconnected);
                        self.stats_ticker.stop();
                    }
                    IceConnectionState::New | IceConnectionState::Closed => {}
                }
                Vec::new()
            }
            PeerSignal::ConnectionState(TransportState::Failed) => {
                self.try_ice_restart();
                Vec::new()
            }
            PeerSignal::ConnectionState(transport) => {
                debug!("Transport state: {:?}", transport);
                Vec::new()
            }
            PeerSignal::LocalCandidate(candidate) => {
                let Some(active) = self.active.as_mut() else {
                    return Vec::new();
                };
                if active.local_description_sent {
                    vec![PeerOutput::Signal(SignalMessage::IceCandidate { candidate })]
                } else {
                    active.pending_candidates.push(candidate);
                    Vec::new()
                }
            }
            PeerSignal::RemoteTrack(track) => {
                let Some(active) = self.active.as_mut() else {
                    return Vec::new();
                };
                if active.remote_streams.insert(track.stream_id.clone()) {
                    info!("Remote stream {} arrived ({})", track.stream_id, track.kind);
                    vec![PeerOutput::RemoteStream(track)]
                } else {
                    Vec::new()
                }
            }
            PeerSignal::NegotiationNeeded => {
                self.renegotiate();
                Vec::new()
            }
        }
    }

    fn try_ice_restart(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.role != CallRole::Caller
            || active.ice_restart_attempted
            || active.phase != Phase::Stable
        {
            warn!("Transport failed, no ICE restart possible");
            self.fail();
            return;
        }

        info!("Transport failed, attempting ICE restart");
        active.ice_restart_attempted = true;
        active.phase = Phase::Renegotiating;
        active.enqueue(offer_step(true));
    }

    fn renegotiate(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.phase != Phase::Stable {
            debug!("Negotiation needed while {:?}, skipping", active.phase);
            return;
        }

        info!("Renegotiating after local track change");
        active.phase = Phase::Renegotiating;
        active.enqueue(offer_step(false));
    }

    /// Queues the current tracks unless this connection already has them,
    /// either attached or about to be by its creation step.
    fn sync_local_media(&mut self) {
        let Some(tracks) = self.local_media.clone() else {
            return;
        };
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.media_stream.as_deref() == Some(tracks.stream_id.as_str()) {
            return;
        }

        active.media_stream = Some(tracks.stream_id.clone());
        active.enqueue(step(move |connection| async move {
            if let Err(e) = connection.add_tracks(&tracks).await {
                warn!("Failed to attach local media {}: {}", tracks.stream_id, e);
            }
            Ok::<_, PeerError>(Negotiation::TracksAttached)
        }));
    }

    /// Replaces the current connection with a new generation whose worker
    /// creates the connection, runs `setup` and then drains queued steps.
    fn open_connection(&mut self, role: CallRole, setup: Step) -> u64 {
        if let Some(connection) = self.active.take().and_then(|a| a.connection) {
            debug!("Closing previous peer connection");
            close_in_background(connection);
        }
        self.stats_ticker.stop();
        self.last_stats = None;
        self.generation += 1;

        let generation = self.generation;
        let (steps_tx, mut steps) = mpsc::unbounded_channel::<Step>();
        let media_stream = self.local_media.as_ref().map(|t| t.stream_id.clone());
        self.active = Some(ActivePeer::new(generation, role, media_stream, steps_tx));
        self.set_state(PeerConnectionState::Connecting);

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let signals = self.signal_sink(generation);
        let events = self.events.clone();
        tokio::spawn(async move {
            let connection = match backend.create(&config, signals).await {
                Ok(connection) => connection,
                Err(e) => {
                    events.emit(PeerEvent::Negotiated {
                        generation,
                        connection: None,
                        outcome: Err(e),
                    });
                    return;
                }
            };
            let outcome = setup(Arc::clone(&connection)).await;
            events.emit(PeerEvent::Negotiated {
                generation,
                connection: Some(Arc::clone(&connection)),
                outcome,
            });
            while let Some(step) = steps.recv().await {
                let outcome = step(Arc::clone(&connection)).await;
                events.emit(PeerEvent::Negotiated {
                    generation,
                    connection: None,
                    outcome,
                });
            }
            debug!("Step queue of generation {} closed", generation);
        });
        generation
    }

    fn signal_sink(&self, generation: u64) -> EventSink<PeerSignal> {
        self.events
            .map(move |signal| PeerEvent::Signal { generation, signal })
    }

    fn start_stats(&mut self) {
        if self.stats_ticker.is_running() {
            return;
        }
        self.stats_ticker
            .start(self.config.stats_interval, &self.events, |token| {
                PeerEvent::StatsDue { token }
            });
    }

    fn sample_stats(&self) {
        if self.state != PeerConnectionState::Connected {
            return;
        }
        let Some(connection) = self.active.as_ref().and_then(|a| a.connection.clone()) else {
            return;
        };
        let generation = self.generation;
        let events = self.events.clone();
        tokio::spawn(async move {
            let stats = connection.stats().await;
            events.emit(PeerEvent::Stats { generation, stats });
        });
    }

    fn fail(&mut self) {
        self.stats_ticker.stop();
        self.set_state(PeerConnectionState::Failed);
    }

    fn set_state(&mut self, state: PeerConnectionState) {
        if self.state != state {
            info!("Peer connection state: {} -> {}", self.state, state);
            self.state = state;
        }
    }
}

fn offer_step(ice_restart: bool) -> Step {
    step(move |connection| async move {
        let offer = connection.create_offer(ice_restart).await?;
        connection.set_local_description(offer.clone()).await?;
        Ok::<_, PeerError>(Negotiation::LocalOffer(offer))
    })
}

fn answer_step(offer: SessionDescription, remote_session: Option<String>) -> Step {
    step(move |connection| async move {
        connection.set_remote_description(offer).await?;
        let answer = connection.create_answer().await?;
        connection.set_local_description(answer.clone()).await?;
        Ok::<_, PeerError>(Negotiation::LocalAnswer {
            answer,
            remote_session,
        })
    })
}

fn close_in_background(connection: Arc<dyn PeerConnection>) {
    tokio::spawn(async move {
        if let Err(e) = connection.close().await {
            debug!("Error while closing peer connection: {}", e);
        }
    });
}
