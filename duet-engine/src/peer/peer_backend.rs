use crate::error::PeerError;
use crate::event_sink::EventSink;
use async_trait::async_trait;
use duet_core::config::PeerConfig;
use duet_core::{IceCandidate, MediaTrackSet, PeerStats, RemoteTrack, SessionDescription};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Aggregate state of the DTLS/ICE transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Notifications a connection raises on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerSignal {
    IceConnectionState(IceConnectionState),
    ConnectionState(TransportState),
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    NegotiationNeeded,
}

/// Factory for peer connections. The production implementation is
/// [`crate::transport::RtcBackend`].
#[async_trait]
pub trait PeerBackend: Send + Sync + 'static {
    async fn create(
        &self,
        config: &PeerConfig,
        signals: EventSink<PeerSignal>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError>;
}

#[async_trait]
pub trait PeerConnection: Send + Sync + 'static {
    async fn add_tracks(&self, tracks: &MediaTrackSet) -> Result<(), PeerError>;

    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, PeerError>;

    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    async fn stats(&self) -> Result<PeerStats, PeerError>;

    async fn close(&self) -> Result<(), PeerError>;
}
