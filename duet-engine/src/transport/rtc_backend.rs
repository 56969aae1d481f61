use crate::error::PeerError;
use crate::event_sink::EventSink;
use crate::peer::{IceConnectionState, PeerBackend, PeerConnection, PeerSignal, TransportState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use duet_core::config::PeerConfig;
use duet_core::{
    IceCandidate, MediaTrack, MediaTrackSet, PeerStats, RemoteTrack, SdpType, SessionDescription,
    TrackKind,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::stats::StatsReportType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Peer backend on top of `webrtc`.
///
/// Local tracks are exposed as sample writers keyed by track id; the capture
/// pipeline pushes encoded frames through [`RtcBackend::write_sample`].
/// Remote tracks are kept for the renderer under their track id.
#[derive(Clone, Default)]
pub struct RtcBackend {
    local_tracks: Arc<DashMap<String, Arc<TrackLocalStaticSample>>>,
    remote_tracks: Arc<DashMap<String, Arc<TrackRemote>>>,
}

impl RtcBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn write_sample(
        &self,
        track_id: &str,
        data: Bytes,
        duration: Duration,
    ) -> Result<(), PeerError> {
        let track = self
            .local_tracks
            .get(track_id)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| PeerError::Backend(format!("no local track {track_id}")))?;
        track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await
            .map_err(PeerError::backend)
    }

    pub fn remote_track(&self, track_id: &str) -> Option<Arc<TrackRemote>> {
        self.remote_tracks.get(track_id).map(|t| Arc::clone(t.value()))
    }

    fn local_track(&self, track: &MediaTrack, stream_id: &str) -> Arc<TrackLocalStaticSample> {
        let entry = self.local_tracks.entry(track.id.clone()).or_insert_with(|| {
            Arc::new(TrackLocalStaticSample::new(
                codec_for(track.kind),
                track.id.clone(),
                stream_id.to_owned(),
            ))
        });
        Arc::clone(entry.value())
    }
}

#[async_trait]
impl PeerBackend for RtcBackend {
    async fn create(
        &self,
        config: &PeerConfig,
        signals: EventSink<PeerSignal>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let connection = RtcConnection::open(self.clone(), config, signals)
            .await
            .map_err(|e| PeerError::Backend(format!("{e:#}")))?;
        Ok(Arc::new(connection))
    }
}

struct RtcConnection {
    backend: RtcBackend,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<Vec<(String, Arc<RTCRtpSender>)>>,
}

impl RtcConnection {
    async fn open(
        backend: RtcBackend,
        config: &PeerConfig,
        signals: EventSink<PeerSignal>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ice_candidate_pool_size: config.ice_candidate_pool_size,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let ice_signals = signals.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let signals = ice_signals.clone();
                Box::pin(async move {
                    let Some(state) = map_ice_state(s) else { return };
                    signals.emit(PeerSignal::IceConnectionState(state));
                })
            },
        ));

        let state_signals = signals.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let signals = state_signals.clone();
                Box::pin(async move {
                    info!("Peer Connection State changed: {:?}", s);
                    let Some(state) = map_transport_state(s) else { return };
                    signals.emit(PeerSignal::ConnectionState(state));
                })
            },
        ));

        let ice_candidate_signals = signals.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let signals = ice_candidate_signals.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                signals.emit(PeerSignal::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_signals = signals.clone();
        let remote_tracks = Arc::clone(&backend.remote_tracks);
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let signals = track_signals.clone();
                let remote_tracks = Arc::clone(&remote_tracks);
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        RTPCodecType::Video => TrackKind::Video,
                        other => {
                            debug!("Ignoring remote track of kind {:?}", other);
                            return;
                        }
                    };
                    let remote = RemoteTrack {
                        track_id: track.id(),
                        stream_id: track.stream_id(),
                        kind,
                    };
                    remote_tracks.insert(remote.track_id.clone(), track);
                    signals.emit(PeerSignal::RemoteTrack(remote));
                })
            },
        ));

        let negotiation_signals = signals;
        peer_connection.on_negotiation_needed(Box::new(move || {
            let signals = negotiation_signals.clone();
            Box::pin(async move {
                signals.emit(PeerSignal::NegotiationNeeded);
            })
        }));

        Ok(Self {
            backend,
            peer_connection,
            senders: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PeerConnection for RtcConnection {
    /// Replaces whatever was sent before with the tracks of `tracks`.
    async fn add_tracks(&self, tracks: &MediaTrackSet) -> Result<(), PeerError> {
        let mut senders = self.senders.lock().await;
        for (track_id, sender) in senders.drain(..) {
            if let Err(e) = self.peer_connection.remove_track(&sender).await {
                warn!("Failed to remove local track {}: {}", track_id, e);
            }
        }

        for track in &tracks.tracks {
            let local = self.backend.local_track(track, &tracks.stream_id);
            let sender = self
                .peer_connection
                .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(PeerError::backend)?;

            let rtcp_sender = Arc::clone(&sender);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while rtcp_sender.read(&mut buf).await.is_ok() {}
            });
            senders.push((track.id.clone(), sender));
        }
        Ok(())
    }

    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, PeerError> {
        let options = ice_restart.then(|| RTCOfferOptions {
            ice_restart: true,
            ..Default::default()
        });
        let offer = self
            .peer_connection
            .create_offer(options)
            .await
            .map_err(PeerError::backend)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(PeerError::backend)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await
            .map_err(PeerError::backend)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await
            .map_err(PeerError::backend)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(PeerError::backend)
    }

    async fn stats(&self) -> Result<PeerStats, PeerError> {
        let report = self.peer_connection.get_stats().await;
        let mut stats = PeerStats::default();
        for entry in report.reports.values() {
            match entry {
                StatsReportType::OutboundRTP(outbound) => stats.bytes_sent += outbound.bytes_sent,
                StatsReportType::InboundRTP(inbound) => {
                    stats.bytes_received += inbound.bytes_received
                }
                StatsReportType::RemoteInboundRTP(remote) => {
                    stats.packets_lost += remote.packets_lost;
                    if let Some(rtt) = remote.round_trip_time {
                        stats.round_trip_time = Duration::try_from_secs_f64(rtt).ok();
                    }
                }
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.peer_connection.close().await.map_err(PeerError::backend)
    }
}

fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    match kind {
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, PeerError> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpType::Rollback => return Err(PeerError::UnsupportedDescription(desc.sdp_type)),
    };
    rtc.map_err(PeerError::backend)
}

fn map_ice_state(state: RTCIceConnectionState) -> Option<IceConnectionState> {
    Some(match state {
        RTCIceConnectionState::New => IceConnectionState::New,
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
        RTCIceConnectionState::Unspecified => return None,
    })
}

fn map_transport_state(state: RTCPeerConnectionState) -> Option<TransportState> {
    Some(match state {
        RTCPeerConnectionState::New => TransportState::New,
        RTCPeerConnectionState::Connecting => TransportState::Connecting,
        RTCPeerConnectionState::Connected => TransportState::Connected,
        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
        RTCPeerConnectionState::Failed => TransportState::Failed,
        RTCPeerConnectionState::Closed => TransportState::Closed,
        RTCPeerConnectionState::Unspecified => return None,
    })
}
