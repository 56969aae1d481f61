use crate::error::MediaError;
use crate::event_sink::EventSink;
use crate::media::{Acquisition, MediaDevices, MediaIssue, acquire};
use duet_core::{MediaConstraints, MediaTrackSet, TrackKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum MediaEvent {
    Acquired {
        generation: u64,
        result: Result<Acquisition, MediaError>,
    },
}

/// Owner of the local capture.
///
/// Acquisition runs in the background and reports through
/// [`MediaEvent::Acquired`]. Only the latest request counts; tracks from an
/// earlier one are stopped on arrival.
pub struct LocalMedia {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    events: EventSink<MediaEvent>,
    generation: u64,
    acquiring: bool,
    tracks: Option<MediaTrackSet>,
    audio_enabled: bool,
    video_enabled: bool,
    issue: Option<MediaIssue>,
}

impl LocalMedia {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        constraints: MediaConstraints,
        events: EventSink<MediaEvent>,
    ) -> Self {
        Self {
            devices,
            constraints,
            events,
            generation: 0,
            acquiring: false,
            tracks: None,
            audio_enabled: false,
            video_enabled: false,
            issue: None,
        }
    }

    /// Stops the current tracks and asks for new ones.
    pub fn request(&mut self) {
        self.stop_tracks();
        self.generation += 1;
        self.acquiring = true;

        let generation = self.generation;
        let devices = Arc::clone(&self.devices);
        let constraints = self.constraints.clone();
        let events = self.events.clone();
        debug!("Requesting local media (generation {})", generation);
        tokio::spawn(async move {
            let result = acquire(devices.as_ref(), &constraints).await;
            events.emit(MediaEvent::Acquired { generation, result });
        });
    }

    /// Pins `kind` to another device and re-acquires.
    pub fn switch_device(&mut self, kind: TrackKind, device_id: &str) {
        info!("Switching {} device to {}", kind, device_id);
        self.constraints = self.constraints.with_device(kind, device_id);
        self.request();
    }

    /// Applies an acquisition result. Returns `true` when it was current.
    pub fn on_event(&mut self, event: MediaEvent) -> bool {
        let MediaEvent::Acquired { generation, result } = event;
        if generation != self.generation || !self.acquiring {
            debug!("Dropping stale media acquisition {}", generation);
            if let Ok(acquisition) = result {
                acquisition.tracks.stop_all();
            }
            return false;
        }

        self.acquiring = false;
        match result {
            Ok(Acquisition { tracks, issue }) => {
                self.audio_enabled = tracks.has(TrackKind::Audio);
                self.video_enabled = tracks.has(TrackKind::Video);
                info!(
                    "Local media ready (audio: {}, video: {})",
                    self.audio_enabled, self.video_enabled
                );
                self.tracks = Some(tracks);
                self.issue = issue;
            }
            Err(e) => {
                warn!("Local media unavailable: {}", e);
                self.issue = Some(MediaIssue::Failed(e));
            }
        }
        true
    }

    /// Flips the audio track. Returns the new state; `false` without a track.
    pub fn toggle_audio(&mut self) -> bool {
        self.audio_enabled = self.toggle(TrackKind::Audio);
        self.audio_enabled
    }

    pub fn toggle_video(&mut self) -> bool {
        self.video_enabled = self.toggle(TrackKind::Video);
        self.video_enabled
    }

    /// Stops every track. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.stop_tracks();
        self.generation += 1;
        self.acquiring = false;
    }

    pub fn tracks(&self) -> Option<&MediaTrackSet> {
        self.tracks.as_ref()
    }

    pub fn issue(&self) -> Option<&MediaIssue> {
        self.issue.as_ref()
    }

    pub fn has_issue(&self) -> bool {
        self.issue.is_some()
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    fn toggle(&self, kind: TrackKind) -> bool {
        self.tracks
            .as_ref()
            .and_then(|tracks| tracks.toggle(kind))
            .unwrap_or(false)
    }

    fn stop_tracks(&mut self) {
        if let Some(tracks) = self.tracks.take() {
            debug!("Stopping local stream {}", tracks.stream_id);
            tracks.stop_all();
        }
        self.audio_enabled = false;
        self.video_enabled = false;
    }
}

impl Drop for LocalMedia {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
