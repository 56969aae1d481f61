use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug)]
struct TrackFlags {
    enabled: AtomicBool,
    live: AtomicBool,
}

/// Handle to a captured local track.
///
/// Clones share the same flags, so the capture layer observes muting and
/// stopping done through any clone. `enabled` only mutes; `stop` ends the
/// track for good.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    pub device_id: Option<String>,
    flags: Arc<TrackFlags>,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            device_id: None,
            flags: Arc::new(TrackFlags {
                enabled: AtomicBool::new(true),
                live: AtomicBool::new(true),
            }),
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.flags.live.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.flags.live.store(false, Ordering::SeqCst);
    }
}

/// The local tracks of one acquisition, grouped under one stream id.
#[derive(Debug, Clone)]
pub struct MediaTrackSet {
    pub stream_id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaTrackSet {
    pub fn new(stream_id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            stream_id: stream_id.into(),
            tracks,
        }
    }

    pub fn of_kind(&self, kind: TrackKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// Returns the new value of the flag, or `None` when there is no track
    /// of that kind.
    pub fn toggle(&self, kind: TrackKind) -> Option<bool> {
        let enabled = !self.of_kind(kind).next()?.is_enabled();
        for track in self.of_kind(kind) {
            track.set_enabled(enabled);
        }
        Some(enabled)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// A track announced by the remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub track_id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            device_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub facing_mode: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing_mode: "user".to_owned(),
            device_id: None,
        }
    }
}

/// What to ask the capture platform for. `None` means "do not capture".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: Option<AudioConstraints>,
    pub video: Option<VideoConstraints>,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: Some(VideoConstraints::default()),
        }
    }
}

impl MediaConstraints {
    pub fn wants(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio.is_some(),
            TrackKind::Video => self.video.is_some(),
        }
    }

    pub fn audio_only(&self) -> Self {
        Self {
            audio: self.audio.clone(),
            video: None,
        }
    }

    /// Pins one kind to a device. A kind that was not requested is requested
    /// with default settings.
    pub fn with_device(&self, kind: TrackKind, device_id: impl Into<String>) -> Self {
        let mut next = self.clone();
        let device_id = Some(device_id.into());
        match kind {
            TrackKind::Audio => {
                next.audio.get_or_insert_with(AudioConstraints::default).device_id = device_id;
            }
            TrackKind::Video => {
                next.video.get_or_insert_with(VideoConstraints::default).device_id = device_id;
            }
        }
        next
    }
}
