use crate::error::MediaError;
use async_trait::async_trait;
use duet_core::{MediaConstraints, MediaTrackSet, TrackKind};
use std::fmt;
use tracing::warn;

/// The capture platform.
#[async_trait]
pub trait MediaDevices: Send + Sync + 'static {
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaTrackSet, MediaError>;
}

/// Something the user should know about the local media, without the
/// session having to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaIssue {
    /// Video could not be captured; continuing with audio only.
    VideoUnavailable(MediaError),
    /// The platform granted less than was asked for.
    PartialGrant { missing: TrackKind },
    /// Nothing could be captured.
    Failed(MediaError),
}

impl fmt::Display for MediaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoUnavailable(MediaError::PermissionDenied(_)) => {
                f.write_str("Camera access denied, continuing with audio only")
            }
            Self::VideoUnavailable(MediaError::DeviceNotFound(_)) => {
                f.write_str("No camera found, continuing with audio only")
            }
            Self::VideoUnavailable(cause) => {
                write!(f, "Video unavailable ({cause}), continuing with audio only")
            }
            Self::PartialGrant { missing } => write!(f, "No {missing} track was granted"),
            Self::Failed(cause) => write!(f, "Could not access camera or microphone: {cause}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Acquisition {
    pub tracks: MediaTrackSet,
    pub issue: Option<MediaIssue>,
}

/// Requests `constraints`, retrying without video when the camera is denied
/// or missing.
pub async fn acquire(
    devices: &dyn MediaDevices,
    constraints: &MediaConstraints,
) -> Result<Acquisition, MediaError> {
    match devices.get_user_media(constraints).await {
        Ok(tracks) => {
            let issue = [TrackKind::Audio, TrackKind::Video]
                .into_iter()
                .find(|kind| constraints.wants(*kind) && !tracks.has(*kind))
                .map(|missing| MediaIssue::PartialGrant { missing });
            if let Some(issue) = &issue {
                warn!("Partial media grant: {}", issue);
            }
            Ok(Acquisition { tracks, issue })
        }
        Err(e)
            if constraints.wants(TrackKind::Video)
                && constraints.wants(TrackKind::Audio)
                && e.allows_audio_fallback() =>
        {
            warn!("Video capture failed ({}), retrying audio only", e);
            let tracks = devices.get_user_media(&constraints.audio_only()).await?;
            Ok(Acquisition {
                tracks,
                issue: Some(MediaIssue::VideoUnavailable(e)),
            })
        }
        Err(e) => Err(e),
    }
}
