use duet_core::{MediaConstraints, TrackKind};
use duet_engine::media::{MediaIssue, acquire};
use duet_engine::MediaError;

use crate::integration::init_tracing;
use crate::utils::FakeDevices;

#[tokio::test]
async fn test_denied_camera_falls_back_to_audio() {
    init_tracing();

    let devices = FakeDevices::new();
    devices.deny_video(Some(MediaError::PermissionDenied("camera blocked".to_owned())));

    let acquisition = acquire(&devices, &MediaConstraints::default()).await.unwrap();

    assert!(acquisition.tracks.has(TrackKind::Audio));
    assert!(!acquisition.tracks.has(TrackKind::Video));
    assert!(matches!(
        acquisition.issue,
        Some(MediaIssue::VideoUnavailable(MediaError::PermissionDenied(_)))
    ));
    assert_eq!(
        acquisition.issue.unwrap().to_string(),
        "Camera access denied, continuing with audio only"
    );

    let requests = devices.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].wants(TrackKind::Video));
    assert!(!requests[1].wants(TrackKind::Video));
    assert!(requests[1].wants(TrackKind::Audio));
}

#[tokio::test]
async fn test_missing_camera_falls_back_to_audio() {
    init_tracing();

    let devices = FakeDevices::new();
    devices.deny_video(Some(MediaError::DeviceNotFound("no camera".to_owned())));

    let acquisition = acquire(&devices, &MediaConstraints::default()).await.unwrap();
    assert_eq!(
        acquisition.issue.unwrap().to_string(),
        "No camera found, continuing with audio only"
    );
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    init_tracing();

    let devices = FakeDevices::new();
    devices.deny_video(Some(MediaError::Constraint("1080p unsupported".to_owned())));

    let result = acquire(&devices, &MediaConstraints::default()).await;
    assert_eq!(
        result.unwrap_err(),
        MediaError::Constraint("1080p unsupported".to_owned())
    );
    assert_eq!(devices.requests().len(), 1);
}

#[tokio::test]
async fn test_partial_grant_is_reported() {
    init_tracing();

    let devices = FakeDevices::new();
    devices.grant_audio_only();

    let acquisition = acquire(&devices, &MediaConstraints::default()).await.unwrap();
    assert_eq!(
        acquisition.issue,
        Some(MediaIssue::PartialGrant {
            missing: TrackKind::Video
        })
    );
    assert!(acquisition.tracks.has(TrackKind::Audio));
}

#[tokio::test]
async fn test_audio_only_request_is_not_partial() {
    init_tracing();

    let devices = FakeDevices::new();
    let constraints = MediaConstraints::default().audio_only();

    let acquisition = acquire(&devices, &constraints).await.unwrap();
    assert!(acquisition.issue.is_none());
    assert!(!acquisition.tracks.has(TrackKind::Video));
}
