mod local_media;
mod media_devices;

pub use local_media::{LocalMedia, MediaEvent};
pub use media_devices::{Acquisition, MediaDevices, MediaIssue, acquire};
