//! Boundary to the platform media API.
//!
//! Platform adapters implement [`MediaDevices`] and hand out [`MediaStream`]s.
//! Failures cross the boundary as a [`DeviceFailure`] carrying the platform's
//! own error name; classification happens in [`super::CameraError`].

use std::fmt;

use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;

use super::StreamConstraints;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub name: String,
    pub message: String,
}

impl DeviceFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for DeviceFailure {}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub live: bool,
}

/// A granted media stream. Dropping it without stopping its tracks leaks the
/// device, so owners must go through [`stop_all_tracks`].
pub trait MediaStream: Send {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<TrackInfo>;

    fn stop_track(&mut self, track_id: &str);

    /// Current video frame at the stream's native resolution.
    fn current_frame(&self) -> Result<DynamicImage, DeviceFailure>;
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Suspends until the platform grants or denies access. May never resolve
    /// if the user leaves a permission prompt open.
    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceFailure>;
}

/// Stop every live track of `stream`; returns how many were stopped.
pub fn stop_all_tracks(stream: &mut dyn MediaStream) -> usize {
    let live: Vec<String> = stream
        .tracks()
        .into_iter()
        .filter(|track| track.live)
        .map(|track| track.id)
        .collect();

    for track_id in &live {
        stream.stop_track(track_id);
    }

    live.len()
}
