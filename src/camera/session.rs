use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    device::stop_all_tracks, CameraError, CaptureError, FacingMode, FrameEncoder, ImageArtifact,
    MediaDevices, MediaStream, SessionSnapshot, SessionStatus, StreamConstraints,
};
use crate::settings::DEFAULT_WIDE_VIEWPORT_BREAKPOINT;

#[derive(Default)]
struct SessionState {
    status: SessionStatus,
    stream: Option<Box<dyn MediaStream>>,
    /// Token of the in-flight device request, if any.
    pending: Option<CancellationToken>,
    constraints: Option<StreamConstraints>,
    last_error: Option<CameraError>,
}

impl SessionState {
    fn release_stream(&mut self) -> usize {
        match self.stream.take() {
            Some(mut stream) => {
                let stopped = stop_all_tracks(stream.as_mut());
                info!("Released camera stream {} ({} tracks stopped)", stream.id(), stopped);
                stopped
            }
            None => 0,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    fn reset(&mut self) {
        self.cancel_pending();
        self.release_stream();
        self.status = SessionStatus::Idle;
        self.constraints = None;
        self.last_error = None;
    }
}

fn discard_late_grant(mut stream: Box<dyn MediaStream>) {
    let stopped = stop_all_tracks(stream.as_mut());
    warn!(
        "Discarded camera grant {} that arrived after cancellation ({} tracks stopped)",
        stream.id(),
        stopped
    );
}

/// An encoded frame and the stream it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub stream_id: String,
    pub artifact: ImageArtifact,
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.cancel_pending();
        self.release_stream();
    }
}

/// Live camera acquisition state machine.
///
/// Owns at most one stream at a time. Cloning yields another handle to the
/// same session.
#[derive(Clone)]
pub struct CaptureSession {
    state: Arc<Mutex<SessionState>>,
    devices: Arc<dyn MediaDevices>,
    encoder: FrameEncoder,
    viewport_breakpoint: u32,
}

impl CaptureSession {
    pub fn new(devices: Arc<dyn MediaDevices>, encoder: FrameEncoder) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            devices,
            encoder,
            viewport_breakpoint: DEFAULT_WIDE_VIEWPORT_BREAKPOINT,
        }
    }

    pub fn with_viewport_breakpoint(mut self, breakpoint: u32) -> Self {
        self.viewport_breakpoint = breakpoint;
        self
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn last_error(&self) -> Option<CameraError> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            status: state.status,
            stream_id: state.stream.as_ref().map(|stream| stream.id().to_string()),
            constraints: state.constraints.clone(),
            last_error: state.last_error.clone(),
            error_message: state.last_error.as_ref().map(CameraError::user_message),
        }
    }

    /// Ask the device for a video stream sized for `viewport_width`.
    ///
    /// A no-op while already active. Starting while a request is pending
    /// supersedes it; the superseded call returns [`CaptureError::Cancelled`].
    pub async fn start(
        &self,
        facing: FacingMode,
        viewport_width: u32,
    ) -> Result<(), CaptureError> {
        let constraints = StreamConstraints::for_viewport_with_breakpoint(
            facing,
            viewport_width,
            self.viewport_breakpoint,
        );

        let token = {
            let mut state = self.state.lock().await;
            match state.status {
                SessionStatus::Active => return Ok(()),
                SessionStatus::Requesting => {
                    info!("Superseding pending camera request");
                    state.cancel_pending();
                }
                SessionStatus::Error => {
                    state.last_error = None;
                }
                SessionStatus::Idle => {}
            }

            let token = CancellationToken::new();
            state.status = SessionStatus::Requesting;
            state.pending = Some(token.clone());
            state.constraints = Some(constraints.clone());
            token
        };

        info!(
            "Requesting camera stream (facing={}, ideal={}x{})",
            facing.as_str(),
            constraints.width.ideal,
            constraints.height.ideal
        );

        // The lock is not held here: stop() must be able to cancel us.
        let devices = Arc::clone(&self.devices);
        let requested = constraints.clone();
        let mut request = Box::pin(async move { devices.request_stream(&requested).await });

        let outcome = tokio::select! {
            outcome = &mut request => outcome,
            _ = token.cancelled() => {
                // The platform may still grant; release whatever it hands back.
                tokio::spawn(async move {
                    if let Ok(stream) = request.await {
                        discard_late_grant(stream);
                    }
                });
                return Err(CaptureError::Cancelled);
            }
        };

        let mut state = self.state.lock().await;
        if token.is_cancelled() {
            if let Ok(stream) = outcome {
                discard_late_grant(stream);
            }
            return Err(CaptureError::Cancelled);
        }
        state.pending = None;

        match outcome {
            Ok(stream) => {
                state.release_stream();
                info!("Camera stream {} active", stream.id());
                state.stream = Some(stream);
                state.status = SessionStatus::Active;
                Ok(())
            }
            Err(failure) => {
                let camera_error = CameraError::from(failure);
                error!("Camera request failed: {camera_error}");
                state.status = SessionStatus::Error;
                state.constraints = None;
                state.last_error = Some(camera_error.clone());
                Err(CaptureError::Camera(camera_error))
            }
        }
    }

    /// Encode the current frame. Leaves the session running.
    pub async fn capture_frame(&self) -> Result<CapturedFrame, CaptureError> {
        let (stream_id, frame) = {
            let state = self.state.lock().await;
            if state.status != SessionStatus::Active {
                return Err(CaptureError::NotActive);
            }
            let stream = state.stream.as_ref().ok_or(CaptureError::NotActive)?;
            let frame = stream
                .current_frame()
                .map_err(|failure| CaptureError::Frame(failure.to_string()))?;
            (stream.id().to_string(), frame)
        };

        // The lock is released while encoding; the session may change meanwhile.
        let encoder = self.encoder;
        let artifact = tokio::task::spawn_blocking(move || encoder.encode(&frame))
            .await
            .map_err(|err| CaptureError::Encode(format!("encoder worker join failed: {err}")))??;

        Ok(CapturedFrame {
            stream_id,
            artifact,
        })
    }

    /// Release everything and return to `Idle`. Safe to call in any state.
    pub async fn stop(&self) {
        self.state.lock().await.reset();
    }

    /// Stop only if `stream_id` is still the held stream. Returns false, and
    /// leaves the session alone, when it was stopped or restarted since.
    pub async fn stop_if_current(&self, stream_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let current = state
            .stream
            .as_ref()
            .is_some_and(|stream| stream.id() == stream_id);
        if current {
            state.reset();
        } else {
            info!("Camera stream {stream_id} already replaced, leaving session running");
        }
        current
    }

    /// `Error -> Idle`. Returns false when there was no error to acknowledge.
    pub async fn acknowledge_error(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Error {
            return false;
        }
        state.status = SessionStatus::Idle;
        state.last_error = None;
        true
    }
}
