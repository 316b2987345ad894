//! In-process camera that renders generated frames.
//!
//! Used by hosts without a camera backend and by tests. Live tracks are
//! counted so a leaked stream shows up as a non-zero [`SyntheticCamera::live_tracks`].

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use tokio::sync::watch;
use uuid::Uuid;

use super::{
    DeviceFailure, FacingMode, MediaDevices, MediaStream, StreamConstraints, TrackInfo, TrackKind,
};

struct CameraInner {
    native_width: u32,
    native_height: u32,
    denial: Mutex<Option<DeviceFailure>>,
    last_constraints: Mutex<Option<StreamConstraints>>,
    /// `true` lets requests through; `false` parks them like an open permission prompt.
    gate: watch::Sender<bool>,
    arrived: watch::Sender<usize>,
    granted: watch::Sender<usize>,
    live_tracks: Arc<AtomicUsize>,
    fail_frames: Arc<AtomicBool>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Clone)]
pub struct SyntheticCamera {
    inner: Arc<CameraInner>,
}

impl SyntheticCamera {
    /// A camera whose sensor tops out at `native_width` x `native_height`.
    pub fn new(native_width: u32, native_height: u32) -> Self {
        let (gate, _) = watch::channel(true);
        let (arrived, _) = watch::channel(0usize);
        let (granted, _) = watch::channel(0usize);
        Self {
            inner: Arc::new(CameraInner {
                native_width,
                native_height,
                denial: Mutex::new(None),
                last_constraints: Mutex::new(None),
                gate,
                arrived,
                granted,
                live_tracks: Arc::new(AtomicUsize::new(0)),
                fail_frames: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Reject future requests with the given platform error name.
    pub fn deny_with(&self, error_name: &str) {
        *lock(&self.inner.denial) = Some(DeviceFailure::new(
            error_name,
            format!("synthetic camera rejected the request ({error_name})"),
        ));
    }

    pub fn allow(&self) {
        *lock(&self.inner.denial) = None;
    }

    pub fn hold_requests(&self) {
        self.inner.gate.send_replace(false);
    }

    pub fn release_requests(&self) {
        self.inner.gate.send_replace(true);
    }

    pub fn fail_frames(&self, fail: bool) {
        self.inner.fail_frames.store(fail, Ordering::SeqCst);
    }

    /// Total number of `request_stream` calls so far.
    pub fn requests(&self) -> usize {
        *self.inner.arrived.borrow()
    }

    /// Wait until at least `count` requests have reached the device.
    pub async fn wait_for_requests(&self, count: usize) {
        let mut arrived = self.inner.arrived.subscribe();
        let _ = arrived.wait_for(|seen| *seen >= count).await;
    }

    /// Total number of streams handed out so far.
    pub fn grants(&self) -> usize {
        *self.inner.granted.borrow()
    }

    pub async fn wait_for_grants(&self, count: usize) {
        let mut granted = self.inner.granted.subscribe();
        let _ = granted.wait_for(|seen| *seen >= count).await;
    }

    pub fn live_tracks(&self) -> usize {
        self.inner.live_tracks.load(Ordering::SeqCst)
    }

    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        lock(&self.inner.last_constraints).clone()
    }
}

#[async_trait]
impl MediaDevices for SyntheticCamera {
    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceFailure> {
        *lock(&self.inner.last_constraints) = Some(constraints.clone());
        self.inner.arrived.send_modify(|seen| *seen += 1);

        let mut gate = self.inner.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if let Some(failure) = lock(&self.inner.denial).clone() {
            return Err(failure);
        }

        let (Some(width), Some(height)) = (
            constraints.width.resolve(self.inner.native_width),
            constraints.height.resolve(self.inner.native_height),
        ) else {
            return Err(DeviceFailure::new(
                "OverconstrainedError",
                format!(
                    "sensor {}x{} is below the requested minimum",
                    self.inner.native_width, self.inner.native_height
                ),
            ));
        };

        let stream = SyntheticStream::open(
            width,
            height,
            constraints.facing,
            Arc::clone(&self.inner.live_tracks),
            Arc::clone(&self.inner.fail_frames),
        );
        self.inner.granted.send_modify(|seen| *seen += 1);
        Ok(Box::new(stream))
    }
}

struct SyntheticStream {
    id: String,
    track: TrackInfo,
    width: u32,
    height: u32,
    facing: FacingMode,
    live_tracks: Arc<AtomicUsize>,
    fail_frames: Arc<AtomicBool>,
}

impl SyntheticStream {
    fn open(
        width: u32,
        height: u32,
        facing: FacingMode,
        live_tracks: Arc<AtomicUsize>,
        fail_frames: Arc<AtomicBool>,
    ) -> Self {
        live_tracks.fetch_add(1, Ordering::SeqCst);
        Self {
            id: Uuid::new_v4().to_string(),
            track: TrackInfo {
                id: Uuid::new_v4().to_string(),
                kind: TrackKind::Video,
                live: true,
            },
            width,
            height,
            facing,
            live_tracks,
            fail_frames,
        }
    }

    /// A pale "paper" frame with darker print rows; the front camera is tinted.
    fn render(&self) -> RgbImage {
        let tint = match self.facing {
            FacingMode::Environment => 0u8,
            FacingMode::User => 24u8,
        };
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let margin = x < self.width / 8 || x > self.width - self.width / 8;
            let print_row = (y / 12) % 3 == 0;
            if !margin && print_row {
                Rgb([40, 40, 40 + tint])
            } else {
                let shade = 230 - ((x + y) % 16) as u8;
                Rgb([shade, shade, shade.saturating_sub(tint)])
            }
        })
    }
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        vec![self.track.clone()]
    }

    fn stop_track(&mut self, track_id: &str) {
        if self.track.id == track_id && self.track.live {
            self.track.live = false;
            self.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn current_frame(&self) -> Result<DynamicImage, DeviceFailure> {
        if !self.track.live {
            return Err(DeviceFailure::new("InvalidStateError", "video track has ended"));
        }
        if self.fail_frames.load(Ordering::SeqCst) {
            return Err(DeviceFailure::new("NotReadableError", "sensor returned no data"));
        }
        Ok(DynamicImage::ImageRgb8(self.render()))
    }
}
