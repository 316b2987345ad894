pub mod constraints;
pub mod device;
pub mod encoder;
pub mod error;
pub mod session;
pub mod state;
pub mod synthetic;

pub use constraints::{DimensionRange, FacingMode, StreamConstraints};
pub use device::{DeviceFailure, MediaDevices, MediaStream, TrackInfo, TrackKind};
pub use encoder::{FrameEncoder, ImageArtifact, JPEG_MIME_TYPE};
pub use error::{CameraError, CameraErrorKind, CaptureError};
pub use session::{CaptureSession, CapturedFrame};
pub use state::{SessionSnapshot, SessionStatus};
pub use synthetic::SyntheticCamera;
