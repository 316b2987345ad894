use thiserror::Error;

use crate::camera::CaptureError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl ReceiptError {
    /// Text suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            ReceiptError::Capture(CaptureError::Camera(camera_error)) => camera_error.user_message(),
            ReceiptError::Capture(CaptureError::NotActive) => {
                "Start the camera before taking a photo.".to_string()
            }
            ReceiptError::Capture(CaptureError::Cancelled) => {
                "The camera request was cancelled.".to_string()
            }
            ReceiptError::Capture(other) => format!("Could not capture the receipt: {other}"),
        }
    }
}
