use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::device::DeviceFailure;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CameraErrorKind {
    PermissionDenied,
    DeviceNotFound,
    Other,
}

impl CameraErrorKind {
    /// Map a platform media error name onto the closed set of kinds.
    pub fn from_platform_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                CameraErrorKind::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" => CameraErrorKind::DeviceNotFound,
            _ => CameraErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("camera unavailable ({kind:?}): {message}")]
pub struct CameraError {
    pub kind: CameraErrorKind,
    /// Platform error name as reported by the device layer.
    pub name: String,
    pub message: String,
}

impl CameraError {
    pub fn user_message(&self) -> String {
        let hint = match self.kind {
            CameraErrorKind::PermissionDenied => "Allow camera access for this app and try again.",
            CameraErrorKind::DeviceNotFound => "No camera was found on this device.",
            CameraErrorKind::Other => "Check the camera settings and try again.",
        };
        format!("Unable to access the camera.\n{hint}")
    }
}

impl From<DeviceFailure> for CameraError {
    fn from(failure: DeviceFailure) -> Self {
        Self {
            kind: CameraErrorKind::from_platform_name(&failure.name),
            name: failure.name,
            message: failure.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("no active camera session")]
    NotActive,

    #[error("camera request was cancelled before it completed")]
    Cancelled,

    #[error("failed to read frame from camera: {0}")]
    Frame(String),

    #[error("failed to encode captured frame: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_platform_names() {
        assert_eq!(
            CameraErrorKind::from_platform_name("NotAllowedError"),
            CameraErrorKind::PermissionDenied
        );
        assert_eq!(
            CameraErrorKind::from_platform_name("SecurityError"),
            CameraErrorKind::PermissionDenied
        );
        assert_eq!(
            CameraErrorKind::from_platform_name("NotFoundError"),
            CameraErrorKind::DeviceNotFound
        );
        assert_eq!(
            CameraErrorKind::from_platform_name("OverconstrainedError"),
            CameraErrorKind::Other
        );
        assert_eq!(CameraErrorKind::from_platform_name(""), CameraErrorKind::Other);
    }

    #[test]
    fn failure_converts_with_name_preserved() {
        let error = CameraError::from(DeviceFailure::new("NotReadableError", "device busy"));
        assert_eq!(error.kind, CameraErrorKind::Other);
        assert_eq!(error.name, "NotReadableError");
        assert!(error.to_string().contains("device busy"));
    }

    #[test]
    fn user_message_depends_on_kind() {
        let denied = CameraError::from(DeviceFailure::new("NotAllowedError", "denied"));
        let missing = CameraError::from(DeviceFailure::new("NotFoundError", "none"));
        assert!(denied.user_message().contains("Allow camera access"));
        assert!(missing.user_message().contains("No camera"));
    }
}
