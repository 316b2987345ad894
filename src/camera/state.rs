use serde::{Deserialize, Serialize};

use super::{CameraError, StreamConstraints};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Requesting,
    Active,
    Error,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

/// Point-in-time view of the capture session for the UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub stream_id: Option<String>,
    pub constraints: Option<StreamConstraints>,
    pub last_error: Option<CameraError>,
    /// Present only while `last_error` is set.
    pub error_message: Option<String>,
}
