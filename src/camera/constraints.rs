use serde::{Deserialize, Serialize};

use crate::settings::DEFAULT_WIDE_VIEWPORT_BREAKPOINT;

pub const MIN_WIDTH: u32 = 640;
pub const MAX_WIDTH: u32 = 1920;
pub const MIN_HEIGHT: u32 = 480;
pub const MAX_HEIGHT: u32 = 1080;

const COMPACT_IDEAL: (u32, u32) = (800, 600);
const WIDE_IDEAL: (u32, u32) = (1280, 720);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    /// Rear camera, the one pointed at a receipt on a phone.
    Environment,
    User,
}

impl Default for FacingMode {
    fn default() -> Self {
        FacingMode::Environment
    }
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

/// Resolution hint for one axis: the driver picks the closest supported
/// mode to `ideal` that stays within `[min, max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

impl DimensionRange {
    fn new(min: u32, ideal: u32, max: u32) -> Self {
        Self {
            min,
            ideal: ideal.clamp(min, max),
            max,
        }
    }

    /// Closest value to `ideal` a device limited to `supported_max` can deliver,
    /// or `None` if the device cannot reach `min`.
    pub fn resolve(&self, supported_max: u32) -> Option<u32> {
        if supported_max < self.min {
            return None;
        }
        Some(self.ideal.min(supported_max).min(self.max))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamConstraints {
    /// Preferred, not required: a device with only the other camera still wins.
    pub facing: FacingMode,
    pub width: DimensionRange,
    pub height: DimensionRange,
}

impl StreamConstraints {
    pub fn for_viewport(facing: FacingMode, viewport_width: u32) -> Self {
        Self::for_viewport_with_breakpoint(facing, viewport_width, DEFAULT_WIDE_VIEWPORT_BREAKPOINT)
    }

    pub fn for_viewport_with_breakpoint(
        facing: FacingMode,
        viewport_width: u32,
        breakpoint: u32,
    ) -> Self {
        let (ideal_width, ideal_height) = if viewport_width > breakpoint {
            WIDE_IDEAL
        } else {
            COMPACT_IDEAL
        };

        Self {
            facing,
            width: DimensionRange::new(MIN_WIDTH, ideal_width, MAX_WIDTH),
            height: DimensionRange::new(MIN_HEIGHT, ideal_height, MAX_HEIGHT),
        }
    }
}
