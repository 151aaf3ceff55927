// SPDX-License-Identifier: GPL-3.0-only

//! Static per-device capability snapshot
//!
//! Capabilities are queried once from the hardware service when a camera is
//! selected and cached by the caller. They are never mutated afterwards; the
//! settings store validates every manual-control write against them.

use std::ops::RangeInclusive;

/// Which way the camera sensor faces
///
/// Front-facing sensors produce mirrored previews, which changes the
/// EXIF-style orientation computed for captured stills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LensFacing {
    #[default]
    Back,
    Front,
    External,
}

impl LensFacing {
    /// True if images from this sensor are mirrored
    pub fn is_mirrored(&self) -> bool {
        matches!(self, LensFacing::Front)
    }
}

/// Immutable capability snapshot for one camera device
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCapabilities {
    /// True if the sensor supports full manual control
    pub supports_manual_controls: bool,
    /// Supported ISO sensitivity range, if declared by the driver
    pub iso_range: Option<RangeInclusive<i32>>,
    /// Supported exposure time range in nanoseconds, if declared
    pub exposure_time_range: Option<RangeInclusive<i64>>,
    /// Minimum focus distance in diopters (None for fixed-focus lenses)
    pub minimum_focus_distance: Option<f32>,
    /// Sensor facing, used for mirrored-orientation handling
    pub facing: LensFacing,
}

impl CameraCapabilities {
    /// True if `iso` lies within the declared sensitivity range
    ///
    /// Returns true when no range is declared; validation only applies to
    /// ranges the driver actually reports.
    pub fn allows_iso(&self, iso: i32) -> bool {
        match &self.iso_range {
            Some(range) => range.contains(&iso),
            None => true,
        }
    }

    /// True if `shutter_speed_ns` lies within the declared exposure range
    pub fn allows_exposure_time(&self, shutter_speed_ns: i64) -> bool {
        match &self.exposure_time_range {
            Some(range) => range.contains(&shutter_speed_ns),
            None => true,
        }
    }

    /// True if `focus_distance` lies between infinity (0) and the closest
    /// focusable distance
    pub fn allows_focus_distance(&self, focus_distance: f32) -> bool {
        match self.minimum_focus_distance {
            Some(min) => (0.0..=min).contains(&focus_distance),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> CameraCapabilities {
        CameraCapabilities {
            supports_manual_controls: true,
            iso_range: Some(100..=1600),
            exposure_time_range: Some(1_000..=1_000_000_000),
            minimum_focus_distance: Some(10.0),
            facing: LensFacing::Back,
        }
    }

    #[test]
    fn iso_range_is_inclusive() {
        let caps = caps();
        assert!(caps.allows_iso(100));
        assert!(caps.allows_iso(1600));
        assert!(!caps.allows_iso(99));
        assert!(!caps.allows_iso(3200));
    }

    #[test]
    fn undeclared_ranges_allow_everything() {
        let caps = CameraCapabilities {
            supports_manual_controls: false,
            iso_range: None,
            exposure_time_range: None,
            minimum_focus_distance: None,
            facing: LensFacing::External,
        };
        assert!(caps.allows_iso(1_000_000));
        assert!(caps.allows_exposure_time(-5));
        assert!(caps.allows_focus_distance(99.0));
    }

    #[test]
    fn focus_distance_spans_infinity_to_minimum() {
        let caps = caps();
        assert!(caps.allows_focus_distance(0.0));
        assert!(caps.allows_focus_distance(10.0));
        assert!(!caps.allows_focus_distance(10.5));
        assert!(!caps.allows_focus_distance(-0.1));
    }
}
