// SPDX-License-Identifier: GPL-3.0-only

//! Capture request construction
//!
//! Pure mapping from (template, target surface, settings) to a
//! [`RequestDescriptor`]. Validation already happened in the settings store,
//! so no value is clamped or altered here.

use crate::hardware::SurfaceHandle;
use crate::settings::{CameraSettings, WhiteBalanceMode};

/// Request template selecting the service's tuning profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Repeating preview request
    Preview,
    /// One-shot still capture request
    StillCapture,
}

/// Overall 3A control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Auto,
    Off,
}

/// Auto-exposure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeMode {
    On,
    Off,
}

/// Auto-focus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfMode {
    ContinuousPicture,
    Off,
}

/// A fully specified capture request ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub template: TemplateKind,
    pub target: SurfaceHandle,
    pub control_mode: ControlMode,
    pub ae_mode: AeMode,
    /// Manual exposure time; only set when auto-exposure is off
    pub exposure_time_ns: Option<i64>,
    /// Manual ISO sensitivity; only set when auto-exposure is off
    pub sensitivity: Option<i32>,
    pub af_mode: AfMode,
    /// Manual focus distance; only set when auto-focus is off
    pub focus_distance: Option<f32>,
    pub awb_mode: WhiteBalanceMode,
}

/// Build a request descriptor from the current settings
///
/// When manual mode is active all three manual parameters are copied through
/// value-for-value with every automatic algorithm disabled; otherwise the
/// request leaves exposure, focus and white balance to the service.
pub fn build_request(
    template: TemplateKind,
    target: SurfaceHandle,
    settings: &CameraSettings,
) -> RequestDescriptor {
    if settings.is_manual_mode {
        RequestDescriptor {
            template,
            target,
            control_mode: ControlMode::Off,
            ae_mode: AeMode::Off,
            exposure_time_ns: Some(settings.shutter_speed_ns),
            sensitivity: Some(settings.iso),
            af_mode: AfMode::Off,
            focus_distance: Some(settings.focus_distance),
            awb_mode: WhiteBalanceMode::Off,
        }
    } else {
        RequestDescriptor {
            template,
            target,
            control_mode: ControlMode::Auto,
            ae_mode: AeMode::On,
            exposure_time_ns: None,
            sensitivity: None,
            af_mode: AfMode::ContinuousPicture,
            focus_distance: None,
            awb_mode: settings.white_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> SurfaceHandle {
        SurfaceHandle { token: 7 }
    }

    #[test]
    fn manual_request_round_trips_settings() {
        let settings = CameraSettings {
            is_manual_mode: true,
            shutter_speed_ns: 8_333_333,
            iso: 640,
            focus_distance: 2.5,
            white_balance: WhiteBalanceMode::Daylight,
        };

        let request = build_request(TemplateKind::StillCapture, surface(), &settings);

        assert_eq!(request.control_mode, ControlMode::Off);
        assert_eq!(request.ae_mode, AeMode::Off);
        assert_eq!(request.af_mode, AfMode::Off);
        assert_eq!(request.exposure_time_ns, Some(8_333_333));
        assert_eq!(request.sensitivity, Some(640));
        assert_eq!(request.focus_distance, Some(2.5));
        assert_eq!(request.awb_mode, WhiteBalanceMode::Off);
        assert_eq!(request.target, surface());
    }

    #[test]
    fn auto_request_leaves_algorithms_on() {
        let settings = CameraSettings::default();
        let request = build_request(TemplateKind::Preview, surface(), &settings);

        assert_eq!(request.control_mode, ControlMode::Auto);
        assert_eq!(request.ae_mode, AeMode::On);
        assert_eq!(request.af_mode, AfMode::ContinuousPicture);
        assert_eq!(request.exposure_time_ns, None);
        assert_eq!(request.sensitivity, None);
        assert_eq!(request.focus_distance, None);
        assert_eq!(request.awb_mode, WhiteBalanceMode::Auto);
    }

    #[test]
    fn template_is_preserved() {
        let settings = CameraSettings::default();
        let preview = build_request(TemplateKind::Preview, surface(), &settings);
        let still = build_request(TemplateKind::StillCapture, surface(), &settings);
        assert_eq!(preview.template, TemplateKind::Preview);
        assert_eq!(still.template, TemplateKind::StillCapture);
    }
}
