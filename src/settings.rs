// SPDX-License-Identifier: GPL-3.0-only

//! Manual-control settings store
//!
//! Holds the current [`CameraSettings`] snapshot and replaces it wholesale on
//! each validated mutation. Out-of-range writes while manual mode is active
//! are dropped silently: no state change and no change notification, matching
//! the behavior of the original controls. Subscribers observe accepted
//! changes through a `watch` channel and regenerate the preview request.

use crate::capabilities::CameraCapabilities;
use crate::constants::{DEFAULT_FOCUS_DISTANCE, DEFAULT_ISO, DEFAULT_SHUTTER_SPEED_NS};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// White balance mode applied to preview and still requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteBalanceMode {
    #[default]
    Auto,
    Off,
    Incandescent,
    Fluorescent,
    Daylight,
    Cloudy,
}

/// Current manual-control configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub is_manual_mode: bool,
    /// Exposure time in nanoseconds
    pub shutter_speed_ns: i64,
    pub iso: i32,
    /// Focus distance in diopters (0 = infinity)
    pub focus_distance: f32,
    pub white_balance: WhiteBalanceMode,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            is_manual_mode: false,
            shutter_speed_ns: DEFAULT_SHUTTER_SPEED_NS,
            iso: DEFAULT_ISO,
            focus_distance: DEFAULT_FOCUS_DISTANCE,
            white_balance: WhiteBalanceMode::Auto,
        }
    }
}

/// Single-owner settings store with publish-on-change semantics
///
/// The read-validate-write sequence of each setter runs under the `watch`
/// sender's internal lock (`send_if_modified`), so concurrent setter calls
/// are serialized and a change notification fires only when a value is
/// actually accepted. The capability snapshot used for validation is swapped
/// when the active camera changes.
pub struct SettingsStore {
    capabilities: Mutex<CameraCapabilities>,
    tx: watch::Sender<CameraSettings>,
}

impl SettingsStore {
    /// Create a store validating against `capabilities`
    pub fn new(capabilities: CameraCapabilities) -> Self {
        let (tx, _rx) = watch::channel(CameraSettings::default());
        Self {
            capabilities: Mutex::new(capabilities),
            tx,
        }
    }

    /// Subscribe to accepted settings changes
    pub fn subscribe(&self) -> watch::Receiver<CameraSettings> {
        self.tx.subscribe()
    }

    /// Current settings snapshot
    pub fn current(&self) -> CameraSettings {
        self.tx.borrow().clone()
    }

    /// Replace the capability snapshot after a camera switch
    pub fn set_capabilities(&self, capabilities: CameraCapabilities) {
        *self.capabilities.lock().unwrap() = capabilities;
    }

    /// Flip manual mode; always succeeds
    pub fn toggle_manual_mode(&self) -> CameraSettings {
        self.tx.send_modify(|settings| {
            settings.is_manual_mode = !settings.is_manual_mode;
        });
        let settings = self.current();
        debug!(manual = settings.is_manual_mode, "Manual mode toggled");
        settings
    }

    /// Set the exposure time; returns true if the value was accepted
    pub fn set_shutter_speed(&self, shutter_speed_ns: i64) -> bool {
        let capabilities = self.capabilities.lock().unwrap().clone();
        self.tx.send_if_modified(|settings| {
            if settings.is_manual_mode && !capabilities.allows_exposure_time(shutter_speed_ns) {
                debug!(shutter_speed_ns, "Rejected out-of-range shutter speed");
                return false;
            }
            if settings.shutter_speed_ns == shutter_speed_ns {
                return false;
            }
            settings.shutter_speed_ns = shutter_speed_ns;
            true
        })
    }

    /// Set the ISO sensitivity; returns true if the value was accepted
    pub fn set_iso(&self, iso: i32) -> bool {
        let capabilities = self.capabilities.lock().unwrap().clone();
        self.tx.send_if_modified(|settings| {
            if settings.is_manual_mode && !capabilities.allows_iso(iso) {
                debug!(iso, "Rejected out-of-range ISO");
                return false;
            }
            if settings.iso == iso {
                return false;
            }
            settings.iso = iso;
            true
        })
    }

    /// Set the focus distance; returns true if the value was accepted
    pub fn set_focus_distance(&self, focus_distance: f32) -> bool {
        let capabilities = self.capabilities.lock().unwrap().clone();
        self.tx.send_if_modified(|settings| {
            if settings.is_manual_mode && !capabilities.allows_focus_distance(focus_distance) {
                debug!(focus_distance, "Rejected out-of-range focus distance");
                return false;
            }
            if settings.focus_distance == focus_distance {
                return false;
            }
            settings.focus_distance = focus_distance;
            true
        })
    }

    /// Set the white balance mode; returns true if the value changed
    pub fn set_white_balance(&self, mode: WhiteBalanceMode) -> bool {
        self.tx.send_if_modified(|settings| {
            if settings.white_balance == mode {
                return false;
            }
            settings.white_balance = mode;
            true
        })
    }
}
