// SPDX-License-Identifier: GPL-3.0-only

//! Constants shared across the capture core

use std::time::Duration;

/// Maximum number of images held in the image stream's buffer pool
pub const IMAGE_BUFFER_SIZE: usize = 3;

/// Maximum time allowed to wait for the image matching a capture result
pub const IMAGE_CAPTURE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default shutter speed: 1/60 second in nanoseconds
pub const DEFAULT_SHUTTER_SPEED_NS: i64 = 1_000_000_000 / 60;

/// Default ISO sensitivity
pub const DEFAULT_ISO: i32 = 100;

/// Default focus distance (0 means infinity focus)
pub const DEFAULT_FOCUS_DISTANCE: f32 = 0.0;
