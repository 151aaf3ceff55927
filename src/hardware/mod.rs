// SPDX-License-Identifier: GPL-3.0-only

//! Hardware capability boundary
//!
//! The capture core never talks to a camera driver directly. Everything it
//! needs from the hardware lives behind the [`CameraService`] trait: opening
//! devices, configuring sessions, submitting requests and receiving the
//! asynchronous notifications (device state, session state, capture progress,
//! image availability) the driver delivers on its own threads.
//!
//! The service is an explicitly injected handle, never a global. A test
//! double can implement the trait and fire each notification deterministically
//! to exercise race conditions; [`virtual_device`] provides an in-process
//! simulated service for the CLI and smoke tests.

pub mod virtual_device;

pub use virtual_device::VirtualCameraService;

use crate::capabilities::CameraCapabilities;
use crate::errors::CameraResult;
use crate::request::RequestDescriptor;
use std::fmt;

/// Hardware error code: camera already in use (maps to `InUse`)
pub const ERROR_CAMERA_IN_USE: i32 = 1;
/// Hardware error code: too many cameras open (maps to `MaxCamerasInUse`)
pub const ERROR_MAX_CAMERAS_IN_USE: i32 = 2;
/// Hardware error code: camera disabled by policy (maps to `PolicyDisabled`)
pub const ERROR_CAMERA_DISABLED: i32 = 3;
/// Hardware error code: fatal device failure (maps to `FatalDevice`)
pub const ERROR_CAMERA_DEVICE: i32 = 4;
/// Hardware error code: fatal service failure (maps to `FatalService`)
pub const ERROR_CAMERA_SERVICE: i32 = 5;

/// Opaque handle for an opened camera device
///
/// Owned exclusively by the lifecycle manager; invalid after
/// [`CameraService::close_device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub camera_id: String,
    pub token: u64,
}

/// Opaque handle for a configured capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub token: u64,
}

/// Opaque handle for an output surface (preview sink or image stream)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub token: u64,
}

/// Pixel/container format of a captured image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Compressed JPEG bytes, persisted as-is
    Jpeg,
    /// JPEG with an embedded depth map; timestamp matching is unreliable
    /// for this format on some hardware
    DepthJpeg,
    /// Unprocessed 16-bit sensor data
    RawSensor,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "JPEG"),
            ImageFormat::DepthJpeg => write!(f, "DEPTH_JPEG"),
            ImageFormat::RawSensor => write!(f, "RAW_SENSOR"),
        }
    }
}

/// A single image buffer delivered by the hardware service
///
/// The buffer is owned; handing it to the encoder consumes it, so a capture
/// result can be released at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Sensor timestamp in nanoseconds, used to match the image against the
    /// capture result metadata
    pub timestamp: i64,
    pub data: Vec<u8>,
}

/// Final metadata for a completed capture request
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureMetadata {
    /// Sensor timestamp of the frame this result describes
    pub sensor_timestamp: i64,
    /// Exposure time actually applied, if reported
    pub exposure_time_ns: Option<i64>,
    /// ISO sensitivity actually applied, if reported
    pub sensitivity: Option<i32>,
    /// Lens focus distance actually applied, if reported
    pub focus_distance: Option<f32>,
    /// Monotonic frame counter from the service
    pub frame_number: u64,
}

/// Device state notifications delivered on the service's callback thread
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// Device opened successfully
    Opened(DeviceHandle),
    /// Device disconnected; fatal for the current session
    Disconnected,
    /// Device failed with a hardware error code (`ERROR_CAMERA_*`)
    Error(i32),
}

/// Session state notifications
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session configured and ready for requests
    Configured(SessionHandle),
    /// Session configuration failed
    ConfigureFailed,
}

/// Capture progress notifications for a one-shot request
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Exposure started; carries the sensor start timestamp
    Started { timestamp: i64, frame_number: u64 },
    /// Final result metadata is available
    Completed(CaptureMetadata),
}

/// Observer for device state; may fire multiple times over the device's life
/// (an `Opened` can be followed much later by a `Disconnected`)
pub type DeviceObserver = Box<dyn FnMut(DeviceEvent) + Send>;

/// Observer for session configuration; fires exactly once
pub type SessionObserver = Box<dyn FnOnce(SessionEvent) + Send>;

/// Observer for one still capture; `Started` always precedes `Completed`
pub type CaptureObserver = Box<dyn FnMut(CaptureEvent) + Send>;

/// Listener invoked on the image-delivery thread for each arriving buffer
pub type ImageListener = Box<dyn FnMut(RawImage) + Send>;

/// The externally supplied camera hardware capability
///
/// All notification callbacks are invoked from the service's own threads,
/// never from the caller's. Implementations must deliver exactly one of
/// `Opened`/`Error` per `open_device` call and exactly one of
/// `Configured`/`ConfigureFailed` per `create_session` call.
pub trait CameraService: Send + Sync {
    /// Enumerate known camera identifiers
    fn list_cameras(&self) -> Vec<String>;

    /// Query the static capability snapshot for a camera
    ///
    /// Synchronous; may block briefly on the service. Fails with
    /// `DeviceNotFound` for unknown identifiers.
    fn query_capabilities(&self, camera_id: &str) -> CameraResult<CameraCapabilities>;

    /// Begin opening a device; the outcome arrives via `observer`
    fn open_device(&self, camera_id: &str, observer: DeviceObserver) -> CameraResult<()>;

    /// Allocate an image stream surface backed by `capacity` buffers
    fn create_image_stream(
        &self,
        device: &DeviceHandle,
        format: ImageFormat,
        capacity: usize,
    ) -> CameraResult<SurfaceHandle>;

    /// Allocate a preview sink surface
    fn create_preview_stream(&self, device: &DeviceHandle) -> CameraResult<SurfaceHandle>;

    /// Begin configuring a session over `targets`; the outcome arrives via
    /// `observer`
    fn create_session(
        &self,
        device: &DeviceHandle,
        targets: Vec<SurfaceHandle>,
        observer: SessionObserver,
    ) -> CameraResult<()>;

    /// Install (or replace) the repeating preview request
    fn set_repeating_request(
        &self,
        session: &SessionHandle,
        request: &RequestDescriptor,
    ) -> CameraResult<()>;

    /// Submit a one-shot still capture request
    fn submit_capture(
        &self,
        session: &SessionHandle,
        request: &RequestDescriptor,
        observer: CaptureObserver,
    ) -> CameraResult<()>;

    /// Install or remove the image-available listener for a stream
    ///
    /// While a listener is installed, new buffers go to it; without one they
    /// accumulate in the stream and can be pulled via `acquire_next_image`.
    fn set_image_listener(&self, surface: &SurfaceHandle, listener: Option<ImageListener>);

    /// Pull the next buffered image from a stream, if any (drain path)
    fn acquire_next_image(&self, surface: &SurfaceHandle) -> Option<RawImage>;

    /// Release a session handle
    fn close_session(&self, session: SessionHandle) -> CameraResult<()>;

    /// Release a device handle and all its streams
    fn close_device(&self, device: DeviceHandle) -> CameraResult<()>;
}
