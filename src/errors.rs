// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture orchestration core

use crate::hardware::ImageFormat;
use std::fmt;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Reason a device open was refused by the hardware service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOpenReason {
    /// Fatal error in the camera device itself
    FatalDevice,
    /// Camera disabled by device policy
    PolicyDisabled,
    /// Camera is already in use by another client
    InUse,
    /// Fatal error in the camera service
    FatalService,
    /// Too many cameras are open at once
    MaxCamerasInUse,
    /// Unrecognized error code from the service
    Unknown,
}

impl fmt::Display for DeviceOpenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceOpenReason::FatalDevice => write!(f, "Fatal (device)"),
            DeviceOpenReason::PolicyDisabled => write!(f, "Device policy"),
            DeviceOpenReason::InUse => write!(f, "Camera in use"),
            DeviceOpenReason::FatalService => write!(f, "Fatal (service)"),
            DeviceOpenReason::MaxCamerasInUse => write!(f, "Maximum cameras in use"),
            DeviceOpenReason::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Errors surfaced by the capture core
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// The requested camera identifier is unknown to the hardware service
    DeviceNotFound(String),
    /// The hardware service reported an error while opening the device
    DeviceOpen(DeviceOpenReason),
    /// The device disconnected or was closed while an operation was outstanding
    DeviceLost,
    /// The hardware service failed to configure the capture session
    SessionConfigFailed(String),
    /// Device, session or image surface are not ready for the operation
    NotReady,
    /// A still capture is already outstanding
    CaptureAlreadyInProgress,
    /// No matching image arrived within the capture timeout
    CaptureTimeout,
    /// The image encoder failed to persist a capture result
    Encode(EncodeError),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceNotFound(id) => write!(f, "Camera {} not found", id),
            CameraError::DeviceOpen(reason) => write!(f, "Camera open error: {}", reason),
            CameraError::DeviceLost => write!(f, "Camera disconnected"),
            CameraError::SessionConfigFailed(id) => {
                write!(f, "Camera {} session configuration failed", id)
            }
            CameraError::NotReady => write!(f, "Camera session is not ready"),
            CameraError::CaptureAlreadyInProgress => {
                write!(f, "A capture is already in progress")
            }
            CameraError::CaptureTimeout => write!(f, "Image dequeuing took too long"),
            CameraError::Encode(e) => write!(f, "Encode error: {}", e),
        }
    }
}

impl std::error::Error for CameraError {}

/// Errors from the image-encoder collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// Writing the output file failed
    Io(String),
    /// The raw buffer did not match the expected layout
    InvalidBuffer(String),
    /// The capture format has no encoder
    UnsupportedFormat(ImageFormat),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Io(msg) => write!(f, "Unable to write image to file: {}", msg),
            EncodeError::InvalidBuffer(msg) => write!(f, "Invalid image buffer: {}", msg),
            EncodeError::UnsupportedFormat(format) => {
                write!(f, "Unknown image format: {}", format)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<EncodeError> for CameraError {
    fn from(err: EncodeError) -> Self {
        CameraError::Encode(err)
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        EncodeError::Io(err.to_string())
    }
}
