// SPDX-License-Identifier: GPL-3.0-only

//! Manual camera capture core
//!
//! This library provides the asynchronous capture orchestration for a
//! manual-control camera: device and session lifecycle, still capture with
//! image/metadata reconciliation, validated manual exposure settings and
//! observable capture state.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`hardware`]: Camera service abstraction and the virtual backend
//! - [`lifecycle`]: Device open and session configuration state machine
//! - [`orchestrator`]: Still capture submission and result reconciliation
//! - [`settings`]: Validated manual-control settings store
//! - [`state`]: Observable capture state
//! - [`controller`]: Event-driven composition of the above
//! - [`encoder`]: Persisting captured images
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let service = Arc::new(VirtualCameraService::new());
//! let encoder = Arc::new(FileImageEncoder::new(Arc::clone(&service), output_dir));
//! let controller = CameraController::new(service, encoder, "0", ImageFormat::Jpeg)?;
//! controller.initialize().await?;
//! let path = controller.take_photo().await?;
//! ```

pub mod capabilities;
pub mod cell;
pub mod config;
pub mod constants;
pub mod controller;
pub mod encoder;
pub mod errors;
pub mod hardware;
pub mod image_queue;
pub mod lifecycle;
pub mod orchestrator;
pub mod orientation;
pub mod request;
pub mod settings;
pub mod state;

// Re-export commonly used types
pub use capabilities::{CameraCapabilities, LensFacing};
pub use config::Config;
pub use controller::{CameraController, CameraEvent};
pub use errors::{CameraError, CameraResult};
pub use hardware::{CameraService, ImageFormat, VirtualCameraService};
pub use orchestrator::{CaptureSignal, CombinedCaptureResult};
pub use settings::{CameraSettings, WhiteBalanceMode};
pub use state::CameraState;
