// SPDX-License-Identifier: GPL-3.0-only

//! Camera controller
//!
//! Top-level composition of the capture core: owns the lifecycle manager,
//! the orchestrator, the settings and state stores and the encoder, and
//! exposes the event-driven surface the presentation layer drives. Every
//! mutation goes through [`CameraController::handle_event`] or one of the
//! named operations it dispatches to.

use crate::capabilities::CameraCapabilities;
use crate::constants::IMAGE_BUFFER_SIZE;
use crate::encoder::ImageEncoder;
use crate::errors::{CameraError, CameraResult, EncodeError};
use crate::hardware::{CameraService, ImageFormat, SurfaceHandle};
use crate::lifecycle::CameraLifecycle;
use crate::orchestrator::{CaptureOrchestrator, CaptureSignal};
use crate::orientation::Rotation;
use crate::request::{TemplateKind, build_request};
use crate::settings::{CameraSettings, SettingsStore, WhiteBalanceMode};
use crate::state::{CameraState, StateStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// User-driven camera events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraEvent {
    /// Open the active camera and configure a session
    InitializeCamera,
    /// Capture and persist a single still image
    TakePhoto,
    /// Flip between automatic and manual exposure control
    ToggleManualMode,
    /// Set the exposure time in nanoseconds
    SetShutterSpeed(i64),
    /// Set the ISO sensitivity
    SetIso(i32),
    /// Set the focus distance in diopters
    SetFocusDistance(f32),
    /// Set the white balance mode
    SetWhiteBalance(WhiteBalanceMode),
    /// Tear down the active camera and bring up the next one
    SwitchCamera,
}

struct Surfaces {
    image: SurfaceHandle,
    preview: Option<SurfaceHandle>,
}

/// Event-driven controller over one active camera
pub struct CameraController {
    service: Arc<dyn CameraService>,
    encoder: Arc<dyn ImageEncoder>,
    lifecycle: Arc<CameraLifecycle>,
    orchestrator: CaptureOrchestrator,
    settings: Arc<SettingsStore>,
    state: Arc<StateStore>,
    camera_id: Mutex<String>,
    capabilities: watch::Sender<CameraCapabilities>,
    image_format: ImageFormat,
    rotation: Rotation,
    enable_preview: bool,
    surfaces: Mutex<Option<Surfaces>>,
    shutter_signals: Mutex<Option<mpsc::Receiver<CaptureSignal>>>,
}

impl CameraController {
    /// Create a controller for `camera_id`, querying its capabilities
    ///
    /// Nothing is opened yet; `InitializeCamera` brings the device up.
    pub fn new(
        service: Arc<dyn CameraService>,
        encoder: Arc<dyn ImageEncoder>,
        camera_id: &str,
        image_format: ImageFormat,
    ) -> CameraResult<Self> {
        let capabilities = service.query_capabilities(camera_id)?;
        let settings = Arc::new(SettingsStore::new(capabilities.clone()));
        let state = Arc::new(StateStore::new());
        let lifecycle = Arc::new(CameraLifecycle::new(Arc::clone(&service)));
        let (orchestrator, shutter_signals) = CaptureOrchestrator::new(
            Arc::clone(&service),
            Arc::clone(&lifecycle),
            Arc::clone(&state),
        );

        // A disconnect after open fails any in-flight capture and marks the
        // controller uninitialized; the next InitializeCamera recovers.
        let aborter = orchestrator.aborter();
        let disconnect_state = Arc::clone(&state);
        lifecycle.set_on_disconnect(Box::new(move || {
            aborter.abort(CameraError::DeviceLost);
            disconnect_state.update(|state| {
                state.is_initialized = false;
                state.error = Some(CameraError::DeviceLost.to_string());
            });
        }));

        Ok(Self {
            service,
            encoder,
            lifecycle,
            orchestrator,
            settings,
            state,
            camera_id: Mutex::new(camera_id.to_string()),
            capabilities: watch::channel(capabilities).0,
            image_format,
            rotation: Rotation::None,
            enable_preview: true,
            surfaces: Mutex::new(None),
            shutter_signals: Mutex::new(Some(shutter_signals)),
        })
    }

    /// Override the still-capture timeout
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.orchestrator.set_timeout(timeout);
        self
    }

    /// Set the display rotation recorded in captured images
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Enable or disable the repeating preview stream
    pub fn with_preview(mut self, enable_preview: bool) -> Self {
        self.enable_preview = enable_preview;
        self
    }

    /// Subscribe to observable state transitions
    pub fn state(&self) -> watch::Receiver<CameraState> {
        self.state.subscribe()
    }

    /// Subscribe to accepted settings changes
    pub fn settings(&self) -> watch::Receiver<CameraSettings> {
        self.settings.subscribe()
    }

    /// Subscribe to capability snapshots (republished on camera switch)
    pub fn capabilities(&self) -> watch::Receiver<CameraCapabilities> {
        self.capabilities.subscribe()
    }

    /// Current settings snapshot
    pub fn current_settings(&self) -> CameraSettings {
        self.settings.current()
    }

    /// Identifier of the active camera
    pub fn active_camera(&self) -> String {
        self.camera_id.lock().unwrap().clone()
    }

    /// Take the shutter-signal receiver; yields `None` after the first call
    pub fn take_shutter_signals(&self) -> Option<mpsc::Receiver<CaptureSignal>> {
        self.shutter_signals.lock().unwrap().take()
    }

    /// Dispatch a single event
    pub async fn handle_event(&self, event: CameraEvent) -> CameraResult<()> {
        match event {
            CameraEvent::InitializeCamera => self.initialize().await,
            CameraEvent::TakePhoto => self.take_photo().await.map(|_| ()),
            CameraEvent::ToggleManualMode => {
                self.toggle_manual_mode();
                Ok(())
            }
            CameraEvent::SetShutterSpeed(shutter_speed_ns) => {
                self.set_shutter_speed(shutter_speed_ns);
                Ok(())
            }
            CameraEvent::SetIso(iso) => {
                self.set_iso(iso);
                Ok(())
            }
            CameraEvent::SetFocusDistance(focus_distance) => {
                self.set_focus_distance(focus_distance);
                Ok(())
            }
            CameraEvent::SetWhiteBalance(mode) => {
                self.set_white_balance(mode);
                Ok(())
            }
            CameraEvent::SwitchCamera => self.switch_camera().await,
        }
    }

    /// Open the active camera, allocate its streams and configure a session
    ///
    /// On success the state publishes `is_initialized = true` and the
    /// repeating preview request is running (when preview is enabled). On
    /// failure the error is recorded in the observable state and returned.
    pub async fn initialize(&self) -> CameraResult<()> {
        let camera_id = self.active_camera();
        // Re-initialization tears any previous session down first.
        self.orchestrator.aborter().abort(CameraError::DeviceLost);
        self.lifecycle.close();
        *self.surfaces.lock().unwrap() = None;
        self.state.update(|state| {
            state.is_initialized = false;
            state.error = None;
        });

        match self.initialize_inner(&camera_id).await {
            Ok(()) => {
                info!(camera_id = %camera_id, "Camera initialized");
                self.state.update(|state| state.is_initialized = true);
                Ok(())
            }
            Err(err) => {
                error!(camera_id = %camera_id, error = %err, "Camera initialization failed");
                self.state
                    .update(|state| state.error = Some(err.to_string()));
                Err(err)
            }
        }
    }

    async fn initialize_inner(&self, camera_id: &str) -> CameraResult<()> {
        let device = self.lifecycle.open_device(camera_id).await?;

        let image = self
            .service
            .create_image_stream(&device, self.image_format, IMAGE_BUFFER_SIZE)?;
        let preview = if self.enable_preview {
            Some(self.service.create_preview_stream(&device)?)
        } else {
            None
        };

        let mut targets = Vec::with_capacity(2);
        if let Some(preview) = &preview {
            targets.push(preview.clone());
        }
        targets.push(image.clone());
        self.lifecycle.create_session(targets).await?;

        *self.surfaces.lock().unwrap() = Some(Surfaces { image, preview });
        self.update_preview()?;
        Ok(())
    }

    /// Capture a still image and persist it
    ///
    /// The capturing flag is released once the image is acquired; encoding
    /// runs outside it on a blocking worker. An encoder failure is recorded
    /// in the observable state but does not invalidate the session.
    pub async fn take_photo(&self) -> CameraResult<PathBuf> {
        let surface = {
            let surfaces = self.surfaces.lock().unwrap();
            surfaces
                .as_ref()
                .map(|s| s.image.clone())
                .ok_or(CameraError::NotReady)?
        };
        let settings = self.settings.current();
        let mirrored = self.capabilities.borrow().facing.is_mirrored();

        let result = self
            .orchestrator
            .take_photo(&surface, &settings, self.rotation, mirrored)
            .await?;

        let encoder = Arc::clone(&self.encoder);
        let encoded = tokio::task::spawn_blocking(move || encoder.encode_and_persist(result)).await;
        match encoded {
            Ok(Ok(path)) => {
                self.state
                    .update(|state| state.last_captured_image_path = Some(path.clone()));
                Ok(path)
            }
            Ok(Err(err)) => {
                let err = CameraError::Encode(err);
                warn!(error = %err, "Failed to persist captured image");
                self.state
                    .update(|state| state.error = Some(err.to_string()));
                Err(err)
            }
            Err(join_err) => {
                error!(error = %join_err, "Encoder task failed");
                let err = CameraError::Encode(EncodeError::Io(join_err.to_string()));
                self.state
                    .update(|state| state.error = Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Flip manual mode and regenerate the preview request
    pub fn toggle_manual_mode(&self) -> CameraSettings {
        let settings = self.settings.toggle_manual_mode();
        self.restart_preview();
        settings
    }

    /// Set the exposure time; restarts the preview when accepted
    pub fn set_shutter_speed(&self, shutter_speed_ns: i64) -> bool {
        let accepted = self.settings.set_shutter_speed(shutter_speed_ns);
        if accepted {
            self.restart_preview();
        }
        accepted
    }

    /// Set the ISO sensitivity; restarts the preview when accepted
    pub fn set_iso(&self, iso: i32) -> bool {
        let accepted = self.settings.set_iso(iso);
        if accepted {
            self.restart_preview();
        }
        accepted
    }

    /// Set the focus distance; restarts the preview when accepted
    pub fn set_focus_distance(&self, focus_distance: f32) -> bool {
        let accepted = self.settings.set_focus_distance(focus_distance);
        if accepted {
            self.restart_preview();
        }
        accepted
    }

    /// Set the white balance mode; restarts the preview when accepted
    pub fn set_white_balance(&self, mode: WhiteBalanceMode) -> bool {
        let accepted = self.settings.set_white_balance(mode);
        if accepted {
            self.restart_preview();
        }
        accepted
    }

    /// Tear down the active camera and initialize the next enumerated one
    ///
    /// An outstanding capture is failed rather than awaited; validation
    /// ranges are swapped to the new camera's capabilities before the
    /// session comes up.
    pub async fn switch_camera(&self) -> CameraResult<()> {
        let cameras = self.service.list_cameras();
        if cameras.len() < 2 {
            debug!("Only one camera present; switch ignored");
            return Ok(());
        }

        let next = {
            let current = self.active_camera();
            let position = cameras.iter().position(|id| *id == current).unwrap_or(0);
            cameras[(position + 1) % cameras.len()].clone()
        };
        info!(camera_id = %next, "Switching camera");

        self.orchestrator.aborter().abort(CameraError::DeviceLost);
        self.lifecycle.close();
        *self.surfaces.lock().unwrap() = None;

        let capabilities = self.service.query_capabilities(&next)?;
        self.settings.set_capabilities(capabilities.clone());
        self.capabilities.send_replace(capabilities);
        *self.camera_id.lock().unwrap() = next;

        self.initialize().await
    }

    /// Release the device and session; the controller can be re-initialized
    pub fn shutdown(&self) {
        info!(camera_id = %self.active_camera(), "Shutting down camera controller");
        self.orchestrator.aborter().abort(CameraError::DeviceLost);
        self.lifecycle.close();
        *self.surfaces.lock().unwrap() = None;
        self.state.update(|state| state.is_initialized = false);
    }

    /// Reinstall the repeating preview request with the current settings
    fn update_preview(&self) -> CameraResult<()> {
        let preview = {
            let surfaces = self.surfaces.lock().unwrap();
            match surfaces.as_ref().and_then(|s| s.preview.clone()) {
                Some(preview) => preview,
                None => return Ok(()),
            }
        };
        let session = self.lifecycle.ready_session()?;
        let request = build_request(TemplateKind::Preview, preview, &self.settings.current());
        debug!(manual = request.exposure_time_ns.is_some(), "Updating preview request");
        self.service.set_repeating_request(&session, &request)
    }

    /// Best-effort preview restart after a settings change
    fn restart_preview(&self) {
        if let Err(err) = self.update_preview()
            && !matches!(err, CameraError::NotReady)
        {
            warn!(error = %err, "Failed to restart preview");
        }
    }
}
