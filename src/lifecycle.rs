// SPDX-License-Identifier: GPL-3.0-only

//! Device and session lifecycle manager
//!
//! Owns the asynchronous open/configure/teardown state machine and is the
//! sole owner of the device and session handles. Each suspending operation
//! parks on a single-resolution [`cell`](crate::cell) that the hardware
//! service's callback resolves exactly once.
//!
//! States: `Closed → Opening → Opened → SessionConfiguring → SessionReady`,
//! back to `Closed` on teardown, with `Error` reachable from `Opening` and
//! `SessionConfiguring`. No capture request may be submitted before
//! `SessionReady`.

use crate::cell::result_cell;
use crate::errors::{CameraError, CameraResult, DeviceOpenReason};
use crate::hardware::{
    self, CameraService, DeviceEvent, DeviceHandle, SessionEvent, SessionHandle, SurfaceHandle,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Lifecycle state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Closed,
    Opening,
    Opened,
    SessionConfiguring,
    SessionReady,
    Error,
}

/// Map a hardware error code to an open-failure reason
pub fn map_error_code(code: i32) -> DeviceOpenReason {
    match code {
        hardware::ERROR_CAMERA_DEVICE => DeviceOpenReason::FatalDevice,
        hardware::ERROR_CAMERA_DISABLED => DeviceOpenReason::PolicyDisabled,
        hardware::ERROR_CAMERA_IN_USE => DeviceOpenReason::InUse,
        hardware::ERROR_CAMERA_SERVICE => DeviceOpenReason::FatalService,
        hardware::ERROR_MAX_CAMERAS_IN_USE => DeviceOpenReason::MaxCamerasInUse,
        _ => DeviceOpenReason::Unknown,
    }
}

#[derive(Default)]
struct LifecycleInner {
    state: LifecycleState,
    device: Option<DeviceHandle>,
    session: Option<SessionHandle>,
}

type DisconnectHook = Box<dyn Fn() + Send>;

/// Asynchronous device/session lifecycle manager
pub struct CameraLifecycle {
    service: Arc<dyn CameraService>,
    inner: Arc<Mutex<LifecycleInner>>,
    on_disconnect: Arc<Mutex<Option<DisconnectHook>>>,
}

impl CameraLifecycle {
    pub fn new(service: Arc<dyn CameraService>) -> Self {
        Self {
            service,
            inner: Arc::new(Mutex::new(LifecycleInner::default())),
            on_disconnect: Arc::new(Mutex::new(None)),
        }
    }

    /// Install the hook fired when the device disconnects after a
    /// successful open (used to fail an outstanding capture)
    pub fn set_on_disconnect(&self, hook: DisconnectHook) {
        *self.on_disconnect.lock().unwrap() = Some(hook);
    }

    /// Current state machine position
    pub fn state(&self) -> LifecycleState {
        self.inner.lock().unwrap().state
    }

    /// The open device handle, if any
    pub fn device(&self) -> Option<DeviceHandle> {
        self.inner.lock().unwrap().device.clone()
    }

    /// The configured session handle, enforcing the `SessionReady`
    /// precondition for request submission
    pub fn ready_session(&self) -> CameraResult<SessionHandle> {
        let inner = self.inner.lock().unwrap();
        if inner.state != LifecycleState::SessionReady {
            return Err(CameraError::NotReady);
        }
        inner.session.clone().ok_or(CameraError::NotReady)
    }

    /// Open a camera device, suspending until the service reports the
    /// outcome
    ///
    /// Exactly one of opened/disconnected/errored resolves the wait. A
    /// disconnect delivered while the open is pending fails it with
    /// `DeviceLost`; one delivered later tears the session down and fires
    /// the disconnect hook.
    pub async fn open_device(&self, camera_id: &str) -> CameraResult<DeviceHandle> {
        info!(camera_id, "Opening camera device");
        self.inner.lock().unwrap().state = LifecycleState::Opening;

        let (resolver, completion) = result_cell::<CameraResult<DeviceHandle>>();
        let id = camera_id.to_string();
        let inner = Arc::clone(&self.inner);
        let on_disconnect = Arc::clone(&self.on_disconnect);

        let observer = move |event: DeviceEvent| match event {
            DeviceEvent::Opened(handle) => {
                if !resolver.resolve(Ok(handle)) {
                    warn!(camera_id = %id, "Duplicate open notification ignored");
                }
            }
            DeviceEvent::Error(code) => {
                let reason = map_error_code(code);
                error!(camera_id = %id, code, %reason, "Camera device error");
                if resolver.is_active() {
                    resolver.resolve(Err(CameraError::DeviceOpen(reason)));
                }
            }
            DeviceEvent::Disconnected => {
                warn!(camera_id = %id, "Camera has been disconnected");
                if !resolver.resolve(Err(CameraError::DeviceLost)) {
                    // Disconnect after a successful open: the whole session
                    // is gone and must be re-initialized.
                    {
                        let mut inner = inner.lock().unwrap();
                        inner.state = LifecycleState::Closed;
                        inner.device = None;
                        inner.session = None;
                    }
                    if let Some(hook) = on_disconnect.lock().unwrap().as_ref() {
                        hook();
                    }
                }
            }
        };

        if let Err(err) = self.service.open_device(camera_id, Box::new(observer)) {
            self.inner.lock().unwrap().state = LifecycleState::Error;
            return Err(err);
        }

        match completion.wait().await {
            Some(Ok(handle)) => {
                let mut inner = self.inner.lock().unwrap();
                // A disconnect delivered between the open notification and
                // this point has already moved the state off `Opening`; the
                // handle must not be stored over that teardown.
                if inner.state != LifecycleState::Opening {
                    drop(inner);
                    warn!(camera_id, "Device disconnected before open completed");
                    return Err(CameraError::DeviceLost);
                }
                debug!(camera_id, token = handle.token, "Camera device opened");
                inner.state = LifecycleState::Opened;
                inner.device = Some(handle.clone());
                Ok(handle)
            }
            Some(Err(err)) => {
                let mut inner = self.inner.lock().unwrap();
                inner.state = match err {
                    CameraError::DeviceLost => LifecycleState::Closed,
                    _ => LifecycleState::Error,
                };
                Err(err)
            }
            None => {
                self.inner.lock().unwrap().state = LifecycleState::Error;
                Err(CameraError::DeviceLost)
            }
        }
    }

    /// Configure a capture session over `targets`, suspending until the
    /// service reports configured or failed
    pub async fn create_session(&self, targets: Vec<SurfaceHandle>) -> CameraResult<SessionHandle> {
        let device = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != LifecycleState::Opened {
                return Err(CameraError::NotReady);
            }
            inner.state = LifecycleState::SessionConfiguring;
            inner.device.clone().ok_or(CameraError::NotReady)?
        };

        info!(camera_id = %device.camera_id, targets = targets.len(), "Configuring capture session");

        let (resolver, completion) = result_cell::<CameraResult<SessionHandle>>();
        let camera_id = device.camera_id.clone();
        let observer = move |event: SessionEvent| match event {
            SessionEvent::Configured(session) => {
                resolver.resolve(Ok(session));
            }
            SessionEvent::ConfigureFailed => {
                error!(camera_id = %camera_id, "Session configuration failed");
                resolver.resolve(Err(CameraError::SessionConfigFailed(camera_id.clone())));
            }
        };

        if let Err(err) = self
            .service
            .create_session(&device, targets, Box::new(observer))
        {
            self.inner.lock().unwrap().state = LifecycleState::Error;
            return Err(err);
        }

        match completion.wait().await {
            Some(Ok(session)) => {
                debug!(token = session.token, "Capture session ready");
                let mut inner = self.inner.lock().unwrap();
                inner.state = LifecycleState::SessionReady;
                inner.session = Some(session.clone());
                Ok(session)
            }
            Some(Err(err)) => {
                self.inner.lock().unwrap().state = LifecycleState::Error;
                Err(err)
            }
            None => {
                self.inner.lock().unwrap().state = LifecycleState::Error;
                Err(CameraError::SessionConfigFailed(device.camera_id))
            }
        }
    }

    /// Release the session and device handles
    ///
    /// Idempotent. Secondary errors from the release path are reported as
    /// warnings and never escalated.
    pub fn close(&self) {
        let (session, device) = {
            let mut inner = self.inner.lock().unwrap();
            inner.state = LifecycleState::Closed;
            (inner.session.take(), inner.device.take())
        };

        if let Some(session) = session
            && let Err(err) = self.service.close_session(session)
        {
            warn!(error = %err, "Error releasing capture session");
        }
        if let Some(device) = device {
            info!(camera_id = %device.camera_id, "Closing camera device");
            if let Err(err) = self.service.close_device(device) {
                warn!(error = %err, "Error closing camera device");
            }
        }
    }
}
