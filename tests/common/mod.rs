// SPDX-License-Identifier: GPL-3.0-only

//! Deterministic test double for the camera service
//!
//! Every notification a real driver would deliver asynchronously is either
//! fired inline (open, session configuration) or driven by a scripted plan
//! on a background thread (capture progress and image delivery), so each
//! test controls the exact interleaving it wants to exercise.

use manual_camera::capabilities::{CameraCapabilities, LensFacing};
use manual_camera::encoder::ImageEncoder;
use manual_camera::errors::{CameraResult, EncodeError};
use manual_camera::hardware::{
    CameraService, CaptureEvent, CaptureMetadata, CaptureObserver, DeviceEvent, DeviceHandle,
    DeviceObserver, ImageFormat, ImageListener, RawImage, SessionEvent, SessionHandle,
    SessionObserver, SurfaceHandle,
};
use manual_camera::orchestrator::CombinedCaptureResult;
use manual_camera::request::RequestDescriptor;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How `open_device` resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    Succeed,
    Error(i32),
    DisconnectDuringOpen,
    /// Report the device opened, then disconnect before the opener has a
    /// chance to observe the handle
    DisconnectAfterOpen,
}

/// How `create_session` resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBehavior {
    Configure,
    Fail,
}

/// Scripted behavior for one submitted capture
#[derive(Debug, Clone)]
pub enum CapturePlan {
    /// Fire started and completed with `result_ts`, then deliver the listed
    /// images in order
    Deliver {
        result_ts: i64,
        images: Vec<(i64, ImageFormat)>,
    },
    /// Fire started only; the capture never completes
    Stall,
    /// Fire started and completed, but never deliver an image
    NoImage { result_ts: i64 },
}

pub fn test_image(timestamp: i64, format: ImageFormat) -> RawImage {
    RawImage {
        width: 4,
        height: 4,
        format,
        timestamp,
        data: vec![0xAB; 64],
    }
}

#[derive(Default)]
struct FakeState {
    listeners: HashMap<u64, ImageListener>,
    buffered: HashMap<u64, VecDeque<RawImage>>,
    device_observer: Option<DeviceObserver>,
}

/// Scriptable in-memory [`CameraService`]
pub struct FakeCameraService {
    open_behavior: Mutex<OpenBehavior>,
    session_behavior: Mutex<SessionBehavior>,
    capture_plan: Mutex<CapturePlan>,
    capabilities: Mutex<HashMap<String, CameraCapabilities>>,
    state: Arc<Mutex<FakeState>>,
    next_token: AtomicU64,
    pub capture_submissions: AtomicUsize,
    pub repeating_requests: AtomicUsize,
    pub devices_closed: AtomicUsize,
}

impl Default for FakeCameraService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCameraService {
    pub fn new() -> Self {
        let mut capabilities = HashMap::new();
        capabilities.insert(
            "0".to_string(),
            CameraCapabilities {
                supports_manual_controls: true,
                iso_range: Some(100..=3200),
                exposure_time_range: Some(100_000..=1_000_000_000),
                minimum_focus_distance: Some(10.0),
                facing: LensFacing::Back,
            },
        );
        capabilities.insert(
            "1".to_string(),
            CameraCapabilities {
                supports_manual_controls: true,
                iso_range: Some(100..=1600),
                exposure_time_range: Some(100_000..=250_000_000),
                minimum_focus_distance: Some(5.0),
                facing: LensFacing::Front,
            },
        );
        Self {
            open_behavior: Mutex::new(OpenBehavior::Succeed),
            session_behavior: Mutex::new(SessionBehavior::Configure),
            capture_plan: Mutex::new(CapturePlan::Deliver {
                result_ts: 1,
                images: vec![(1, ImageFormat::Jpeg)],
            }),
            capabilities: Mutex::new(capabilities),
            state: Arc::new(Mutex::new(FakeState::default())),
            next_token: AtomicU64::new(1),
            capture_submissions: AtomicUsize::new(0),
            repeating_requests: AtomicUsize::new(0),
            devices_closed: AtomicUsize::new(0),
        }
    }

    pub fn set_open_behavior(&self, behavior: OpenBehavior) {
        *self.open_behavior.lock().unwrap() = behavior;
    }

    pub fn set_session_behavior(&self, behavior: SessionBehavior) {
        *self.session_behavior.lock().unwrap() = behavior;
    }

    pub fn set_capture_plan(&self, plan: CapturePlan) {
        *self.capture_plan.lock().unwrap() = plan;
    }

    /// Pre-populate a stream with an image from a "previous" capture
    pub fn enqueue_stale(&self, surface: &SurfaceHandle, image: RawImage) {
        self.state
            .lock()
            .unwrap()
            .buffered
            .entry(surface.token)
            .or_default()
            .push_back(image);
    }

    pub fn listener_installed(&self, surface: &SurfaceHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .listeners
            .contains_key(&surface.token)
    }

    /// Fire a post-open disconnect on the stored device observer
    pub fn disconnect_device(&self) {
        let observer = self.state.lock().unwrap().device_observer.take();
        if let Some(mut observer) = observer {
            observer(DeviceEvent::Disconnected);
        }
    }

    fn token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }
}

impl CameraService for FakeCameraService {
    fn list_cameras(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.capabilities.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn query_capabilities(&self, camera_id: &str) -> CameraResult<CameraCapabilities> {
        self.capabilities
            .lock()
            .unwrap()
            .get(camera_id)
            .cloned()
            .ok_or_else(|| manual_camera::CameraError::DeviceNotFound(camera_id.to_string()))
    }

    fn open_device(&self, camera_id: &str, mut observer: DeviceObserver) -> CameraResult<()> {
        match *self.open_behavior.lock().unwrap() {
            OpenBehavior::Succeed => {
                observer(DeviceEvent::Opened(DeviceHandle {
                    camera_id: camera_id.to_string(),
                    token: self.token(),
                }));
                // Keep the observer around so a test can disconnect later.
                self.state.lock().unwrap().device_observer = Some(observer);
            }
            OpenBehavior::Error(code) => observer(DeviceEvent::Error(code)),
            OpenBehavior::DisconnectDuringOpen => observer(DeviceEvent::Disconnected),
            OpenBehavior::DisconnectAfterOpen => {
                observer(DeviceEvent::Opened(DeviceHandle {
                    camera_id: camera_id.to_string(),
                    token: self.token(),
                }));
                observer(DeviceEvent::Disconnected);
            }
        }
        Ok(())
    }

    fn create_image_stream(
        &self,
        _device: &DeviceHandle,
        _format: ImageFormat,
        _capacity: usize,
    ) -> CameraResult<SurfaceHandle> {
        Ok(SurfaceHandle { token: self.token() })
    }

    fn create_preview_stream(&self, _device: &DeviceHandle) -> CameraResult<SurfaceHandle> {
        Ok(SurfaceHandle { token: self.token() })
    }

    fn create_session(
        &self,
        _device: &DeviceHandle,
        _targets: Vec<SurfaceHandle>,
        observer: SessionObserver,
    ) -> CameraResult<()> {
        match *self.session_behavior.lock().unwrap() {
            SessionBehavior::Configure => {
                observer(SessionEvent::Configured(SessionHandle { token: self.token() }))
            }
            SessionBehavior::Fail => observer(SessionEvent::ConfigureFailed),
        }
        Ok(())
    }

    fn set_repeating_request(
        &self,
        _session: &SessionHandle,
        _request: &RequestDescriptor,
    ) -> CameraResult<()> {
        self.repeating_requests.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn submit_capture(
        &self,
        _session: &SessionHandle,
        request: &RequestDescriptor,
        mut observer: CaptureObserver,
    ) -> CameraResult<()> {
        let frame_number = self.capture_submissions.fetch_add(1, Ordering::Relaxed) as u64;
        let plan = self.capture_plan.lock().unwrap().clone();
        let state = Arc::clone(&self.state);
        let surface_token = request.target.token;
        let exposure_time_ns = request.exposure_time_ns;
        let sensitivity = request.sensitivity;
        let focus_distance = request.focus_distance;

        std::thread::spawn(move || match plan {
            CapturePlan::Deliver { result_ts, images } => {
                observer(CaptureEvent::Started {
                    timestamp: result_ts,
                    frame_number,
                });
                observer(CaptureEvent::Completed(CaptureMetadata {
                    sensor_timestamp: result_ts,
                    exposure_time_ns,
                    sensitivity,
                    focus_distance,
                    frame_number,
                }));
                for (timestamp, format) in images {
                    let image = test_image(timestamp, format);
                    let mut state = state.lock().unwrap();
                    match state.listeners.get_mut(&surface_token) {
                        Some(listener) => listener(image),
                        None => state
                            .buffered
                            .entry(surface_token)
                            .or_default()
                            .push_back(image),
                    }
                }
            }
            CapturePlan::Stall => {
                observer(CaptureEvent::Started {
                    timestamp: 0,
                    frame_number,
                });
            }
            CapturePlan::NoImage { result_ts } => {
                observer(CaptureEvent::Started {
                    timestamp: result_ts,
                    frame_number,
                });
                observer(CaptureEvent::Completed(CaptureMetadata {
                    sensor_timestamp: result_ts,
                    exposure_time_ns,
                    sensitivity,
                    focus_distance,
                    frame_number,
                }));
            }
        });
        Ok(())
    }

    fn set_image_listener(&self, surface: &SurfaceHandle, listener: Option<ImageListener>) {
        let mut state = self.state.lock().unwrap();
        match listener {
            Some(listener) => {
                state.listeners.insert(surface.token, listener);
            }
            None => {
                state.listeners.remove(&surface.token);
            }
        }
    }

    fn acquire_next_image(&self, surface: &SurfaceHandle) -> Option<RawImage> {
        self.state
            .lock()
            .unwrap()
            .buffered
            .get_mut(&surface.token)
            .and_then(|queue| queue.pop_front())
    }

    fn close_session(&self, _session: SessionHandle) -> CameraResult<()> {
        Ok(())
    }

    fn close_device(&self, _device: DeviceHandle) -> CameraResult<()> {
        self.devices_closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Encoder double recording what it was asked to persist
#[derive(Default)]
pub struct RecordingEncoder {
    pub persisted: Mutex<Vec<(i64, u32, ImageFormat)>>,
    pub fail_next: Mutex<bool>,
}

impl ImageEncoder for RecordingEncoder {
    fn encode_and_persist(&self, result: CombinedCaptureResult) -> Result<PathBuf, EncodeError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(EncodeError::Io("disk full".to_string()));
        }
        self.persisted.lock().unwrap().push((
            result.image.timestamp,
            result.orientation,
            result.format,
        ));
        Ok(PathBuf::from(format!(
            "/virtual/IMG_{}.jpg",
            result.image.timestamp
        )))
    }
}
