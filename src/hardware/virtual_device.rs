// SPDX-License-Identifier: GPL-3.0-only

//! In-process simulated camera service
//!
//! Implements [`CameraService`] without any hardware: two virtual cameras
//! with fixed capability snapshots, a dedicated device-callback thread and a
//! dedicated image-delivery thread, and deterministic monotonic sensor
//! timestamps. Used by the CLI and by smoke tests; notification ordering
//! (started, then image delivery racing completion) mirrors a real driver.

use crate::capabilities::{CameraCapabilities, LensFacing};
use crate::errors::{CameraError, CameraResult};
use crate::hardware::{
    CameraService, CaptureEvent, CaptureMetadata, CaptureObserver, DeviceEvent, DeviceHandle,
    DeviceObserver, ImageFormat, ImageListener, RawImage, SessionEvent, SessionHandle,
    SessionObserver, SurfaceHandle,
};
use crate::request::RequestDescriptor;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

type Job = Box<dyn FnOnce() + Send>;

/// Worker thread executing posted callback jobs in order
struct CallbackThread {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CallbackThread {
    fn new(name: &str) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let thread_name = name.to_string();
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(name = %thread_name, "Callback thread started");
                for job in rx {
                    job();
                }
                debug!(name = %thread_name, "Callback thread exiting");
            })
            .expect("failed to spawn callback thread");
        Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    fn post(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref()
            && tx.send(Box::new(job)).is_err()
        {
            warn!("Callback thread is gone; notification dropped");
        }
    }
}

impl Drop for CallbackThread {
    fn drop(&mut self) {
        self.tx.lock().unwrap().take();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

struct VirtualCamera {
    id: String,
    capabilities: CameraCapabilities,
}

struct DeviceEntry {
    camera_id: String,
    observer: Arc<Mutex<DeviceObserver>>,
}

struct StreamEntry {
    format: ImageFormat,
    width: u32,
    height: u32,
    preview: bool,
    queue: VecDeque<RawImage>,
    listener: Option<ImageListener>,
}

struct SessionEntry {
    device_token: u64,
    targets: Vec<u64>,
    repeating: Option<RequestDescriptor>,
}

struct ServiceInner {
    cameras: Vec<VirtualCamera>,
    devices: Mutex<HashMap<u64, DeviceEntry>>,
    streams: Mutex<HashMap<u64, StreamEntry>>,
    sessions: Mutex<HashMap<u64, SessionEntry>>,
    next_token: AtomicU64,
    sensor_clock: AtomicI64,
    frame_counter: AtomicU64,
}

/// Simulated camera service with deterministic timing
pub struct VirtualCameraService {
    inner: Arc<ServiceInner>,
    device_thread: CallbackThread,
    image_thread: Arc<CallbackThread>,
}

impl Default for VirtualCameraService {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualCameraService {
    pub fn new() -> Self {
        let cameras = vec![
            VirtualCamera {
                id: "0".to_string(),
                capabilities: CameraCapabilities {
                    supports_manual_controls: true,
                    iso_range: Some(100..=3200),
                    exposure_time_range: Some(100_000..=1_000_000_000),
                    minimum_focus_distance: Some(10.0),
                    facing: LensFacing::Back,
                },
            },
            VirtualCamera {
                id: "1".to_string(),
                capabilities: CameraCapabilities {
                    supports_manual_controls: true,
                    iso_range: Some(100..=1600),
                    exposure_time_range: Some(100_000..=250_000_000),
                    minimum_focus_distance: Some(5.0),
                    facing: LensFacing::Front,
                },
            },
        ];

        Self {
            inner: Arc::new(ServiceInner {
                cameras,
                devices: Mutex::new(HashMap::new()),
                streams: Mutex::new(HashMap::new()),
                sessions: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
                sensor_clock: AtomicI64::new(1_000_000_000),
                frame_counter: AtomicU64::new(0),
            }),
            device_thread: CallbackThread::new("virtual-camera-callback"),
            image_thread: Arc::new(CallbackThread::new("virtual-image-delivery")),
        }
    }

    /// Simulate unplugging a camera: every open device for `camera_id`
    /// receives a `Disconnected` notification
    pub fn disconnect(&self, camera_id: &str) {
        let observers: Vec<_> = {
            let mut devices = self.inner.devices.lock().unwrap();
            let tokens: Vec<u64> = devices
                .iter()
                .filter(|(_, entry)| entry.camera_id == camera_id)
                .map(|(token, _)| *token)
                .collect();
            tokens
                .into_iter()
                .filter_map(|token| devices.remove(&token))
                .map(|entry| entry.observer)
                .collect()
        };
        for observer in observers {
            self.device_thread.post(move || {
                (observer.lock().unwrap())(DeviceEvent::Disconnected);
            });
        }
    }

    fn next_token(&self) -> u64 {
        self.inner.next_token.fetch_add(1, Ordering::Relaxed)
    }

    fn camera(&self, camera_id: &str) -> CameraResult<&VirtualCamera> {
        self.inner
            .cameras
            .iter()
            .find(|camera| camera.id == camera_id)
            .ok_or_else(|| CameraError::DeviceNotFound(camera_id.to_string()))
    }

    fn synthesize_image(format: ImageFormat, width: u32, height: u32, timestamp: i64) -> RawImage {
        let fill = (timestamp % 256) as u8;
        let data = match format {
            ImageFormat::Jpeg | ImageFormat::DepthJpeg => {
                // JPEG-shaped payload: SOI marker, patterned body, EOI marker.
                let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
                data.extend(std::iter::repeat_n(fill, 1020));
                data.extend([0xFF, 0xD9]);
                data
            }
            ImageFormat::RawSensor => {
                vec![fill; width as usize * height as usize * 2]
            }
        };
        RawImage {
            width,
            height,
            format,
            timestamp,
            data,
        }
    }

    fn deliver_image(inner: &ServiceInner, stream_token: u64, image: RawImage) {
        let mut streams = inner.streams.lock().unwrap();
        let Some(stream) = streams.get_mut(&stream_token) else {
            warn!(stream_token, "Image delivered to unknown stream");
            return;
        };
        match stream.listener.as_mut() {
            Some(listener) => listener(image),
            None => stream.queue.push_back(image),
        }
    }
}

impl CameraService for VirtualCameraService {
    fn list_cameras(&self) -> Vec<String> {
        self.inner
            .cameras
            .iter()
            .map(|camera| camera.id.clone())
            .collect()
    }

    fn query_capabilities(&self, camera_id: &str) -> CameraResult<CameraCapabilities> {
        Ok(self.camera(camera_id)?.capabilities.clone())
    }

    fn open_device(&self, camera_id: &str, observer: DeviceObserver) -> CameraResult<()> {
        let camera = self.camera(camera_id)?;
        let token = self.next_token();
        let handle = DeviceHandle {
            camera_id: camera.id.clone(),
            token,
        };
        let observer = Arc::new(Mutex::new(observer));
        self.inner.devices.lock().unwrap().insert(
            token,
            DeviceEntry {
                camera_id: camera.id.clone(),
                observer: Arc::clone(&observer),
            },
        );

        info!(camera_id, token, "Virtual camera opening");
        self.device_thread.post(move || {
            (observer.lock().unwrap())(DeviceEvent::Opened(handle));
        });
        Ok(())
    }

    fn create_image_stream(
        &self,
        device: &DeviceHandle,
        format: ImageFormat,
        capacity: usize,
    ) -> CameraResult<SurfaceHandle> {
        if !self.inner.devices.lock().unwrap().contains_key(&device.token) {
            return Err(CameraError::NotReady);
        }
        let (width, height) = match format {
            ImageFormat::Jpeg | ImageFormat::DepthJpeg => (640, 480),
            ImageFormat::RawSensor => (320, 240),
        };
        let token = self.next_token();
        debug!(token, %format, capacity, "Creating virtual image stream");
        self.inner.streams.lock().unwrap().insert(
            token,
            StreamEntry {
                format,
                width,
                height,
                preview: false,
                queue: VecDeque::with_capacity(capacity),
                listener: None,
            },
        );
        Ok(SurfaceHandle { token })
    }

    fn create_preview_stream(&self, device: &DeviceHandle) -> CameraResult<SurfaceHandle> {
        if !self.inner.devices.lock().unwrap().contains_key(&device.token) {
            return Err(CameraError::NotReady);
        }
        let token = self.next_token();
        self.inner.streams.lock().unwrap().insert(
            token,
            StreamEntry {
                format: ImageFormat::Jpeg,
                width: 640,
                height: 480,
                preview: true,
                queue: VecDeque::new(),
                listener: None,
            },
        );
        Ok(SurfaceHandle { token })
    }

    fn create_session(
        &self,
        device: &DeviceHandle,
        targets: Vec<SurfaceHandle>,
        observer: SessionObserver,
    ) -> CameraResult<()> {
        if !self.inner.devices.lock().unwrap().contains_key(&device.token) {
            return Err(CameraError::NotReady);
        }
        let token = self.next_token();
        self.inner.sessions.lock().unwrap().insert(
            token,
            SessionEntry {
                device_token: device.token,
                targets: targets.iter().map(|surface| surface.token).collect(),
                repeating: None,
            },
        );

        info!(token, targets = targets.len(), "Virtual session configuring");
        self.device_thread.post(move || {
            observer(SessionEvent::Configured(SessionHandle { token }));
        });
        Ok(())
    }

    fn set_repeating_request(
        &self,
        session: &SessionHandle,
        request: &RequestDescriptor,
    ) -> CameraResult<()> {
        let mut sessions = self.inner.sessions.lock().unwrap();
        let entry = sessions
            .get_mut(&session.token)
            .ok_or(CameraError::NotReady)?;
        debug!(
            session = session.token,
            manual = request.exposure_time_ns.is_some(),
            "Repeating preview request installed"
        );
        entry.repeating = Some(request.clone());
        Ok(())
    }

    fn submit_capture(
        &self,
        session: &SessionHandle,
        request: &RequestDescriptor,
        observer: CaptureObserver,
    ) -> CameraResult<()> {
        let stream_token = {
            let sessions = self.inner.sessions.lock().unwrap();
            let entry = sessions.get(&session.token).ok_or(CameraError::NotReady)?;
            if !entry.targets.contains(&request.target.token) {
                return Err(CameraError::NotReady);
            }
            debug!(
                session = session.token,
                preview_active = entry.repeating.is_some(),
                "Still capture accepted"
            );
            request.target.token
        };
        let (format, width, height) = {
            let streams = self.inner.streams.lock().unwrap();
            let stream = streams.get(&stream_token).ok_or(CameraError::NotReady)?;
            if stream.preview {
                return Err(CameraError::NotReady);
            }
            (stream.format, stream.width, stream.height)
        };

        // One frame interval per capture keeps timestamps monotonic and
        // deterministic.
        let timestamp = self
            .inner
            .sensor_clock
            .fetch_add(16_666_667, Ordering::Relaxed);
        let frame_number = self.inner.frame_counter.fetch_add(1, Ordering::Relaxed);
        let metadata = CaptureMetadata {
            sensor_timestamp: timestamp,
            exposure_time_ns: request.exposure_time_ns,
            sensitivity: request.sensitivity,
            focus_distance: request.focus_distance,
            frame_number,
        };

        let inner = Arc::clone(&self.inner);
        let image_thread = Arc::clone(&self.image_thread);
        let observer = Arc::new(Mutex::new(observer));

        debug!(timestamp, frame_number, "Virtual capture submitted");
        self.device_thread.post(move || {
            (observer.lock().unwrap())(CaptureEvent::Started {
                timestamp,
                frame_number,
            });
            // Image delivery runs on its own thread and races the
            // completion notification, as on real hardware.
            let image = Self::synthesize_image(format, width, height, timestamp);
            image_thread.post(move || {
                Self::deliver_image(&inner, stream_token, image);
            });
            (observer.lock().unwrap())(CaptureEvent::Completed(metadata));
        });
        Ok(())
    }

    fn set_image_listener(&self, surface: &SurfaceHandle, listener: Option<ImageListener>) {
        let mut streams = self.inner.streams.lock().unwrap();
        if let Some(stream) = streams.get_mut(&surface.token) {
            stream.listener = listener;
        }
    }

    fn acquire_next_image(&self, surface: &SurfaceHandle) -> Option<RawImage> {
        let mut streams = self.inner.streams.lock().unwrap();
        streams
            .get_mut(&surface.token)
            .and_then(|stream| stream.queue.pop_front())
    }

    fn close_session(&self, session: SessionHandle) -> CameraResult<()> {
        self.inner.sessions.lock().unwrap().remove(&session.token);
        Ok(())
    }

    fn close_device(&self, device: DeviceHandle) -> CameraResult<()> {
        self.inner.devices.lock().unwrap().remove(&device.token);
        let mut sessions = self.inner.sessions.lock().unwrap();
        sessions.retain(|_, entry| entry.device_token != device.token);
        Ok(())
    }
}

