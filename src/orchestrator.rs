// SPDX-License-Identifier: GPL-3.0-only

//! Still-capture orchestration
//!
//! Drives a single still capture end to end: flush stale buffers, register
//! the image listener, submit the request, await the completion metadata,
//! then reconcile the image queue against the result timestamp to assemble
//! exactly one [`CombinedCaptureResult`] (or exactly one failure).
//!
//! The operation is not re-entrant: the `is_capturing` state flag is claimed
//! atomically before anything touches the hardware, so a second invocation
//! while one is outstanding is rejected without submitting a request.

use crate::cell::{Resolver, result_cell};
use crate::constants::{IMAGE_BUFFER_SIZE, IMAGE_CAPTURE_TIMEOUT};
use crate::errors::{CameraError, CameraResult};
use crate::hardware::{
    CameraService, CaptureEvent, CaptureMetadata, ImageFormat, RawImage, SurfaceHandle,
};
use crate::image_queue::{ImageQueue, RecvError};
use crate::lifecycle::CameraLifecycle;
use crate::orientation::{Rotation, exif_orientation_degrees};
use crate::request::{RequestDescriptor, TemplateKind, build_request};
use crate::settings::CameraSettings;
use crate::state::StateStore;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Transient events the presentation layer may react to (e.g. a shutter
/// flash animation); the core only emits them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSignal {
    /// Exposure of the still frame has started
    ShutterStarted,
}

/// One complete still capture: image bytes, result metadata and the
/// orientation the encoder should record
///
/// Move-only: handing the result to the encoder consumes it, so the image
/// buffer is released exactly once.
#[derive(Debug)]
pub struct CombinedCaptureResult {
    pub image: RawImage,
    pub metadata: CaptureMetadata,
    /// EXIF-style orientation in degrees (0, 90, 180 or 270)
    pub orientation: u32,
    pub format: ImageFormat,
    pub camera_id: String,
}

struct PendingCapture {
    queue: Arc<ImageQueue>,
    completion: Resolver<CameraResult<CaptureMetadata>>,
}

/// Handle for failing an outstanding capture from the teardown path
#[derive(Clone)]
pub struct CaptureAborter {
    pending: Arc<Mutex<Option<PendingCapture>>>,
}

impl CaptureAborter {
    /// Fail the outstanding capture, if any, with `error`
    ///
    /// Wakes both the metadata wait and the blocked image dequeue so a
    /// close-during-capture can never hang.
    pub fn abort(&self, error: CameraError) {
        if let Some(pending) = self.pending.lock().unwrap().take() {
            warn!(error = %error, "Aborting outstanding capture");
            pending.completion.resolve(Err(error));
            pending.queue.close();
        }
    }
}

/// Orchestrates still captures against the lifecycle manager's session
pub struct CaptureOrchestrator {
    service: Arc<dyn CameraService>,
    lifecycle: Arc<CameraLifecycle>,
    state: Arc<StateStore>,
    signals: mpsc::Sender<CaptureSignal>,
    pending: Arc<Mutex<Option<PendingCapture>>>,
    timeout: Duration,
}

impl CaptureOrchestrator {
    /// Create an orchestrator and the receiver for its transient signals
    pub fn new(
        service: Arc<dyn CameraService>,
        lifecycle: Arc<CameraLifecycle>,
        state: Arc<StateStore>,
    ) -> (Self, mpsc::Receiver<CaptureSignal>) {
        let (signals, signal_rx) = mpsc::channel(8);
        (
            Self {
                service,
                lifecycle,
                state,
                signals,
                pending: Arc::new(Mutex::new(None)),
                timeout: IMAGE_CAPTURE_TIMEOUT,
            },
            signal_rx,
        )
    }

    /// Override the capture timeout (tests compress the 5 s default)
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Handle for failing the outstanding capture during teardown
    pub fn aborter(&self) -> CaptureAborter {
        CaptureAborter {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Capture a single still image
    ///
    /// Produces exactly one result or exactly one error per invocation.
    /// `NotReady` is returned without touching any state; a capture already
    /// in flight is rejected before a second hardware request is built.
    pub async fn take_photo(
        &self,
        surface: &SurfaceHandle,
        settings: &CameraSettings,
        rotation: Rotation,
        mirrored: bool,
    ) -> CameraResult<CombinedCaptureResult> {
        // Preconditions first: NotReady must not mutate observable state.
        let session = self.lifecycle.ready_session()?;
        let device = self.lifecycle.device().ok_or(CameraError::NotReady)?;

        if !self.state.begin_capture() {
            return Err(CameraError::CaptureAlreadyInProgress);
        }

        let result = self
            .capture_inner(&session, &device.camera_id, surface, settings, rotation, mirrored)
            .await;

        // The capturing flag covers submission through result delivery;
        // persistence happens outside it. The controller records encoder
        // errors separately.
        self.state.end_capture(result.as_ref().err().map(|e| e.to_string()));
        result
    }

    async fn capture_inner(
        &self,
        session: &crate::hardware::SessionHandle,
        camera_id: &str,
        surface: &SurfaceHandle,
        settings: &CameraSettings,
        rotation: Rotation,
        mirrored: bool,
    ) -> CameraResult<CombinedCaptureResult> {
        // Flush any images left over from a previous capture; they must
        // never leak into this one.
        let mut stale = 0usize;
        while self.service.acquire_next_image(surface).is_some() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "Flushed stale images before capture");
        }

        // Start a new image queue and route arriving buffers into it.
        let queue = Arc::new(ImageQueue::with_capacity(IMAGE_BUFFER_SIZE));
        let producer = Arc::clone(&queue);
        self.service.set_image_listener(
            surface,
            Some(Box::new(move |image: RawImage| {
                debug!(timestamp = image.timestamp, "Image available in queue");
                producer.push(image);
            })),
        );

        let request = build_request(TemplateKind::StillCapture, surface.clone(), settings);
        let result = self
            .submit_and_reconcile(session, camera_id, &queue, &request, rotation, mirrored)
            .await;

        // Close the queue before touching the service again: a producer
        // blocked on a full queue holds the service's delivery lock until
        // the close wakes it, and deregistering the listener needs that
        // same lock. Remaining images belong to no valid request.
        queue.close();
        self.service.set_image_listener(surface, None);
        let leftover = queue.drain();
        if leftover > 0 {
            debug!(leftover, "Discarded leftover queued images");
        }
        self.pending.lock().unwrap().take();

        result
    }

    async fn submit_and_reconcile(
        &self,
        session: &crate::hardware::SessionHandle,
        camera_id: &str,
        queue: &Arc<ImageQueue>,
        request: &RequestDescriptor,
        rotation: Rotation,
        mirrored: bool,
    ) -> CameraResult<CombinedCaptureResult> {
        let (resolver, completion) = result_cell::<CameraResult<CaptureMetadata>>();
        *self.pending.lock().unwrap() = Some(PendingCapture {
            queue: Arc::clone(queue),
            completion: resolver.clone(),
        });

        let signals = self.signals.clone();
        let observer = move |event: CaptureEvent| match event {
            CaptureEvent::Started {
                timestamp,
                frame_number,
            } => {
                debug!(timestamp, frame_number, "Capture started");
                // Dropped if the presentation layer is not listening.
                let _ = signals.try_send(CaptureSignal::ShutterStarted);
            }
            CaptureEvent::Completed(metadata) => {
                debug!(
                    timestamp = metadata.sensor_timestamp,
                    "Capture result received"
                );
                if !resolver.resolve(Ok(metadata)) {
                    warn!("Duplicate capture completion ignored");
                }
            }
        };

        info!(camera_id, "Submitting still capture request");
        self.service
            .submit_capture(session, request, Box::new(observer))?;

        let metadata = match completion.wait().await {
            Some(Ok(metadata)) => metadata,
            Some(Err(err)) => return Err(err),
            None => return Err(CameraError::DeviceLost),
        };

        let image = self
            .match_image(Arc::clone(queue), metadata.sensor_timestamp)
            .await?;

        let orientation = exif_orientation_degrees(rotation, mirrored);
        let format = image.format;
        info!(
            timestamp = image.timestamp,
            orientation, %format, "Capture assembled"
        );

        Ok(CombinedCaptureResult {
            image,
            metadata,
            orientation,
            format,
            camera_id: camera_id.to_string(),
        })
    }

    /// Dequeue images until one matches the result timestamp or the
    /// timeout fires
    ///
    /// Depth-JPEG images are accepted unconditionally: timestamp matching
    /// is unreliable for that format on some hardware, a documented quirk
    /// rather than a defect.
    async fn match_image(
        &self,
        queue: Arc<ImageQueue>,
        result_timestamp: i64,
    ) -> CameraResult<RawImage> {
        let deadline = Instant::now() + self.timeout;
        let matching = tokio::task::spawn_blocking(move || {
            loop {
                let image = match queue.recv_deadline(deadline) {
                    Ok(image) => image,
                    Err(RecvError::TimedOut) => return Err(CameraError::CaptureTimeout),
                    Err(RecvError::Closed) => return Err(CameraError::DeviceLost),
                };
                if image.format != ImageFormat::DepthJpeg && image.timestamp != result_timestamp {
                    debug!(
                        timestamp = image.timestamp,
                        result_timestamp, "Skipping image with non-matching timestamp"
                    );
                    continue;
                }
                debug!(timestamp = image.timestamp, "Matching image dequeued");
                return Ok(image);
            }
        });

        match matching.await {
            Ok(result) => result,
            Err(err) => {
                // Only reachable if the matching task panicked.
                error!(error = %err, "Image matching task failed");
                Err(CameraError::DeviceLost)
            }
        }
    }
}
