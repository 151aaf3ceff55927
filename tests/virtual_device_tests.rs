// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end smoke tests against the virtual backend
//!
//! The full stack: controller, lifecycle, orchestrator, virtual service and
//! file encoder, writing real files to a temp directory.

use manual_camera::controller::CameraController;
use manual_camera::encoder::FileImageEncoder;
use manual_camera::hardware::{CameraService, ImageFormat, VirtualCameraService};
use std::path::PathBuf;
use std::sync::Arc;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("manual-camera-e2e-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn build(
    dir: &PathBuf,
    camera_id: &str,
    format: ImageFormat,
) -> (Arc<VirtualCameraService>, CameraController) {
    let service = Arc::new(VirtualCameraService::new());
    let encoder = Arc::new(FileImageEncoder::new(
        Arc::clone(&service) as Arc<dyn CameraService>,
        dir.clone(),
    ));
    let controller = CameraController::new(
        Arc::clone(&service) as Arc<dyn CameraService>,
        encoder,
        camera_id,
        format,
    )
    .unwrap();
    (service, controller)
}

#[tokio::test(flavor = "multi_thread")]
async fn jpeg_photo_lands_on_disk() {
    let dir = temp_dir("jpeg");
    let (_service, controller) = build(&dir, "0", ImageFormat::Jpeg);

    controller.initialize().await.unwrap();
    let path = controller.take_photo().await.unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    assert_eq!(path.extension().unwrap(), "jpg");
    assert!(
        path.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("IMG_")
    );

    controller.shutdown();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_photo_encodes_as_tiff() {
    let dir = temp_dir("raw");
    let (_service, controller) = build(&dir, "0", ImageFormat::RawSensor);

    controller.initialize().await.unwrap();
    let path = controller.take_photo().await.unwrap();

    assert_eq!(path.extension().unwrap(), "tiff");
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    controller.shutdown();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_settings_flow_through_to_metadata() {
    let dir = temp_dir("manual");
    let (_service, controller) = build(&dir, "0", ImageFormat::Jpeg);

    controller.initialize().await.unwrap();
    controller.toggle_manual_mode();
    assert!(controller.set_iso(800));
    assert!(controller.set_shutter_speed(8_000_000));
    // Out of the back camera's declared range.
    assert!(!controller.set_iso(6400));

    let path = controller.take_photo().await.unwrap();
    assert!(path.exists());

    controller.shutdown();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn sequential_captures_produce_distinct_files() {
    let dir = temp_dir("sequential");
    let (_service, controller) = build(&dir, "0", ImageFormat::Jpeg);

    controller.initialize().await.unwrap();
    let first = controller.take_photo().await.unwrap();
    let second = controller.take_photo().await.unwrap();
    assert_ne!(first, second);

    controller.shutdown();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_camera_keeps_capturing() {
    let dir = temp_dir("switch");
    let (_service, controller) = build(&dir, "0", ImageFormat::Jpeg);

    controller.initialize().await.unwrap();
    controller.take_photo().await.unwrap();

    controller.switch_camera().await.unwrap();
    assert_eq!(controller.active_camera(), "1");
    let path = controller.take_photo().await.unwrap();
    assert!(path.exists());

    controller.shutdown();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn unplug_fails_capture_and_recovers_on_reinitialize() {
    let dir = temp_dir("unplug");
    let (service, controller) = build(&dir, "0", ImageFormat::Jpeg);

    controller.initialize().await.unwrap();
    service.disconnect("0");

    // The disconnect lands asynchronously on the callback thread.
    let mut state = controller.state();
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while state.borrow_and_update().is_initialized {
            state.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    controller.initialize().await.unwrap();
    let path = controller.take_photo().await.unwrap();
    assert!(path.exists());

    controller.shutdown();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn enumeration_reports_both_cameras() {
    let service = VirtualCameraService::new();
    assert_eq!(service.list_cameras(), vec!["0".to_string(), "1".to_string()]);

    let caps = service.query_capabilities("0").unwrap();
    assert!(caps.supports_manual_controls);
    assert!(caps.iso_range.is_some());
    assert!(service.query_capabilities("9").is_err());
}
