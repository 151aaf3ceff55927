// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras and their capabilities
//! - Taking photos with automatic or manual exposure control

use manual_camera::config::Config;
use manual_camera::controller::CameraController;
use manual_camera::encoder::FileImageEncoder;
use manual_camera::hardware::{CameraService, ImageFormat, VirtualCameraService};
use manual_camera::orientation::Rotation;
use std::path::PathBuf;
use std::sync::Arc;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let service = VirtualCameraService::new();
    let cameras = service.list_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera_id in &cameras {
        match service.query_capabilities(camera_id) {
            Ok(caps) => {
                println!("  [{}] facing {:?}", camera_id, caps.facing);
                if caps.supports_manual_controls {
                    if let Some(iso) = &caps.iso_range {
                        println!("      ISO: {}-{}", iso.start(), iso.end());
                    }
                    if let Some(exposure) = &caps.exposure_time_range {
                        println!(
                            "      Exposure: {}ns-{}ns",
                            exposure.start(),
                            exposure.end()
                        );
                    }
                    if let Some(min_focus) = caps.minimum_focus_distance {
                        println!("      Focus: 0.0-{} diopters", min_focus);
                    }
                } else {
                    println!("      Manual controls not supported");
                }
            }
            Err(err) => println!("  [{}] unavailable: {}", camera_id, err),
        }
        println!();
    }

    Ok(())
}

/// Show the capability snapshot for a single camera
pub fn show_capabilities(camera_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let service = VirtualCameraService::new();
    let caps = service.query_capabilities(camera_id)?;

    println!("Camera {}:", camera_id);
    println!("  Facing: {:?}", caps.facing);
    println!("  Manual controls: {}", caps.supports_manual_controls);
    match &caps.iso_range {
        Some(range) => println!("  ISO range: {}-{}", range.start(), range.end()),
        None => println!("  ISO range: not declared"),
    }
    match &caps.exposure_time_range {
        Some(range) => println!("  Exposure range: {}ns-{}ns", range.start(), range.end()),
        None => println!("  Exposure range: not declared"),
    }
    match caps.minimum_focus_distance {
        Some(min) => println!("  Minimum focus distance: {} diopters", min),
        None => println!("  Minimum focus distance: not declared"),
    }

    Ok(())
}

/// Options for the photo command
pub struct PhotoOptions {
    pub camera: Option<String>,
    pub raw: bool,
    pub manual: bool,
    pub iso: Option<i32>,
    pub shutter_ns: Option<i64>,
    pub focus: Option<f32>,
    pub rotation: i32,
    pub output: Option<PathBuf>,
}

/// Take a photo using the specified camera
pub fn take_photo(options: PhotoOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let service: Arc<dyn CameraService> = Arc::new(VirtualCameraService::new());

    let camera_id = options
        .camera
        .or(config.camera_id.clone())
        .or_else(|| service.list_cameras().into_iter().next())
        .ok_or("No cameras found")?;

    let output_dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir_or_default());
    let format = if options.raw {
        ImageFormat::RawSensor
    } else {
        ImageFormat::Jpeg
    };

    println!("Using camera: {}", camera_id);
    println!("Capture format: {}", format);

    let encoder = Arc::new(FileImageEncoder::new(Arc::clone(&service), output_dir));
    let controller = CameraController::new(service, encoder, &camera_id, format)?
        .with_rotation(Rotation::from_degrees(options.rotation));

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(async {
        controller.initialize().await?;

        if options.manual || config.start_in_manual_mode {
            controller.toggle_manual_mode();
        }
        if let Some(iso) = options.iso
            && !controller.set_iso(iso)
        {
            println!("ISO {} rejected (out of range)", iso);
        }
        if let Some(shutter_ns) = options.shutter_ns
            && !controller.set_shutter_speed(shutter_ns)
        {
            println!("Shutter speed {}ns rejected (out of range)", shutter_ns);
        }
        if let Some(focus) = options.focus
            && !controller.set_focus_distance(focus)
        {
            println!("Focus distance {} rejected (out of range)", focus);
        }

        println!("Capturing...");
        let path = controller.take_photo().await?;
        controller.shutdown();
        Ok::<_, manual_camera::errors::CameraError>(path)
    })?;

    println!("Photo saved: {}", path.display());
    Ok(())
}
