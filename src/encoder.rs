// SPDX-License-Identifier: GPL-3.0-only

//! Image encoder boundary
//!
//! Consumes a [`CombinedCaptureResult`] and persists it to disk. JPEG and
//! depth-JPEG buffers are already compressed and are written through as-is;
//! raw sensor buffers need the device's capability metadata and go through
//! a 16-bit TIFF encoder. The result is taken by value, so the underlying
//! image buffer is released exactly once.

use crate::errors::EncodeError;
use crate::hardware::{CameraService, ImageFormat};
use crate::orchestrator::CombinedCaptureResult;
use chrono::Local;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Persists a capture result, consuming it
pub trait ImageEncoder: Send + Sync {
    /// Encode the result and write it to storage, returning the output path
    fn encode_and_persist(&self, result: CombinedCaptureResult) -> Result<PathBuf, EncodeError>;
}

/// File-backed encoder writing timestamped `IMG_*` files
pub struct FileImageEncoder {
    service: Arc<dyn CameraService>,
    output_dir: PathBuf,
}

impl FileImageEncoder {
    pub fn new(service: Arc<dyn CameraService>, output_dir: PathBuf) -> Self {
        Self {
            service,
            output_dir,
        }
    }

    fn create_path(&self, extension: &str) -> PathBuf {
        let stamp = Local::now().format("%Y_%m_%d_%H_%M_%S_%3f");
        self.output_dir.join(format!("IMG_{}.{}", stamp, extension))
    }

    fn write_raw_sensor(
        &self,
        result: &CombinedCaptureResult,
        path: &Path,
    ) -> Result<(), EncodeError> {
        // The raw encoder needs the device's static metadata; an unknown
        // camera id means the buffer cannot be interpreted.
        let capabilities = self
            .service
            .query_capabilities(&result.camera_id)
            .map_err(|err| EncodeError::InvalidBuffer(err.to_string()))?;
        debug!(
            camera_id = %result.camera_id,
            manual = capabilities.supports_manual_controls,
            exposure_ns = result.metadata.exposure_time_ns,
            sensitivity = result.metadata.sensitivity,
            "Encoding raw sensor data"
        );

        let image = &result.image;
        let expected = image.width as usize * image.height as usize * 2;
        if image.data.len() != expected {
            return Err(EncodeError::InvalidBuffer(format!(
                "raw buffer is {} bytes, expected {} for {}x{} 16-bit",
                image.data.len(),
                expected,
                image.width,
                image.height
            )));
        }

        let file = File::create(path)?;
        let encoder = image::codecs::tiff::TiffEncoder::new(BufWriter::new(file));
        image::ImageEncoder::write_image(
            encoder,
            &image.data,
            image.width,
            image.height,
            image::ExtendedColorType::L16,
        )
        .map_err(|err| EncodeError::Io(err.to_string()))?;
        Ok(())
    }
}

impl ImageEncoder for FileImageEncoder {
    fn encode_and_persist(&self, result: CombinedCaptureResult) -> Result<PathBuf, EncodeError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let output = match result.format {
            // Already-compressed bytes are saved as-is.
            ImageFormat::Jpeg | ImageFormat::DepthJpeg => {
                let output = self.create_path("jpg");
                std::fs::write(&output, &result.image.data)?;
                output
            }
            ImageFormat::RawSensor => {
                let output = self.create_path("tiff");
                self.write_raw_sensor(&result, &output)?;
                output
            }
        };

        info!(path = ?output, orientation = result.orientation, "Image saved");
        Ok(output)
    }
}
