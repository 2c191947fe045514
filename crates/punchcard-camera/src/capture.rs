//! Single-shot capture into the content store.

use std::{fs, path::PathBuf};

use punchcard_ops::allocate_timestamped_filename;
use punchcard_types::Result;
use tracing::info;

use crate::{capture_error, encode_jpeg, CameraArbiter};

/// An encoded capture written to disk, with its retrieval reference.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub filename: String,
    pub url: String,
    pub size_bytes: usize,
}

pub struct CaptureService {
    arbiter: CameraArbiter,
    captures_dir: PathBuf,
    public_base_url: String,
    jpeg_quality: u8,
}

impl CaptureService {
    pub fn new(
        arbiter: CameraArbiter,
        captures_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            arbiter,
            captures_dir: captures_dir.into(),
            public_base_url: public_base_url.into(),
            jpeg_quality,
        }
    }

    /// Acquire one arbitrated frame, encode it, and persist it under a
    /// timestamp-derived filename. Nothing is written when any step fails.
    pub async fn capture_once(&self) -> Result<CapturedImage> {
        let frame = self
            .arbiter
            .acquire_frame()
            .await
            .map_err(|err| capture_error(format!("camera read failed: {err}")))?;
        let jpeg = encode_jpeg(&frame, self.jpeg_quality)?;

        fs::create_dir_all(&self.captures_dir)
            .map_err(|err| capture_error(format!("capture dir unavailable: {err}")))?;
        let filename = allocate_timestamped_filename(
            &self.captures_dir,
            "capture",
            frame.captured_at.timestamp(),
            "jpg",
        );
        fs::write(self.captures_dir.join(&filename), &jpeg)
            .map_err(|err| capture_error(format!("failed to write {filename}: {err}")))?;

        info!("Captured image saved as {filename}");
        Ok(CapturedImage {
            url: format!(
                "{}/captured/{}",
                self.public_base_url.trim_end_matches('/'),
                filename
            ),
            filename,
            size_bytes: jpeg.len(),
        })
    }
}
