//! Camera device abstraction and arbitrated access.

use std::sync::Arc;

use async_trait::async_trait;
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageBuffer, Rgba};
use punchcard_types::{frame::Frame, PunchcardError, Result};
use tokio::sync::Mutex;
use tracing::debug;

mod capture;
mod stream;

pub use capture::{CaptureService, CapturedImage};
pub use stream::{mjpeg_content_type, open_mjpeg_stream, StreamSettings, MULTIPART_BOUNDARY};

/// A physical (or synthetic) frame source. Reading advances the device's
/// internal position, so concurrent reads must never interleave.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn read_frame(&mut self) -> Result<Frame>;
}

/// Serializes all access to the single camera device. Both the streaming
/// pipeline and capture requests go through `acquire_frame`, so exactly one
/// device read is in flight at any time.
#[derive(Clone)]
pub struct CameraArbiter {
    device: Arc<Mutex<Box<dyn CameraDevice>>>,
}

impl CameraArbiter {
    pub fn new(device: impl CameraDevice + 'static) -> Self {
        Self {
            device: Arc::new(Mutex::new(Box::new(device))),
        }
    }

    /// Performs exactly one exclusive device read.
    pub async fn acquire_frame(&self) -> Result<Frame> {
        let mut device = self.device.lock().await;
        device.read_frame().await
    }
}

/// Synthetic moving-gradient source used when no physical camera is wired up.
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    tick: u32,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

#[async_trait]
impl CameraDevice for TestPatternCamera {
    async fn read_frame(&mut self) -> Result<Frame> {
        self.tick = self.tick.wrapping_add(1);
        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x.wrapping_add(self.tick)) % 256) as u8);
                data.push(((y.wrapping_add(self.tick)) % 256) as u8);
                data.push((self.tick % 256) as u8);
                data.push(255);
            }
        }
        debug!("Test pattern frame {} generated", self.tick);
        Ok(Frame::from_rgba(self.width, self.height, data))
    }
}

/// Encode a raw RGBA frame as JPEG at the given quality.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let Some(buffer) =
        ImageBuffer::<Rgba<u8>, _>::from_raw(frame.width, frame.height, frame.data.clone())
    else {
        return Err(device_error(
            "frame dimensions do not match pixel buffer length",
        ));
    };
    let rgb = DynamicImage::ImageRgba8(buffer).into_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality)
        .encode_image(&rgb)
        .map_err(|err| capture_error(format!("JPEG encoding failed: {err}")))?;
    Ok(encoded)
}

pub fn device_error(message: impl Into<String>) -> PunchcardError {
    PunchcardError::Device(message.into())
}

pub fn capture_error(message: impl Into<String>) -> PunchcardError {
    PunchcardError::Capture(message.into())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use punchcard_types::{frame::Frame, Result};
    use tokio::time::{sleep, Duration};

    use crate::{device_error, CameraDevice};

    /// Returns queued frames in order, then fails like a disconnected device.
    pub struct ScriptedCamera {
        frames: VecDeque<Frame>,
        reading: Arc<AtomicBool>,
        pub reads: Arc<AtomicUsize>,
    }

    impl ScriptedCamera {
        pub fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into(),
                reading: Arc::new(AtomicBool::new(false)),
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CameraDevice for ScriptedCamera {
        async fn read_frame(&mut self) -> Result<Frame> {
            let was_reading = self.reading.swap(true, Ordering::SeqCst);
            assert!(!was_reading, "overlapping device reads detected");
            sleep(Duration::from_millis(5)).await;
            self.reads.fetch_add(1, Ordering::SeqCst);
            let frame = self.frames.pop_front();
            self.reading.store(false, Ordering::SeqCst);
            frame.ok_or_else(|| device_error("no frame available"))
        }
    }

    pub fn solid_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::from_rgba(width, height, vec![value; (width * height * 4) as usize])
    }
}
