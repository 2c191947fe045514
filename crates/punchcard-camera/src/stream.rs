//! Multipart MJPEG streaming pipeline.

use async_stream::stream;
use bytes::Bytes;
use futures::Stream;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::{encode_jpeg, CameraArbiter};

pub const MULTIPART_BOUNDARY: &str = "frame";

/// Content type expected by multipart-replace consumers (browsers).
pub fn mjpeg_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={MULTIPART_BOUNDARY}")
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub jpeg_quality: u8,
    /// Minimum delay between frames; zero streams at device pace.
    pub frame_interval: Duration,
}

/// Open an infinite MJPEG part stream against the arbiter. Each item is one
/// boundary-framed JPEG. The stream closes when frame acquisition fails;
/// dropping it (consumer gone) stops production and releases the device.
pub fn open_mjpeg_stream(
    arbiter: CameraArbiter,
    settings: StreamSettings,
) -> impl Stream<Item = Bytes> {
    stream! {
        loop {
            let frame = match arbiter.acquire_frame().await {
                Ok(frame) => frame,
                Err(err) => {
                    info!("video stream ended: {err}");
                    break;
                }
            };
            match encode_jpeg(&frame, settings.jpeg_quality) {
                Ok(jpeg) => yield frame_part(&jpeg),
                // A bad frame is dropped; only acquisition failure ends the stream.
                Err(err) => warn!("skipping unencodable frame: {err}"),
            }
            if !settings.frame_interval.is_zero() {
                sleep(settings.frame_interval).await;
            }
        }
    }
}

fn frame_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "--{MULTIPART_BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::testing::{solid_frame, ScriptedCamera};

    fn settings() -> StreamSettings {
        StreamSettings {
            jpeg_quality: 75,
            frame_interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn stream_yields_framed_parts_then_ends_on_device_failure() {
        let arbiter = CameraArbiter::new(ScriptedCamera::new(vec![
            solid_frame(8, 8, 10),
            solid_frame(8, 8, 20),
        ]));
        let parts: Vec<Bytes> = open_mjpeg_stream(arbiter, settings()).collect().await;

        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n"));
            assert!(part.ends_with(b"\r\n"));
            // JPEG payload starts after the blank header line.
            let body_at = part
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .expect("header terminator")
                + 4;
            assert_eq!(&part[body_at..body_at + 2], &[0xFF, 0xD8]);
        }
    }

    #[tokio::test]
    async fn stream_is_empty_when_device_never_produces() {
        let arbiter = CameraArbiter::new(ScriptedCamera::new(Vec::new()));
        let parts: Vec<Bytes> = open_mjpeg_stream(arbiter, settings()).collect().await;
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn unencodable_frames_are_dropped_not_fatal() {
        // 8x8 header with a truncated pixel buffer cannot be encoded.
        let bad = punchcard_types::frame::Frame::from_rgba(8, 8, vec![0; 4]);
        let arbiter = CameraArbiter::new(ScriptedCamera::new(vec![bad, solid_frame(8, 8, 30)]));
        let parts: Vec<Bytes> = open_mjpeg_stream(arbiter, settings()).collect().await;
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn content_type_carries_boundary() {
        assert_eq!(
            mjpeg_content_type(),
            "multipart/x-mixed-replace; boundary=frame"
        );
    }
}
