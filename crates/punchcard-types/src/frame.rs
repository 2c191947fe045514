use chrono::{DateTime, Utc};

/// A single decoded camera frame, owned by whichever component requested it.
/// Never retained past encoding.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Raw RGBA pixel buffer.
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::from_rgba(0, 0, Vec::new())
    }
}
