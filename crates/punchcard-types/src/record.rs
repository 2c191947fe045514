use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position attached to an attendance event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// One verified attendance event, stored as a single JSON document under the
/// user's partition. Field names follow the on-disk camelCase format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default = "default_verified")]
    pub verified: bool,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_verified() -> bool {
    true
}

/// Caller-supplied fields for a save operation. The timestamp is never taken
/// from the caller; the store stamps it at save time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendance {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default = "default_verified")]
    pub verified: bool,
    /// Base64-encoded JPEG photo, decoded and persisted alongside the record.
    #[serde(default)]
    pub image_data: Option<String>,
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SavedAttendance {
    pub record_id: String,
    pub image_filename: Option<String>,
}

/// Per-user aggregation over a trailing window of days.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceStats {
    pub total_days_marked: usize,
    pub attendance_percentage: f64,
    pub last_record: Option<AttendanceRecord>,
}

impl AttendanceStats {
    pub fn empty() -> Self {
        Self {
            total_days_marked: 0,
            attendance_percentage: 0.0,
            last_record: None,
        }
    }
}
