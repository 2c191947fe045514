//! Attendance record store: directory-per-user, file-per-record persistence
//! with listing and daily-attendance aggregation.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use punchcard_ops::allocate_timestamped_filename;
use punchcard_types::{
    record::{AttendanceRecord, AttendanceStats, NewAttendance, SavedAttendance},
    PunchcardError, Result,
};
use tracing::{info, warn};

const RECORD_PREFIX: &str = "attendance";

/// Append-only store rooted at the records directory. Each user owns one
/// partition subdirectory; each record is a single JSON document named after
/// its save timestamp. The files are the source of truth; nothing is ever
/// rewritten in place.
pub struct AttendanceStore {
    root: PathBuf,
}

impl AttendanceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn partition(&self, user_id: &str) -> PathBuf {
        self.root.join(user_id)
    }

    /// Persist one attendance event, stamping the current server time.
    pub fn save(&self, new: NewAttendance) -> Result<SavedAttendance> {
        self.save_at(new, Utc::now())
    }

    /// Save with an explicit clock instant. The record id is the timestamp
    /// portion of the written filename (plus a collision suffix when two
    /// saves land in the same second).
    pub fn save_at(&self, new: NewAttendance, at: DateTime<Utc>) -> Result<SavedAttendance> {
        let user_id = new.user_id.trim();
        if user_id.is_empty() {
            return Err(PunchcardError::Validation("userId is required".into()));
        }
        if !is_safe_user_id(user_id) {
            return Err(PunchcardError::Validation(
                "userId must not contain path separators".into(),
            ));
        }

        let partition = self.partition(user_id);
        fs::create_dir_all(&partition)
            .map_err(|err| storage_error(format!("failed to create partition: {err}")))?;

        let epoch = at.timestamp();
        let image = match new.image_data.as_deref() {
            Some(data) if !data.is_empty() => {
                Some(self.write_photo(&partition, epoch, data)?)
            }
            _ => None,
        };

        let record = AttendanceRecord {
            user_id: user_id.to_string(),
            user_name: new.user_name,
            email: new.email,
            timestamp: at,
            location: new.location,
            verified: new.verified,
            image,
        };

        let filename = allocate_timestamped_filename(&partition, RECORD_PREFIX, epoch, "json");
        let doc = serde_json::to_vec_pretty(&record)
            .map_err(|err| storage_error(format!("failed to serialize record: {err}")))?;
        fs::write(partition.join(&filename), doc)
            .map_err(|err| storage_error(format!("failed to write {filename}: {err}")))?;

        let record_id = record_id_from_filename(&filename);
        info!("Attendance saved for {user_id} as {filename}");
        Ok(SavedAttendance {
            record_id,
            image_filename: record.image,
        })
    }

    fn write_photo(&self, partition: &Path, epoch: i64, data: &str) -> Result<String> {
        let bytes = BASE64.decode(strip_data_url(data)).map_err(|err| {
            PunchcardError::Validation(format!("imageData is not valid base64: {err}"))
        })?;
        let filename = allocate_timestamped_filename(partition, RECORD_PREFIX, epoch, "jpg");
        fs::write(partition.join(&filename), bytes)
            .map_err(|err| storage_error(format!("failed to write photo {filename}: {err}")))?;
        Ok(filename)
    }

    /// All records for a user, newest first. A missing partition is an empty
    /// result, and unparseable record files are skipped rather than fatal.
    pub fn list_by_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AttendanceRecord>> {
        if !is_safe_user_id(user_id) {
            return Ok(Vec::new());
        }
        let partition = self.partition(user_id);
        if !partition.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<(String, AttendanceRecord)> = Vec::new();
        let dir = fs::read_dir(&partition)
            .map_err(|err| storage_error(format!("failed to read partition: {err}")))?;
        for entry in dir {
            let entry =
                entry.map_err(|err| storage_error(format!("failed to read partition: {err}")))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".json") {
                continue;
            }
            let parsed = fs::read_to_string(entry.path())
                .ok()
                .and_then(|doc| serde_json::from_str::<AttendanceRecord>(&doc).ok());
            match parsed {
                Some(record) => entries.push((name, record)),
                None => warn!("skipping unreadable attendance file {:?}", entry.path()),
            }
        }

        entries.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then_with(|| a.0.cmp(&b.0)));
        let mut records: Vec<AttendanceRecord> =
            entries.into_iter().map(|(_, record)| record).collect();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Aggregate the trailing `window_days` of a user's records into
    /// unique-days-marked, attendance percentage, and the latest record.
    pub fn stats_by_user(&self, user_id: &str, window_days: i64) -> Result<AttendanceStats> {
        self.stats_by_user_at(user_id, window_days, Utc::now())
    }

    pub fn stats_by_user_at(
        &self,
        user_id: &str,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<AttendanceStats> {
        let cutoff = now - Duration::days(window_days);
        let records = self.list_by_user(user_id, None)?;
        let in_window: Vec<&AttendanceRecord> = records
            .iter()
            .filter(|record| record.timestamp >= cutoff && record.timestamp <= now)
            .collect();

        let days: HashSet<_> = in_window
            .iter()
            .map(|record| record.timestamp.date_naive())
            .collect();
        let total_days_marked = days.len();
        let attendance_percentage = if window_days > 0 {
            round2(total_days_marked as f64 / window_days as f64 * 100.0)
        } else {
            0.0
        };

        Ok(AttendanceStats {
            total_days_marked,
            attendance_percentage,
            // list_by_user is newest-first, so the first kept record wins.
            last_record: in_window.first().map(|record| (*record).clone()),
        })
    }
}

fn record_id_from_filename(filename: &str) -> String {
    filename
        .trim_start_matches(RECORD_PREFIX)
        .trim_start_matches('_')
        .trim_end_matches(".json")
        .to_string()
}

/// Partition names must stay inside the records root.
fn is_safe_user_id(user_id: &str) -> bool {
    !user_id.contains('/') && !user_id.contains('\\') && !user_id.contains("..")
}

/// Browsers post photos as data URLs; keep only the base64 payload.
fn strip_data_url(data: &str) -> &str {
    match data.split_once(',') {
        Some((head, payload)) if head.starts_with("data:") => payload,
        _ => data,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn storage_error(message: impl Into<String>) -> PunchcardError {
    PunchcardError::Storage(message.into())
}
