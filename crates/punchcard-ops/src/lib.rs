//! Operational helpers: logging setup and storage directory bootstrap.

use std::path::{Path, PathBuf};

use punchcard_types::{config::OpsConfig, PunchcardError, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| PunchcardError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| PunchcardError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

pub fn ensure_storage_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| PunchcardError::Ops(format!("failed to create storage dir: {err}")))?;
    info!("Storage directory ready at {:?}", dir);
    Ok(dir)
}

/// Derive a `<prefix>_<epochSeconds>.<ext>` filename inside `dir`, appending a
/// numeric suffix when the base name is already taken. Writes racing for the
/// same suffixed name are still last-writer-wins; the check only removes the
/// silent same-second overwrite.
pub fn allocate_timestamped_filename(
    dir: &Path,
    prefix: &str,
    epoch_secs: i64,
    extension: &str,
) -> String {
    let base = format!("{prefix}_{epoch_secs}");
    let candidate = format!("{base}.{extension}");
    if !dir.join(&candidate).exists() {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}-{n}.{extension}");
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn filename_allocation_avoids_collisions() {
        let dir = std::env::temp_dir().join(format!("punchcard-ops-test-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");

        let first = allocate_timestamped_filename(&dir, "capture", 1_700_000_000, "jpg");
        assert_eq!(first, "capture_1700000000.jpg");
        fs::write(dir.join(&first), b"x").expect("write first");

        let second = allocate_timestamped_filename(&dir, "capture", 1_700_000_000, "jpg");
        assert_eq!(second, "capture_1700000000-1.jpg");
        fs::write(dir.join(&second), b"x").expect("write second");

        let third = allocate_timestamped_filename(&dir, "capture", 1_700_000_000, "jpg");
        assert_eq!(third, "capture_1700000000-2.jpg");

        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }
}
