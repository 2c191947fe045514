use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{PunchcardError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Base URL prefixed to capture retrieval paths, e.g. "http://localhost:5000".
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// JPEG quality for stream and capture encoding, 1..=100.
    pub jpeg_quality: u8,
    /// Minimum delay between streamed frames; 0 streams as fast as the device reads.
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub records_dir: String,
    pub captures_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunchcardConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub storage: StorageConfig,
    pub ops: OpsConfig,
}

impl PunchcardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            PunchcardError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            PunchcardError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(PunchcardError::Configuration(
                "server.port must be a valid port (>0)".into(),
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(PunchcardError::Configuration(
                "camera.width and camera.height must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(PunchcardError::Configuration(
                "camera.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.storage.records_dir.is_empty() || self.storage.captures_dir.is_empty() {
            return Err(PunchcardError::Configuration(
                "storage.records_dir and storage.captures_dir must be set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_config() -> PunchcardConfig {
        PunchcardConfig {
            server: ServerConfig {
                bind_addr: "127.0.0.1".into(),
                port: 5000,
                public_base_url: "http://localhost:5000".into(),
            },
            camera: CameraConfig {
                width: 640,
                height: 480,
                jpeg_quality: 80,
                frame_interval_ms: 33,
            },
            storage: StorageConfig {
                records_dir: "attendance_records".into(),
                captures_dir: "captured_images".into(),
            },
            ops: OpsConfig {
                log_level: "debug".into(),
            },
        }
    }

    #[test]
    fn load_punchcard_config_from_file() {
        let temp_path = std::env::temp_dir().join("punchcard-config-test.toml");
        let config = sample_config();

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = PunchcardConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.server.port, config.server.port);
        assert_eq!(loaded.camera.jpeg_quality, config.camera.jpeg_quality);
        assert_eq!(loaded.storage.records_dir, config.storage.records_dir);
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = sample_config();

        config.server.port = 0;
        assert!(config.validate().is_err());
        config.server.port = 5000;
        config.camera.width = 0;
        assert!(config.validate().is_err());
        config.camera.width = 640;
        config.camera.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.camera.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config.camera.jpeg_quality = 80;
        config.storage.records_dir.clear();
        assert!(config.validate().is_err());
        config.storage.records_dir = "attendance_records".into();
        assert!(config.validate().is_ok());
    }
}
