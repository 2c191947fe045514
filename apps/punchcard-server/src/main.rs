use std::{env, sync::Arc};

use anyhow::Result;
use punchcard_camera::{CameraArbiter, CaptureService, StreamSettings, TestPatternCamera};
use punchcard_ops::{ensure_storage_dir, init_tracing};
use punchcard_store::AttendanceStore;
use punchcard_types::config::{
    CameraConfig, OpsConfig, PunchcardConfig, ServerConfig, StorageConfig,
};
use tokio::time::Duration;
use tracing::info;

mod http;

use http::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config();
    init_tracing(&config.ops)?;
    ensure_storage_dir(&config.storage.records_dir)?;
    let captures_dir = ensure_storage_dir(&config.storage.captures_dir)?;

    let arbiter = CameraArbiter::new(TestPatternCamera::new(
        config.camera.width,
        config.camera.height,
    ));
    let capture = Arc::new(CaptureService::new(
        arbiter.clone(),
        &captures_dir,
        config.server.public_base_url.clone(),
        config.camera.jpeg_quality,
    ));
    let store = Arc::new(AttendanceStore::new(&config.storage.records_dir));

    let state = AppState {
        arbiter,
        capture,
        store,
        stream_settings: StreamSettings {
            jpeg_quality: config.camera.jpeg_quality,
            frame_interval: Duration::from_millis(config.camera.frame_interval_ms),
        },
        captures_dir,
    };

    let addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Punchcard server listening on {addr}");
    axum::serve(listener, http::router(state)).await?;
    Ok(())
}

fn load_config() -> PunchcardConfig {
    let from_env = env::var("PUNCHCARD_CONFIG").ok();
    let from_args = env::args().nth(1);
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| "configs/dev.toml".into());
    match PunchcardConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path
                );
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path
            );
            default_config()
        }
    }
}

fn default_config() -> PunchcardConfig {
    let config = PunchcardConfig {
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
            log_level: "info".into(),
        },
    };
    debug_assert!(config.validate().is_ok());
    config
}
