use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use scandoc::config::{load_config, load_config_from_env, Config};
use scandoc::{Database, Pipeline, ScandocError};
use scandoc_server::{serve, AppState, ServerError};

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Scandoc(#[from] ScandocError),

    #[error("no database path configured and no home directory found")]
    NoDatabasePath,

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// `RUST_LOG` controls the filter (default `info`); `SCANDOC_LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() -> Result<(), StartupError> {
    tracing_log::LogTracer::init().map_err(|e| StartupError::Logging(e.to_string()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SCANDOC_LOG_FORMAT").is_ok_and(|v| v == "json");
    let fmt_layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| StartupError::Logging(e.to_string()))
}

fn load_settings() -> Result<Config, ScandocError> {
    match std::env::var("SCANDOC_CONFIG") {
        Ok(path) if !path.trim().is_empty() => {
            log::info!("Loading config from {}", path);
            Ok(load_config(PathBuf::from(path))?)
        }
        _ => {
            log::info!("SCANDOC_CONFIG not set, configuring from environment");
            Ok(load_config_from_env()?)
        }
    }
}

fn run() -> Result<(), StartupError> {
    let config = load_settings()?;

    let db_path = config
        .database
        .resolved_path()
        .ok_or(StartupError::NoDatabasePath)?;
    let db = Database::open(&db_path).map_err(ScandocError::from)?;

    // Built outside the runtime: the Supabase store owns a blocking client.
    let pipeline = Arc::new(Pipeline::from_config(&config, db)?);
    let state = AppState::new(pipeline.clone(), config.server.max_upload_bytes);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;
    let served = runtime.block_on(serve(state, &config.server.bind));

    drop(runtime);
    drop(pipeline);
    Ok(served?)
}

fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    if let Err(e) = init_tracing() {
        eprintln!("{}", e);
    }

    log::info!("Starting scandoc-server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!(error = %e, "scandoc-server stopped");
        eprintln!("scandoc-server stopped: {}", e);
        std::process::exit(1);
    }
}
