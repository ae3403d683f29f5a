use std::path::{Path, PathBuf};

use engine::{compile_thing_defs_file, resolve_app_paths, DefDatabase};
use petrify::PetrifyConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::SandboxError;

const CONFIG_PATH_ENV_VAR: &str = "PETRIFY_CONFIG";

pub(crate) struct AppWiring {
    pub(crate) config: PetrifyConfig,
    pub(crate) defs_file: Option<PathBuf>,
    pub(crate) saves_dir: PathBuf,
    pub(crate) config_error: Option<SandboxError>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Petrify Sandbox Startup ===");

    let (defs_file, saves_dir) = match resolve_app_paths() {
        Ok(paths) => {
            let defs_file = paths.defs_file.is_file().then_some(paths.defs_file);
            (defs_file, paths.saves_dir)
        }
        Err(err) => {
            let fallback = std::env::temp_dir().join("petrify-sandbox");
            warn!(error = %err, fallback = %fallback.display(), "app_paths_unresolved");
            (None, fallback)
        }
    };

    let (config, config_error) = match load_config() {
        Ok(config) => (config, None),
        Err(err) => (PetrifyConfig::default(), Some(err)),
    };

    AppWiring {
        config,
        defs_file,
        saves_dir,
        config_error,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_config() -> Result<PetrifyConfig, SandboxError> {
    let base = match std::env::var(CONFIG_PATH_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            let path = PathBuf::from(path.trim());
            info!(path = %path.display(), "config_file_loading");
            PetrifyConfig::load_json_file(&path)?
        }
        _ => PetrifyConfig::default(),
    };
    Ok(base.with_env_overrides()?)
}

pub(crate) fn load_defs(defs_file: Option<&Path>) -> Result<DefDatabase, SandboxError> {
    let defs = match defs_file {
        Some(path) => compile_thing_defs_file(path)?,
        None => DefDatabase::builtin()?,
    };
    info!(
        defs = defs.thing_defs().len(),
        hash = %defs.source_hash(),
        "thing_defs_loaded"
    );
    Ok(defs)
}
