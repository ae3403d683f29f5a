mod bootstrap;
mod scenario;

use thiserror::Error;

pub(crate) use bootstrap::build_app;
use bootstrap::{load_defs, AppWiring};

#[derive(Debug, Error)]
pub(crate) enum SandboxError {
    #[error(transparent)]
    Config(#[from] petrify::ConfigError),
    #[error(transparent)]
    Defs(#[from] engine::DefCompileError),
    #[error(transparent)]
    World(#[from] engine::WorldError),
    #[error(transparent)]
    Tilemap(#[from] engine::TilemapError),
    #[error(transparent)]
    Save(#[from] engine::SaveError),
    #[error(transparent)]
    Petrify(#[from] petrify::PetrifyError),
}

pub(crate) fn run(wiring: AppWiring) -> Result<(), SandboxError> {
    if let Some(err) = wiring.config_error {
        return Err(err);
    }
    let defs = load_defs(wiring.defs_file.as_deref())?;
    let save_path = wiring.saves_dir.join("sandbox.json");
    let summary = scenario::run_demo(&wiring.config, defs, &save_path)?;
    summary.log();
    Ok(())
}
