//! Config loading entry points.

use super::{merge, sources, ProvgraphConfig};
use config::{ConfigError, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`ProvgraphConfig`] from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global config file,
    /// `config/config.toml`, `config/{PROVGRAPH_ENV}.toml`, `PROVGRAPH__*`
    /// environment variables.
    pub fn load(workspace_root: &Path) -> Result<ProvgraphConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(env_source()).build()?;
        debug!(workspace = %workspace_root.display(), "configuration loaded");
        config.try_deserialize()
    }

    /// Load configuration from one explicit file (plus defaults and environment)
    pub fn load_from_file(path: &Path) -> Result<ProvgraphConfig, ConfigError> {
        let config = merge::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(env_source())
            .build()?;
        config.try_deserialize()
    }

    /// Path of the global config file, if a home or XDG config dir is known
    pub fn xdg_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("PROVGRAPH").separator("__")
}
