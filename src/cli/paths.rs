use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default config directory name under the home directory
const DEFAULT_DIR_NAME: &str = ".entra-lab";

/// Resolve the config directory: the explicit path if given, else
/// `~/.entra-lab`.
pub fn resolve_config_dir(config_dir: Option<String>) -> Result<PathBuf> {
    match config_dir {
        Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path.trim())),
        _ => dirs::home_dir()
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .context("Failed to determine home directory; pass --config-dir"),
    }
}
