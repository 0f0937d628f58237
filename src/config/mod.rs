//! Lab configuration.
//!
//! Settings are layered at startup:
//! 1. built-in defaults (`register_defaults`)
//! 2. `<config-dir>/config.json` overrides
//! 3. `ENTRA_LAB_*` environment variables
//!
//! The resulting `SettingsStore` is turned into a typed `LabConfig` that is
//! handed to every component by reference.

mod defaults;
mod lab;
mod store;

pub use defaults::{register_defaults, DEFAULT_LOG_LEVEL, LOG_LEVEL, MODULE};
pub use lab::LabConfig;
pub use store::{ConfigError, SettingValue, SettingsStore};

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// File name of the overrides file inside the config directory
pub const CONFIG_FILE: &str = "config.json";

/// Qualify a key with the module namespace if it is missing,
/// e.g. `Graph.PageSize` -> `EntraLab.Graph.PageSize`.
pub fn qualify(key: &str) -> String {
    let prefix = format!("{}.", MODULE);
    if key.starts_with(&prefix) {
        key.to_string()
    } else {
        format!("{}{}", prefix, key)
    }
}

/// Overrides as stored in `config.json`. `null` removes a deletable setting.
pub type Overrides = BTreeMap<String, Option<SettingValue>>;

/// Read the overrides file. A missing file yields no overrides.
pub fn read_overrides(config_dir: &Path) -> Result<Overrides> {
    let path = config_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Write the overrides file, creating the config directory if needed.
pub fn write_overrides(config_dir: &Path, overrides: &Overrides) -> Result<()> {
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;

    let path = config_dir.join(CONFIG_FILE);
    let content =
        serde_json::to_string_pretty(overrides).context("Failed to serialize config overrides")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    debug!("Config overrides saved to {:?}", path);
    Ok(())
}

/// Apply one file override. String values are parsed by the setting's type
/// so `"250"` works for an integer setting.
fn apply_override(
    store: &mut SettingsStore,
    key: &str,
    value: &Option<SettingValue>,
) -> Result<(), ConfigError> {
    let key = qualify(key);
    match value {
        None => store.remove(&key).map(|removed| {
            debug!("Removed setting {}", removed.key());
        }),
        Some(SettingValue::String(raw)) => store.set_from_str(&key, raw),
        Some(other) => store.set(&key, other.clone()),
    }
}

/// Apply file overrides, stopping at the first invalid one.
pub fn apply_overrides(store: &mut SettingsStore, overrides: &Overrides) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        apply_override(store, key, value)?;
    }
    Ok(())
}

/// Environment values for registered settings, as (key, variable, raw value)
fn env_values(
    store: &SettingsStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<(String, String, String)> {
    store
        .iter()
        .filter_map(|s| {
            let var = s.env_var();
            lookup(&var).map(|raw| (s.key(), var, raw))
        })
        .collect()
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    store: &mut SettingsStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    for (key, var, raw) in env_values(store, lookup) {
        debug!("Applying {} from {}", key, var);
        store.set_from_str(&key, &raw)?;
    }
    Ok(())
}

fn defaults() -> Result<SettingsStore> {
    let mut store = SettingsStore::new();
    register_defaults(&mut store).context("Failed to register default settings")?;
    Ok(store)
}

/// Build the settings store and typed configuration for this process.
pub fn load(config_dir: &Path) -> Result<(SettingsStore, LabConfig)> {
    let mut store = defaults()?;

    let overrides = read_overrides(config_dir)?;
    if !overrides.is_empty() {
        info!("Loaded {} setting override(s) from {}", overrides.len(), CONFIG_FILE);
    }
    apply_overrides(&mut store, &overrides).context("Invalid setting in config file")?;
    apply_env_overrides(&mut store, |name| std::env::var(name).ok())
        .context("Invalid setting in environment")?;

    let config = LabConfig::from_store(&store).context("Invalid lab configuration")?;
    Ok((store, config))
}

/// Like `load`, but invalid overrides are skipped instead of failing.
///
/// Returns the rejected overrides as `<source>: <error>` lines. Used by
/// `config` so a bad value can still be inspected and reset.
pub fn load_lenient(
    config_dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(SettingsStore, Vec<String>)> {
    let mut store = defaults()?;
    let mut rejected = Vec::new();

    let overrides = read_overrides(config_dir).unwrap_or_else(|e| {
        warn!("Ignoring {}: {:#}", CONFIG_FILE, e);
        rejected.push(format!("{}: {:#}", CONFIG_FILE, e));
        Overrides::new()
    });
    for (key, value) in &overrides {
        if let Err(e) = apply_override(&mut store, key, value) {
            warn!("Ignoring override {} from {}: {}", key, CONFIG_FILE, e);
            rejected.push(format!("{}: {}", CONFIG_FILE, e));
        }
    }
    for (key, var, raw) in env_values(&store, lookup) {
        if let Err(e) = store.set_from_str(&key, &raw) {
            warn!("Ignoring {}: {}", var, e);
            rejected.push(format!("{}: {}", var, e));
        }
    }

    Ok((store, rejected))
}
