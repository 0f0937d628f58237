use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::ConfigAction;
use crate::config::{self, SettingsStore, CONFIG_FILE};

/// `store` is loaded leniently; `rejected` lists the overrides that were
/// skipped so they can be fixed from here.
pub async fn run_config(
    config_dir: &Path,
    store: &SettingsStore,
    rejected: &[String],
    action: Option<ConfigAction>,
) -> Result<()> {
    for problem in rejected {
        println!("⚠️  Ignoring invalid override {}", problem);
    }

    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => show(store),
        ConfigAction::Set { key, value } => set(config_dir, store, &key, &value),
        ConfigAction::Reset { key } => reset(config_dir, store, &key),
        ConfigAction::Remove { key } => remove(config_dir, store, &key),
    }
}

fn show(store: &SettingsStore) -> Result<()> {
    if store.is_empty() {
        println!("No settings registered.");
        return Ok(());
    }

    let mut module = "";
    for setting in store.iter() {
        if setting.module() != module {
            module = setting.module();
            println!("[{}]", module);
        }

        let mut notes = Vec::new();
        if setting.value() != setting.default_value() {
            notes.push("overridden");
        }
        if setting.is_deletable() {
            notes.push("deletable");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };

        println!("  {} = {}{}", setting.name(), setting.value(), notes);
        if !setting.description_text().is_empty() {
            println!("      {}", setting.description_text());
        }
        println!("      env: {}", setting.env_var());
    }
    println!("\n{} setting(s)", store.len());
    Ok(())
}

/// Override keys that refer to `key`, with and without the module prefix
fn aliases(key: &str) -> [String; 2] {
    let short = key
        .strip_prefix(&format!("{}.", config::MODULE))
        .unwrap_or(key)
        .to_string();
    [key.to_string(), short]
}

fn set(config_dir: &Path, store: &SettingsStore, key: &str, value: &str) -> Result<()> {
    let key = config::qualify(key);

    // Validate against a copy so a bad value never reaches the file
    let mut check = store.clone();
    if check.setting(&key).is_none() {
        // a removed flag can be set again
        config::register_defaults(&mut check)?;
    }
    check
        .set_from_str(&key, value)
        .with_context(|| format!("Cannot set {}", key))?;
    let parsed = check
        .get(&key)
        .cloned()
        .with_context(|| format!("Setting {} disappeared after update", key))?;

    let mut overrides = config::read_overrides(config_dir)?;
    for alias in aliases(&key) {
        overrides.remove(&alias);
    }
    overrides.insert(key.clone(), Some(parsed.clone()));
    config::write_overrides(config_dir, &overrides)?;

    println!("✅ {} = {} (saved to {})", key, parsed, CONFIG_FILE);
    Ok(())
}

fn reset(config_dir: &Path, store: &SettingsStore, key: &str) -> Result<()> {
    let key = config::qualify(key);

    let mut restored = store.clone();
    if restored.setting(&key).is_none() {
        // removed flags come back with their registered default
        config::register_defaults(&mut restored)?;
    }
    restored
        .reset(&key)
        .with_context(|| format!("Cannot reset {}", key))?;
    let setting = restored
        .setting(&key)
        .with_context(|| format!("Unknown setting {}", key))?;

    let mut overrides = config::read_overrides(config_dir)?;
    let mut removed = false;
    for alias in aliases(&key) {
        removed |= overrides.remove(&alias).is_some();
    }
    if !removed {
        println!("{} has no override in {}", key, CONFIG_FILE);
        return Ok(());
    }
    config::write_overrides(config_dir, &overrides)?;

    println!("✅ {} reset to {}", key, setting.value());
    if std::env::var(setting.env_var()).is_ok() {
        println!("   Note: {} is set and still overrides it.", setting.env_var());
    }
    Ok(())
}

fn remove(config_dir: &Path, store: &SettingsStore, key: &str) -> Result<()> {
    let key = config::qualify(key);

    let mut check = store.clone();
    check
        .remove(&key)
        .with_context(|| format!("Cannot remove {}", key))?;

    let mut overrides = config::read_overrides(config_dir)?;
    for alias in aliases(&key) {
        overrides.remove(&alias);
    }
    overrides.insert(key.clone(), None);
    config::write_overrides(config_dir, &overrides)?;

    println!("✅ {} removed (saved to {})", key, CONFIG_FILE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn load(dir: &Path) -> (SettingsStore, Vec<String>) {
        config::load_lenient(dir, no_env).unwrap()
    }

    #[tokio::test]
    async fn test_set_then_reset_round_trips_through_file() {
        let tmp = tempdir().unwrap();
        let (store, rejected) = load(tmp.path());

        run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Set {
                key: "Graph.PageSize".to_string(),
                value: "250".to_string(),
            }),
        )
        .await
        .unwrap();

        let overrides = config::read_overrides(tmp.path()).unwrap();
        assert_eq!(
            overrides
                .get("EntraLab.Graph.PageSize")
                .and_then(|v| v.as_ref())
                .and_then(|v| v.as_i64()),
            Some(250)
        );

        run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Reset {
                key: "EntraLab.Graph.PageSize".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(config::read_overrides(tmp.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_value() {
        let tmp = tempdir().unwrap();
        let (store, rejected) = load(tmp.path());

        let result = run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Set {
                key: "Graph.PageSize".to_string(),
                value: "5000".to_string(),
            }),
        )
        .await;

        assert!(result.is_err());
        assert!(!tmp.path().join(CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn test_reset_recovers_from_invalid_config_file() {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"{"EntraLab.Graph.PageSize": 5000}"#,
        )
        .unwrap();
        assert!(config::load(tmp.path()).is_err());

        let (store, rejected) = load(tmp.path());
        assert_eq!(rejected.len(), 1);

        run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Reset {
                key: "Graph.PageSize".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(config::read_overrides(tmp.path()).unwrap().is_empty());
        let (_, config) = config::load(tmp.path()).unwrap();
        assert_eq!(config.page_size, 100);
    }

    #[tokio::test]
    async fn test_remove_feature_flag_then_reset() {
        let tmp = tempdir().unwrap();
        let (store, rejected) = load(tmp.path());

        run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Remove {
                key: "Features.IdentityGovernance.Enabled".to_string(),
            }),
        )
        .await
        .unwrap();

        let (removed, _) = load(tmp.path());
        assert!(removed
            .setting("EntraLab.Features.IdentityGovernance.Enabled")
            .is_none());

        run_config(
            tmp.path(),
            &removed,
            &[],
            Some(ConfigAction::Reset {
                key: "Features.IdentityGovernance.Enabled".to_string(),
            }),
        )
        .await
        .unwrap();

        let (restored, _) = load(tmp.path());
        assert!(restored
            .get_bool("EntraLab.Features.IdentityGovernance.Enabled")
            .unwrap());
    }

    #[tokio::test]
    async fn test_remove_required_setting_fails() {
        let tmp = tempdir().unwrap();
        let (store, rejected) = load(tmp.path());

        let err = run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Remove {
                key: "Graph.Host".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotDeletable(_))
        ));
        assert!(!tmp.path().join(CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn test_reset_unknown_key_fails() {
        let tmp = tempdir().unwrap();
        let (store, rejected) = load(tmp.path());

        let result = run_config(
            tmp.path(),
            &store,
            &rejected,
            Some(ConfigAction::Reset {
                key: "Nope.Missing".to_string(),
            }),
        )
        .await;

        assert!(result.is_err());
    }
}
