//! Typed lab configuration read from the settings store.

use super::defaults::{
    DEFAULT_GRAPH_HOST, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE,
    DEFAULT_PROJECT_NAME, FEATURE_ENTRA_ID, FEATURE_GLOBAL_SECURE_ACCESS,
    FEATURE_IDENTITY_GOVERNANCE, GRAPH_API_VERSION, GRAPH_HOST, GRAPH_MAX_RETRIES,
    GRAPH_PAGE_SIZE, LOG_LEVEL, PROJECT_NAME,
};
use super::store::{ConfigError, SettingsStore};
use crate::graph::ApiVersion;

/// Which parts of the lab get provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub entra_id: bool,
    pub global_secure_access: bool,
    pub identity_governance: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            entra_id: true,
            global_secure_access: true,
            identity_governance: true,
        }
    }
}

/// Effective configuration, built once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    pub project_name: String,
    pub graph_host: String,
    pub api_version: ApiVersion,
    pub page_size: i64,
    pub max_retries: usize,
    pub features: Features,
    pub log_level: String,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            graph_host: DEFAULT_GRAPH_HOST.to_string(),
            api_version: ApiVersion::Preview,
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES as usize,
            features: Features::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LabConfig {
    /// Read the registered settings into a typed configuration.
    ///
    /// Feature flags are deletable; a removed flag reads as disabled.
    pub fn from_store(store: &SettingsStore) -> Result<Self, ConfigError> {
        let api_version = store
            .get_str(GRAPH_API_VERSION)?
            .parse::<ApiVersion>()
            .map_err(|e| ConfigError::InvalidValue {
                key: GRAPH_API_VERSION.to_string(),
                reason: e.to_string(),
            })?;
        let max_retries = usize::try_from(store.get_i64(GRAPH_MAX_RETRIES)?).map_err(|e| {
            ConfigError::InvalidValue {
                key: GRAPH_MAX_RETRIES.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            project_name: store.get_str(PROJECT_NAME)?.to_string(),
            graph_host: store.get_str(GRAPH_HOST)?.to_string(),
            api_version,
            page_size: store.get_i64(GRAPH_PAGE_SIZE)?,
            max_retries,
            features: Features {
                entra_id: flag(store, FEATURE_ENTRA_ID)?,
                global_secure_access: flag(store, FEATURE_GLOBAL_SECURE_ACCESS)?,
                identity_governance: flag(store, FEATURE_IDENTITY_GOVERNANCE)?,
            },
            log_level: store.get_str(LOG_LEVEL)?.to_lowercase(),
        })
    }

    /// Graph base URL for a version, e.g. `https://graph.microsoft.com/v1.0/`
    pub fn graph_base_url(&self, version: ApiVersion) -> String {
        format!("https://{}/{}/", self.graph_host, version.as_str())
    }
}

fn flag(store: &SettingsStore, key: &str) -> Result<bool, ConfigError> {
    match store.get_bool(key) {
        Err(ConfigError::UnknownSetting(_)) => Ok(false),
        other => other,
    }
}
