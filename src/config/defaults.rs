//! Built-in settings registered at startup.

use super::store::{ConfigError, Setting, SettingsStore, Validation};

/// Module namespace for every built-in setting
pub const MODULE: &str = "EntraLab";

pub const PROJECT_NAME: &str = "EntraLab.Project.Name";
pub const GRAPH_HOST: &str = "EntraLab.Graph.Host";
pub const GRAPH_API_VERSION: &str = "EntraLab.Graph.ApiVersion";
pub const GRAPH_PAGE_SIZE: &str = "EntraLab.Graph.PageSize";
pub const GRAPH_MAX_RETRIES: &str = "EntraLab.Graph.MaxRetries";
pub const FEATURE_ENTRA_ID: &str = "EntraLab.Features.EntraId.Enabled";
pub const FEATURE_GLOBAL_SECURE_ACCESS: &str = "EntraLab.Features.GlobalSecureAccess.Enabled";
pub const FEATURE_IDENTITY_GOVERNANCE: &str = "EntraLab.Features.IdentityGovernance.Enabled";
pub const LOG_LEVEL: &str = "EntraLab.Logging.Level";

pub const DEFAULT_PROJECT_NAME: &str = "EntraLab";
pub const DEFAULT_GRAPH_HOST: &str = "graph.microsoft.com";
pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Graph rejects `$top` above 999 on most collections
const MAX_PAGE_SIZE: i64 = 999;

const MAX_RETRIES: i64 = 10;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn known_settings() -> Vec<Setting> {
    vec![
        Setting::new(MODULE, "Project.Name", DEFAULT_PROJECT_NAME)
            .validation(Validation::NonEmpty)
            .description("Name of the lab project, used as a prefix for provisioned resources"),
        Setting::new(MODULE, "Graph.Host", DEFAULT_GRAPH_HOST)
            .validation(Validation::NonEmpty)
            .description("Host name of the Microsoft Graph endpoint"),
        Setting::new(MODULE, "Graph.ApiVersion", "beta")
            .validation(Validation::one_of(&["v1.0", "beta"]))
            .description("Default Graph API version for relative request paths"),
        Setting::new(MODULE, "Graph.PageSize", DEFAULT_PAGE_SIZE)
            .validation(Validation::Range {
                min: 0,
                max: MAX_PAGE_SIZE,
            })
            .description("Page size ($top) for paged requests; 0 leaves it to the server"),
        Setting::new(MODULE, "Graph.MaxRetries", DEFAULT_MAX_RETRIES)
            .validation(Validation::Range {
                min: 0,
                max: MAX_RETRIES,
            })
            .description("Retries for throttled or unavailable Graph calls; 0 disables retrying"),
        Setting::new(MODULE, "Features.EntraId.Enabled", true)
            .description("Provision Entra ID lab resources (groups)")
            .deletable(true),
        Setting::new(MODULE, "Features.GlobalSecureAccess.Enabled", true)
            .description("Provision Global Secure Access lab resources (forwarding profiles)")
            .deletable(true),
        Setting::new(MODULE, "Features.IdentityGovernance.Enabled", true)
            .description("Provision Identity Governance lab resources (access package catalogs)")
            .deletable(true),
        Setting::new(MODULE, "Logging.Level", DEFAULT_LOG_LEVEL)
            .validation(Validation::one_of(LOG_LEVELS))
            .description("Default log level when --verbose and RUST_LOG are not set"),
    ]
}

/// Register every built-in setting with its default.
///
/// Safe to call more than once: settings already present keep their value.
pub fn register_defaults(store: &mut SettingsStore) -> Result<(), ConfigError> {
    for setting in known_settings() {
        store.initialize(setting)?;
    }
    Ok(())
}
