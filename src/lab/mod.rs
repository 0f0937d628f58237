//! Lab provisioning on top of the Graph request wrapper.
//!
//! Each step is idempotent: it looks the resource up first and only creates
//! or updates what is missing. With `dry_run` nothing is written and the
//! step reports what it would do.

mod governance;
mod groups;
mod network_access;

pub use governance::ensure_catalog;
pub use groups::{ensure_group, lab_groups};
pub use network_access::{enable_forwarding_profile, list_forwarding_profiles};

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};
use url::form_urlencoded;

use crate::config::LabConfig;
use crate::graph::{GraphClient, GraphError, GraphTransport};

/// What a provisioning step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Unchanged,
    /// Dry run: would have been created or updated
    Planned,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Unchanged => "unchanged",
            Action::Planned => "planned",
        };
        f.write_str(s)
    }
}

/// Outcome of one provisioning step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub feature: &'static str,
    pub resource: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl StepOutcome {
    fn new(feature: &'static str, resource: impl Into<String>, action: Action) -> Self {
        Self {
            feature,
            resource: resource.into(),
            action,
            id: None,
        }
    }

    fn with_id(mut self, resource: &Value) -> Self {
        self.id = resource
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        self
    }
}

/// Quote a string for an OData `$filter` literal.
pub(crate) fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `$filter=<field> eq '<value>'` with the expression percent-encoded, so
/// `&`, `#`, `+` and `%` in names survive the query string.
pub(crate) fn eq_filter(field: &str, value: &str) -> String {
    let expression = format!("{} eq {}", field, odata_literal(value));
    let encoded: String = form_urlencoded::byte_serialize(expression.as_bytes()).collect();
    // A literal `+` is already `%2B`; any `+` left is a space
    format!("$filter={}", encoded.replace('+', "%20"))
}

/// Provision every enabled part of the lab.
pub async fn provision<T: GraphTransport>(
    client: &GraphClient<T>,
    config: &LabConfig,
    dry_run: bool,
) -> Result<Vec<StepOutcome>, GraphError> {
    let mut outcomes = Vec::new();

    if config.features.entra_id {
        info!("Provisioning Entra ID groups for {}", config.project_name);
        for (name, description) in lab_groups(&config.project_name) {
            outcomes.push(ensure_group(client, &name, &description, dry_run).await?);
        }
    } else {
        info!("Entra ID provisioning disabled");
    }

    if config.features.global_secure_access {
        info!("Enabling Global Secure Access forwarding profiles");
        match list_forwarding_profiles(client).await {
            Ok(profiles) => {
                for profile in profiles {
                    outcomes.push(enable_forwarding_profile(client, &profile, dry_run).await?);
                }
            }
            Err(e) if e.is_not_found() => {
                warn!("Global Secure Access is not activated for this tenant, skipping");
            }
            Err(e) => return Err(e),
        }
    } else {
        info!("Global Secure Access provisioning disabled");
    }

    if config.features.identity_governance {
        info!("Provisioning Identity Governance catalog");
        let catalog = format!("{} Catalog", config.project_name);
        outcomes.push(ensure_catalog(client, &catalog, dry_run).await?);
    } else {
        info!("Identity Governance provisioning disabled");
    }

    Ok(outcomes)
}
