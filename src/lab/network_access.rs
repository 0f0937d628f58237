//! Global Secure Access forwarding profiles.
//!
//! Forwarding profiles exist in every tenant once Global Secure Access is
//! activated; provisioning only switches them on. The API is beta-only.

use serde_json::{json, Value};
use tracing::info;

use super::{Action, StepOutcome};
use crate::graph::{ApiVersion, GraphClient, GraphError, GraphTransport, HttpMethod};

const FEATURE: &str = "global-secure-access";

const PROFILES: &str = "networkAccess/forwardingProfiles";

fn profile_name(profile: &Value) -> String {
    profile
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| profile.get("id").and_then(Value::as_str))
        .unwrap_or("<unnamed>")
        .to_string()
}

/// List every forwarding profile in the tenant.
pub async fn list_forwarding_profiles<T: GraphTransport>(
    client: &GraphClient<T>,
) -> Result<Vec<Value>, GraphError> {
    let request = client
        .build(HttpMethod::Get, PROFILES)
        .api_version(ApiVersion::Preview)
        .fetch_all(true)
        .operation("list_forwarding_profiles");
    Ok(client.request(request).await?.into_items())
}

/// Set a forwarding profile's state to `enabled` unless it already is.
pub async fn enable_forwarding_profile<T: GraphTransport>(
    client: &GraphClient<T>,
    profile: &Value,
    dry_run: bool,
) -> Result<StepOutcome, GraphError> {
    let name = profile_name(profile);
    let outcome = |action| StepOutcome::new(FEATURE, name.clone(), action).with_id(profile);

    let state = profile.get("state").and_then(Value::as_str);
    if state.is_some_and(|s| s.eq_ignore_ascii_case("enabled")) {
        return Ok(outcome(Action::Unchanged));
    }

    let Some(id) = profile.get("id").and_then(Value::as_str) else {
        return Err(GraphError::UnexpectedResponse(format!(
            "forwarding profile {} has no id",
            name
        )));
    };

    if dry_run {
        info!("Would enable forwarding profile {}", name);
        return Ok(outcome(Action::Planned));
    }

    let request = client
        .build(HttpMethod::Patch, format!("{}/{}", PROFILES, id))
        .api_version(ApiVersion::Preview)
        .body(json!({ "state": "enabled" }))
        .operation("enable_forwarding_profile");
    client.request(request).await?;

    info!("Enabled forwarding profile {}", name);
    Ok(outcome(Action::Updated))
}
