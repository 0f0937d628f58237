//! Entra ID security groups for the lab.

use serde_json::{json, Value};
use tracing::{debug, info};

use super::{eq_filter, Action, StepOutcome};
use crate::graph::{GraphClient, GraphError, GraphTransport, HttpMethod};

const FEATURE: &str = "entra-id";

/// Groups every lab gets, as (display name, description)
pub fn lab_groups(project: &str) -> Vec<(String, String)> {
    vec![
        (
            format!("{}-Users", project),
            format!("{} lab users", project),
        ),
        (
            format!("{}-Admins", project),
            format!("{} lab administrators", project),
        ),
        (
            format!("{}-GSA-Pilot", project),
            format!("{} Global Secure Access pilot users", project),
        ),
    ]
}

/// `mailNickname` is required even for security groups and only allows
/// ASCII letters and digits.
fn mail_nickname(display_name: &str) -> String {
    let nickname: String = display_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if nickname.is_empty() {
        "lab".to_string()
    } else {
        nickname
    }
}

/// Look up a group by exact display name.
pub async fn find_group<T: GraphTransport>(
    client: &GraphClient<T>,
    display_name: &str,
) -> Result<Option<Value>, GraphError> {
    let uri = format!(
        "groups?{}&$select=id,displayName",
        eq_filter("displayName", display_name)
    );
    let request = client
        .build(HttpMethod::Get, uri)
        .operation("find_group");
    let found = client.request(request).await?.into_items();
    debug!("Found {} group(s) named {}", found.len(), display_name);
    Ok(found.into_iter().next())
}

/// Create the group unless one with the same display name exists.
pub async fn ensure_group<T: GraphTransport>(
    client: &GraphClient<T>,
    display_name: &str,
    description: &str,
    dry_run: bool,
) -> Result<StepOutcome, GraphError> {
    if let Some(existing) = find_group(client, display_name).await? {
        return Ok(StepOutcome::new(FEATURE, display_name, Action::Unchanged).with_id(&existing));
    }

    if dry_run {
        info!("Would create group {}", display_name);
        return Ok(StepOutcome::new(FEATURE, display_name, Action::Planned));
    }

    let body = json!({
        "displayName": display_name,
        "description": description,
        "mailEnabled": false,
        "mailNickname": mail_nickname(display_name),
        "securityEnabled": true,
    });
    let request = client
        .build(HttpMethod::Post, "groups")
        .body(body)
        .operation("create_group");
    let created = client.request(request).await?.into_value();

    info!("Created group {}", display_name);
    Ok(StepOutcome::new(FEATURE, display_name, Action::Created).with_id(&created))
}
