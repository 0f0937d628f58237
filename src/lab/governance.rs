//! Identity Governance: the lab's entitlement-management catalog.

use serde_json::{json, Value};
use tracing::info;

use super::{eq_filter, Action, StepOutcome};
use crate::graph::{GraphClient, GraphError, GraphTransport, HttpMethod};

const FEATURE: &str = "identity-governance";

const CATALOGS: &str = "identityGovernance/entitlementManagement/catalogs";

/// Create the catalog unless one with the same display name exists.
pub async fn ensure_catalog<T: GraphTransport>(
    client: &GraphClient<T>,
    display_name: &str,
    dry_run: bool,
) -> Result<StepOutcome, GraphError> {
    let lookup = client
        .build(
            HttpMethod::Get,
            format!("{}?{}", CATALOGS, eq_filter("displayName", display_name)),
        )
        .operation("find_catalog");
    let existing: Option<Value> = client.request(lookup).await?.into_items().into_iter().next();

    if let Some(catalog) = existing {
        return Ok(StepOutcome::new(FEATURE, display_name, Action::Unchanged).with_id(&catalog));
    }

    if dry_run {
        info!("Would create catalog {}", display_name);
        return Ok(StepOutcome::new(FEATURE, display_name, Action::Planned));
    }

    let create = client
        .build(HttpMethod::Post, CATALOGS)
        .body(json!({
            "displayName": display_name,
            "description": format!("Access packages for {}", display_name),
            "isExternallyVisible": false,
        }))
        .operation("create_catalog");
    let created = client.request(create).await?.into_value();

    info!("Created catalog {}", display_name);
    Ok(StepOutcome::new(FEATURE, display_name, Action::Created).with_id(&created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockTransport;

    #[tokio::test]
    async fn test_creates_missing_catalog() {
        let client = GraphClient::with_host(
            MockTransport::with_responses(vec![
                Ok(json!({"value": []})),
                Ok(json!({"id": "cat-9", "displayName": "Lab Catalog"})),
            ]),
            "graph.microsoft.com",
        );

        let outcome = ensure_catalog(&client, "Lab Catalog", false).await.unwrap();

        assert_eq!(outcome.action, Action::Created);
        assert_eq!(outcome.id.as_deref(), Some("cat-9"));

        let calls = client.transport().calls();
        assert_eq!(
            calls[0].uri,
            "https://graph.microsoft.com/beta/identityGovernance/entitlementManagement/catalogs?$filter=displayName%20eq%20%27Lab%20Catalog%27"
        );
        assert_eq!(calls[1].method, HttpMethod::Post);
        assert_eq!(calls[1].body.as_ref().unwrap()["isExternallyVisible"], json!(false));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_create() {
        let client = GraphClient::with_host(
            MockTransport::with_responses(vec![Ok(json!({"value": []}))]),
            "graph.microsoft.com",
        );

        let outcome = ensure_catalog(&client, "Lab Catalog", true).await.unwrap();

        assert_eq!(outcome.action, Action::Planned);
        assert!(outcome.id.is_none());
        assert_eq!(client.transport().calls().len(), 1);
    }
}
