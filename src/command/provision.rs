use anyhow::{Context, Result};

use crate::config::LabConfig;
use crate::graph::{GraphClient, GraphTransport};
use crate::lab::{self, Action};

pub async fn run_provision<T: GraphTransport>(
    client: &GraphClient<T>,
    config: &LabConfig,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let outcomes = lab::provision(client, config, dry_run)
        .await
        .context("Provisioning failed")?;

    if json {
        let output =
            serde_json::to_string_pretty(&outcomes).context("Failed to format outcomes")?;
        println!("{}", output);
        return Ok(());
    }

    if dry_run {
        println!("🔍 Dry run for {}: nothing was written\n", config.project_name);
    } else {
        println!("🚀 Provisioned {}\n", config.project_name);
    }

    for outcome in &outcomes {
        let icon = match outcome.action {
            Action::Created | Action::Updated => "✅",
            Action::Unchanged => "  ",
            Action::Planned => "📝",
        };
        println!(
            "{} [{}] {} {}",
            icon, outcome.feature, outcome.resource, outcome.action
        );
    }

    let changed = outcomes
        .iter()
        .filter(|o| matches!(o.action, Action::Created | Action::Updated | Action::Planned))
        .count();
    println!("\n{} step(s), {} change(s)", outcomes.len(), changed);
    Ok(())
}
