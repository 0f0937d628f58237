use anyhow::Result;
use std::path::Path;

use crate::config::LabConfig;
use crate::session::{AuthSessionStore, SessionSource, ACCESS_TOKEN_ENV};

pub async fn run_status(config_dir: &Path, config: &LabConfig) -> Result<()> {
    let session_store = AuthSessionStore::new(config_dir)?;

    match session_store.get_session_with_source()? {
        Some((session, source)) => {
            println!("✅ Access token available");
            match source {
                SessionSource::Environment => println!("   Source: {}", ACCESS_TOKEN_ENV),
                SessionSource::File => {
                    println!("   Source: {}", session_store.session_path().display())
                }
            }
            if let Some(tenant_id) = &session.tenant_id {
                println!("   Tenant: {}", tenant_id);
            }
            if let Some(saved_at) = session.saved_at {
                println!("   Saved at: {}", saved_at.to_rfc3339());
            }
        }
        None => {
            println!("❌ No access token");
            println!("   Run 'entra-lab login --access-token <TOKEN>' or set {}.", ACCESS_TOKEN_ENV);
        }
    }

    println!("   Project: {}", config.project_name);
    println!(
        "   Graph endpoint: {}",
        config.graph_base_url(config.api_version)
    );

    Ok(())
}
