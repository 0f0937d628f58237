use anyhow::Result;
use std::path::Path;

use crate::session::AuthSessionStore;

pub async fn run_login(
    config_dir: &Path,
    access_token: &str,
    tenant_id: Option<&str>,
) -> Result<()> {
    let session_store = AuthSessionStore::new(config_dir)?;

    if session_store.get_session()?.is_some() {
        println!("⚠️  An existing session will be replaced.");
    }

    session_store.save_session(access_token, tenant_id)?;

    println!("✅ Access token saved to {}", session_store.session_path().display());
    if std::env::var(crate::session::ACCESS_TOKEN_ENV).is_ok() {
        println!(
            "   Note: {} is set and takes precedence over the saved token.",
            crate::session::ACCESS_TOKEN_ENV
        );
    }

    Ok(())
}
