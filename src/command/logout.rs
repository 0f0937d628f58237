use anyhow::Result;
use std::path::Path;

use crate::session::AuthSessionStore;

pub async fn run_logout(config_dir: &Path) -> Result<()> {
    let session_store = AuthSessionStore::new(config_dir)?;

    if !session_store.session_path().exists() {
        println!("You are not logged in.");
        return Ok(());
    }

    session_store.remove_session()?;
    println!("✅ Successfully logged out.");

    Ok(())
}
