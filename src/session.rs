//! Session storage for the Graph access token.
//!
//! The token is issued elsewhere (Azure CLI, a device-code flow, a CI
//! secret) and handed to `entra-lab login`. It is kept in
//! `<config-dir>/session.json`; `ENTRA_LAB_ACCESS_TOKEN` takes precedence.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Environment variable holding an access token
pub const ACCESS_TOKEN_ENV: &str = "ENTRA_LAB_ACCESS_TOKEN";

/// Environment variable holding the tenant ID shown by `status`
pub const TENANT_ID_ENV: &str = "ENTRA_LAB_TENANT_ID";

const SESSION_FILE: &str = "session.json";

/// Session data stored in session.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Where the active session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Environment,
    File,
}

/// Session store
pub struct AuthSessionStore {
    session_path: PathBuf,
}

impl AuthSessionStore {
    /// Create a session store in `config_dir`, creating the directory.
    pub fn new(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;

        Ok(Self {
            session_path: config_dir.join(SESSION_FILE),
        })
    }

    pub fn session_path(&self) -> &PathBuf {
        &self.session_path
    }

    fn parse_session_from_string(&self, raw: &str) -> Option<SessionData> {
        match serde_json::from_str::<SessionData>(raw) {
            Ok(session) if session.access_token.trim().is_empty() => {
                warn!("Session validation failed: access token is empty");
                None
            }
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Failed to parse session JSON: {}", e);
                None
            }
        }
    }

    /// Get the current session and where it came from.
    ///
    /// Priority:
    /// 1. ENTRA_LAB_ACCESS_TOKEN (+ ENTRA_LAB_TENANT_ID) environment variables
    /// 2. session.json
    pub fn get_session_with_source(&self) -> Result<Option<(SessionData, SessionSource)>> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                return Ok(Some((
                    SessionData {
                        access_token: token,
                        tenant_id: std::env::var(TENANT_ID_ENV).ok(),
                        saved_at: None,
                    },
                    SessionSource::Environment,
                )));
            }
        }

        if !self.session_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.session_path)
            .with_context(|| format!("Failed to read session file: {:?}", self.session_path))?;

        if let Some(session) = self.parse_session_from_string(&content) {
            return Ok(Some((session, SessionSource::File)));
        }

        warn!("Invalid session data found, removing session file");
        if let Err(e) = self.remove_session() {
            error!("Failed to remove invalid session file: {}", e);
        }
        Ok(None)
    }

    pub fn get_session(&self) -> Result<Option<SessionData>> {
        Ok(self.get_session_with_source()?.map(|(session, _)| session))
    }

    /// Save a new session
    pub fn save_session(&self, access_token: &str, tenant_id: Option<&str>) -> Result<()> {
        if access_token.trim().is_empty() {
            anyhow::bail!("Access token must not be empty");
        }

        let session = SessionData {
            access_token: access_token.trim().to_string(),
            tenant_id: tenant_id.map(str::to_string),
            saved_at: Some(Utc::now()),
        };

        let content =
            serde_json::to_string_pretty(&session).context("Failed to serialize session data")?;

        write_private(&self.session_path, content.as_bytes())
            .with_context(|| format!("Failed to write session file: {:?}", self.session_path))?;

        info!("Session saved successfully");
        debug!("Session saved to {:?}", self.session_path);

        Ok(())
    }

    /// Remove the saved session
    pub fn remove_session(&self) -> Result<()> {
        if self.session_path.exists() {
            std::fs::remove_file(&self.session_path).with_context(|| {
                format!("Failed to remove session file: {:?}", self.session_path)
            })?;
        }

        info!("Session removed successfully");

        Ok(())
    }
}

/// Write `content` readable by the owner only (0600 on unix).
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // mode() only applies on create; tighten files left by older versions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content)?;
    file.flush()
}
