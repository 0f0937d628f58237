use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;
mod config;
mod graph;
mod lab;
mod session;

use cli::{Cli, Commands};
use command::RequestArgs;
use config::LabConfig;
use graph::{GraphClient, ReqwestTransport, RetryPolicy};
use session::{AuthSessionStore, ACCESS_TOKEN_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli::resolve_config_dir(cli.config_dir)?;

    // `config` must work on a broken config.json so it can repair it
    if let Some(Commands::Config { action }) = cli.command {
        let (store, rejected) = config::load_lenient(&config_dir, |name| std::env::var(name).ok())?;
        let level = store
            .get_str(config::LOG_LEVEL)
            .unwrap_or(config::DEFAULT_LOG_LEVEL);
        init_logging(cli.verbose, level);
        return command::run_config(&config_dir, &store, &rejected, action).await;
    }

    let (_, config) = config::load(&config_dir)?;
    init_logging(cli.verbose, &config.log_level);

    tracing::debug!("Using config directory {:?}", config_dir);

    match cli.command {
        Some(Commands::Login {
            access_token,
            tenant_id,
        }) => {
            command::run_login(&config_dir, &access_token, tenant_id.as_deref()).await?;
        }
        Some(Commands::Logout) => {
            command::run_logout(&config_dir).await?;
        }
        Some(Commands::Status) => {
            command::run_status(&config_dir, &config).await?;
        }
        Some(Commands::Config { .. }) => unreachable!("handled before the strict load"),
        Some(Commands::Request {
            method,
            uri,
            body,
            api_version,
            all,
            page_size,
            expand,
            headers,
            content_type,
        }) => {
            let client = graph_client(&config_dir, &config)?;
            let args = RequestArgs {
                method,
                uri,
                body,
                api_version,
                all,
                page_size,
                expand,
                headers,
                content_type,
            };
            command::run_request(&client, args).await?;
        }
        Some(Commands::Provision { dry_run, json }) => {
            let client = graph_client(&config_dir, &config)?;
            command::run_provision(&client, &config, dry_run, json).await?;
        }
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'entra-lab login --access-token <TOKEN>' to get started.");
        }
    }

    Ok(())
}

/// RUST_LOG wins, then --verbose, then EntraLab.Logging.Level
fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build a Graph client from the active session.
fn graph_client(config_dir: &Path, config: &LabConfig) -> Result<GraphClient<ReqwestTransport>> {
    let session_store = AuthSessionStore::new(config_dir)?;
    let session = session_store.get_session()?.with_context(|| {
        format!(
            "No access token. Run 'entra-lab login --access-token <TOKEN>' or set {}",
            ACCESS_TOKEN_ENV
        )
    })?;

    let transport = ReqwestTransport::new(session.access_token)
        .context("Failed to create HTTP client")?
        .with_retry_policy(RetryPolicy {
            max_retries: config.max_retries,
            ..RetryPolicy::default()
        });
    Ok(GraphClient::new(transport, config))
}
