use clap::{Parser, Subcommand};

/// entra-lab - provision an Entra ID lab through Microsoft Graph
#[derive(Parser)]
#[command(name = "entra-lab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config.json and session.json. Defaults to ~/.entra-lab
    #[arg(long, global = true, env = "ENTRA_LAB_CONFIG_DIR")]
    pub config_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save a Graph access token for later commands
    Login {
        /// Bearer token, e.g. from `az account get-access-token --resource-type ms-graph`
        #[arg(long)]
        access_token: String,

        /// Tenant the token was issued for (shown by `status`)
        #[arg(long)]
        tenant_id: Option<String>,
    },
    /// Remove the saved access token
    Logout,
    /// Show current session status
    Status,
    /// Inspect or change lab settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Send a single request through the Graph wrapper and print the result
    Request {
        /// GET, POST, PATCH, PUT or DELETE
        method: String,

        /// Path relative to the Graph version root, e.g. `users` or `/groups`
        uri: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// v1.0 or beta (defaults to EntraLab.Graph.ApiVersion)
        #[arg(long)]
        api_version: Option<String>,

        /// Follow @odata.nextLink and return every page
        #[arg(long)]
        all: bool,

        /// $top for paged requests; 0 leaves paging to the server
        #[arg(long)]
        page_size: Option<i64>,

        /// Return this top-level field instead of `value`
        #[arg(long)]
        expand: Option<String>,

        /// Extra request header as `Name: value`; repeatable
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,

        /// Content-Type for the request body
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Provision the lab for every enabled feature
    Provision {
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the step outcomes as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print every setting with its effective value
    Show,
    /// Persist an override in config.json
    Set {
        /// Setting key, with or without the `EntraLab.` prefix
        key: String,
        value: String,
    },
    /// Drop an override from config.json
    Reset {
        /// Setting key, with or without the `EntraLab.` prefix
        key: String,
    },
    /// Unregister a deletable setting (feature flags) via config.json
    Remove {
        /// Setting key, with or without the `EntraLab.` prefix
        key: String,
    },
}
