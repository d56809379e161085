use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use murmur::api::{ApiClient, Credentials};
use murmur::config::Config;
use murmur::feed::{FeedController, FeedEvent};
use murmur::ui::{self, UiState};

/// Get the config directory path (~/.config/murmur/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("murmur");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "murmur", about = "Terminal client for a topics feed server")]
struct Args {
    /// Browse a single user's topics instead of the global feed
    #[arg(long, value_name = "USERNAME")]
    profile: Option<String>,

    /// Server base URL (overrides config file)
    #[arg(long, value_name = "URL")]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = get_config_dir()?.join("config.toml");
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(server) = args.server {
        config.server_url = server;
        config
            .validate_server_url()
            .context("Invalid --server URL")?;
    }

    // MURMUR_PASSWORD takes precedence over the config file so the password
    // does not have to live on disk.
    let password = std::env::var("MURMUR_PASSWORD")
        .ok()
        .or_else(|| config.password.clone());

    let credentials = match (&config.username, password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.into(),
        }),
        (Some(_), None) => {
            eprintln!(
                "Warning: username configured without a password; browsing anonymously.\n\
                 Set MURMUR_PASSWORD or add `password` to {}.",
                config_path.display()
            );
            None
        }
        _ => None,
    };
    let authenticated = credentials.is_some();

    let api = ApiClient::new(&config.server_url, credentials)
        .context("Failed to build HTTP client")?;

    // Resolve the logged-in account up front so posting and deleting can be
    // gated on ownership. A bad password should fail here, not mid-session.
    let current_user = if authenticated {
        let user = api
            .login()
            .await
            .context("Login failed: check username and password")?;
        tracing::info!(username = %user.username, "Logged in");
        Some(user)
    } else {
        None
    };

    // Verify the profile exists before entering the TUI
    if let Some(username) = &args.profile {
        api.get_user(username)
            .await
            .with_context(|| format!("No such user: {}", username))?;
    }

    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(32);

    let mut controller = FeedController::new(
        api,
        args.profile,
        config.page_size,
        Duration::from_secs(config.poll_interval_secs),
        event_tx,
    );
    let mut ui = UiState::new(current_user);

    ui::run(&mut controller, &mut ui, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
