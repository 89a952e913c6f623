//! Propagator server binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use propagator_core::config::{AppConfig, LogFormat};
use propagator_core::{Identity, identity};
use propagator_server::{AppState, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Propagator - keeps directory fingerprints current
#[derive(Parser, Debug)]
#[command(name = "propagatord")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PROPAGATOR_CONFIG",
        default_value = "config/server.toml",
        global = true
    )]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a signed access token
    Token {
        /// Username the token identifies
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        /// Lifetime in seconds; omit for a token that never expires
        #[arg(long)]
        ttl_secs: Option<i64>,
    },
}

/// Load configuration (file is optional, env vars can provide/override everything).
///
/// Returns whether a config file was read alongside the config.
fn load_config(path: &str) -> Result<(AppConfig, bool)> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();

    let has_config_file = config_path.exists();
    if has_config_file {
        figment = figment.merge(Toml::file(path));
    }

    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with("PROPAGATOR_") && key != "PROPAGATOR_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: propagatord --config /path/to/config.toml\n  \
             2. Environment variables: PROPAGATOR_AUTH__SHARED_SECRET=... propagatord\n\n\
             See config/server.example.toml for example configuration."
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("PROPAGATOR_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok((config, has_config_file))
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log format lives in the config file.
    let (config, has_config_file) = load_config(&args.config)?;
    init_tracing(config.server.log_format);

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loaded configuration from file");
    } else {
        tracing::info!("Using environment variables for configuration");
    }

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Token {
            username,
            email,
            display_name,
            ttl_secs,
        } => {
            let mut who = Identity::new(username);
            who.email = email.unwrap_or_default();
            who.display_name = display_name.unwrap_or_default();
            let ttl = ttl_secs.map(time::Duration::seconds);
            let token = identity::issue(&who, &config.auth.shared_secret, ttl)
                .context("failed to issue token")?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("Propagator v{}", env!("CARGO_PKG_VERSION"));

    let metadata = propagator_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!(
        records = metadata.count_records().await.unwrap_or_default(),
        "Metadata store initialized"
    );

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, metadata).context("failed to build application state")?;
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_reports_file_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("server.toml");
        std::fs::write(
            &path,
            "[auth]\nshared_secret = \"from-file\"\n\n[layout]\nhome_depth = 3\n",
        )
        .unwrap();

        let (config, has_config_file) = load_config(path.to_str().unwrap()).unwrap();
        assert!(has_config_file);
        assert_eq!(config.layout.home_depth, 3);
        assert_eq!(config.server.log_format, LogFormat::Text);
    }
}
