#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use wardgate::cli::{Cli, Command};
use wardgate::config::Config;
use wardgate::security::{UrlSafetyGuard, path_guard};
use wardgate::store::UserStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    // This prevents the error: "could not automatically determine the process-level CryptoProvider"
    // when both aws-lc-rs and ring features are available (or neither is explicitly selected).
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => wardgate::gateway::run_gateway(config).await,
        Command::CheckUrl { url } => check_url(&config, &url).await,
        Command::CheckFile { name } => check_file(&config, &name),
        Command::AddUser { email } => add_user(&config, &email).await,
        Command::Init { force } => init_config(cli.config.as_deref(), force),
    }
}

async fn check_url(config: &Config, candidate: &str) -> Result<()> {
    let guard = UrlSafetyGuard::new(Duration::from_secs(config.upload.dns_timeout_secs));
    match guard.validate(candidate).await {
        Ok(url) => {
            println!("allow: {url}");
            Ok(())
        }
        Err(reason) => anyhow::bail!("deny ({}): {reason}", reason.kind()),
    }
}

fn check_file(config: &Config, name: &str) -> Result<()> {
    let base = config.storage.key_files_dir();
    match path_guard::resolve(name, &base) {
        Ok(resolved) => {
            println!("allow: {}", resolved.display());
            Ok(())
        }
        Err(reason) => anyhow::bail!("deny ({}): {reason}", reason.kind()),
    }
}

async fn add_user(config: &Config, email: &str) -> Result<()> {
    let store = UserStore::open(&config.storage.database_path()).await?;
    let user = store.create_user(email).await?;
    let token = store.issue_session(user.id).await?;
    println!("user {} created (id {})", user.email, user.id);
    println!("session token: {token}");
    Ok(())
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let target = path.map_or_else(Config::default_path, Path::to_path_buf);
    if target.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", target.display());
    }
    Config::write_default(&target)?;
    println!("wrote {}", target.display());
    Ok(())
}
