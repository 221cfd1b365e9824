use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wardgate",
    version,
    about = "Fail-closed boundary guard for URL-sourced uploads and key-file serving"
)]
pub struct Cli {
    /// Path to config.toml (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve,
    /// Validate a URL against the SSRF guard and exit
    CheckUrl { url: String },
    /// Validate a file name against the path guard and exit
    CheckFile { name: String },
    /// Create a user and print a session token
    AddUser { email: String },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_with_config_override() {
        let cli = Cli::parse_from(["wardgate", "serve", "--config", "/tmp/wg.toml"]);
        assert!(matches!(cli.command, Command::Serve));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/wg.toml")));
    }

    #[test]
    fn parses_check_url() {
        let cli = Cli::parse_from(["wardgate", "check-url", "https://example.com/a.png"]);
        match cli.command {
            Command::CheckUrl { url } => assert_eq!(url, "https://example.com/a.png"),
            _ => panic!("expected check-url"),
        }
    }
}
