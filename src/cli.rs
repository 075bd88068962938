//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::scrape::Scraper;
use crate::server;

#[derive(Debug, Parser)]
#[command(
    name = "parceltrack",
    about = "Shipment tracking acquisition via stealth browser automation",
    version
)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "PARCELTRACK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP query surface.
    Serve {
        /// Bind address (overrides configuration).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides configuration).
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Scrape a single tracking number and print the result as JSON.
    Track {
        /// Tracking number to look up.
        num: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Arc::new(Settings::load(cli.config.as_deref())?);

    match cli.command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            server::serve(settings, &host, port).await
        }
        Command::Track { num } => {
            let scraper = Scraper::new(settings);
            let report = scraper.track(&num).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_overrides() {
        let cli = Cli::parse_from(["parceltrack", "serve", "--host", "127.0.0.1", "--port", "9999"]);
        match cli.command {
            Command::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9999));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn track_takes_a_positional_number() {
        let cli = Cli::parse_from(["parceltrack", "track", "ABC123"]);
        match cli.command {
            Command::Track { num } => assert_eq!(num, "ABC123"),
            other => panic!("expected track, got {other:?}"),
        }
    }
}
