#![deny(unsafe_code)]

//! glowd CLI — run the daemon, or send a running daemon a command.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use glowd_core::IpcClient;

/// glowd — an Adalight LED strip daemon.
#[derive(Parser)]
#[command(name = "glowd", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "glowd.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the glowd daemon in the foreground.
    Start,

    /// Send a command to the running daemon and print its reply.
    ///
    /// The words are joined into one command line, e.g.
    /// `glowd send fill 255,0,0` or `glowd send status`.
    Send {
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up tracing subscriber with verbosity level
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Start => {
            cmd_start(&cli.config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send { words } => cmd_send(&cli.config, words).await,
        Commands::Config { show } => {
            cmd_config(&cli.config, show).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_start(config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;
    info!("Starting glowd daemon");

    let daemon = glowd_core::Daemon::new(config)?;
    daemon.run().await?;

    Ok(())
}

/// Exit 0 with the reply on stdout; 2 when the daemon is unreachable
/// within the connect timeout; 3 on any other error.
async fn cmd_send(config_path: &Path, words: Vec<String>) -> Result<ExitCode> {
    let config = load_config(config_path).await?;
    let command = words.join(" ");

    let client = IpcClient::new(&config.daemon.socket_path)
        .with_connect_timeout(config.daemon.connect_timeout());

    match client.send_command(&command).await {
        Ok(reply) => {
            println!("{reply}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if err.is_unreachable() {
                Ok(ExitCode::from(2))
            } else {
                Ok(ExitCode::from(3))
            }
        }
    }
}

async fn cmd_config(config_path: &Path, show: bool) -> Result<()> {
    let config = load_config(config_path).await?;
    if show {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<glowd_config::AppConfig> {
    if path.exists() {
        glowd_config::AppConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(glowd_config::AppConfig::default())
    }
}
