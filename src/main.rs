use agentchat::{app, commands, config::Config};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agentchat")]
#[command(version)]
#[command(about = "Chat with a hosted agent from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.agentchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Agent service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Agent to talk to
    #[arg(long, global = true)]
    agent_id: Option<String>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Show the configured agent
    Agent,
    /// Send a single message and print the reply
    Send {
        /// Continue an existing conversation instead of starting one
        #[arg(long)]
        conversation: Option<String>,

        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },
}

/// Filter used when `RUST_LOG` is unset. Headless commands stay quiet on stderr.
fn default_filter(debug: bool, interactive: bool) -> &'static str {
    if debug {
        "debug"
    } else if interactive {
        "info,agentchat=debug"
    } else {
        "warn"
    }
}

/// The TUI owns the terminal, so interactive sessions log to a file
fn init_logging(config: &Config, debug: bool, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug, interactive)));

    if interactive {
        fs::create_dir_all(&config.home).context("Failed to create .agentchat directory")?;
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_path())
            .context("Failed to open log file")?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(log_file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(cli.api_url, cli.agent_id);

    let interactive = matches!(cli.command, None | Some(Commands::Chat));
    init_logging(&config, cli.debug, interactive)?;

    match cli.command {
        None | Some(Commands::Chat) => app::run(&config).await,
        Some(Commands::Agent) => commands::show_agent(&config).await,
        Some(Commands::Send { conversation, text }) => {
            commands::send_message(&config, &text.join(" "), conversation).await
        }
    }
}
