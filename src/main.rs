use clap::{Parser, Subcommand};
use openvpn_askpass::{Config, PatternTable, Server, SessionHandler, ZenityProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openvpn-askpass")]
#[command(about = "Answer OpenVPN credential requests with desktop dialogs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Unix socket OpenVPN's management interface connects to
    #[arg(short, long, env = "ASKPASS_SOCKET")]
    socket: Option<PathBuf>,

    /// Config file (defaults to ./openvpn-askpass.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default config file
    Init {
        /// Where to write the config
        #[arg(default_value = openvpn_askpass::config::LOCAL_CONFIG_FILE)]
        path: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG takes precedence over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Init { path }) = cli.command {
        Config::default().save(&path)?;
        info!("Created default config: {}", path.display());
        return Ok(());
    }

    let config = Config::discover(cli.config.as_deref())?;
    let socket = cli.socket.unwrap_or(config.socket);

    let provider = ZenityProvider::with_command(config.dialog.command);
    if !provider.is_available() {
        warn!("Dialog program not found on PATH; credential prompts will fail");
    }

    let handler = SessionHandler::new(Arc::new(PatternTable::standard()?), Arc::new(provider))
        .with_prompt(config.dialog.prompt);
    let server = Server::new(&socket, handler);

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            shutdown.notify_one();
        }
    });

    server.run().await?;
    Ok(())
}
