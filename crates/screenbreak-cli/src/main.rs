use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "screenbreak", version, about = "ScreenBreak intervention client")]
struct Cli {
    /// Usage-tracking service URL (overrides server.base_url for this run)
    #[arg(long, global = true)]
    server_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for interventions and show them until interrupted
    Watch {
        /// Do not refresh dashboard statistics alongside
        #[arg(long)]
        no_dashboard: bool,
    },
    /// Ask the server once whether an intervention is required
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Today's usage statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Usage limits kept by the server
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Relay Screenpipe OCR frames to the service until interrupted
    Forward {
        /// Screenpipe URL (overrides forwarder.screenpipe_url for this run)
        #[arg(long)]
        screenpipe_url: Option<String>,
        /// Forward a single frame and print the service's reply
        #[arg(long)]
        once: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("screenbreak=info,screenbreak_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let server_url = cli.server_url.as_deref();
    let result = match cli.command {
        Commands::Watch { no_dashboard } => commands::watch::run(server_url, no_dashboard).await,
        Commands::Check { json } => commands::check::run(server_url, json).await,
        Commands::Stats { json } => commands::stats::run(server_url, json).await,
        Commands::Settings { action } => commands::settings::run(server_url, action).await,
        Commands::Forward { screenpipe_url, once } => {
            commands::forward::run(server_url, screenpipe_url.as_deref(), once).await
        }
        Commands::Config { action } => commands::config::run(server_url, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
