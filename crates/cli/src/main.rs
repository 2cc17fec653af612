mod client_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "warden", about = "Warden: remote host control over Discord", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: warden.{toml,yaml,yml,json} in the working
    /// directory, then ~/.config/warden).
    #[arg(long, global = true, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve commands (default).
    Start,
    /// Check once whether the client is online.
    Probe,
    /// Send a Wake-on-LAN packet to the client.
    Wake,
    /// Load and validate the configuration.
    CheckConfig,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = warden_config::discover_and_load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => {
            info!(version = env!("CARGO_PKG_VERSION"), "warden starting");
            let problems = client_commands::problems(&config);
            if !problems.is_empty() {
                anyhow::bail!("invalid configuration: {}", problems.join("; "));
            }
            warden_discord::run_bot(&config).await
        },
        Commands::Probe => client_commands::probe(&config).await,
        Commands::Wake => client_commands::wake(&config).await,
        Commands::CheckConfig => client_commands::check_config(&config),
    }
}
