use {
    clap::Parser,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    hookbridge_config::{RelayConfig, WEBHOOK_URL_VAR},
    hookbridge_gateway::server::{AppState, run_gateway},
};

#[derive(Parser)]
#[command(name = "hookbridge", about = "hookbridge — Discord webhook relay", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to.
    #[arg(long, default_value = "127.0.0.1", env = "HOOKBRIDGE_BIND")]
    bind: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8787, env = "HOOKBRIDGE_PORT")]
    port: u16,

    /// Destination webhook URL (overrides DISCORD_WEBHOOK_URL).
    #[arg(long)]
    webhook_url: Option<String>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
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

    let mut config = RelayConfig::from_env()?;
    if cli.webhook_url.is_some() {
        config.webhook_url = cli.webhook_url.clone();
    }
    if config.webhook_url.is_none() {
        warn!("no webhook URL configured; POST requests will fail until {WEBHOOK_URL_VAR} is set");
    }

    info!("starting hookbridge v{}", env!("CARGO_PKG_VERSION"));
    run_gateway(&cli.bind, cli.port, AppState::new(config)).await
}
