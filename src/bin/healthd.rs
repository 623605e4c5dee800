use std::sync::Arc;

use clap::Parser;
use health_monitoring::{
    ProbeSource, Registry,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, read_config_file},
    util::apply_env_overrides,
};
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("health_monitoring", LevelFilter::DEBUG),
        ("healthd", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config.api);

    let registry = Arc::new(Registry::new());
    admit_configured_probes(&registry, &config).await;

    let addr = spawn_api_server(ApiConfig::from(&config.api), ApiState::new(registry.clone())).await?;
    info!("control API available on {addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    registry.shutdown().await;

    Ok(())
}

async fn admit_configured_probes(registry: &Registry, config: &Config) {
    for probe in config.probes() {
        let name = probe.name().to_string();
        if probe.one_off() {
            warn!("ignoring one-off probe {name} from the configuration file");
            continue;
        }
        if let Err(e) = registry.add_check(probe, ProbeSource::Configuration).await {
            error!("{e}");
        }
    }
}
