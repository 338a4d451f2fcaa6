use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use market_config::{ConfigLoader, MarketConfig};
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod service;

#[derive(Parser)]
#[command(name = "skill-market")]
#[command(about = "C2C marketplace for AI skills, prompts and agents", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/market.toml")]
	config: PathBuf,

	#[arg(long, env = "MARKET_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the marketplace service
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	match cli.command {
		Some(Commands::Start) | None => start_service(cli).await,
		Some(Commands::Validate) => validate_config(cli).await,
	}
}

async fn start_service(cli: Cli) -> Result<()> {
	info!("Starting skill-market service");

	let config = load_config(&cli)?;
	info!("Service name: {}", config.market.name);
	info!("HTTP port: {}", config.market.http_port);
	info!("Storage backend: {}", config.storage.backend);

	let state = service::build_state(&config).context("Failed to build service components")?;

	api::start_http_server(state, config.market.http_port)
		.await
		.context("HTTP server failed")?;

	info!("skill-market service stopped");
	Ok(())
}

fn load_config(cli: &Cli) -> Result<MarketConfig> {
	if cli.config.exists() {
		info!("Loading configuration from: {:?}", cli.config);
		ConfigLoader::from_env_and_file(Some(&cli.config)).context("Failed to load configuration")
	} else {
		info!(
			"No config file at {:?}; using defaults with environment overrides",
			cli.config
		);
		ConfigLoader::from_env_and_file(None).context("Failed to load configuration")
	}
}

async fn validate_config(cli: Cli) -> Result<()> {
	info!("Validating configuration file: {:?}", cli.config);

	let config = ConfigLoader::from_env_and_file(Some(&cli.config))
		.context("Failed to load configuration")?;

	info!("Configuration is valid");
	info!("Service name: {}", config.market.name);
	info!("Storage backend: {}", config.storage.backend);
	info!("Verification networks:");
	for network in config.verification.evm.keys() {
		info!("  EVM explorer: {}", network);
	}
	info!("  Solana RPC: {}", config.verification.solana_rpc_url);
	info!("  Bitcoin explorer: {}", config.verification.bitcoin_api_url);

	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

pub(crate) async fn shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
