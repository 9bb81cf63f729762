use anyhow::{bail, Context};
use augur::adapters::{ClobVenue, DryRunVenue, GammaCatalog};
use augur::agent::OpenAiOracle;
use augur::cli::{self, Cli, Commands};
use augur::config::{AppConfig, LoggingConfig};
use augur::coordination::CancelToken;
use augur::exchange::ExecutionVenue;
use augur::signing::keys::PRIVATE_KEY_ENV;
use augur::signing::{
    ApiCredentials, EnvKeySource, EphemeralKeySource, HmacAuth, KeySource, OrderSigner,
};
use augur::strategy::Trader;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run { live, thesis } => {
            init_logging(&config.logging);
            run_trade_cycle(config, live, thesis).await?;
        }
        Commands::Markets { limit } => {
            init_logging_simple();
            let catalog = GammaCatalog::new(config.catalog.clone())?;
            cli::show_markets(&catalog, limit).await?;
        }
        Commands::Candidates { thesis } => {
            init_logging_simple();
            let catalog = GammaCatalog::new(config.catalog.clone())?;
            cli::show_candidates(&catalog, config.relevance.clone(), &thesis).await?;
        }
        Commands::Forecast {
            event_title,
            question,
            outcome,
        } => {
            init_logging_simple();
            let oracle = OpenAiOracle::from_env(config.oracle.clone())?;
            cli::ask_forecast(&oracle, &event_title, &question, &outcome).await?;
        }
    }

    Ok(())
}

fn load_config(dir: &str) -> anyhow::Result<AppConfig> {
    let config = match AppConfig::load_from(dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load config from {}: {}. Using built-in defaults.", dir, e);
            AppConfig::default_config(true)
        }
    };

    if let Err(errors) = config.validate() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(config)
}

async fn run_trade_cycle(config: AppConfig, live: bool, thesis: Option<String>) -> anyhow::Result<()> {
    let dry_run = !live || config.dry_run.enabled;
    if live && config.dry_run.enabled {
        warn!("--live given but dry_run.enabled = true; staying in paper mode");
    }

    // Paper mode may sign with a throwaway key; live mode needs the real one.
    let keys: Arc<dyn KeySource> = if !dry_run || std::env::var(PRIVATE_KEY_ENV).is_ok() {
        Arc::new(EnvKeySource::default())
    } else {
        info!("{} not set, signing paper orders with an ephemeral key", PRIVATE_KEY_ENV);
        Arc::new(EphemeralKeySource::generate())
    };
    let signer = OrderSigner::new(keys, config.order.chain_id);
    let address = signer.address().map_err(|e| {
        error!("signing unavailable: {}", e);
        e
    })?;

    let venue: Arc<dyn ExecutionVenue> = if dry_run {
        Arc::new(DryRunVenue::new())
    } else {
        let credentials = ApiCredentials::from_env().context("live trading needs CLOB API credentials")?;
        let auth = HmacAuth::new(credentials, format!("{:?}", address));
        Arc::new(ClobVenue::new(
            &config.catalog.clob_url,
            Duration::from_millis(config.catalog.request_timeout_ms),
            auth,
        )?)
    };

    let catalog = Arc::new(GammaCatalog::new(config.catalog.clone())?);
    let oracle = Arc::new(OpenAiOracle::from_env(config.oracle.clone())?);

    let mut pipeline = config.pipeline();
    if let Some(thesis) = thesis {
        pipeline.relevance.thesis = thesis;
    }

    info!(dry_run, signer = ?address, "augur starting");
    let trader = Trader::new(catalog, oracle, venue, signer, pipeline);

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        on_signal.cancel();
    });

    let outcome = trader.one_best_trade(&cancel).await?;
    cli::print_outcome(&outcome);
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},augur=debug", logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_logging_simple() {
    // Minimal logging for read-only commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
