//! Main application entry point for the connection gateway.
//!
//! Provides CLI handling, configuration loading, logging setup, and
//! startup/shutdown orchestration of the gateway and the command relay.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gateway_server::auth::StaticTokenValidator;
use gateway_server::bus::{InProcessBus, MessageBus};
use gateway_server::{CommandRelay, Gateway, SessionRegistry};

mod cli;
mod config;
mod signals;

use cli::CliArgs;
use config::{AppConfig, LoggingSettings};

// ============================================================================
// Logging Setup
// ============================================================================

/// Initialize the logging system.
fn setup_logging(
    settings: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || settings.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }

    Ok(())
}

// ============================================================================
// Application
// ============================================================================

/// The assembled gateway process: configuration, gateway, relay, and the
/// registry both of them share.
pub struct Application {
    config: AppConfig,
    registry: Arc<SessionRegistry>,
    gateway: Arc<Gateway>,
    relay: CommandRelay,
}

impl Application {
    /// Load configuration, apply CLI overrides, and wire the components.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }

        setup_logging(&config.logging, args.json_logs)?;

        info!("Fleetgate v{}", env!("CARGO_PKG_VERSION"));
        info!("Config: {}", args.config_path.display());

        if config.auth.tokens.is_empty() {
            warn!("no server tokens configured; every login will be rejected");
        }

        let registry = Arc::new(SessionRegistry::new());
        let validator = Arc::new(StaticTokenValidator::new(config.auth.tokens.clone()));
        let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::new());

        let gateway_config = config.to_gateway_config()?;
        let max_frame_bytes = gateway_config.max_frame_bytes;
        let gateway = Arc::new(Gateway::new(
            gateway_config,
            registry.clone(),
            validator,
            bus.clone(),
        ));
        let relay = CommandRelay::new(registry.clone(), bus, max_frame_bytes);

        Ok(Self {
            config,
            registry,
            gateway,
            relay,
        })
    }

    /// Run until a termination signal, then shut down gracefully.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Bind address: {}", self.config.server.bind_address);
        info!("Max connections: {}", self.config.server.max_connections);
        info!("Idle timeout: {}s", self.config.server.idle_timeout_secs);

        let gateway = self.gateway.clone();
        let gateway_handle = tokio::spawn(async move {
            if let Err(e) = gateway.start().await {
                error!("Gateway error: {e}");
                std::process::exit(1);
            }
        });

        let relay_shutdown = self.gateway.subscribe_shutdown();
        let relay = self.relay;
        let relay_handle = tokio::spawn(async move {
            if let Err(e) = relay.run(relay_shutdown).await {
                error!("Command relay error: {e}");
            }
        });

        info!("Fleetgate is running; press Ctrl+C to shut down");
        signals::setup_signal_handlers().await?;

        info!("Shutdown signal received, initiating graceful shutdown");
        self.gateway.shutdown();

        // give the accept loops, relay and connection teardown a moment
        let drain = async {
            let _ = gateway_handle.await;
            let _ = relay_handle.await;
        };
        if tokio::time::timeout(Duration::from_secs(5), drain).await.is_err() {
            warn!("shutdown drain timed out");
        }

        info!(live_sessions = self.registry.len(), "Fleetgate stopped");
        Ok(())
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {e:?}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
