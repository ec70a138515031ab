//! Conversion Relay. Server-side fan-out of storefront conversion events to
//! ad-platform conversion APIs.
//!
//! `serve` runs the HTTP relay; `generate-traffic` drives synthetic events
//! through the same dispatch path.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use relay_analytics::EventLog;
use relay_api::{ApiServer, AppState};
use relay_core::config::AppConfig;
use relay_destinations::DestinationRouter;
use relay_traffic::{TrafficGenerator, TrafficOptions, TRAFFIC_SOURCE};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "conversion-relay")]
#[command(about = "Server-side relay for ad-platform conversion events")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Destination credentials (override config).
#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, env = "META_ACCESS_TOKEN", hide_env_values = true)]
    meta_access_token: Option<String>,

    #[arg(long, env = "META_PIXEL_ID")]
    meta_pixel_id: Option<String>,

    #[arg(long, env = "TIKTOK_ACCESS_TOKEN", hide_env_values = true)]
    tiktok_access_token: Option<String>,

    #[arg(long, env = "TIKTOK_PIXEL_ID")]
    tiktok_pixel_id: Option<String>,

    #[arg(long, env = "REDDIT_ACCESS_TOKEN", hide_env_values = true)]
    reddit_access_token: Option<String>,

    /// Reddit ad account id
    #[arg(long, env = "REDDIT_PIXEL_ID")]
    reddit_pixel_id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP relay (default)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// HTTP port (overrides config)
        #[arg(long, env = "CONVERSION_RELAY__API__HTTP_PORT")]
        http_port: Option<u16>,
    },

    /// Send synthetic conversion events to every configured destination
    GenerateTraffic {
        /// Number of events to send
        #[arg(long, default_value_t = 100)]
        count: usize,

        /// Build payloads but do not send them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Pause between events in milliseconds
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
}

impl CredentialArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(token) = self.meta_access_token {
            config.meta.access_token = token;
        }
        if let Some(pixel_id) = self.meta_pixel_id {
            config.meta.pixel_id = pixel_id;
        }
        if let Some(token) = self.tiktok_access_token {
            config.tiktok.access_token = token;
        }
        if let Some(pixel_id) = self.tiktok_pixel_id {
            config.tiktok.pixel_id = pixel_id;
        }
        if let Some(token) = self.reddit_access_token {
            config.reddit.access_token = token;
        }
        if let Some(pixel_id) = self.reddit_pixel_id {
            config.reddit.pixel_id = pixel_id;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "conversion_relay=info,relay_api=info,relay_destinations=info,tower_http=info"
                    .into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    cli.credentials.apply(&mut config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        http_port: None,
    }) {
        Commands::Serve { host, http_port } => {
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = http_port {
                config.api.http_port = port;
            }
            serve(config).await
        }
        Commands::GenerateTraffic {
            count,
            dry_run,
            interval_ms,
        } => {
            generate_traffic(
                config,
                TrafficOptions {
                    count,
                    dry_run,
                    interval: Duration::from_millis(interval_ms),
                },
            )
            .await
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        http_port = config.api.http_port,
        log_capacity = config.event_log.capacity,
        "Conversion relay starting up"
    );

    let router = Arc::new(DestinationRouter::new(&config)?);
    let log = Arc::new(EventLog::new(config.event_log.capacity));

    info!(
        destinations = router.active_destination_count(),
        "Destinations configured"
    );

    let api_server = ApiServer::new(config.clone(), AppState::new(router, log));

    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Conversion relay is ready to accept events");

    // Blocks until shutdown
    api_server.start_http().await?;

    Ok(())
}

async fn generate_traffic(config: AppConfig, options: TrafficOptions) -> anyhow::Result<()> {
    let router = Arc::new(DestinationRouter::new(&config)?);
    let log = Arc::new(EventLog::new(config.event_log.capacity));
    let mut generator = TrafficGenerator::new(router, log);

    println!(
        "Generating {} synthetic events (dry_run={})...",
        options.count, options.dry_run
    );

    let summary = generator
        .run(&options, |progress| {
            if progress.primary_ok() {
                println!("{progress}");
            } else {
                eprintln!("{progress}");
            }
        })
        .await;

    println!("\n{summary}");
    if summary.logged > 0 {
        println!("Event log holds {} records tagged {TRAFFIC_SOURCE}", summary.logged);
    }
    Ok(())
}
