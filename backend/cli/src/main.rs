mod config;
mod doctor_cmd;
mod status_cmd;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cligate_gateway::{build_router, GatewayState};
use cligate_invoker::CliInvoker;
use cligate_session::SessionStore;

use config::Config;

#[derive(Parser)]
#[command(name = "cligate")]
#[command(about = "OpenAI-compatible HTTP gateway for a dual-mode AI CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show a running instance's health
    Status,
    /// Diagnose the local installation
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            logging::init_logger(&config.log_dir, &config.log_level);
            run_server(config).await?;
        }
        Commands::Status => status_cmd::run(&config).await?,
        Commands::Doctor => doctor_cmd::run(&config).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        cli = %config.cli_command,
        "starting cligate"
    );

    let invoker = Arc::new(CliInvoker::new(config.invoker_config()));

    // Startup probe, advisory only: a misconfigured CLI should be loud at
    // boot but requests stay the place where failures become responses.
    match invoker.probe().await {
        Ok(version) => info!(%version, "CLI probe succeeded"),
        Err(e) => warn!(error = %e, "CLI probe failed, serving in degraded mode"),
    }

    let sessions = SessionStore::new(config.session_config());

    // Periodic advisory eviction of idle sessions.
    let evict_store = sessions.clone();
    let eviction_interval = config.eviction_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(eviction_interval);
        ticker.tick().await; // the first tick fires immediately
        loop {
            ticker.tick().await;
            evict_store.evict_expired().await;
        }
    });

    let state = GatewayState::new(invoker, sessions);
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
    info!(%addr, "HTTP API listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cligate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
