//! neo4j-mcp - MCP server for a Neo4j knowledge graph
//!
//! Frames travel over stdin/stdout, so every log line goes to stderr.

use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neo4j_mcp::{
    config::Args,
    db::Neo4jDriver,
    server::{McpServer, SERVER_VERSION},
    shutdown::{install_signal_handlers, ShutdownCoordinator, StopSignal},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("neo4j_mcp={},warn", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = args.server_config();
    info!("======================================");
    info!("  neo4j-mcp v{}", SERVER_VERSION);
    info!("======================================");
    info!(
        "Max concurrency: {}",
        config
            .max_concurrency
            .map(|n| n.to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    info!("Query timeout: {}s", config.query_timeout.as_secs());
    info!("Tool timeout: {}s", config.tool_timeout.as_secs());
    info!("======================================");

    let stop = StopSignal::new();
    let server = Arc::new(McpServer::new(
        config.clone(),
        Arc::new(Neo4jDriver::new()),
        Some(stop.clone()),
    ));

    server.connection().configure(args.credentials()).await;
    if server.connection().status().pending && !args.no_eager_connect {
        match server.connection().ensure_connected().await {
            Ok(_) => info!("Connected to Neo4j at startup"),
            Err(e) => warn!("Startup connection failed; will retry on first use: {}", e),
        }
    }

    install_signal_handlers(&stop);

    let coordinator = ShutdownCoordinator::new(
        stop,
        Arc::clone(server.connection()),
        config.drain_timeout,
    )
    .with_output(server.output_tracker());
    let tracker = server.tracker();
    let running = Arc::clone(&server);
    let report = coordinator
        .run(
            async move {
                running
                    .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                    .await
            },
            tracker,
        )
        .await;

    if !report.drained {
        warn!("Exited with tool calls still in flight");
    }
    // A pending blocking stdin read would keep the runtime alive.
    std::process::exit(0)
}
