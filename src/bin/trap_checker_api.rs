//! Trap Checker API Server
//!
//! Usage:
//!   cargo run --bin trap_checker_api
//!
//! Environment:
//!   PORT / TRAP_PORT  - Server port (default: 8080)
//!   TRAP_HOST         - Server host (default: 0.0.0.0)
//!   TRAP_API_KEYS     - Comma separated API keys (unset: open access)
//!   ETHERSCAN_API_KEY - Explorer key
//!   RUST_LOG          - Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use trap_checker::api::{create_router, start_cleanup_task, AppState};
use trap_checker::utils::constants::{get_chain_name, APP_VERSION};
use trap_checker::{CheckerConfig, ExplorerDataSource, ServerConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = CheckerConfig::from_env()?;
    let server = ServerConfig::default();

    if config.explorer_api_key.is_none() {
        warn!("⚠️ ETHERSCAN_API_KEY not set: source, ABI and holder lookups will be unavailable");
    }

    let source = Arc::new(ExplorerDataSource::from_config(&config)?);
    let default_chain = config.default_chain_id;
    let state = Arc::new(AppState::new(config, source, server.cache_ttl_secs));
    let telemetry = Arc::clone(&state.telemetry);

    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    info!("🚀 Trap Checker API v{} starting on http://{}", APP_VERSION, addr);
    info!("⛓️ Default chain: {} ({})", get_chain_name(default_chain), default_chain);
    info!("");
    info!("Endpoints:");
    info!("  POST /v1/trap-check         - Risk check for one contract");
    info!("  GET  /api/trap-check        - Same, via ?address=&chain=");
    info!("  POST /v1/trap-check/batch   - Batch check (up to 50 contracts)");
    info!("  POST /v1/scan/source        - Scan pasted source code");
    info!("  GET  /v1/stats              - Check statistics");
    info!("  GET  /v1/health             - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("");
    info!("🛑 Shutdown signal received, cleaning up...");
    let stats = telemetry.snapshot();
    info!("   Total checks: {}", stats.total_checks);
    info!(
        "   LOW / MEDIUM / HIGH: {} / {} / {}",
        stats.low_risk, stats.medium_risk, stats.high_risk
    );
    info!("   Degraded: {}, timeouts: {}", stats.degraded, stats.timeouts);
    info!("   Avg latency: {:.1}ms", stats.avg_latency_ms);
    info!("👋 Trap Checker API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    +--------------------------------------------------------------+
    |                                                              |
    |   _____                    ____ _               _            |
    |  |_   _| __ __ _ _ __     / ___| |__   ___  ___| | _____ _ __ |
    |    | || '__/ _` | '_ \   | |   | '_ \ / _ \/ __| |/ / _ \ '__||
    |    | || | | (_| | |_) |  | |___| | | |  __/ (__|   <  __/ |  |
    |    |_||_|  \__,_| .__/    \____|_| |_|\___|\___|_|\_\___|_|  |
    |               |_|                                            |
    |                                                              |
    |            R U G - P U L L   R I S K   A P I                 |
    |                                                              |
    +--------------------------------------------------------------+
    "#
    );
}
