use clap::Parser;
use tokio::net::TcpListener;

use resilient_gateway::lifecycle::{shutdown::shutdown_signal, Shutdown};
use resilient_gateway::observability::logging;
use resilient_gateway::upstream::flaky::{flaky_router, FlakyConfig};

#[derive(Parser)]
#[command(name = "flaky-upstream")]
#[command(about = "Upstream service that fails at random", long_about = None)]
struct Cli {
    #[arg(long, env = "UPSTREAM_BIND", default_value = "0.0.0.0:5000")]
    bind: String,

    /// Failure probability of GET /circuit
    #[arg(long, default_value_t = 5.0 / 11.0)]
    circuit_failure_rate: f64,

    /// Failure probability of GET /retries
    #[arg(long, default_value_t = 6.0 / 11.0)]
    retries_failure_rate: f64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let config = FlakyConfig {
        circuit_failure_rate: cli.circuit_failure_rate,
        retries_failure_rate: cli.retries_failure_rate,
    };
    tracing::info!(
        circuit_failure_rate = config.circuit_failure_rate,
        retries_failure_rate = config.retries_failure_rate,
        "Flaky upstream configured"
    );

    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Flaky upstream listening");

    let shutdown = Shutdown::new();
    axum::serve(listener, flaky_router(config))
        .with_graceful_shutdown(shutdown_signal(shutdown.subscribe()))
        .await?;

    Ok(())
}
