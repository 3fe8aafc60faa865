//! Motor telemetry monitor - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Motor telemetry monitor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MOTOR_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the reading buffer capacity
    #[arg(long)]
    max_readings: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    motor_telemetry::init_logging()?;

    info!("Starting motor monitor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = motor_monitor::AppConfig::load(args.config.as_deref())?;
    if let Some(max_readings) = args.max_readings {
        config.ingest.max_readings = max_readings;
    }
    config.validate()?;
    info!(
        api = %config.api.base_url,
        push = %config.websocket.url,
        max_readings = config.ingest.max_readings,
        dashboard_port = config.dashboard.port,
        "Configuration loaded"
    );

    let app = motor_monitor::Application::new(config)?;
    app.run().await?;

    Ok(())
}
