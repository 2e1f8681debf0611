//! Standalone bot game server
//!
//! Usage: cargo run -p botserver_web --bin botserver -- --port 8080

use botserver_web::{LifecycleSettings, LogFormat, ServerConfig, WebServer};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "botserver", about = "Bot game server", version)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind to
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    /// Readiness polls before a full session is aborted
    #[arg(long, default_value_t = 10)]
    readiness_attempts: u32,
    #[arg(long, default_value_t = 1000)]
    readiness_interval_ms: u64,
    /// Pause before each event delivery
    #[arg(long, default_value_t = 1000)]
    delivery_delay_ms: u64,
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn lifecycle(&self) -> LifecycleSettings {
        LifecycleSettings {
            readiness_attempts: self.readiness_attempts,
            readiness_interval_ms: self.readiness_interval_ms,
            delivery_delay_ms: self.delivery_delay_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    botserver_web::init_logging(args.log_format)?;

    let config = ServerConfig::new(args.host.clone(), args.port).with_lifecycle(args.lifecycle());

    tracing::info!(
        host = %config.host(),
        port = config.port(),
        readiness_attempts = config.lifecycle().readiness_attempts,
        readiness_interval_ms = config.lifecycle().readiness_interval_ms,
        delivery_delay_ms = config.lifecycle().delivery_delay_ms,
        "starting bot server"
    );

    let server = WebServer::new(config)?;
    let handle = server.start().await?;

    tracing::info!("server running at http://{}", handle.address());

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down server");
    handle.shutdown().await?;

    Ok(())
}
