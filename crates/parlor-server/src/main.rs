//! Parlor server binary.
//!
//! # Usage
//!
//! ```bash
//! # Default: JSON-lines history under ./rooms, counter in ./chatter-count.json
//! parlor-server --bind 0.0.0.0:9002
//!
//! # Ephemeral deployment without any disk writes for history
//! parlor-server --bind 0.0.0.0:9002 --memory-history
//! ```

use clap::Parser;
use parlor_server::{AppState, ChatterCounter, JsonlHistory, MemoryHistory, router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parlor chat-room server
#[derive(Parser, Debug)]
#[command(name = "parlor-server")]
#[command(about = "Parlor chat-room protocol server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:9002")]
    bind: String,

    /// Directory for per-room JSON-lines history files
    #[arg(long, default_value = "./rooms")]
    history_dir: String,

    /// Path of the aggregate chatter counter document
    #[arg(long, default_value = "./chatter-count.json")]
    counter_file: String,

    /// Keep history in memory only (nothing written to history_dir)
    #[arg(long)]
    memory_history: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Parlor server starting");

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("Listening on http://{} (websocket at /ws)", listener.local_addr()?);

    let counter = ChatterCounter::new(&args.counter_file);

    if args.memory_history {
        tracing::warn!("History is in-memory only and will be lost on shutdown");
        let state = AppState::new(MemoryHistory::new(), counter);
        axum::serve(listener, router(state)).await?;
    } else {
        let history = JsonlHistory::new(&args.history_dir)?;
        let state = AppState::new(history, counter);
        axum::serve(listener, router(state)).await?;
    }

    Ok(())
}
