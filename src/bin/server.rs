//! TNRA Server Binary
//!
//! Starts the job queue server.

use std::path::PathBuf;

use clap::Parser;
use tnra::{Config, QueueDiscipline, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// TNRA job server
#[derive(Parser, Debug)]
#[command(name = "tnra-server")]
#[command(about = "Job queue, result sink and variable store for routing workers")]
#[command(version)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "TNRA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// TCP port
    #[arg(short, long, env = "TNRA_PORT", default_value_t = tnra::config::DEFAULT_PORT)]
    port: u16,

    /// Queue retrieval order (lifo or fifo)
    #[arg(short, long, env = "TNRA_QUEUE_DISCIPLINE", default_value = "lifo")]
    discipline: QueueDiscipline,

    /// Directory relative filenames in commands resolve against
    #[arg(short, long, env = "TNRA_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tnra=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("TNRA Server v{}", tnra::VERSION);
    tracing::info!("Work directory: {}", args.work_dir.display());

    let config = Config::builder()
        .listen_addr(format!("{}:{}", args.host, args.port))
        .queue_discipline(args.discipline)
        .work_dir(&args.work_dir)
        .max_connections(args.max_connections)
        .build();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
