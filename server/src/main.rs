use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};
use shared::{DEFAULT_HOST, DEFAULT_PORT, SERVER_LAG};
use std::time::Duration;

/// Main-method of the server.
/// Parses command-line arguments, binds the listener and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = DEFAULT_HOST)]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Artificial delay applied to every inbound update, in milliseconds
        #[clap(short, long, default_value_t = SERVER_LAG.as_millis() as u64)]
        lag_ms: u64,
        /// Maximum number of concurrent sessions
        #[clap(short, long, default_value = "64")]
        max_sessions: usize,
        /// Snapshots buffered per session before new ones are dropped
        #[clap(short, long, default_value = "32")]
        outbound_queue: usize,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        lag: Duration::from_millis(args.lag_ms),
        max_sessions: args.max_sessions.max(1),
        outbound_queue: args.outbound_queue.max(1),
    };

    let server = Server::bind(config).await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
