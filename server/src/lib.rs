//! # Coin Arena Server
//!
//! Authoritative server for the coin arena. Clients own their avatar's
//! position; the server owns everything else: session identities, the coin,
//! and the scores.
//!
//! ## Flow
//!
//! 1. A TCP connection is accepted and registered; its session id is sent
//!    back as the first frame.
//! 2. Every inbound state update is delayed by the configured lag, then
//!    applied under the world lock.
//! 3. The same critical section checks for a coin pickup, credits the
//!    point, respawns the coin and broadcasts a full snapshot.
//! 4. Disconnects (clean or not) purge the session everywhere.
//!
//! ## Modules
//!
//! - `game`: world state (players, scores, coin)
//! - `scoring`: pickup detection and coin respawn
//! - `client_manager`: registry of live sessions and their outbound queues
//! - `broadcast`: snapshot fan-out with dead-session eviction
//! - `session`: per-connection lifecycle
//! - `network`: listener, accept loop and the shared lock
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod game;
pub mod network;
pub mod scoring;
pub mod session;
