//! # Coin Arena Client
//!
//! Desktop client for the coin arena. The local avatar moves the instant a
//! key is pressed; its position is sent to the server at a throttled rate.
//! Remote avatars are drawn from server snapshots, smoothed toward their
//! latest known position every frame.
//!
//! ## Frame loop
//!
//! Each frame polls input, sends a pending state update if the throttle
//! allows, polls the network without blocking, advances smoothing, renders,
//! and sleeps to the target frame rate. Networking runs on background tokio
//! tasks that talk to the loop only through channels.
//!
//! ## Modules
//!
//! - `network`: connect/handshake, non-blocking send and poll
//! - `reconciliation`: smoothing cache for remote avatars
//! - `game`: local movement, send throttle, connection status, scoreboard
//! - `input`: movement keys and the username prompt
//! - `rendering`: arena, coin, avatars, scoreboard and status line
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{NetworkClient, Poll};
//!
//! # async fn demo() -> Result<(), client::network::ClientError> {
//! let mut network = NetworkClient::connect("127.0.0.1:65432").await?;
//! println!("playing as {}", network.session_id());
//!
//! if let Poll::Snapshot(snapshot) = network.poll_snapshot() {
//!     println!("{} players online", snapshot.players.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod reconciliation;
pub mod rendering;
