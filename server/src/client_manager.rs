//! Connection registry: which sessions are live and how to reach them
//!
//! This module tracks the server side of every connection, including:
//! - Session identity issued on accept
//! - The bounded outbound queue each session's writer task drains
//! - The concurrent-session cap enforced at registration
//!
//! Each registered session owns a bounded outbound queue of ready-to-write
//! frames. The registry only ever hands frames to that queue; the session's
//! writer task is the single writer on its socket, so concurrent broadcasts
//! from other sessions never interleave bytes on the wire.

use log::info;
use shared::SessionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Encoded frame shared by every recipient of one broadcast
pub type Frame = Arc<[u8]>;

/// Sending end of a session's outbound queue
pub type Outbound = mpsc::Sender<Frame>;

/// A live connection as seen by the registry
///
/// Each client keeps:
/// - Connection metadata (id, peer address, registration time)
/// - The only handle through which other tasks reach its socket
#[derive(Debug)]
pub struct Client {
    /// Identity issued on accept
    pub id: SessionId,
    /// Remote peer address
    pub addr: SocketAddr,
    /// When the session was registered
    pub connected_at: Instant,
    /// Queue drained by the session's writer task
    pub sender: Outbound,
}

impl Client {
    /// Creates a client record stamped with the current time
    ///
    /// The sender is the producing end of the queue whose receiver the
    /// session's writer task owns. Dropping the record closes nothing by
    /// itself; the queue closes once the last sender clone is gone.
    pub fn new(id: SessionId, addr: SocketAddr, sender: Outbound) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }
}

/// Tracks every registered session and enforces the concurrent-session cap
///
/// The registry lives inside the server's world lock, so registration,
/// removal and the broadcast walk over [`ClientManager::senders`] never
/// overlap.
pub struct ClientManager {
    /// Live sessions keyed by their issued id
    clients: HashMap<SessionId, Client>,
    /// Registrations refused once this many sessions are live
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty registry admitting at most `max_clients` sessions
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a new connection under a freshly issued id.
    ///
    /// The id is a random UUID, so it is never reused while the server runs.
    /// Returns None when the server is already at capacity; the caller then
    /// closes the connection without sending an identity.
    pub fn add_client(&mut self, addr: SocketAddr, sender: Outbound) -> Option<SessionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let id = SessionId::generate();
        info!("Client {} connected from {}", id.short(), addr);
        self.clients
            .insert(id.clone(), Client::new(id.clone(), addr, sender));

        Some(id)
    }

    /// Drops the session's queue handle.
    ///
    /// Returns false if it was already gone, which makes repeated cleanup of
    /// the same session harmless.
    pub fn remove_client(&mut self, id: &SessionId) -> bool {
        match self.clients.remove(id) {
            Some(client) => {
                info!(
                    "Client {} removed after {:.1}s. Active: {}",
                    id.short(),
                    client.connected_at.elapsed().as_secs_f32(),
                    self.clients.len()
                );
                true
            }
            None => false,
        }
    }

    /// Whether the session is still registered
    pub fn contains(&self, id: &SessionId) -> bool {
        self.clients.contains_key(id)
    }

    /// Id and outbound queue of every live session
    ///
    /// Iteration order is unspecified.
    pub fn senders(&self) -> impl Iterator<Item = (&SessionId, &Outbound)> {
        self.clients.iter().map(|(id, client)| (id, &client.sender))
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Configured session cap
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}
