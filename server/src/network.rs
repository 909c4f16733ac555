//! Server network layer: listening socket, accept loop and the shared lock
//!
//! All shared state lives in one [`ServerState`] behind one exclusive
//! `tokio::sync::Mutex`. Every mutation (player update, pickup, disconnect)
//! and every full read (snapshot, registry walk) holds that lock for the
//! whole read-and-use span. Nothing performs socket I/O while holding it:
//! outbound bytes go through per-session queues instead.

use crate::broadcast;
use crate::client_manager::{ClientManager, Outbound};
use crate::game::GameState;
use crate::scoring;
use crate::session;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use shared::framing::MAX_SUPPORTED_SESSIONS;
use shared::{PlayerState, SessionId, DEFAULT_HOST, DEFAULT_PORT, SERVER_LAG};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: String,
    /// Artificial delay before each inbound update is applied
    pub lag: Duration,
    /// Concurrent sessions allowed before new connections are turned away
    pub max_sessions: usize,
    /// Frames buffered per session before snapshots start being dropped
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            lag: SERVER_LAG,
            max_sessions: 64,
            outbound_queue: 32,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("{requested} sessions requested; snapshots only fit {limit}")]
    TooManySessions { requested: usize, limit: usize },
}

/// Everything guarded by the world lock
pub struct ServerState {
    pub game: GameState,
    pub clients: ClientManager,
    /// Source of coin respawn positions
    pub rng: Box<dyn RngCore + Send>,
}

impl ServerState {
    /// Fresh world with the coin already placed
    pub fn new(max_sessions: usize) -> Self {
        let mut rng: Box<dyn RngCore + Send> = Box::new(StdRng::from_entropy());
        let coin = scoring::spawn_coin(&mut *rng);

        Self {
            game: GameState::new(coin),
            clients: ClientManager::new(max_sessions),
            rng,
        }
    }

    /// Registers a connection and opens its score at zero.
    pub fn register(&mut self, addr: SocketAddr, sender: Outbound) -> Option<SessionId> {
        let id = self.clients.add_client(addr, sender)?;
        self.game.add_session(&id);
        Some(id)
    }

    /// Removes the session from the registry and every world store.
    ///
    /// Safe to call any number of times; returns true only for the call that
    /// actually removed something.
    pub fn disconnect(&mut self, id: &SessionId) -> bool {
        let was_client = self.clients.remove_client(id);
        let had_state = self.game.remove_session(id);
        was_client || had_state
    }

    /// Applies one state update, runs pickup detection, and broadcasts.
    ///
    /// Returns None if the session was already evicted, in which case the
    /// update is discarded.
    pub fn handle_update(&mut self, id: &SessionId, player: PlayerState) -> Option<bool> {
        if !self.clients.contains(id) {
            return None;
        }

        self.game.apply_player_update(id, player.clone());
        let picked_up =
            scoring::check_and_resolve(&mut self.game, id, &player, &mut *self.rng);
        broadcast::broadcast(self);
        Some(picked_up)
    }
}

pub type SharedState = Arc<Mutex<ServerState>>;

/// Accepts connections and runs one session task per connection
pub struct Server {
    listener: TcpListener,
    state: SharedState,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Validates the configuration and binds the listening socket.
    ///
    /// Fails with [`ServerError::TooManySessions`] when a full arena's
    /// snapshot could exceed the frame size clients accept.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if config.max_sessions > MAX_SUPPORTED_SESSIONS {
            return Err(ServerError::TooManySessions {
                requested: config.max_sessions,
                limit: MAX_SUPPORTED_SESSIONS,
            });
        }

        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;

        let state = Arc::new(Mutex::new(ServerState::new(config.max_sessions)));

        Ok(Server {
            listener,
            state,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Accept loop. Runs until the task is dropped.
    pub async fn run(self) {
        match self.local_addr() {
            Ok(addr) => info!("Server listening on {}", addr),
            Err(e) => warn!("Server listening on unknown address: {}", e),
        }
        info!("Server-side lag set to {}ms", self.config.lag.as_millis());
        info!(
            "Accepting up to {} concurrent sessions",
            self.config.max_sessions
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let state = Arc::clone(&self.state);
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        if let Ok(end) = session::run_session(stream, addr, state, config).await {
                            debug!("Session from {} ended: {:?}", addr, end);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
