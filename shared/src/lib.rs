use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

pub mod framing;
pub mod protocol;

pub const ARENA_WIDTH: f32 = 800.0;
pub const ARENA_HEIGHT: f32 = 400.0;
pub const PLAYER_SIZE: f32 = 30.0;
pub const COIN_SIZE: f32 = 15.0;
pub const MOVE_STEP: f32 = 15.0;
pub const MAX_USERNAME_LEN: usize = 12;
pub const SMOOTHING_FACTOR: f32 = 0.25;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 65432;

/// Minimum spacing between two outbound state updates from one client.
pub const SEND_INTERVAL: Duration = Duration::from_millis(200);
/// Client render/poll tick (30 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Artificial per-message delay the server applies before each update.
pub const SERVER_LAG: Duration = Duration::from_millis(200);

/// Coins never respawn closer than this to an arena edge.
pub const COIN_PADDING: f32 = COIN_SIZE;

/// Errors raised while moving messages across the wire
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("identity frame is not a valid session id")]
    InvalidIdentity,
}

/// Server-issued identity of one connection, stable for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Issues a fresh, never reused identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters used when the id is shown to people or logged.
    pub fn short(&self) -> &str {
        self.prefix(8)
    }

    pub fn prefix(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One avatar as reported by its own client. The server stores it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: SessionId,
    pub x: f32,
    pub y: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub username: String,
}

impl PlayerState {
    pub fn new(id: SessionId, x: f32, y: f32, color: (u8, u8, u8), username: &str) -> Self {
        Self {
            id,
            x,
            y,
            r: color.0,
            g: color.1,
            b: color.2,
            username: username.to_string(),
        }
    }

    /// Avatar coordinates are the top-left corner of its square.
    pub fn center(&self) -> (f32, f32) {
        (self.x + PLAYER_SIZE / 2.0, self.y + PLAYER_SIZE / 2.0)
    }

    pub fn color(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

/// The single collectible. Its coordinate is already its centre.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoinState {
    pub x: f32,
    pub y: f32,
}

impl CoinState {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Point-in-time read of every shared store on the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub players: HashMap<SessionId, PlayerState>,
    pub coin: CoinState,
    pub scores: HashMap<SessionId, u32>,
}

impl WorldSnapshot {
    pub fn score_of(&self, id: &SessionId) -> u32 {
        self.scores.get(id).copied().unwrap_or(0)
    }
}

/// Distance under which an avatar picks up the coin.
pub const PICKUP_DISTANCE: f32 = PLAYER_SIZE / 2.0 + COIN_SIZE / 2.0;

/// Circle test between an avatar and the coin. Touching edges do not count.
pub fn check_pickup(player: &PlayerState, coin: &CoinState) -> bool {
    let (px, py) = player.center();
    let (cx, cy) = coin.center();

    let dx = px - cx;
    let dy = py - cy;
    (dx * dx + dy * dy).sqrt() < PICKUP_DISTANCE
}
