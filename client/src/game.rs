//! Client-side game state: the local avatar, the smoothed view of everyone
//! else, and the scoreboard
//!
//! The local avatar is authoritative on this side. It moves immediately on
//! input and is only sent to the server, never corrected by it. Remote
//! avatars come from snapshots and are eased toward their reported spots.

use crate::reconciliation::ReconciliationCache;
use log::{debug, info};
use rand::Rng;
use shared::{
    CoinState, PlayerState, SessionId, WorldSnapshot, ARENA_HEIGHT, ARENA_WIDTH, MOVE_STEP,
    PLAYER_SIZE,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Distance kept from the arena edges when picking a spawn point
const SPAWN_MARGIN: f32 = 50.0;

/// Where the client is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Waiting for the server to issue an id
    Connecting,
    Connected,
    /// Server closed the stream; never left again
    Disconnected,
}

/// One movement key's worth of motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -MOVE_STEP),
            Direction::Down => (0.0, MOVE_STEP),
            Direction::Left => (-MOVE_STEP, 0.0),
            Direction::Right => (MOVE_STEP, 0.0),
        }
    }
}

/// Moves the avatar one step, clamped to the arena. Returns true if it moved.
pub fn step(player: &mut PlayerState, direction: Direction) -> bool {
    let (dx, dy) = direction.delta();
    let x = (player.x + dx).clamp(0.0, ARENA_WIDTH - PLAYER_SIZE);
    let y = (player.y + dy).clamp(0.0, ARENA_HEIGHT - PLAYER_SIZE);

    let moved = x != player.x || y != player.y;
    player.x = x;
    player.y = y;
    moved
}

/// Caps how often state updates go out, independent of input rate
#[derive(Debug, Clone)]
pub struct SendThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl SendThrottle {
    /// A throttle that lets the first update through immediately
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Whether at least one interval has passed since the last send
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}

/// Everything the render loop needs from one frame to the next
///
/// Tracks:
/// - Connection status and the local avatar
/// - Whether local movement still has to be sent
/// - The latest snapshot and the smoothed positions derived from it
/// - Coin position and scores as last reported by the server
pub struct ClientGameState {
    status: ConnectionStatus,
    /// The local avatar, created once the server issues an id
    local: Option<PlayerState>,
    /// Local movement not yet sent to the server
    dirty: bool,
    /// Smoothed display positions, local avatar included
    cache: ReconciliationCache,
    /// Target positions for smoothing
    latest: Option<WorldSnapshot>,
    coin: Option<CoinState>,
    scores: HashMap<SessionId, u32>,
}

impl ClientGameState {
    /// Starts out connecting, with no avatar, coin or scores yet
    ///
    /// Nothing is drawn in the arena until [`on_connected`] creates the
    /// local avatar and the first snapshot arrives.
    ///
    /// [`on_connected`]: ClientGameState::on_connected
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            local: None,
            dirty: false,
            cache: ReconciliationCache::default(),
            latest: None,
            coin: None,
            scores: HashMap::new(),
        }
    }

    /// Creates the local avatar at a random spot with a random colour.
    ///
    /// The spot keeps a margin from every edge. Each colour channel is drawn
    /// from 50 to 200.
    pub fn on_connected<R: Rng + ?Sized>(
        &mut self,
        id: SessionId,
        username: &str,
        rng: &mut R,
    ) -> &PlayerState {
        let x = rng.gen_range(SPAWN_MARGIN..=ARENA_WIDTH - SPAWN_MARGIN);
        let y = rng.gen_range(SPAWN_MARGIN..=ARENA_HEIGHT - SPAWN_MARGIN);
        let color = (
            rng.gen_range(50..=200),
            rng.gen_range(50..=200),
            rng.gen_range(50..=200),
        );

        info!("Spawning {} at ({:.0}, {:.0})", id.short(), x, y);
        self.status = ConnectionStatus::Connected;
        self.dirty = false;
        let player = PlayerState::new(id, x, y, color, username);
        self.cache.set_local(&player);
        self.local.insert(player)
    }

    /// Applies the frame's key presses. Returns true if the avatar moved.
    pub fn apply_moves(&mut self, directions: &[Direction]) -> bool {
        if self.status != ConnectionStatus::Connected {
            return false;
        }
        let Some(local) = self.local.as_mut() else {
            return false;
        };

        let mut moved = false;
        for &direction in directions {
            moved |= step(local, direction);
        }
        self.dirty |= moved;
        moved
    }

    /// The local state, if it moved since the last send and the throttle allows.
    pub fn take_pending_update(
        &mut self,
        throttle: &mut SendThrottle,
        now: Instant,
    ) -> Option<PlayerState> {
        if !self.dirty || !throttle.ready(now) {
            return None;
        }

        let local = self.local.clone()?;
        self.dirty = false;
        throttle.mark_sent(now);
        Some(local)
    }

    /// Records a freshly received snapshot.
    ///
    /// Coin and scores are replaced outright. Players that left are dropped
    /// from the smoothing cache; the rest ease toward the new positions over
    /// the following ticks.
    pub fn on_snapshot(&mut self, snapshot: WorldSnapshot) {
        self.coin = Some(snapshot.coin);
        self.scores.clone_from(&snapshot.scores);

        let evicted = self.cache.evict_absent(&snapshot);
        if evicted > 0 {
            debug!("Dropped {} departed players", evicted);
        }
        self.latest = Some(snapshot);
    }

    /// Advances smoothing by one render tick.
    pub fn tick(&mut self) {
        if let Some(local) = &self.local {
            self.cache.set_local(local);
        }
        if let Some(snapshot) = &self.latest {
            self.cache.merge(snapshot);
        }
    }

    /// Marks the connection lost. Movement and sending stop for good.
    pub fn on_disconnected(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            info!("Disconnected from server");
        }
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn local(&self) -> Option<&PlayerState> {
        self.local.as_ref()
    }

    pub fn coin(&self) -> Option<CoinState> {
        self.coin
    }

    /// Players to draw, local one included
    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.cache.entries()
    }

    /// One-line summary shown under the arena
    pub fn status_line(&self) -> String {
        match (self.status, &self.local) {
            (ConnectionStatus::Connected, Some(local)) => format!(
                "Connected | Players: {} | ID: {} | User: {}",
                self.cache.len(),
                local.id.short(),
                local.username
            ),
            (ConnectionStatus::Disconnected, _) => "DISCONNECTED".to_string(),
            _ => "Connecting...".to_string(),
        }
    }

    /// Scores sorted best first, labelled by username or a short id.
    pub fn scoreboard(&self) -> Vec<(String, u32)> {
        let mut rows: Vec<(String, u32)> = self
            .scores
            .iter()
            .map(|(id, &score)| (self.label_for(id), score))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows
    }

    fn label_for(&self, id: &SessionId) -> String {
        match self.cache.get(id) {
            Some(player) if !player.username.is_empty() => player.username.clone(),
            _ => id.prefix(4).to_string(),
        }
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
