//! Authoritative world state: every avatar, every score and the coin
//!
//! This module owns the three world stores:
//! - Players: the last self-reported state of each session, stored verbatim
//! - Scores: one counter per registered session, opened at zero
//! - Coin: the single coin's current position
//!
//! `GameState` itself holds no lock. It lives inside the server's single
//! `Mutex<ServerState>`, so each method here runs as one atomic step and a
//! snapshot can never observe a half-applied update.

use log::{debug, info};
use shared::{CoinState, PlayerState, SessionId, WorldSnapshot};
use std::collections::HashMap;

/// The world as the server sees it
///
/// A session may have a score without a player entry (registered but not yet
/// reporting), never the other way round after cleanup: [`remove_session`]
/// purges both stores together.
///
/// [`remove_session`]: GameState::remove_session
#[derive(Debug, Clone)]
pub struct GameState {
    /// Last reported state per session; absent until the first update
    players: HashMap<SessionId, PlayerState>,
    /// Points per session
    scores: HashMap<SessionId, u32>,
    /// Current coin position
    coin: CoinState,
}

impl GameState {
    /// Creates an empty world with the coin at the given position
    pub fn new(coin: CoinState) -> Self {
        Self {
            players: HashMap::new(),
            scores: HashMap::new(),
            coin,
        }
    }

    /// Opens a zero score for a freshly registered session.
    ///
    /// The session gets no player entry until its first state update arrives.
    pub fn add_session(&mut self, id: &SessionId) {
        self.scores.entry(id.clone()).or_insert(0);
    }

    /// Stores the client's self-reported state verbatim.
    ///
    /// The server keys the entry by the connection's issued id. Position,
    /// colour and username are trusted as sent; nothing is clamped.
    pub fn apply_player_update(&mut self, id: &SessionId, state: PlayerState) {
        debug!(
            "Player {} at ({:.1}, {:.1})",
            id.short(),
            state.x,
            state.y
        );
        self.players.insert(id.clone(), state);
    }

    /// Purges the session from players and scores. Removing an unknown
    /// session is a no-op and returns false.
    pub fn remove_session(&mut self, id: &SessionId) -> bool {
        let had_player = self.players.remove(id).is_some();
        let had_score = self.scores.remove(id).is_some();

        if had_player || had_score {
            info!("Removed player {}", id.short());
        }
        had_player || had_score
    }

    /// Copies the whole world for broadcasting
    ///
    /// Callers hold the world lock while taking it, so the copy is
    /// consistent: no update is ever half applied in a snapshot.
    pub fn get_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            players: self.players.clone(),
            coin: self.coin,
            scores: self.scores.clone(),
        }
    }

    /// Adds one point and returns the new total.
    ///
    /// Opens the score at zero first if the session somehow has none.
    pub fn award_point(&mut self, id: &SessionId) -> u32 {
        let score = self.scores.entry(id.clone()).or_insert(0);
        *score += 1;
        *score
    }

    /// Current coin position
    pub fn coin(&self) -> CoinState {
        self.coin
    }

    /// Moves the coin, used when it respawns after a pickup
    pub fn set_coin(&mut self, coin: CoinState) {
        self.coin = coin;
    }

    /// Score of a session, None once it has been removed
    pub fn score(&self, id: &SessionId) -> Option<u32> {
        self.scores.get(id).copied()
    }

    pub fn player(&self, id: &SessionId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    /// Sessions that have reported at least one state
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
