//! Coin pickup detection and scoring
//!
//! Runs inside the same critical section as the update that triggered it,
//! so the score increment and the coin respawn form one atomic step. A second
//! session reporting the same spot a moment later sees the coin already moved.

use crate::game::GameState;
use log::info;
use rand::Rng;
use shared::{
    check_pickup, CoinState, PlayerState, SessionId, ARENA_HEIGHT, ARENA_WIDTH, COIN_PADDING,
};

/// Picks a uniformly random coin position inside the padded arena.
pub fn spawn_coin<R: Rng + ?Sized>(rng: &mut R) -> CoinState {
    let x = rng.gen_range(COIN_PADDING..=ARENA_WIDTH - COIN_PADDING);
    let y = rng.gen_range(COIN_PADDING..=ARENA_HEIGHT - COIN_PADDING);

    info!("New coin spawned at ({:.0}, {:.0})", x, y);
    CoinState::new(x, y)
}

/// Credits `id` and relocates the coin if `player` overlaps it.
///
/// Returns true iff a pickup happened during this call.
pub fn check_and_resolve<R: Rng + ?Sized>(
    game: &mut GameState,
    id: &SessionId,
    player: &PlayerState,
    rng: &mut R,
) -> bool {
    if !check_pickup(player, &game.coin()) {
        return false;
    }

    let score = game.award_point(id);
    info!("Player {} collected the coin (score {})", id.short(), score);

    game.set_coin(spawn_coin(rng));
    true
}
