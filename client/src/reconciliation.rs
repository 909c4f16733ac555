//! Client-side smoothing of remote avatars
//!
//! Remote positions arrive at the server's broadcast rate, which is far below
//! the render rate. Each render tick moves every remote avatar a fixed
//! fraction of the way toward its last known position. The local avatar is
//! never touched: local input is authoritative for it.

use shared::{PlayerState, SessionId, WorldSnapshot, SMOOTHING_FACTOR};
use std::collections::HashMap;

/// One exponential smoothing step.
pub fn smooth_toward(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

#[derive(Debug, Clone)]
pub struct ReconciliationCache {
    local_id: Option<SessionId>,
    entries: HashMap<SessionId, PlayerState>,
    factor: f32,
}

impl ReconciliationCache {
    pub fn new(factor: f32) -> Self {
        Self {
            local_id: None,
            entries: HashMap::new(),
            factor,
        }
    }

    /// Records the locally computed state as the displayed one.
    pub fn set_local(&mut self, player: &PlayerState) {
        self.local_id = Some(player.id.clone());
        self.entries.insert(player.id.clone(), player.clone());
    }

    /// Folds one snapshot into the cache.
    ///
    /// Unseen sessions are seeded verbatim. Known ones move toward the
    /// snapshot position by one smoothing step, while colour and username
    /// are copied as-is. Sessions missing from the snapshot stay cached.
    pub fn merge(&mut self, snapshot: &WorldSnapshot) {
        for (id, target) in &snapshot.players {
            if self.local_id.as_ref() == Some(id) {
                continue;
            }

            match self.entries.get_mut(id) {
                Some(cached) => {
                    cached.x = smooth_toward(cached.x, target.x, self.factor);
                    cached.y = smooth_toward(cached.y, target.y, self.factor);
                    cached.r = target.r;
                    cached.g = target.g;
                    cached.b = target.b;
                    cached.username.clone_from(&target.username);
                }
                None => {
                    self.entries.insert(id.clone(), target.clone());
                }
            }
        }
    }

    /// Removes remote sessions absent from `snapshot`. Returns how many went.
    pub fn evict_absent(&mut self, snapshot: &WorldSnapshot) -> usize {
        let before = self.entries.len();
        let local = self.local_id.as_ref();
        self.entries
            .retain(|id, _| local == Some(id) || snapshot.players.contains_key(id));
        before - self.entries.len()
    }

    pub fn get(&self, id: &SessionId) -> Option<&PlayerState> {
        self.entries.get(id)
    }

    pub fn local_id(&self) -> Option<&SessionId> {
        self.local_id.as_ref()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PlayerState> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReconciliationCache {
    fn default() -> Self {
        Self::new(SMOOTHING_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn player(id: &SessionId, x: f32, y: f32) -> PlayerState {
        PlayerState::new(id.clone(), x, y, (100, 100, 100), "p")
    }

    fn snapshot_of(players: &[PlayerState]) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::default();
        for p in players {
            snapshot.players.insert(p.id.clone(), p.clone());
            snapshot.scores.insert(p.id.clone(), 0);
        }
        snapshot
    }

    #[test]
    fn test_smooth_toward() {
        assert_approx_eq!(smooth_toward(0.0, 100.0, 0.25), 25.0);
        assert_approx_eq!(smooth_toward(100.0, 0.0, 0.25), 75.0);
        assert_approx_eq!(smooth_toward(42.0, 42.0, 0.25), 42.0);
    }

    #[test]
    fn test_unseen_session_is_seeded_verbatim() {
        let mut cache = ReconciliationCache::default();
        let other = SessionId::generate();
        let remote = player(&other, 300.0, 120.0);

        cache.merge(&snapshot_of(&[remote.clone()]));

        assert_eq!(cache.get(&other), Some(&remote));
    }

    #[test]
    fn test_distance_shrinks_by_three_quarters_without_overshoot() {
        let mut cache = ReconciliationCache::default();
        let other = SessionId::generate();
        cache.merge(&snapshot_of(&[player(&other, 0.0, 0.0)]));

        let target = snapshot_of(&[player(&other, 400.0, 200.0)]);
        let mut previous_gap = 400.0_f32;
        for _ in 0..40 {
            cache.merge(&target);
            let x = cache.get(&other).unwrap().x;
            let gap = 400.0 - x;

            assert!(x <= 400.0, "overshot target: {}", x);
            assert_approx_eq!(gap, previous_gap * 0.75, 1e-3);
            previous_gap = gap;
        }

        let settled = cache.get(&other).unwrap();
        assert_approx_eq!(settled.x, 400.0, 0.01);
        assert_approx_eq!(settled.y, 200.0, 0.01);
    }

    #[test]
    fn test_discrete_fields_copied_immediately() {
        let mut cache = ReconciliationCache::default();
        let other = SessionId::generate();
        cache.merge(&snapshot_of(&[player(&other, 10.0, 10.0)]));

        let renamed = PlayerState::new(other.clone(), 90.0, 10.0, (50, 60, 70), "bob");
        cache.merge(&snapshot_of(&[renamed]));

        let cached = cache.get(&other).unwrap();
        assert_eq!(cached.color(), (50, 60, 70));
        assert_eq!(cached.username, "bob");
        assert_approx_eq!(cached.x, 30.0);
    }

    #[test]
    fn test_local_player_never_overwritten() {
        let mut cache = ReconciliationCache::default();
        let me = SessionId::generate();
        let local = player(&me, 200.0, 200.0);
        cache.set_local(&local);

        cache.merge(&snapshot_of(&[player(&me, 0.0, 0.0)]));
        cache.merge(&snapshot_of(&[player(&me, 770.0, 370.0)]));

        assert_eq!(cache.get(&me), Some(&local));
        assert_eq!(cache.local_id(), Some(&me));
    }

    #[test]
    fn test_merge_keeps_sessions_missing_from_snapshot() {
        let mut cache = ReconciliationCache::default();
        let gone = SessionId::generate();
        cache.merge(&snapshot_of(&[player(&gone, 10.0, 10.0)]));

        cache.merge(&WorldSnapshot::default());

        assert!(cache.get(&gone).is_some());
    }

    #[test]
    fn test_evict_absent_spares_local_player() {
        let mut cache = ReconciliationCache::default();
        let me = SessionId::generate();
        let stays = SessionId::generate();
        let leaves = SessionId::generate();
        cache.set_local(&player(&me, 1.0, 1.0));
        cache.merge(&snapshot_of(&[player(&stays, 5.0, 5.0), player(&leaves, 9.0, 9.0)]));

        let removed = cache.evict_absent(&snapshot_of(&[player(&stays, 5.0, 5.0)]));

        assert_eq!(removed, 1);
        assert!(cache.get(&me).is_some());
        assert!(cache.get(&stays).is_some());
        assert!(cache.get(&leaves).is_none());
        assert_eq!(cache.len(), 2);
    }
}
