//! Snapshot fan-out
//!
//! Runs on whichever session task triggered it, while that task holds the
//! world lock. The snapshot is taken and encoded exactly once; every
//! recipient gets the same shared bytes.

use crate::client_manager::Frame;
use crate::network::ServerState;
use log::{debug, error, warn};
use shared::framing::{encode_frame, MAX_SNAPSHOT_LEN};
use shared::protocol::encode_snapshot;
use shared::SessionId;
use tokio::sync::mpsc::error::TrySendError;

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BroadcastReport {
    /// Sessions whose queue accepted the snapshot
    pub delivered: usize,
    /// Sessions whose queue was full; they skip this snapshot only
    pub dropped: usize,
    /// Sessions whose writer is gone; they have been disconnected
    pub evicted: Vec<SessionId>,
    /// Sessions left without this snapshot because it could not be encoded
    pub unsent: usize,
}

/// Sends the current world snapshot to every registered session.
///
/// A failure for one session never stops delivery to the rest. Sessions
/// whose connection is dead are purged from the registry and the world
/// before this returns.
pub fn broadcast(state: &mut ServerState) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    if state.clients.is_empty() {
        return report;
    }

    let snapshot = state.game.get_snapshot();
    let encoded = encode_snapshot(&snapshot)
        .and_then(|payload| encode_frame(&payload, MAX_SNAPSHOT_LEN));
    let frame: Frame = match encoded {
        Ok(bytes) => bytes.into(),
        Err(e) => {
            report.unsent = state.clients.len();
            error!(
                "Failed to encode snapshot, {} sessions left without it: {}",
                report.unsent, e
            );
            return report;
        }
    };

    for (id, sender) in state.clients.senders() {
        match sender.try_send(Frame::clone(&frame)) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for {}, skipping snapshot", id.short());
                report.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => report.evicted.push(id.clone()),
        }
    }

    for id in &report.evicted {
        warn!("Send to {} failed, disconnecting", id.short());
        state.disconnect(id);
    }

    debug!(
        "Broadcast {} bytes: {} delivered, {} dropped, {} evicted",
        frame.len(),
        report.delivered,
        report.dropped,
        report.evicted.len()
    );
    report
}
