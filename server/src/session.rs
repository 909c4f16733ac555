//! Per-connection session handling
//!
//! Lifecycle: connected → registered (id issued and sent) → active
//! (receive / update / broadcast) → terminated. Every way out of the active
//! loop ends in the same idempotent cleanup.

use crate::client_manager::Frame;
use crate::network::{ServerConfig, SharedState};
use log::{debug, error, info, warn};
use shared::framing::{read_frame, write_encoded, write_frame, MAX_FRAME_LEN};
use shared::protocol::{decode_state, encode_identity};
use shared::{ProtocolError, SessionId};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

/// Ways a session finishes without a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the stream cleanly
    PeerClosed,
    /// A broadcast found the session's writer dead and removed it
    Evicted,
    /// Turned away at the session limit before an id was issued
    Rejected,
}

/// Drives one connection from accept to cleanup.
///
/// Cleanup has already run by the time this returns, whatever the outcome.
pub async fn run_session<S>(
    stream: S,
    addr: SocketAddr,
    state: SharedState,
    config: Arc<ServerConfig>,
) -> Result<SessionEnd, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, rx) = mpsc::channel::<Frame>(config.outbound_queue);

    let id = {
        let mut guard = state.lock().await;
        guard.register(addr, tx)
    };
    let Some(id) = id else {
        warn!("Rejecting {}: session limit reached", addr);
        return Ok(SessionEnd::Rejected);
    };

    // Snapshots broadcast from now on wait in the queue until the writer
    // starts, so the identity is always the first frame on the wire.
    if let Err(e) = write_frame(&mut writer, &encode_identity(&id), MAX_FRAME_LEN).await {
        error!("Failed to send id to {}: {}", id.short(), e);
        state.lock().await.disconnect(&id);
        return Err(e);
    }
    info!("Sent id {} to {}", id.short(), addr);

    let writer_task = tokio::spawn(write_loop(writer, rx, id.clone()));

    let outcome = receive_loop(&mut reader, &id, &state, &config).await;
    match &outcome {
        Ok(SessionEnd::Evicted) => info!("Client {} was evicted", id.short()),
        Ok(_) => info!("Client {} closed the connection", id.short()),
        Err(e) => error!("Connection with {} failed: {}", id.short(), e),
    }

    state.lock().await.disconnect(&id);
    writer_task.abort();
    outcome
}

/// Reads state updates until the stream ends or fails.
async fn receive_loop<S>(
    reader: &mut ReadHalf<S>,
    id: &SessionId,
    state: &SharedState,
    config: &ServerConfig,
) -> Result<SessionEnd, ProtocolError>
where
    S: AsyncRead + AsyncWrite,
{
    loop {
        let Some(payload) = read_frame(reader, MAX_FRAME_LEN).await? else {
            return Ok(SessionEnd::PeerClosed);
        };

        // Every message pays the delay, including ones dropped below.
        if !config.lag.is_zero() {
            tokio::time::sleep(config.lag).await;
        }

        let player = match decode_state(&payload) {
            Ok(player) => player,
            Err(e) => {
                warn!("Dropping bad payload from {}: {}", id.short(), e);
                continue;
            }
        };

        let mut guard = state.lock().await;
        match guard.handle_update(id, player) {
            Some(picked_up) => debug!("Update from {} (pickup: {})", id.short(), picked_up),
            None => return Ok(SessionEnd::Evicted),
        }
    }
}

/// Sole writer on the socket. Ends when the queue closes or a write fails.
async fn write_loop<S>(mut writer: WriteHalf<S>, mut rx: mpsc::Receiver<Frame>, id: SessionId)
where
    S: AsyncRead + AsyncWrite,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_encoded(&mut writer, &frame).await {
            warn!("Write to {} failed: {}", id.short(), e);
            break;
        }
    }
}
