//! Client network adapter
//!
//! The socket is driven by two background tasks on the tokio runtime. The
//! render loop only ever touches channels, so neither `send_state` nor
//! `poll_snapshot` can stall a frame.

use log::{debug, error, info, warn};
use shared::framing::{encode_frame, read_frame, write_encoded, MAX_FRAME_LEN, MAX_SNAPSHOT_LEN};
use shared::protocol::{decode_identity, decode_snapshot, encode_state};
use shared::{PlayerState, ProtocolError, SessionId, WorldSnapshot};
use std::io;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long `connect` waits for the server to send the session id
pub const IDENTITY_TIMEOUT: Duration = Duration::from_secs(1);

/// Framed updates waiting for the writer task
const OUTBOUND_QUEUE: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("no session id received within {0:?}")]
    IdentityTimeout(Duration),
    #[error("server closed the connection before sending a session id")]
    ClosedBeforeIdentity,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result of one non-blocking poll
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    /// Newest snapshot received since the last poll
    Snapshot(WorldSnapshot),
    /// Nothing new yet
    Empty,
    /// The server closed the stream or the connection failed
    Disconnected,
}

enum NetworkEvent {
    Snapshot(WorldSnapshot),
    Disconnected,
}

pub struct NetworkClient {
    session_id: SessionId,
    outbound: mpsc::Sender<Vec<u8>>,
    events: mpsc::UnboundedReceiver<NetworkEvent>,
    disconnected: bool,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl NetworkClient {
    /// Connects and waits (bounded) for the identity message.
    ///
    /// Must be called from within a tokio runtime; the background tasks are
    /// spawned onto it.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        info!("Connecting to {}...", addr);

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let (mut reader, writer) = stream.into_split();

        let payload = timeout(IDENTITY_TIMEOUT, read_frame(&mut reader, MAX_FRAME_LEN))
            .await
            .map_err(|_| ClientError::IdentityTimeout(IDENTITY_TIMEOUT))??
            .ok_or(ClientError::ClosedBeforeIdentity)?;
        let session_id = decode_identity(&payload)?;
        info!("Connected! Session ID: {}", session_id.short());

        let (event_tx, events) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);

        let reader_task = spawn_network_receiver(reader, event_tx);
        let writer_task = spawn_network_sender(writer, outbound_rx);

        Ok(Self {
            session_id,
            outbound,
            events,
            disconnected: false,
            reader_task,
            writer_task,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Queues a state update. Returns false once the connection is gone, or
    /// if the update cannot be framed.
    ///
    /// A full queue only skips this update; the caller sends a newer one on
    /// its next throttle tick.
    pub fn send_state(&mut self, player: &PlayerState) -> bool {
        if self.disconnected {
            return false;
        }

        let frame = match encode_state(player).and_then(|p| encode_frame(&p, MAX_FRAME_LEN)) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode state: {}", e);
                return false;
            }
        };

        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full, skipping update");
                true
            }
            Err(TrySendError::Closed(_)) => {
                self.disconnected = true;
                false
            }
        }
    }

    /// Drains everything received so far and returns the newest snapshot.
    pub fn poll_snapshot(&mut self) -> Poll {
        if self.disconnected {
            return Poll::Disconnected;
        }

        let mut latest = None;
        loop {
            match self.events.try_recv() {
                Ok(NetworkEvent::Snapshot(snapshot)) => latest = Some(snapshot),
                Ok(NetworkEvent::Disconnected) | Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match latest {
            Some(snapshot) => Poll::Snapshot(snapshot),
            None if self.disconnected => Poll::Disconnected,
            None => Poll::Empty,
        }
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

fn spawn_network_receiver(
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<NetworkEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader, MAX_SNAPSHOT_LEN).await {
                Ok(Some(payload)) => match decode_snapshot(&payload) {
                    Ok(snapshot) => {
                        if events.send(NetworkEvent::Snapshot(snapshot)).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("Dropping malformed snapshot: {}", e),
                },
                Ok(None) => {
                    info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    error!("Error receiving from server: {}", e);
                    break;
                }
            }
        }

        let _ = events.send(NetworkEvent::Disconnected);
    })
}

fn spawn_network_sender(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Vec<u8>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = write_encoded(&mut writer, &frame).await {
                error!("Error sending to server: {}", e);
                break;
            }
        }
    })
}
