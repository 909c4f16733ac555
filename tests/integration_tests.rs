//! Integration tests for the coin arena
//!
//! These tests run a real server on an ephemeral port and drive it with real
//! client network adapters (or raw sockets where the test needs to misbehave).

use client::network::{ClientError, NetworkClient, Poll};
use rand::rngs::mock::StepRng;
use server::network::{Server, ServerConfig, SharedState};
use shared::framing::{read_frame, write_frame, MAX_FRAME_LEN, MAX_SNAPSHOT_LEN};
use shared::protocol::{decode_identity, decode_snapshot, encode_state};
use shared::{CoinState, PlayerState, SessionId, WorldSnapshot, COIN_PADDING};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::sleep;

const WAIT_LIMIT: Duration = Duration::from_secs(3);

struct TestServer {
    addr: String,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_server(max_sessions: usize, lag: Duration) -> TestServer {
    let server = Server::bind(ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        lag,
        max_sessions,
        outbound_queue: 32,
    })
    .await
    .unwrap();

    let addr = server.local_addr().unwrap().to_string();
    let state = server.state();
    let handle = tokio::spawn(server.run());

    TestServer {
        addr,
        state,
        handle,
    }
}

fn player(id: &SessionId, x: f32, y: f32, name: &str) -> PlayerState {
    PlayerState::new(id.clone(), x, y, (120, 80, 60), name)
}

/// Polls until a snapshot satisfying `accept` arrives.
async fn wait_for_snapshot<F>(client: &mut NetworkClient, accept: F) -> WorldSnapshot
where
    F: Fn(&WorldSnapshot) -> bool,
{
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        match client.poll_snapshot() {
            Poll::Snapshot(snapshot) if accept(&snapshot) => return snapshot,
            Poll::Disconnected => panic!("client disconnected while waiting for snapshot"),
            _ => sleep(Duration::from_millis(5)).await,
        }
    }
    panic!("no matching snapshot within {:?}", WAIT_LIMIT);
}

async fn wait_for_session_count(state: &SharedState, expected: usize) {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if state.lock().await.clients.len() == expected {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("server never reached {} sessions", expected);
}

/// HANDSHAKE TESTS
mod handshake_tests {
    use super::*;

    /// Every connection gets its own id and a zero score before any update
    #[tokio::test]
    async fn handshake_issues_unique_ids() {
        let server = start_server(8, Duration::ZERO).await;

        let a = NetworkClient::connect(&server.addr).await.unwrap();
        let b = NetworkClient::connect(&server.addr).await.unwrap();
        assert_ne!(a.session_id(), b.session_id());

        let state = server.state.lock().await;
        assert_eq!(state.clients.len(), 2);
        assert_eq!(state.game.score(a.session_id()), Some(0));
        assert_eq!(state.game.score(b.session_id()), Some(0));
        assert_eq!(state.game.player_count(), 0);
    }

    /// The identity is the very first frame on the wire
    #[tokio::test]
    async fn identity_is_first_frame() {
        let server = start_server(8, Duration::ZERO).await;

        let mut stream = TcpStream::connect(&server.addr).await.unwrap();
        let payload = read_frame(&mut stream, MAX_FRAME_LEN).await.unwrap().unwrap();
        let id = decode_identity(&payload).unwrap();

        assert!(server.state.lock().await.clients.contains(&id));
    }

    /// Connections past the session limit are closed without an id
    #[tokio::test]
    async fn admission_limit_rejects_extra_sessions() {
        let server = start_server(1, Duration::ZERO).await;

        let first = NetworkClient::connect(&server.addr).await.unwrap();
        let second = NetworkClient::connect(&server.addr).await;
        assert!(matches!(second, Err(ClientError::ClosedBeforeIdentity)));

        drop(first);
        wait_for_session_count(&server.state, 0).await;

        let third = NetworkClient::connect(&server.addr).await;
        assert!(third.is_ok());
    }
}

/// SNAPSHOT TESTS
mod snapshot_tests {
    use super::*;

    /// Only sessions that have sent an update appear as players; all have scores
    #[tokio::test]
    async fn players_appear_after_first_update() {
        let server = start_server(8, Duration::ZERO).await;
        server.state.lock().await.game.set_coin(CoinState::new(700.0, 350.0));

        let mut a = NetworkClient::connect(&server.addr).await.unwrap();
        let mut b = NetworkClient::connect(&server.addr).await.unwrap();
        let a_id = a.session_id().clone();
        let b_id = b.session_id().clone();

        assert!(a.send_state(&player(&a_id, 100.0, 100.0, "alice")));

        for client in [&mut a, &mut b] {
            let snapshot = wait_for_snapshot(client, |s| s.players.contains_key(&a_id)).await;
            assert_eq!(snapshot.players.len(), 1);
            assert!(!snapshot.players.contains_key(&b_id));
            assert_eq!(snapshot.scores.get(&a_id), Some(&0));
            assert_eq!(snapshot.scores.get(&b_id), Some(&0));
            assert_eq!(snapshot.coin, CoinState::new(700.0, 350.0));
        }
    }

    /// A disconnected session vanishes from players and scores
    #[tokio::test]
    async fn disconnect_purges_session_from_snapshots() {
        let server = start_server(8, Duration::ZERO).await;
        server.state.lock().await.game.set_coin(CoinState::new(700.0, 350.0));

        let mut stays = NetworkClient::connect(&server.addr).await.unwrap();
        let mut leaves = NetworkClient::connect(&server.addr).await.unwrap();
        let stays_id = stays.session_id().clone();
        let leaves_id = leaves.session_id().clone();

        assert!(leaves.send_state(&player(&leaves_id, 300.0, 300.0, "bye")));
        wait_for_snapshot(&mut stays, |s| s.players.contains_key(&leaves_id)).await;

        drop(leaves);
        wait_for_session_count(&server.state, 1).await;

        assert!(stays.send_state(&player(&stays_id, 10.0, 10.0, "hi")));
        let snapshot = wait_for_snapshot(&mut stays, |s| s.players.contains_key(&stays_id)).await;

        assert!(!snapshot.players.contains_key(&leaves_id));
        assert!(!snapshot.scores.contains_key(&leaves_id));
    }

    /// A malformed frame is dropped and the session keeps working
    #[tokio::test]
    async fn malformed_frame_is_tolerated() {
        let server = start_server(8, Duration::ZERO).await;
        server.state.lock().await.game.set_coin(CoinState::new(700.0, 350.0));

        let mut stream = TcpStream::connect(&server.addr).await.unwrap();
        let identity = read_frame(&mut stream, MAX_FRAME_LEN).await.unwrap().unwrap();
        let id = decode_identity(&identity).unwrap();

        write_frame(&mut stream, b"\xff\xfe not json", MAX_FRAME_LEN)
            .await
            .unwrap();
        let me = player(&id, 42.0, 24.0, "raw");
        write_frame(&mut stream, &encode_state(&me).unwrap(), MAX_FRAME_LEN)
            .await
            .unwrap();

        let payload = tokio::time::timeout(WAIT_LIMIT, read_frame(&mut stream, MAX_SNAPSHOT_LEN))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let snapshot = decode_snapshot(&payload).unwrap();
        assert_eq!(snapshot.players.get(&id), Some(&me));
    }

    /// Updates are held back by the configured server-side lag
    #[tokio::test]
    async fn lag_delays_updates() {
        let lag = Duration::from_millis(150);
        let server = start_server(8, lag).await;
        server.state.lock().await.game.set_coin(CoinState::new(700.0, 350.0));

        let mut client = NetworkClient::connect(&server.addr).await.unwrap();
        let id = client.session_id().clone();

        let sent_at = Instant::now();
        assert!(client.send_state(&player(&id, 5.0, 5.0, "slow")));
        wait_for_snapshot(&mut client, |s| s.players.contains_key(&id)).await;

        assert!(sent_at.elapsed() >= lag);
    }
}

/// SCORING TESTS
mod scoring_tests {
    use super::*;

    /// Touching the coin scores exactly one point and moves the coin
    #[tokio::test]
    async fn pickup_scores_and_respawns_coin() {
        let server = start_server(8, Duration::ZERO).await;
        {
            let mut state = server.state.lock().await;
            state.game.set_coin(CoinState::new(105.0, 100.0));
            state.rng = Box::new(StepRng::new(0, 0));
        }

        let mut client = NetworkClient::connect(&server.addr).await.unwrap();
        let id = client.session_id().clone();
        assert!(client.send_state(&player(&id, 100.0, 100.0, "lucky")));

        let snapshot = wait_for_snapshot(&mut client, |s| s.players.contains_key(&id)).await;
        assert_eq!(snapshot.score_of(&id), 1);
        assert_eq!(snapshot.coin, CoinState::new(COIN_PADDING, COIN_PADDING));
    }

    /// Two sessions landing on the same coin at once: exactly one is credited
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pickup_credits_exactly_one() {
        let server = start_server(8, Duration::ZERO).await;
        {
            let mut state = server.state.lock().await;
            state.game.set_coin(CoinState::new(105.0, 100.0));
            state.rng = Box::new(StepRng::new(0, 0));
        }

        let mut a = NetworkClient::connect(&server.addr).await.unwrap();
        let mut b = NetworkClient::connect(&server.addr).await.unwrap();
        let a_id = a.session_id().clone();
        let b_id = b.session_id().clone();

        assert!(a.send_state(&player(&a_id, 100.0, 100.0, "a")));
        assert!(b.send_state(&player(&b_id, 100.0, 100.0, "b")));

        let snapshot = wait_for_snapshot(&mut a, |s| s.players.len() == 2).await;
        let total = snapshot.score_of(&a_id) + snapshot.score_of(&b_id);
        assert_eq!(total, 1);

        let state = server.state.lock().await;
        let server_total =
            state.game.score(&a_id).unwrap_or(0) + state.game.score(&b_id).unwrap_or(0);
        assert_eq!(server_total, 1);
    }
}
