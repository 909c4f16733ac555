use clap::Parser;
use client::game::{ClientGameState, ConnectionStatus, SendThrottle};
use client::input::{poll_directions, UsernamePrompt};
use client::network::{NetworkClient, Poll};
use client::rendering::{Renderer, HUD_HEIGHT};
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::{
    ARENA_HEIGHT, ARENA_WIDTH, DEFAULT_HOST, DEFAULT_PORT, FRAME_INTERVAL, MAX_USERNAME_LEN,
    SEND_INTERVAL,
};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT))]
    server: String,

    /// Username to join with; skips the in-window prompt
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Minimum time between state updates sent to the server, in milliseconds
    #[arg(long, default_value_t = SEND_INTERVAL.as_millis() as u64)]
    send_interval_ms: u64,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Coin Arena".to_owned(),
        window_width: ARENA_WIDTH as i32,
        window_height: (ARENA_HEIGHT + HUD_HEIGHT) as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return;
        }
    };

    let renderer = Renderer::new();
    renderer.render_message("Connecting...", YELLOW);
    next_frame().await;

    let mut network = match runtime.block_on(NetworkClient::connect(&args.server)) {
        Ok(network) => network,
        Err(e) => {
            error!("{}", e);
            show_until_escape(&renderer, &format!("Connection failed: {}", e)).await;
            return;
        }
    };

    let username: String = match args.username {
        Some(name) => name.chars().take(MAX_USERNAME_LEN).collect(),
        None => match prompt_username(&renderer).await {
            Some(name) => name,
            None => return,
        },
    };
    info!("Joining as {}", username);

    let mut game = ClientGameState::new();
    let mut throttle = SendThrottle::new(Duration::from_millis(args.send_interval_ms));

    let local = game
        .on_connected(network.session_id().clone(), &username, &mut ::rand::thread_rng())
        .clone();
    if network.send_state(&local) {
        throttle.mark_sent(Instant::now());
    } else {
        game.on_disconnected();
    }

    info!("Controls: W/A/S/D to move, Esc to quit");

    loop {
        let frame_start = Instant::now();

        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        if game.status() == ConnectionStatus::Connected {
            game.apply_moves(&poll_directions());

            if let Some(update) = game.take_pending_update(&mut throttle, frame_start) {
                if !network.send_state(&update) {
                    warn!("Failed to send state update");
                    game.on_disconnected();
                }
            }

            match network.poll_snapshot() {
                Poll::Snapshot(snapshot) => game.on_snapshot(snapshot),
                Poll::Empty => {}
                Poll::Disconnected => game.on_disconnected(),
            }
        }

        game.tick();
        renderer.render(&game);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_INTERVAL {
            std::thread::sleep(FRAME_INTERVAL - elapsed);
        }
        next_frame().await;
    }

    drop(network);
    runtime.shutdown_background();
}

/// Runs the username prompt until Enter. None if the user quit instead.
async fn prompt_username(renderer: &Renderer) -> Option<String> {
    let mut prompt = UsernamePrompt::new();
    loop {
        if is_key_pressed(KeyCode::Escape) {
            return None;
        }
        if let Some(name) = prompt.update() {
            return Some(name);
        }
        renderer.render_prompt(&prompt);
        next_frame().await;
    }
}

async fn show_until_escape(renderer: &Renderer, text: &str) {
    while !is_key_pressed(KeyCode::Escape) {
        renderer.render_message(text, RED);
        next_frame().await;
    }
}
