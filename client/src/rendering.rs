use crate::game::{ClientGameState, ConnectionStatus};
use crate::input::UsernamePrompt;
use macroquad::prelude::*;
use shared::{PlayerState, ARENA_HEIGHT, ARENA_WIDTH, COIN_SIZE, MAX_USERNAME_LEN, PLAYER_SIZE};

/// Strip under the arena holding the status line
pub const HUD_HEIGHT: f32 = 70.0;

const BACKGROUND: Color = Color::new(0.1, 0.1, 0.1, 1.0);
const ARENA_COLOR: Color = Color::new(0.16, 0.16, 0.2, 1.0);
const COIN_COLOR: Color = Color::new(1.0, 0.84, 0.0, 1.0);

/// Corner radius of player avatars
const AVATAR_RADIUS: f32 = 8.0;
/// Width of the ring drawn around the local avatar
const LOCAL_RING: f32 = 2.0;

/// A filled rectangle with circular corners, built from two overlapping bars
/// and a disc at each corner.
#[derive(Debug, Clone, PartialEq)]
struct RoundedRect {
    bars: [Rect; 2],
    corners: [Vec2; 4],
    radius: f32,
}

impl RoundedRect {
    /// The radius is clamped to half the shorter side.
    fn new(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Self {
        let r = radius.clamp(0.0, w.min(h) / 2.0);
        RoundedRect {
            bars: [
                Rect::new(x + r, y, w - 2.0 * r, h),
                Rect::new(x, y + r, w, h - 2.0 * r),
            ],
            corners: [
                vec2(x + r, y + r),
                vec2(x + w - r, y + r),
                vec2(x + r, y + h - r),
                vec2(x + w - r, y + h - r),
            ],
            radius: r,
        }
    }

    /// Whether a point falls on the filled shape
    fn contains(&self, point: Vec2) -> bool {
        self.bars.iter().any(|bar| bar.contains(point))
            || self.corners.iter().any(|c| c.distance(point) <= self.radius)
    }

    fn fill(&self, color: Color) {
        for bar in &self.bars {
            draw_rectangle(bar.x, bar.y, bar.w, bar.h, color);
        }
        for corner in &self.corners {
            draw_circle(corner.x, corner.y, self.radius, color);
        }
    }
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT + HUD_HEIGHT,
        }
    }

    /// Draws one frame of the arena.
    ///
    /// Order matters: background, coin, every known avatar, then the
    /// scoreboard and status line on top.
    pub fn render(&self, game: &ClientGameState) {
        clear_background(BACKGROUND);
        draw_rectangle(0.0, 0.0, ARENA_WIDTH, ARENA_HEIGHT, ARENA_COLOR);

        if let Some(coin) = game.coin() {
            let (cx, cy) = coin.center();
            draw_circle(cx, cy, COIN_SIZE / 2.0, COIN_COLOR);
        }

        let local_id = game.local().map(|p| &p.id);
        for player in game.players() {
            self.draw_player(player, local_id == Some(&player.id));
        }

        self.draw_scoreboard(&game.scoreboard());
        self.draw_status(game);
    }

    fn draw_player(&self, player: &PlayerState, is_local: bool) {
        let (r, g, b) = player.color();
        let fill = Color::from_rgba(r, g, b, 255);

        if is_local {
            // The local avatar sits on a slightly larger white one.
            RoundedRect::new(
                player.x - LOCAL_RING,
                player.y - LOCAL_RING,
                PLAYER_SIZE + 2.0 * LOCAL_RING,
                PLAYER_SIZE + 2.0 * LOCAL_RING,
                AVATAR_RADIUS + LOCAL_RING,
            )
            .fill(WHITE);
        }
        RoundedRect::new(player.x, player.y, PLAYER_SIZE, PLAYER_SIZE, AVATAR_RADIUS).fill(fill);

        if !is_local && !player.username.is_empty() {
            let size = measure_text(&player.username, None, 16, 1.0);
            let x = player.x + (PLAYER_SIZE - size.width) / 2.0;
            draw_text(&player.username, x, player.y - 4.0, 16.0, LIGHTGRAY);
        }
    }

    fn draw_scoreboard(&self, rows: &[(String, u32)]) {
        let x = self.width - 150.0;
        let mut y = 20.0;

        draw_text("Scores", x, y, 20.0, WHITE);
        for (rank, (label, score)) in rows.iter().enumerate() {
            y += 18.0;
            draw_text(&format!("{}. {}: {}", rank + 1, label, score), x, y, 18.0, WHITE);
        }
    }

    fn draw_status(&self, game: &ClientGameState) {
        let color = match game.status() {
            ConnectionStatus::Connected => GREEN,
            ConnectionStatus::Connecting => YELLOW,
            ConnectionStatus::Disconnected => RED,
        };
        draw_text(&game.status_line(), 10.0, ARENA_HEIGHT + 30.0, 20.0, color);

        if game.status() == ConnectionStatus::Disconnected {
            let notice = "Disconnected from server. Press Esc to quit.";
            self.draw_centered(notice, ARENA_HEIGHT / 2.0, RED);
        }
    }

    pub fn render_prompt(&self, prompt: &UsernamePrompt) {
        clear_background(BACKGROUND);

        let mid = self.height / 2.0;
        self.draw_centered("Enter your username:", mid - 30.0, WHITE);

        let box_width = 240.0;
        let box_x = (self.width - box_width) / 2.0;
        draw_rectangle_lines(box_x, mid - 10.0, box_width, 36.0, 2.0, WHITE);
        draw_text(prompt.text(), box_x + 10.0, mid + 16.0, 24.0, WHITE);

        let hint = format!("Enter to join, up to {} characters", MAX_USERNAME_LEN);
        self.draw_centered(&hint, mid + 60.0, GRAY);
    }

    /// Full-screen message, used while connecting or after a failed connect
    pub fn render_message(&self, text: &str, color: Color) {
        clear_background(BACKGROUND);
        self.draw_centered(text, self.height / 2.0, color);
    }

    fn draw_centered(&self, text: &str, y: f32, color: Color) {
        let size = measure_text(text, None, 24, 1.0);
        draw_text(text, (self.width - size.width) / 2.0, y, 24.0, color);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar() -> RoundedRect {
        RoundedRect::new(100.0, 50.0, PLAYER_SIZE, PLAYER_SIZE, AVATAR_RADIUS)
    }

    #[test]
    fn test_avatar_corners_are_cut() {
        let shape = avatar();
        assert!(!shape.contains(vec2(100.5, 50.5)));
        assert!(!shape.contains(vec2(129.5, 50.5)));
        assert!(!shape.contains(vec2(100.5, 79.5)));
        assert!(!shape.contains(vec2(129.5, 79.5)));
    }

    #[test]
    fn test_avatar_body_and_edges_are_filled() {
        let shape = avatar();
        assert!(shape.contains(vec2(115.0, 65.0)));
        assert!(shape.contains(vec2(115.0, 50.5)));
        assert!(shape.contains(vec2(100.5, 65.0)));
        // Just inside a corner's arc
        assert!(shape.contains(vec2(103.0, 53.0)));
    }

    #[test]
    fn test_radius_clamped_to_half_side() {
        let shape = RoundedRect::new(0.0, 0.0, 10.0, 20.0, AVATAR_RADIUS);
        assert_eq!(shape.radius, 5.0);
        assert_eq!(shape.bars[0].w, 0.0);

        let square = RoundedRect::new(0.0, 0.0, 10.0, 10.0, -3.0);
        assert_eq!(square.radius, 0.0);
        assert_eq!(square.bars[1], Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
