//! Snake: a small game driven by the engine.
//!
//! WASD or arrow keys steer, ESC quits. Set `GRIDLOOP_LOG=<file>` to write
//! engine logs to a file (the terminal itself is busy with the game).

use gridloop::{Color, Context, Engine, Game, KeyEvent, EXIT_KEY};
use rand::Rng;
use std::collections::VecDeque;
use std::fs::File;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const WIDTH: i32 = 40;
const HEIGHT: i32 = 20;
const STEP: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Point {
    x: i32,
    y: i32,
}

struct World {
    body: VecDeque<Point>,
    food: Point,
    direction: Point,
    score: u32,
    game_over: bool,
    since_step: Duration,
}

impl World {
    fn new() -> Self {
        let mut world = Self {
            body: VecDeque::from([Point {
                x: WIDTH / 2,
                y: HEIGHT / 2,
            }]),
            food: Point { x: 0, y: 0 },
            direction: Point { x: 1, y: 0 },
            score: 0,
            game_over: false,
            since_step: Duration::ZERO,
        };
        world.spawn_food();
        world
    }

    fn steer(&mut self, key: KeyEvent) {
        let turn = match key {
            KeyEvent::Up | KeyEvent::ArrowUp => Point { x: 0, y: -1 },
            KeyEvent::Down | KeyEvent::ArrowDown => Point { x: 0, y: 1 },
            KeyEvent::Left | KeyEvent::ArrowLeft => Point { x: -1, y: 0 },
            KeyEvent::Right | KeyEvent::ArrowRight => Point { x: 1, y: 0 },
            _ => return,
        };
        // No reversing into yourself.
        if (turn.x != 0 && self.direction.x == 0) || (turn.y != 0 && self.direction.y == 0) {
            self.direction = turn;
        }
    }

    fn step(&mut self) {
        let head = self.body[0];
        let next = Point {
            x: head.x + self.direction.x,
            y: head.y + self.direction.y,
        };

        if next.x < 0 || next.x >= WIDTH || next.y < 0 || next.y >= HEIGHT || self.occupied(next)
        {
            self.game_over = true;
            tracing::info!(score = self.score, "game over");
            return;
        }

        self.body.push_front(next);
        if next == self.food {
            self.score += 10;
            if !self.spawn_food() {
                self.game_over = true;
                tracing::info!(score = self.score, "board filled");
            }
        } else {
            self.body.pop_back();
        }
    }

    fn occupied(&self, p: Point) -> bool {
        self.body.contains(&p)
    }

    /// Place food on a free cell. Returns `false` when none is left.
    fn spawn_food(&mut self) -> bool {
        if self.body.len() >= (WIDTH * HEIGHT) as usize {
            return false;
        }
        let mut rng = rand::thread_rng();
        loop {
            let candidate = Point {
                x: rng.gen_range(0..WIDTH),
                y: rng.gen_range(0..HEIGHT),
            };
            if !self.occupied(candidate) {
                self.food = candidate;
                return true;
            }
        }
    }
}

struct Snake {
    world: Mutex<World>,
}

impl Snake {
    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Game for Snake {
    fn on_init(&self, _ctx: &Context<'_>) {
        *self.world() = World::new();
    }

    fn on_update(&self, ctx: &Context<'_>, delta: Duration) {
        let mut world = self.world();
        if world.game_over {
            return;
        }

        // Popping the exit key hides it from the engine's watcher.
        let key = ctx.input().get_key();
        if key == EXIT_KEY {
            ctx.stop();
            return;
        }
        world.steer(key);

        world.since_step += delta;
        if world.since_step >= STEP {
            world.since_step = Duration::ZERO;
            world.step();
        }
    }

    fn on_render(&self, ctx: &Context<'_>) {
        let world = self.world();
        let mut console = ctx.console();
        console.clear();

        console.set_color(Color::BrightWhite);
        console.draw_rect(1, 1, WIDTH + 2, HEIGHT + 2, '#');

        console.set_color(Color::BrightGreen);
        for segment in &world.body {
            console.draw_point(segment.x + 2, segment.y + 2, 'O');
        }
        console.set_color(Color::BrightYellow);
        let head = world.body[0];
        console.draw_point(head.x + 2, head.y + 2, '@');

        console.set_color(Color::BrightRed);
        console.draw_point(world.food.x + 2, world.food.y + 2, '*');

        console.set_color(Color::BrightCyan);
        console.draw_text(WIDTH / 2, HEIGHT + 4, &format!("Score: {}", world.score));
        console.draw_text(WIDTH - 10, HEIGHT + 4, &format!("FPS: {}", ctx.measured_rate()));

        if world.game_over {
            console.set_color(Color::BrightRed);
            console.draw_text(WIDTH / 2 - 5, HEIGHT / 2, "GAME OVER!");
            console.draw_text(WIDTH / 2 - 8, HEIGHT / 2 + 1, "Press ESC to exit");
        }
        console.reset_color();
    }

    fn on_shutdown(&self, ctx: &Context<'_>) {
        let score = self.world().score;
        let mut console = ctx.console();
        console.clear();
        console.draw_text(1, 1, "Thanks for playing!");
        console.draw_text(1, 2, &format!("Final Score: {score}"));
        console.move_to(1, 4);
    }
}

fn init_tracing() {
    let Ok(path) = std::env::var("GRIDLOOP_LOG") else {
        return;
    };
    let Ok(file) = File::create(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init();
}

fn main() {
    init_tracing();

    let game = Snake {
        world: Mutex::new(World::new()),
    };
    let mut engine = Engine::new();
    engine.set_target_rate(60);

    if let Err(e) = engine.run(&game) {
        eprintln!("snake: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_cell() -> impl Iterator<Item = Point> {
        (0..HEIGHT).flat_map(|y| (0..WIDTH).map(move |x| Point { x, y }))
    }

    #[test]
    fn test_no_food_on_full_board() {
        let mut world = World::new();
        world.body = every_cell().collect();
        assert!(!world.spawn_food());
    }

    #[test]
    fn test_eating_last_free_cell_ends_game() {
        let mut world = World::new();
        let head = Point { x: 1, y: 0 };
        let last = Point { x: 0, y: 0 };
        world.body = std::iter::once(head)
            .chain(every_cell().filter(|&p| p != head && p != last))
            .collect();
        world.direction = Point { x: -1, y: 0 };
        world.food = last;

        world.step();

        assert!(world.game_over);
        assert_eq!(world.score, 10);
        assert_eq!(world.body.len(), (WIDTH * HEIGHT) as usize);
    }

    #[test]
    fn test_steer_ignores_reversal() {
        let mut world = World::new();
        world.steer(KeyEvent::ArrowLeft);
        assert_eq!(world.direction, Point { x: 1, y: 0 });
        world.steer(KeyEvent::Up);
        assert_eq!(world.direction, Point { x: 0, y: -1 });
    }
}
