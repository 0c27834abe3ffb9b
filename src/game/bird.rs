//! The player's body: vertical integration, jump impulse and floor death.

use serde::{Deserialize, Serialize};

use crate::game::collider::{Collider, Rect};
use crate::game::constants::bird::{
    FLOOR_Y, GRAVITY, HEIGHT, JUMP_VELOCITY, START_X, START_Y, TICK_DISTANCE, TILT,
    TILT_DEAD_ZONE, WIDTH,
};

/// Display rotation band derived from velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tilt {
    Up,
    #[default]
    Level,
    Down,
}

impl Tilt {
    pub fn from_velocity(velocity: f32) -> Self {
        if velocity <= -TILT_DEAD_ZONE {
            Tilt::Up
        } else if velocity >= TILT_DEAD_ZONE {
            Tilt::Down
        } else {
            Tilt::Level
        }
    }

    /// Band as -1, 0 or +1
    pub fn sign(&self) -> i8 {
        match self {
            Tilt::Up => -1,
            Tilt::Level => 0,
            Tilt::Down => 1,
        }
    }

    /// Rotation in turns for rendering
    pub fn turns(&self) -> f32 {
        self.sign() as f32 * TILT
    }
}

/// Controllable body
#[derive(Debug, Clone)]
pub struct Bird {
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
    tilt: Tilt,
    started: bool,
    jumping: bool,
    dead: bool,
    collider: Collider,
}

impl Bird {
    pub fn new() -> Self {
        Self {
            x: START_X,
            y: START_Y,
            velocity: 0.0,
            tilt: Tilt::Level,
            started: false,
            jumping: false,
            dead: false,
            collider: Collider::new("bird", Rect::new(START_X, START_Y, WIDTH, HEIGHT)),
        }
    }

    pub fn tilt(&self) -> Tilt {
        self.tilt
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_jump_pending(&self) -> bool {
        self.jumping
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    /// Launch (if not yet) and queue a jump impulse for the next tick
    pub fn jump(&mut self) {
        self.started = true;
        self.jumping = true;
    }

    /// Mark the body dead. Death is permanent.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// Advance one tick. Returns true if this tick killed the body.
    pub fn advance(&mut self) -> bool {
        let was_dead = self.dead;

        if self.started {
            self.velocity += GRAVITY;

            if self.jumping && !self.dead {
                self.velocity = JUMP_VELOCITY;
                self.jumping = false;
            }

            self.y += self.velocity * TICK_DISTANCE;

            if self.y > FLOOR_Y {
                self.dead = true;
            }
        }

        self.tilt = Tilt::from_velocity(self.velocity);
        self.collider.set_position(self.x, self.y);

        !was_dead && self.dead
    }
}

impl Default for Bird {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_body_is_frozen() {
        let mut bird = Bird::new();
        for _ in 0..100 {
            assert!(!bird.advance());
        }
        assert_eq!(bird.y, START_Y);
        assert_eq!(bird.velocity, 0.0);
        assert!(!bird.is_dead());
        assert_eq!(bird.tilt(), Tilt::Level);
    }

    #[test]
    fn test_jump_sets_upward_velocity() {
        let mut bird = Bird::new();
        bird.jump();
        bird.advance();

        assert_eq!(bird.velocity, JUMP_VELOCITY);
        assert!(bird.y < START_Y);
        assert!(!bird.is_jump_pending());
        assert_eq!(bird.tilt(), Tilt::Up);
    }

    #[test]
    fn test_gravity_accumulates() {
        let mut bird = Bird::new();
        bird.jump();
        bird.advance();
        bird.advance();
        assert!((bird.velocity - (JUMP_VELOCITY + GRAVITY)).abs() < 1e-6);
    }

    #[test]
    fn test_dies_on_exact_floor_crossing_tick() {
        let mut bird = Bird::new();
        bird.jump();

        let mut ticks = 0;
        loop {
            let before = bird.y;
            assert!(!bird.is_dead(), "died before crossing (y = {})", before);
            let died = bird.advance();
            ticks += 1;
            if bird.y > FLOOR_Y {
                assert!(died);
                assert!(bird.is_dead());
                break;
            }
            assert!(!died);
            assert!(ticks < 10_000);
        }
    }

    #[test]
    fn test_death_is_sticky_and_physics_continue() {
        let mut dead = Bird::new();
        dead.jump();
        while !dead.is_dead() {
            dead.advance();
        }

        let mut expected_y = dead.y;
        let mut expected_velocity = dead.velocity;

        for _ in 0..50 {
            // jumps are ignored once dead
            dead.jump();
            assert!(!dead.advance());
            assert!(dead.is_dead());

            expected_velocity += GRAVITY;
            expected_y += expected_velocity * TICK_DISTANCE;
            assert!((dead.velocity - expected_velocity).abs() < 1e-5);
            assert!((dead.y - expected_y).abs() < 1e-2);
        }
    }

    #[test]
    fn test_collider_follows_position() {
        let mut bird = Bird::new();
        bird.jump();
        for _ in 0..10 {
            bird.advance();
            assert_eq!(bird.collider().bounds.x, bird.x);
            assert_eq!(bird.collider().bounds.y, bird.y);
        }
    }

    #[test]
    fn test_tilt_bands() {
        assert_eq!(Tilt::from_velocity(0.0), Tilt::Level);
        assert_eq!(Tilt::from_velocity(0.099), Tilt::Level);
        assert_eq!(Tilt::from_velocity(-0.099), Tilt::Level);
        assert_eq!(Tilt::from_velocity(0.1), Tilt::Down);
        assert_eq!(Tilt::from_velocity(-0.1), Tilt::Up);
        assert_eq!(Tilt::Up.sign(), -1);
        assert_eq!(Tilt::Down.turns(), TILT);
    }

    #[test]
    fn test_tilt_recomputed_before_launch() {
        let mut bird = Bird::new();
        bird.velocity = 0.5;
        bird.advance();
        assert_eq!(bird.tilt(), Tilt::Down);
        assert_eq!(bird.y, START_Y);
    }
}
