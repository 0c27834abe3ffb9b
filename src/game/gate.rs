//! Obstacle pairs: a top barrier, a bottom barrier and the scoring gap between.
//!
//! Gates are never destroyed. Once one scrolls past the trailing edge it is
//! moved behind the rightmost gate with a fresh gap, which to an observer is
//! indistinguishable from a new gate.

use rand::Rng;
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::game::collider::{Collider, Rect};
use crate::game::constants::gate::{BARRIER_HEIGHT, COLLIDER_WIDTH, TOP_OVERHANG};

/// Stable gate identifier, kept across recycling
pub type GateId = Uuid;

/// Outcome of testing the body against one gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateContact {
    /// Body overlaps the top or bottom barrier
    pub barrier_hit: bool,
    /// Body just left the scoring gap
    pub scored: bool,
}

#[derive(Debug, Clone)]
pub struct Gate {
    id: GateId,
    pub x: f32,
    top_y: f32,
    bottom_y: f32,
    visible: bool,
    top: Collider,
    bottom: Collider,
    score: Collider,
}

impl Gate {
    pub fn new(x: f32, top_y: f32, gap: f32) -> Self {
        let mut gate = Self {
            id: Uuid::new_v4(),
            x,
            top_y,
            bottom_y: top_y + gap,
            visible: true,
            top: Collider::new("gate-top", Rect::default()),
            bottom: Collider::new("gate-bottom", Rect::default()),
            score: Collider::new("gate-score", Rect::default()),
        };
        gate.sync_colliders();
        gate
    }

    /// Gate of the initial pool at `x` with a random level and the initial gap
    pub fn spawn<R: Rng + ?Sized>(x: f32, config: &SimulationConfig, rng: &mut R) -> Self {
        let top_y = rng.gen_range(0.0..config.vertical_variation);
        Self::new(x, top_y, config.initial_gap)
    }

    pub fn id(&self) -> GateId {
        self.id
    }

    pub fn top_y(&self) -> f32 {
        self.top_y
    }

    pub fn bottom_y(&self) -> f32 {
        self.bottom_y
    }

    pub fn gap(&self) -> f32 {
        self.bottom_y - self.top_y
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn top_collider(&self) -> &Collider {
        &self.top
    }

    pub fn bottom_collider(&self) -> &Collider {
        &self.bottom
    }

    pub fn score_collider(&self) -> &Collider {
        &self.score
    }

    /// Scroll left by `speed`. Returns true if the gate was recycled to
    /// `recycle_target_x`.
    ///
    /// Visibility is only switched on inside the visible band; gates outside
    /// it keep their last value.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        speed: f32,
        recycle_target_x: f32,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> bool {
        self.x -= speed;

        let recycled = if self.x < config.trailing_edge {
            self.visible = false;
            self.reroll_gap(config, rng);
            self.x = recycle_target_x;
            true
        } else {
            if self.x > config.visible_min && self.x < config.visible_max {
                self.visible = true;
            }
            false
        };

        self.sync_colliders();
        recycled
    }

    /// Test the body against all three colliders.
    ///
    /// Both barriers are always tested so their latches stay accurate.
    pub fn collide(&mut self, body: &Collider) -> GateContact {
        let top_hit = self.top.overlaps(body).overlapping;
        let bottom_hit = self.bottom.overlaps(body).overlapping;
        let scored = self.score.overlaps(body).left();

        GateContact {
            barrier_hit: top_hit || bottom_hit,
            scored,
        }
    }

    fn reroll_gap<R: Rng + ?Sized>(&mut self, config: &SimulationConfig, rng: &mut R) {
        self.top_y = rng.gen_range(0.0..config.vertical_variation);
        let gap = config.min_gap + rng.gen_range(0.0..config.gap_variation);
        self.bottom_y = self.top_y + gap;
        debug_assert!(self.gap() >= config.min_gap);
    }

    fn sync_colliders(&mut self) {
        self.top.bounds = Rect::new(
            self.x,
            self.top_y + TOP_OVERHANG - BARRIER_HEIGHT,
            COLLIDER_WIDTH,
            BARRIER_HEIGHT,
        );
        self.bottom.bounds = Rect::new(self.x, self.bottom_y, COLLIDER_WIDTH, BARRIER_HEIGHT);
        self.score.bounds = Rect::new(self.x, self.top_y, COLLIDER_WIDTH, self.gap());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn body_at(x: f32, y: f32) -> Collider {
        Collider::new("bird", Rect::new(x, y, 50.0, 32.0))
    }

    #[test]
    fn test_scrolls_left() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut gate = Gate::new(800.0, 100.0, 300.0);

        assert!(!gate.advance(15.0, 5000.0, &config, &mut rng));
        assert_eq!(gate.x, 785.0);
        assert_eq!(gate.top_collider().bounds.x, 785.0);
        assert_eq!(gate.score_collider().bounds.x, 785.0);
    }

    #[test]
    fn test_recycles_past_trailing_edge() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut gate = Gate::new(-150.0, 100.0, 300.0);
        let id = gate.id();

        let rightmost = 4000.0;
        let target = rightmost + config.recycle_spacing;
        assert!(gate.advance(config.scroll_speed, target, &config, &mut rng));

        assert_eq!(gate.x, target);
        assert!(!gate.is_visible());
        assert_eq!(gate.id(), id);
        assert_eq!(gate.bottom_collider().bounds.x, target);
    }

    #[test]
    fn test_visibility_is_sticky_outside_band() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut gate = Gate::new(-150.0, 100.0, 300.0);

        gate.advance(15.0, 3000.0, &config, &mut rng);
        assert!(!gate.is_visible());

        // still off to the right: stays hidden
        gate.advance(15.0, 0.0, &config, &mut rng);
        assert!(!gate.is_visible());

        gate.x = 1510.0;
        gate.advance(15.0, 0.0, &config, &mut rng);
        assert!(gate.is_visible());

        // left of the band but before the trailing edge: stays visible
        gate.x = -50.0;
        gate.advance(15.0, 0.0, &config, &mut rng);
        assert!(gate.is_visible());
        assert_eq!(gate.x, -65.0);
    }

    #[test]
    fn test_gap_invariant_after_recycling() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut gate = Gate::new(-150.0, 0.0, config.initial_gap);

        let mut min_top = f32::MAX;
        let mut max_top = f32::MIN;
        for _ in 0..2000 {
            gate.x = -150.0;
            assert!(gate.advance(15.0, 1000.0, &config, &mut rng));
            assert!(gate.gap() >= config.min_gap);
            assert!(gate.gap() < config.min_gap + config.gap_variation);
            assert!(gate.top_y() >= 0.0 && gate.top_y() < config.vertical_variation);
            min_top = min_top.min(gate.top_y());
            max_top = max_top.max(gate.top_y());
        }
        // draws cover most of the range
        assert!(min_top < config.vertical_variation * 0.1);
        assert!(max_top > config.vertical_variation * 0.9);
    }

    #[test]
    fn test_colliders_frame_the_gap() {
        let gate = Gate::new(500.0, 100.0, 300.0);
        let top = gate.top_collider().bounds;
        let bottom = gate.bottom_collider().bounds;
        let score = gate.score_collider().bounds;

        assert_eq!(top.bottom(), 100.0 + TOP_OVERHANG);
        assert_eq!(bottom.y, 400.0);
        assert_eq!(score.y, 100.0);
        assert_eq!(score.height, 300.0);
        assert_eq!(score.width, COLLIDER_WIDTH);
    }

    #[test]
    fn test_barrier_hits() {
        let mut gate = Gate::new(200.0, 100.0, 300.0);
        assert!(gate.collide(&body_at(200.0, 50.0)).barrier_hit);
        assert!(gate.collide(&body_at(200.0, 390.0)).barrier_hit);
        assert!(!gate.collide(&body_at(200.0, 200.0)).barrier_hit);
    }

    #[test]
    fn test_scores_on_leaving_gap_only() {
        let mut gate = Gate::new(200.0, 100.0, 300.0);
        let inside = body_at(200.0, 200.0);
        let past = body_at(300.0, 200.0);

        let entered = gate.collide(&inside);
        assert!(!entered.scored);
        assert!(!gate.collide(&inside).scored);

        let left = gate.collide(&past);
        assert!(left.scored);
        assert!(!left.barrier_hit);
        assert!(!gate.collide(&past).scored);
    }
}
