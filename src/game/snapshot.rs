//! Read-only render views of a simulation.

use serde::Serialize;

use crate::game::bird::Tilt;
use crate::game::collider::Rect;
use crate::game::constants::gate::{BARRIER_HEIGHT, CAP_HEIGHT, WIDTH};
use crate::game::gate::GateId;
use crate::game::simulation::Simulation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BirdView {
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
    pub tilt: Tilt,
    /// Display rotation in turns
    pub rotation: f32,
    pub started: bool,
    pub dead: bool,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateView {
    pub id: GateId,
    pub x: f32,
    pub top_y: f32,
    pub bottom_y: f32,
    pub visible: bool,
    pub width: f32,
    pub height: f32,
    pub cap_height: f32,
    pub top_bounds: Rect,
    pub bottom_bounds: Rect,
    pub score_bounds: Rect,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub bird: BirdView,
    /// Sorted left to right
    pub gates: Vec<GateView>,
    pub points: u32,
    pub background_offset: i32,
    pub ground_offset: i32,
    pub target_rate: u32,
}

impl Snapshot {
    pub fn capture(sim: &Simulation) -> Self {
        let bird = sim.bird();
        let (background_offset, ground_offset) = sim.background_offsets();

        let mut gates: Vec<GateView> = sim
            .gates()
            .map(|g| GateView {
                id: g.id(),
                x: g.x,
                top_y: g.top_y(),
                bottom_y: g.bottom_y(),
                visible: g.is_visible(),
                width: WIDTH,
                height: BARRIER_HEIGHT,
                cap_height: CAP_HEIGHT,
                top_bounds: g.top_collider().bounds,
                bottom_bounds: g.bottom_collider().bounds,
                score_bounds: g.score_collider().bounds,
            })
            .collect();
        gates.sort_by(|a, b| a.x.total_cmp(&b.x));

        Self {
            tick: sim.total_ticks(),
            bird: BirdView {
                x: bird.x,
                y: bird.y,
                velocity: bird.velocity,
                tilt: bird.tilt(),
                rotation: bird.tilt().turns(),
                started: bird.is_started(),
                dead: bird.is_dead(),
                bounds: bird.collider().bounds,
            },
            gates,
            points: sim.points(),
            background_offset,
            ground_offset,
            target_rate: sim.target_rate(),
        }
    }

    pub fn visible_gates(&self) -> impl Iterator<Item = &GateView> {
        self.gates.iter().filter(|g| g.visible)
    }
}
