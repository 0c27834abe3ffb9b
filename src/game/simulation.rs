//! One player's world: the body, the gate pool and the score.
//!
//! `Simulation` itself is plain data advanced through `&mut self`. The session
//! layer wraps it in a lock so ticks and snapshots never interleave.

use std::time::Duration;

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::{validate_target_rate, ConfigError, SimulationConfig};
use crate::game::bird::Bird;
use crate::game::constants::{background, tick_interval};
use crate::game::gate::{Gate, GateId};
use crate::game::snapshot::Snapshot;

/// Why the body died
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Floor,
    Barrier,
}

/// Events produced by a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Scored { gate: GateId, points: u32 },
    Died { cause: DeathCause },
    Recycled { gate: GateId },
}

/// Result of [`Simulation::tick`]
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub events: SmallVec<[SimEvent; 4]>,
}

impl TickReport {
    pub fn died(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, SimEvent::Died { .. }))
    }

    pub fn scored(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Scored { .. }))
            .count()
    }

    pub fn recycled(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Recycled { .. }))
            .count()
    }
}

pub struct Simulation {
    config: SimulationConfig,
    bird: Bird,
    gates: HashMap<GateId, Gate, FxBuildHasher>,
    points: u32,
    background_offset: i32,
    ground_offset: i32,
    total_ticks: u64,
    target_rate: u32,
    rng: StdRng,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic gap levels for tests and benchmarks
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, mut rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut gates = HashMap::with_capacity_and_hasher(config.gate_count, FxBuildHasher);
        for i in 1..=config.gate_count {
            let gate = Gate::spawn(i as f32 * config.initial_spacing, &config, &mut rng);
            gates.insert(gate.id(), gate);
        }

        Ok(Self {
            target_rate: config.target_rate,
            config,
            bird: Bird::new(),
            gates,
            points: 0,
            background_offset: 0,
            ground_offset: 0,
            total_ticks: 0,
            rng,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn bird(&self) -> &Bird {
        &self.bird
    }

    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.values()
    }

    pub fn gate(&self, id: GateId) -> Option<&Gate> {
        self.gates.get(&id)
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Sky and ground scroll offsets
    pub fn background_offsets(&self) -> (i32, i32) {
        (self.background_offset, self.ground_offset)
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Interval between ticks at the current target rate
    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.target_rate)
    }

    /// Change the target rate. Invalid rates leave the current one in place.
    pub fn set_target_rate(&mut self, rate: i64) -> Result<(), ConfigError> {
        self.target_rate = validate_target_rate(rate)?;
        Ok(())
    }

    /// Launch the body if needed and queue a jump
    pub fn register_jump(&mut self) {
        self.bird.jump();
    }

    /// X of the rightmost gate
    fn rightmost_x(&self) -> f32 {
        self.gates
            .values()
            .map(|g| g.x)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Advance the world one tick.
    ///
    /// Gates only scroll while the body is alive and launched. Collision is
    /// evaluated every tick, dead or not, so gap latches stay consistent.
    /// A gap left on the tick the body dies still scores; gaps left after
    /// that tick do not.
    pub fn tick(&mut self) -> TickReport {
        self.total_ticks += 1;
        let mut report = TickReport {
            tick: self.total_ticks,
            events: SmallVec::new(),
        };

        let alive_at_start = !self.bird.is_dead();

        if self.bird.advance() {
            debug!("Body hit the floor at tick {}", self.total_ticks);
            report.events.push(SimEvent::Died {
                cause: DeathCause::Floor,
            });
        }

        if !self.bird.is_dead() && self.bird.is_started() {
            // Targets come from pre-tick positions so pass order is irrelevant
            let recycle_target_x = self.rightmost_x() + self.config.recycle_spacing;
            let speed = self.config.scroll_speed;

            for gate in self.gates.values_mut() {
                if gate.advance(speed, recycle_target_x, &self.config, &mut self.rng) {
                    report.events.push(SimEvent::Recycled { gate: gate.id() });
                }
            }

            self.background_offset -= background::SKY_SPEED;
            self.ground_offset -= background::GROUND_SPEED;
        }

        let body = self.bird.collider();
        let mut barrier_hit = false;
        for gate in self.gates.values_mut() {
            let contact = gate.collide(body);
            barrier_hit |= contact.barrier_hit;

            if contact.scored && alive_at_start {
                self.points += 1;
                report.events.push(SimEvent::Scored {
                    gate: gate.id(),
                    points: self.points,
                });
            }
        }

        if barrier_hit && !self.bird.is_dead() {
            self.bird.kill();
            debug!("Body hit a barrier at tick {}", self.total_ticks);
            report.events.push(SimEvent::Died {
                cause: DeathCause::Barrier,
            });
        }

        report
    }

    /// Copy of everything a renderer needs
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }
}
