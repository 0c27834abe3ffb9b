//! Tuning constants for the simulation and session runtime.
//!
//! World units are pixels of the reference 1500-wide viewport. Y grows downward.

use std::time::Duration;

/// Tick rate constants
pub mod physics {
    /// Default simulation rate in Hz
    pub const TARGET_RATE: u32 = 30;
    /// Highest accepted target rate (keeps the tick interval above 1 ms)
    pub const MAX_TARGET_RATE: u32 = 240;
}

/// Player body constants
pub mod bird {
    /// Fixed horizontal position of the body
    pub const START_X: f32 = 200.0;
    /// Vertical position before launch
    pub const START_Y: f32 = 300.0;
    pub const WIDTH: f32 = 50.0;
    pub const HEIGHT: f32 = 32.0;
    /// Added to velocity every started tick
    pub const GRAVITY: f32 = 0.011;
    /// Velocity set by a jump impulse (negative = upward)
    pub const JUMP_VELOCITY: f32 = -0.19;
    /// Distance travelled per unit of velocity per tick
    pub const TICK_DISTANCE: f32 = 20.0;
    /// Falling below this line is terminal
    pub const FLOOR_Y: f32 = 1200.0;
    /// Velocities inside (-DEAD_ZONE, DEAD_ZONE) render level
    pub const TILT_DEAD_ZONE: f32 = 0.1;
    /// Display rotation (in turns) for a non-level band
    pub const TILT: f32 = 0.1;
}

/// Obstacle (gate) constants
pub mod gate {
    /// Number of gates in every simulation's pool
    pub const COUNT: usize = 8;
    /// Horizontal scroll per tick
    pub const SCROLL_SPEED: f32 = 15.0;
    /// A gate whose x falls below this is recycled
    pub const TRAILING_EDGE: f32 = -100.0;
    /// Gates with VISIBLE_MIN < x < VISIBLE_MAX are marked visible
    pub const VISIBLE_MIN: f32 = 0.0;
    pub const VISIBLE_MAX: f32 = 1500.0;
    /// Spacing between gates at simulation start
    pub const INITIAL_SPACING: f32 = 800.0;
    /// Distance behind the rightmost gate a recycled gate lands at
    pub const RECYCLE_SPACING: f32 = 600.0;
    /// Top of the gap is drawn from [0, VERTICAL_VARIATION)
    pub const VERTICAL_VARIATION: f32 = 250.0;
    /// Gap height of the initial pool
    pub const INITIAL_GAP: f32 = 300.0;
    /// Smallest gap height a gate may ever have
    pub const MIN_GAP: f32 = 150.0;
    /// Recycled gap heights are drawn from [MIN_GAP, MIN_GAP + GAP_VARIATION)
    pub const GAP_VARIATION: f32 = 100.0;
    /// Rendered pipe width
    pub const WIDTH: f32 = 255.0;
    /// Colliders only cover the pipe's shaft
    pub const COLLIDER_WIDTH: f32 = WIDTH / 4.0;
    /// Height of the pipe cap piece
    pub const CAP_HEIGHT: f32 = 135.0;
    /// Full barrier height including the cap
    pub const BARRIER_HEIGHT: f32 = 5000.0 + CAP_HEIGHT;
    /// The top barrier reaches this far below the gap's top edge
    pub const TOP_OVERHANG: f32 = 25.0;
}

/// Cosmetic background scroll per tick
pub mod background {
    pub const SKY_SPEED: i32 = 1;
    pub const GROUND_SPEED: i32 = 15;
}

/// Session lifecycle constants
pub mod session {
    use std::time::Duration;

    /// Idle time after which a session is expired
    pub const TIMEOUT: Duration = Duration::from_secs(60);
    /// Length of the frame-rate sampling window
    pub const FRAME_SAMPLE_WINDOW: Duration = Duration::from_secs(3);
    /// Delay between death and the terminal screen
    pub const DEAD_SCREEN_DELAY: Duration = Duration::from_secs(10);
    /// Length of generated session ids
    pub const ID_LENGTH: usize = 32;
    /// Alphabet for generated session ids
    pub const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz-_";
    /// Number of shards in the session table
    pub const SHARDS: usize = 16;
    /// Maximum number of live sessions
    pub const MAX_SESSIONS: usize = 10_000;
}

/// Tick interval for a target rate in Hz. The rate must be non-zero.
#[inline]
pub fn tick_interval(rate: u32) -> Duration {
    Duration::from_millis(1000 / rate as u64)
}
