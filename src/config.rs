use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{gate, physics, session};

/// Configuration errors. Rejected values leave prior state unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Target tick rate must be positive, got {0}")]
    NonPositiveTickRate(i64),
    #[error("Target tick rate {0} exceeds maximum of {1}")]
    TickRateTooHigh(i64, u32),
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(&'static str),
}

/// Check a requested target rate and narrow it to the stored type
pub fn validate_target_rate(rate: i64) -> Result<u32, ConfigError> {
    if rate <= 0 {
        return Err(ConfigError::NonPositiveTickRate(rate));
    }
    if rate > physics::MAX_TARGET_RATE as i64 {
        return Err(ConfigError::TickRateTooHigh(rate, physics::MAX_TARGET_RATE));
    }
    Ok(rate as u32)
}

/// Obstacle field tuning for one simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Gates in the pool (fixed for the simulation's lifetime)
    pub gate_count: usize,
    /// Horizontal scroll per tick
    pub scroll_speed: f32,
    /// Gates left of this are recycled
    pub trailing_edge: f32,
    /// Band in which gates become visible
    pub visible_min: f32,
    pub visible_max: f32,
    /// Spacing of the initial pool
    pub initial_spacing: f32,
    /// Distance behind the rightmost gate for recycled gates
    pub recycle_spacing: f32,
    /// Range of the gap's top edge
    pub vertical_variation: f32,
    /// Gap height of the initial pool
    pub initial_gap: f32,
    /// Smallest gap height ever produced
    pub min_gap: f32,
    /// Random extra gap height for recycled gates
    pub gap_variation: f32,
    /// Initial target tick rate in Hz
    pub target_rate: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gate_count: gate::COUNT,
            scroll_speed: gate::SCROLL_SPEED,
            trailing_edge: gate::TRAILING_EDGE,
            visible_min: gate::VISIBLE_MIN,
            visible_max: gate::VISIBLE_MAX,
            initial_spacing: gate::INITIAL_SPACING,
            recycle_spacing: gate::RECYCLE_SPACING,
            vertical_variation: gate::VERTICAL_VARIATION,
            initial_gap: gate::INITIAL_GAP,
            min_gap: gate::MIN_GAP,
            gap_variation: gate::GAP_VARIATION,
            target_rate: physics::TARGET_RATE,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate_count == 0 {
            return Err(ConfigError::MustBePositive("gate_count"));
        }
        if self.scroll_speed <= 0.0 {
            return Err(ConfigError::MustBePositive("scroll_speed"));
        }
        if self.initial_spacing <= 0.0 {
            return Err(ConfigError::MustBePositive("initial_spacing"));
        }
        if self.recycle_spacing <= 0.0 {
            return Err(ConfigError::MustBePositive("recycle_spacing"));
        }
        // two gates must never cross the trailing edge on the same tick
        if self.initial_spacing <= self.scroll_speed {
            return Err(ConfigError::Inconsistent(
                "initial_spacing must exceed scroll_speed",
            ));
        }
        if self.recycle_spacing <= self.scroll_speed {
            return Err(ConfigError::Inconsistent(
                "recycle_spacing must exceed scroll_speed",
            ));
        }
        // random draws need non-empty ranges
        if self.vertical_variation <= 0.0 {
            return Err(ConfigError::MustBePositive("vertical_variation"));
        }
        if self.gap_variation <= 0.0 {
            return Err(ConfigError::MustBePositive("gap_variation"));
        }
        if self.min_gap <= 0.0 {
            return Err(ConfigError::MustBePositive("min_gap"));
        }
        if self.initial_gap < self.min_gap {
            return Err(ConfigError::Inconsistent("initial_gap is below min_gap"));
        }
        if !(self.trailing_edge < self.visible_min && self.visible_min < self.visible_max) {
            return Err(ConfigError::Inconsistent(
                "expected trailing_edge < visible_min < visible_max",
            ));
        }
        validate_target_rate(self.target_rate as i64)?;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the metrics endpoint binds to
    pub metrics_bind_address: IpAddr,
    /// Port of the metrics endpoint
    pub metrics_port: u16,
    /// Idle time after which a session expires
    pub session_timeout: Duration,
    /// Frame-rate sampling window
    pub frame_sample_window: Duration,
    /// Delay between death and the terminal screen signal
    pub dead_screen_delay: Duration,
    /// Interval of the periodic session status report
    pub status_log_interval: Duration,
    /// Number of session table shards
    pub session_shards: usize,
    /// Maximum number of live sessions
    pub max_sessions: usize,
    /// Tuning applied to every new simulation
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            metrics_port: 9090,
            session_timeout: session::TIMEOUT,
            frame_sample_window: session::FRAME_SAMPLE_WINDOW,
            dead_screen_delay: session::DEAD_SCREEN_DELAY,
            status_log_interval: Duration::from_secs(5),
            session_shards: session::SHARDS,
            max_sessions: session::MAX_SESSIONS,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Read and parse an environment variable, warning on garbage
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

/// Positive number of seconds from the environment
fn env_secs(name: &str) -> Option<Duration> {
    match env_parse::<u64>(name)? {
        0 => {
            tracing::warn!("{} must be > 0, using default", name);
            None
        }
        secs => Some(Duration::from_secs(secs)),
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parse("METRICS_BIND_ADDRESS") {
            config.metrics_bind_address = addr;
        }

        if let Some(port) = env_parse::<u16>("METRICS_PORT") {
            if port > 0 {
                config.metrics_port = port;
            } else {
                tracing::warn!("METRICS_PORT must be > 0, using default");
            }
        }

        if let Some(timeout) = env_secs("SESSION_TIMEOUT_SECS") {
            config.session_timeout = timeout;
        }

        if let Some(window) = env_secs("FRAME_SAMPLE_SECS") {
            config.frame_sample_window = window;
        }

        if let Some(delay) = env_secs("DEAD_SCREEN_DELAY_SECS") {
            config.dead_screen_delay = delay;
        }

        if let Some(interval) = env_secs("STATUS_LOG_INTERVAL_SECS") {
            config.status_log_interval = interval;
        }

        if let Some(rate) = env_parse::<i64>("DEFAULT_TARGET_RATE") {
            match validate_target_rate(rate) {
                Ok(rate) => config.simulation.target_rate = rate,
                Err(e) => tracing::warn!("DEFAULT_TARGET_RATE: {}, using default", e),
            }
        }

        if let Some(shards) = env_parse::<usize>("SESSION_SHARDS") {
            if (1..=1024).contains(&shards) {
                config.session_shards = shards;
            } else {
                tracing::warn!("SESSION_SHARDS must be 1-1024, using default");
            }
        }

        if let Some(max_sessions) = env_parse::<usize>("MAX_SESSIONS") {
            if max_sessions > 0 {
                config.max_sessions = max_sessions;
            } else {
                tracing::warn!("MAX_SESSIONS must be > 0, using default");
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_timeout.is_zero() {
            return Err(ConfigError::MustBePositive("session_timeout"));
        }
        if self.frame_sample_window.is_zero() {
            return Err(ConfigError::MustBePositive("frame_sample_window"));
        }
        if self.status_log_interval.is_zero() {
            return Err(ConfigError::MustBePositive("status_log_interval"));
        }
        if self.session_shards == 0 {
            return Err(ConfigError::MustBePositive("session_shards"));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::MustBePositive("max_sessions"));
        }
        self.simulation.validate()
    }
}
