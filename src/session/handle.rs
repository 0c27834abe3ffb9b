//! One player's session: a simulation plus its liveness and sampling state,
//! all behind a single lock.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::ConfigError;
use crate::game::simulation::{Simulation, TickReport};
use crate::game::snapshot::Snapshot;
use crate::session::id::SessionId;
use crate::session::sampler::FrameSampler;

/// Session lifecycle timings
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    /// Idle time before expiry
    pub timeout: Duration,
    /// Frame-rate sampling window
    pub sample_window: Duration,
    /// Delay between death and the terminal screen
    pub dead_screen_delay: Duration,
}

/// What a single tick-loop iteration did
#[derive(Debug)]
pub enum TickStep {
    /// The simulation advanced; `interval` is the delay until the next tick
    Ticked {
        report: TickReport,
        interval: Duration,
        elapsed: Duration,
    },
    /// The liveness deadline has passed; nothing was advanced
    Expired,
}

/// Frame handed back to the boundary layer
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub snapshot: Snapshot,
    pub observed_fps: f32,
    pub observed_tps: f32,
    pub total_frames: u64,
    /// Switch to the terminal view (never reset once set)
    pub show_dead_screen: bool,
    /// Suggested client polling interval
    pub poll_interval_ms: u64,
}

/// Status line for logs and the `/sessions` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub points: u32,
    pub alive: bool,
    pub started: bool,
    pub fps: f32,
    pub tps: f32,
    pub target_rate: u32,
    pub poll_interval_ms: u64,
    pub total_ticks: u64,
    pub total_frames: u64,
    pub idle_secs: u64,
    pub age_secs: u64,
}

/// State guarded by the session lock
struct SessionState {
    simulation: Simulation,
    liveness_deadline: Instant,
    last_renewed: Instant,
    sampler: FrameSampler,
    dead_screen_at: Option<Instant>,
    show_dead_screen: bool,
}

impl SessionState {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.liveness_deadline
    }
}

pub struct Session {
    id: SessionId,
    created_at: Instant,
    timings: SessionTimings,
    state: Mutex<SessionState>,
    live: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(id: SessionId, simulation: Simulation, timings: SessionTimings, now: Instant) -> Self {
        Self {
            id,
            created_at: now,
            timings,
            state: Mutex::new(SessionState {
                simulation,
                liveness_deadline: now + timings.timeout,
                last_renewed: now,
                sampler: FrameSampler::new(timings.sample_window, now),
                dead_screen_at: None,
                show_dead_screen: false,
            }),
            live: AtomicBool::new(true),
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// False once the session has expired or been removed
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Flip the session to not-live. Returns true for the caller that flipped it.
    pub fn mark_dead(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }

    /// Whether the liveness deadline has passed at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        !self.is_live() || self.state.lock().is_expired(now)
    }

    /// Advance the simulation by one tick, unless the deadline has passed
    pub fn tick(&self, now: Instant) -> TickStep {
        let mut state = self.state.lock();
        if state.is_expired(now) {
            return TickStep::Expired;
        }

        let started = std::time::Instant::now();
        let report = state.simulation.tick();
        let elapsed = started.elapsed();
        state.sampler.record_tick(now);

        if report.died() && state.dead_screen_at.is_none() {
            state.dead_screen_at = Some(now + self.timings.dead_screen_delay);
        }

        TickStep::Ticked {
            report,
            interval: state.simulation.tick_interval(),
            elapsed,
        }
    }

    /// Renew liveness, sample the frame rate and capture a frame.
    ///
    /// Returns `None` if the deadline had already passed; an expired session
    /// is never renewed.
    pub fn request_frame(&self, now: Instant) -> Option<Frame> {
        let mut state = self.state.lock();
        if !self.is_live() || state.is_expired(now) {
            return None;
        }

        state.liveness_deadline = now + self.timings.timeout;
        state.last_renewed = now;
        state.sampler.record_frame(now);

        if let Some(at) = state.dead_screen_at {
            if now >= at {
                state.show_dead_screen = true;
            }
        }

        Some(Frame {
            snapshot: state.simulation.snapshot(),
            observed_fps: state.sampler.observed_fps(),
            observed_tps: state.sampler.observed_tps(),
            total_frames: state.sampler.total_frames(),
            show_dead_screen: state.show_dead_screen,
            poll_interval_ms: state.simulation.tick_interval().as_millis() as u64,
        })
    }

    /// Queue a jump. Returns false if the session has expired.
    pub fn jump(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        if !self.is_live() || state.is_expired(now) {
            return false;
        }
        state.simulation.register_jump();
        true
    }

    /// Change the tick rate. `Ok(false)` if the session has expired.
    pub fn set_target_rate(&self, rate: i64, now: Instant) -> Result<bool, ConfigError> {
        let mut state = self.state.lock();
        if !self.is_live() || state.is_expired(now) {
            return Ok(false);
        }
        state.simulation.set_target_rate(rate)?;
        Ok(true)
    }

    /// Read-only view of the simulation without renewing liveness
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().simulation.snapshot()
    }

    pub fn tick_interval(&self) -> Duration {
        self.state.lock().simulation.tick_interval()
    }

    pub fn summary(&self, now: Instant) -> SessionSummary {
        let state = self.state.lock();
        let sim = &state.simulation;
        SessionSummary {
            id: self.id.clone(),
            points: sim.points(),
            alive: !sim.bird().is_dead(),
            started: sim.bird().is_started(),
            fps: state.sampler.observed_fps(),
            tps: state.sampler.observed_tps(),
            target_rate: sim.target_rate(),
            poll_interval_ms: sim.tick_interval().as_millis() as u64,
            total_ticks: sim.total_ticks(),
            total_frames: state.sampler.total_frames(),
            idle_secs: now.saturating_duration_since(state.last_renewed).as_secs(),
            age_secs: now.saturating_duration_since(self.created_at).as_secs(),
        }
    }

    pub(crate) fn attach_task(&self, handle: JoinHandle<()>) {
        *self.task.lock() = Some(handle);
    }

    /// Wait for the tick task to exit. Later calls return immediately.
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Tick task for session {} failed: {}", self.id, e);
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn timings() -> SessionTimings {
        SessionTimings {
            timeout: Duration::from_secs(60),
            sample_window: Duration::from_secs(3),
            dead_screen_delay: Duration::from_secs(10),
        }
    }

    fn session(now: Instant) -> Session {
        let sim = Simulation::with_seed(SimulationConfig::default(), 1).unwrap();
        Session::new(SessionId::from("test"), sim, timings(), now)
    }

    #[test]
    fn test_renewal_keeps_session_alive() {
        let start = Instant::now();
        let session = session(start);

        // renewed every 10s for an hour
        for i in 1..=360u64 {
            let now = start + Duration::from_secs(10 * i);
            assert!(!session.is_expired(now));
            assert!(session.request_frame(now).is_some());
        }
    }

    #[test]
    fn test_expires_without_renewal() {
        let start = Instant::now();
        let session = session(start);

        assert!(!session.is_expired(start + Duration::from_secs(59)));
        assert!(session.is_expired(start + Duration::from_secs(60)));
        assert!(session.request_frame(start + Duration::from_secs(61)).is_none());
        assert!(matches!(
            session.tick(start + Duration::from_secs(61)),
            TickStep::Expired
        ));
        assert!(!session.jump(start + Duration::from_secs(61)));
    }

    #[test]
    fn test_death_does_not_expire() {
        let start = Instant::now();
        let session = session(start);
        assert!(session.jump(start));

        let mut now = start;
        for _ in 0..400 {
            now += Duration::from_millis(33);
            session.tick(now);
        }
        assert!(session.snapshot().bird.dead);
        assert!(!session.is_expired(now));
        assert!(session.request_frame(now).is_some());
    }

    #[test]
    fn test_dead_screen_latch() {
        let start = Instant::now();
        let session = session(start);
        session.jump(start);

        let mut now = start;
        let mut died_at = None;
        for _ in 0..400 {
            now += Duration::from_millis(33);
            if let TickStep::Ticked { report, .. } = session.tick(now) {
                if report.died() {
                    died_at = Some(now);
                }
            }
        }
        let died_at = died_at.expect("body should die without further jumps");

        let early = session.request_frame(died_at + Duration::from_secs(9)).unwrap();
        assert!(!early.show_dead_screen);
        assert!(early.snapshot.bird.dead);

        let late = session.request_frame(died_at + Duration::from_secs(10)).unwrap();
        assert!(late.show_dead_screen);

        // one-way
        let later = session.request_frame(died_at + Duration::from_secs(11)).unwrap();
        assert!(later.show_dead_screen);
    }

    #[test]
    fn test_frame_reports_poll_interval_and_rates() {
        let start = Instant::now();
        let session = session(start);

        let frame = session.request_frame(start).unwrap();
        assert_eq!(frame.poll_interval_ms, 33);
        assert_eq!(frame.total_frames, 1);

        assert_eq!(session.set_target_rate(50, start), Ok(true));
        let frame = session.request_frame(start).unwrap();
        assert_eq!(frame.poll_interval_ms, 20);
        assert_eq!(frame.snapshot.target_rate, 50);
    }

    #[test]
    fn test_bad_rate_rejected_and_unchanged() {
        let start = Instant::now();
        let session = session(start);

        assert_eq!(
            session.set_target_rate(0, start),
            Err(ConfigError::NonPositiveTickRate(0))
        );
        assert_eq!(session.tick_interval(), Duration::from_millis(33));
    }

    #[test]
    fn test_mark_dead_flips_once() {
        let session = session(Instant::now());
        assert!(session.mark_dead());
        assert!(!session.mark_dead());
        assert!(!session.is_live());
        assert!(session.request_frame(Instant::now()).is_none());
    }

    #[test]
    fn test_summary() {
        let start = Instant::now();
        let session = session(start);
        session.request_frame(start);

        let summary = session.summary(start + Duration::from_secs(5));
        assert_eq!(summary.id.as_str(), "test");
        assert!(summary.alive);
        assert!(!summary.started);
        assert_eq!(summary.idle_secs, 5);
        assert_eq!(summary.total_frames, 1);
    }
}
