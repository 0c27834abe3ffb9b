//! Session runtime: owns the session table and one tick task per session.
//!
//! Each session ticks on its own tokio task at its own target rate. The task
//! is the only party that expires a session through its deadline; explicit
//! removal and shutdown flip the session's live flag and the task exits on its
//! next tick.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, interval_at, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::game::simulation::{SimEvent, Simulation};
use crate::metrics::Metrics;
use crate::session::clock::{Clock, TokioClock};
use crate::session::handle::{Frame, Session, SessionSummary, SessionTimings, TickStep};
use crate::session::id::SessionId;
use crate::session::table::{SessionError, SessionTable};

struct RuntimeInner {
    table: SessionTable,
    clock: Arc<dyn Clock>,
    config: ServerConfig,
    metrics: Arc<Metrics>,
}

impl RuntimeInner {
    fn timings(&self) -> SessionTimings {
        SessionTimings {
            timeout: self.config.session_timeout,
            sample_window: self.config.frame_sample_window,
            dead_screen_delay: self.config.dead_screen_delay,
        }
    }

    /// Retire a session whose deadline has passed
    fn expire(&self, session: &Arc<Session>) {
        self.table.remove_if(session.id().as_str(), session);
        if session.mark_dead() {
            self.metrics.session_expired();
            info!(
                "Session {} expired ({} active)",
                session.id(),
                self.table.len()
            );
        }
    }
}

/// Handle to the session runtime. Cheap to clone.
#[derive(Clone)]
pub struct SessionRuntime {
    inner: Arc<RuntimeInner>,
}

impl SessionRuntime {
    pub fn new(config: ServerConfig, metrics: Arc<Metrics>) -> Self {
        Self::with_clock(config, metrics, Arc::new(TokioClock))
    }

    pub fn with_clock(config: ServerConfig, metrics: Arc<Metrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                table: SessionTable::new(config.session_shards),
                clock,
                config,
                metrics,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Create a session and start its tick task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_session(&self, id: impl Into<SessionId>) -> Result<SessionId, SessionError> {
        let id = id.into();
        let inner = &self.inner;

        // stale entries are retired by the lookup
        if self.contains(id.as_str()) {
            return Err(SessionError::AlreadyExists(id));
        }

        if inner.table.len() >= inner.config.max_sessions {
            self.sweep_expired();
            if inner.table.len() >= inner.config.max_sessions {
                inner.metrics.sessions_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Rejected session {}: limit of {} reached",
                    id, inner.config.max_sessions
                );
                return Err(SessionError::AtCapacity);
            }
        }

        let simulation = Simulation::new(inner.config.simulation.clone())?;
        let session = Arc::new(Session::new(
            id.clone(),
            simulation,
            inner.timings(),
            inner.clock.now(),
        ));
        inner.table.insert(session.clone())?;
        inner.metrics.session_created();

        let handle = tokio::spawn(run_tick_loop(inner.clone(), session.clone()));
        session.attach_task(handle);

        info!(
            "Session {} created at {} Hz ({} active)",
            id,
            inner.config.simulation.target_rate,
            inner.table.len()
        );
        Ok(id)
    }

    /// Live session by id. Sessions past their deadline are never returned.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.inner.table.get(id)?;
        if session.is_expired(self.inner.clock.now()) {
            self.inner.expire(&session);
            return None;
        }
        Some(session)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn lookup(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Register a jump for the session
    pub fn jump(&self, id: &str) -> Result<(), SessionError> {
        let session = self.lookup(id)?;
        if !session.jump(self.inner.clock.now()) {
            self.inner.expire(&session);
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.inner.metrics.jumps.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Renew the session's liveness and return its current frame
    pub fn request_frame(&self, id: &str) -> Result<Frame, SessionError> {
        let session = self.lookup(id)?;
        match session.request_frame(self.inner.clock.now()) {
            Some(frame) => {
                self.inner.metrics.frames_served.fetch_add(1, Ordering::Relaxed);
                Ok(frame)
            }
            None => {
                self.inner.expire(&session);
                Err(SessionError::NotFound(id.to_string()))
            }
        }
    }

    /// Change the session's tick rate. Rejected rates leave it unchanged.
    pub fn set_target_rate(&self, id: &str, rate: i64) -> Result<(), SessionError> {
        let session = self.lookup(id)?;
        match session.set_target_rate(rate, self.inner.clock.now()) {
            Ok(true) => {
                info!("Session {} target rate set to {} Hz", id, rate);
                Ok(())
            }
            Ok(false) => {
                self.inner.expire(&session);
                Err(SessionError::NotFound(id.to_string()))
            }
            Err(e) => {
                debug!("Session {} rejected target rate {}: {}", id, rate, e);
                Err(e.into())
            }
        }
    }

    /// Remove a session and stop its tick task.
    ///
    /// The task exits within one tick interval; await [`Session::join`] on
    /// the returned handle to wait for it.
    pub fn remove_session(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self
            .inner
            .table
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if session.mark_dead() {
            self.inner.metrics.session_removed();
            info!("Session {} removed ({} active)", id, self.inner.table.len());
        }
        Ok(session)
    }

    /// Expire every session past its deadline. Returns how many were expired.
    pub fn sweep_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut expired = 0;
        for session in self.inner.table.sessions() {
            if session.is_expired(now) {
                self.inner.expire(&session);
                expired += 1;
            }
        }
        if expired > 0 {
            debug!("Swept {} expired sessions", expired);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.inner.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    /// Summaries of all sessions, ordered by id
    pub fn session_summaries(&self) -> Vec<SessionSummary> {
        let now = self.inner.clock.now();
        let mut summaries: Vec<SessionSummary> = self
            .inner
            .table
            .sessions()
            .iter()
            .map(|s| s.summary(now))
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Log one status line per session
    pub fn log_status(&self) {
        let summaries = self.session_summaries();
        info!("Status: {} sessions", summaries.len());
        for s in &summaries {
            info!(
                "  {} | points {} | {} | fps {:.1} | tps {:.1} | {} Hz | poll {} ms | idle {}s",
                s.id,
                s.points,
                if s.alive { "alive" } else { "dead" },
                s.fps,
                s.tps,
                s.target_rate,
                s.poll_interval_ms,
                s.idle_secs
            );
        }
    }

    /// Stop every tick task and wait for them to exit
    pub async fn shutdown(&self) {
        let sessions = self.inner.table.drain();
        info!("Shutting down {} sessions", sessions.len());

        for session in &sessions {
            if session.mark_dead() {
                self.inner.metrics.session_removed();
            }
        }
        for session in &sessions {
            session.join().await;
        }
    }
}

fn ticker(period: Duration, first_tick_now: bool) -> Interval {
    let mut ticker = if first_tick_now {
        interval(period)
    } else {
        interval_at(tokio::time::Instant::now() + period, period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Tick one session until it expires or is removed
async fn run_tick_loop(inner: Arc<RuntimeInner>, session: Arc<Session>) {
    let mut period = session.tick_interval();
    let mut clock = ticker(period, true);

    debug!("Tick loop for {} started at {:?}", session.id(), period);

    loop {
        clock.tick().await;

        if !session.is_live() {
            break;
        }

        match session.tick(inner.clock.now()) {
            TickStep::Expired => {
                inner.expire(&session);
                break;
            }
            TickStep::Ticked {
                report,
                interval: next_period,
                elapsed,
            } => {
                inner.metrics.record_tick_time(elapsed);
                inner.metrics.record_tick_events(&report);

                for event in &report.events {
                    match event {
                        SimEvent::Died { cause } => {
                            info!(
                                "Session {} died at tick {} ({:?})",
                                session.id(),
                                report.tick,
                                cause
                            );
                        }
                        SimEvent::Scored { points, .. } => {
                            debug!("Session {} scored, {} points", session.id(), points);
                        }
                        SimEvent::Recycled { .. } => {}
                    }
                }

                if next_period != period {
                    period = next_period;
                    clock = ticker(period, false);
                }
            }
        }
    }

    debug!("Tick loop for {} stopped", session.id());
}
