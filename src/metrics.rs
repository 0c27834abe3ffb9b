//! Prometheus-compatible metrics endpoint
//!
//! Exposes session and simulation counters in Prometheus format, plus a JSON
//! listing of live sessions.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use serde::Serialize;

use crate::game::simulation::{SimEvent, TickReport};

/// Tick samples between percentile recomputations
const PERCENTILE_REFRESH: u64 = 50;

/// Metrics registry for the session server
#[derive(Debug)]
pub struct Metrics {
    // Session lifecycle
    pub sessions_active: AtomicU64,
    pub sessions_created: AtomicU64,
    pub sessions_expired: AtomicU64,
    pub sessions_removed: AtomicU64,
    pub sessions_rejected: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // Tick counter across all sessions
    pub tick_count: AtomicU64,

    // Boundary traffic
    pub frames_served: AtomicU64,
    pub jumps: AtomicU64,

    // Gameplay
    pub deaths: AtomicU64,
    pub points_scored: AtomicU64,
    pub gates_recycled: AtomicU64,

    // Server uptime
    start_time: Instant,

    // Rolling tick times for percentile calculation (VecDeque for O(1) pop_front)
    tick_history: RwLock<VecDeque<u64>>,
}

/// JSON view of the registry
#[derive(Debug, Serialize)]
struct MetricsReport {
    sessions: SessionCounts,
    performance: Performance,
    gameplay: Gameplay,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct SessionCounts {
    active: u64,
    created: u64,
    expired: u64,
    removed: u64,
    rejected: u64,
}

#[derive(Debug, Serialize)]
struct Performance {
    tick_time_us: u64,
    tick_time_p95_us: u64,
    tick_time_p99_us: u64,
    tick_time_max_us: u64,
    tick_count: u64,
    frames_served: u64,
}

#[derive(Debug, Serialize)]
struct Gameplay {
    jumps: u64,
    deaths: u64,
    points_scored: u64,
    gates_recycled: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_active: AtomicU64::new(0),
            sessions_created: AtomicU64::new(0),
            sessions_expired: AtomicU64::new(0),
            sessions_removed: AtomicU64::new(0),
            sessions_rejected: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            frames_served: AtomicU64::new(0),
            jumps: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            points_scored: AtomicU64::new(0),
            gates_recycled: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(1000)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);

        // Keep last 1000 samples
        while history.len() > 1000 {
            history.pop_front();
        }

        // Every session reports here, so percentiles are refreshed in batches
        let count = self.tick_count.load(Ordering::Relaxed);
        if history.len() >= 10 && count % PERCENTILE_REFRESH == 0 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Fold one tick's events into the gameplay counters
    pub fn record_tick_events(&self, report: &TickReport) {
        for event in &report.events {
            match event {
                SimEvent::Scored { .. } => {
                    self.points_scored.fetch_add(1, Ordering::Relaxed);
                }
                SimEvent::Died { .. } => {
                    self.deaths.fetch_add(1, Ordering::Relaxed);
                }
                SimEvent::Recycled { .. } => {
                    self.gates_recycled.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::Relaxed);
        self.decrement_active();
    }

    pub fn session_removed(&self) {
        self.sessions_removed.fetch_add(1, Ordering::Relaxed);
        self.decrement_active();
    }

    fn decrement_active(&self) {
        // Saturate at zero
        let _ = self
            .sessions_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Session metrics
        metric!("flappy_sessions_active", "Number of live sessions", "gauge",
            self.sessions_active.load(Ordering::Relaxed));
        metric!("flappy_sessions_created_total", "Sessions created", "counter",
            self.sessions_created.load(Ordering::Relaxed));
        metric!("flappy_sessions_expired_total", "Sessions expired for lack of frame requests", "counter",
            self.sessions_expired.load(Ordering::Relaxed));
        metric!("flappy_sessions_removed_total", "Sessions removed explicitly", "counter",
            self.sessions_removed.load(Ordering::Relaxed));
        metric!("flappy_sessions_rejected_total", "Session creations rejected at capacity", "counter",
            self.sessions_rejected.load(Ordering::Relaxed));

        // Performance metrics
        metric!("flappy_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("flappy_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("flappy_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("flappy_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("flappy_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("flappy_frames_served_total", "Frames returned to clients", "counter",
            self.frames_served.load(Ordering::Relaxed));

        // Gameplay metrics
        metric!("flappy_jumps_total", "Jumps registered", "counter",
            self.jumps.load(Ordering::Relaxed));
        metric!("flappy_deaths_total", "Bodies that hit the floor or a barrier", "counter",
            self.deaths.load(Ordering::Relaxed));
        metric!("flappy_points_scored_total", "Gaps cleared", "counter",
            self.points_scored.load(Ordering::Relaxed));
        metric!("flappy_gates_recycled_total", "Gates moved back behind the field", "counter",
            self.gates_recycled.load(Ordering::Relaxed));

        metric!("flappy_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics (alternative for direct API access)
    pub fn to_json(&self) -> String {
        let report = MetricsReport {
            sessions: SessionCounts {
                active: self.sessions_active.load(Ordering::Relaxed),
                created: self.sessions_created.load(Ordering::Relaxed),
                expired: self.sessions_expired.load(Ordering::Relaxed),
                removed: self.sessions_removed.load(Ordering::Relaxed),
                rejected: self.sessions_rejected.load(Ordering::Relaxed),
            },
            performance: Performance {
                tick_time_us: self.tick_time_us.load(Ordering::Relaxed),
                tick_time_p95_us: self.tick_time_p95_us.load(Ordering::Relaxed),
                tick_time_p99_us: self.tick_time_p99_us.load(Ordering::Relaxed),
                tick_time_max_us: self.tick_time_max_us.load(Ordering::Relaxed),
                tick_count: self.tick_count.load(Ordering::Relaxed),
                frames_served: self.frames_served.load(Ordering::Relaxed),
            },
            gameplay: Gameplay {
                jumps: self.jumps.load(Ordering::Relaxed),
                deaths: self.deaths.load(Ordering::Relaxed),
                points_scored: self.points_scored.load(Ordering::Relaxed),
                gates_recycled: self.gates_recycled.load(Ordering::Relaxed),
            },
            uptime_seconds: self.uptime_seconds(),
        };
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "metrics_endpoint")]
pub use server::start_metrics_server;

#[cfg(feature = "metrics_endpoint")]
mod server {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tracing::{debug, info};

    use super::Metrics;
    use crate::session::SessionRuntime;

    fn response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    /// Route one request line to a full HTTP response
    pub(super) fn route(request: &str, metrics: &Metrics, runtime: &SessionRuntime) -> String {
        if request.starts_with("GET /metrics/json") {
            response("200 OK", "application/json", &metrics.to_json())
        } else if request.starts_with("GET /metrics") {
            response("200 OK", "text/plain; version=0.0.4", &metrics.to_prometheus())
        } else if request.starts_with("GET /sessions") {
            let body = serde_json::to_string(&runtime.session_summaries())
                .unwrap_or_else(|_| "[]".to_string());
            response("200 OK", "application/json", &body)
        } else if request.starts_with("GET /health") {
            response("200 OK", "text/plain", "good")
        } else {
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
        }
    }

    /// Start the metrics HTTP server
    pub async fn start_metrics_server(
        metrics: Arc<Metrics>,
        runtime: SessionRuntime,
        addr: SocketAddr,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;

        info!("Metrics server listening on http://{}/metrics", addr);

        loop {
            let (mut socket, peer) = listener.accept().await?;
            let metrics = metrics.clone();
            let runtime = runtime.clone();

            tokio::spawn(async move {
                let mut buffer = [0u8; 1024];

                match socket.read(&mut buffer).await {
                    Ok(n) if n > 0 => {
                        let request = String::from_utf8_lossy(&buffer[..n]);
                        let response = route(&request, &metrics, &runtime);

                        if let Err(e) = socket.write_all(response.as_bytes()).await {
                            debug!("Failed to write metrics response to {}: {}", peer, e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Failed to read from metrics socket {}: {}", peer, e);
                    }
                }
            });
        }
    }
}
