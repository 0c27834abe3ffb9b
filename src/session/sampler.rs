//! Observed frame and tick rates over a fixed sampling window.
//!
//! Frames are counted when the client asks for one; ticks when the simulation
//! advances. The two are independent: a backgrounded client keeps ticking at
//! the target rate while its frame rate drops to zero.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FrameSampler {
    window: Duration,
    window_start: Instant,
    frames_in_window: u32,
    ticks_in_window: u32,
    total_frames: u64,
    observed_fps: f32,
    observed_tps: f32,
}

impl FrameSampler {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            window_start: now,
            frames_in_window: 0,
            ticks_in_window: 0,
            total_frames: 0,
            observed_fps: 0.0,
            observed_tps: 0.0,
        }
    }

    /// Close the window if it has run out, converting counts to rates
    fn roll(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window || elapsed.is_zero() {
            return;
        }

        let secs = elapsed.as_secs_f32();
        self.observed_fps = self.frames_in_window as f32 / secs;
        self.observed_tps = self.ticks_in_window as f32 / secs;
        self.frames_in_window = 0;
        self.ticks_in_window = 0;
        self.window_start = now;
    }

    pub fn record_frame(&mut self, now: Instant) {
        self.roll(now);
        self.frames_in_window += 1;
        self.total_frames += 1;
    }

    pub fn record_tick(&mut self, now: Instant) {
        self.roll(now);
        self.ticks_in_window += 1;
    }

    /// Frames per second over the last closed window
    pub fn observed_fps(&self) -> f32 {
        self.observed_fps
    }

    /// Ticks per second over the last closed window
    pub fn observed_tps(&self) -> f32 {
        self.observed_tps
    }

    pub fn frames_in_window(&self) -> u32 {
        self.frames_in_window
    }

    pub fn ticks_in_window(&self) -> u32 {
        self.ticks_in_window
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(3);

    #[test]
    fn test_rate_unknown_until_window_closes() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(WINDOW, start);

        for i in 0..10 {
            sampler.record_frame(start + Duration::from_millis(100 * i));
        }
        assert_eq!(sampler.observed_fps(), 0.0);
        assert_eq!(sampler.frames_in_window(), 10);
        assert_eq!(sampler.total_frames(), 10);
    }

    #[test]
    fn test_window_converts_and_resets() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(WINDOW, start);

        // 30 fps for one window
        for i in 0..90 {
            sampler.record_frame(start + Duration::from_millis(33 * i));
        }
        sampler.record_frame(start + WINDOW);

        assert!((sampler.observed_fps() - 30.0).abs() < 0.01);
        assert_eq!(sampler.frames_in_window(), 1);
        assert_eq!(sampler.total_frames(), 91);
    }

    #[test]
    fn test_frames_and_ticks_are_independent() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(WINDOW, start);

        // ticking at ~30 Hz while the client polls only 3 times
        for i in 0..90 {
            sampler.record_tick(start + Duration::from_millis(33 * i));
        }
        for i in 0..3 {
            sampler.record_frame(start + Duration::from_secs(i));
        }
        sampler.record_tick(start + WINDOW);

        assert!((sampler.observed_tps() - 30.0).abs() < 0.01);
        assert!((sampler.observed_fps() - 1.0).abs() < 0.01);
        assert_eq!(sampler.ticks_in_window(), 1);
        assert_eq!(sampler.frames_in_window(), 0);
    }

    #[test]
    fn test_zero_window_stays_finite() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(Duration::ZERO, start);

        sampler.record_frame(start);
        sampler.record_tick(start);
        assert_eq!(sampler.observed_fps(), 0.0);
        assert_eq!(sampler.observed_tps(), 0.0);

        sampler.record_frame(start + Duration::from_millis(500));
        assert!(sampler.observed_fps().is_finite());
        assert!((sampler.observed_fps() - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_long_gap_uses_real_elapsed_time() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(WINDOW, start);

        for _ in 0..12 {
            sampler.record_frame(start);
        }
        // client went away for two windows
        sampler.record_frame(start + WINDOW * 2);
        assert!((sampler.observed_fps() - 2.0).abs() < 0.01);
    }
}
