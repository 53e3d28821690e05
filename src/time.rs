//! Frame timing for the render loop.
//!
//! The integration step of frame `n` is the measured length of frame `n - 1`,
//! so the first frame steps with `dt = 0`. A frame runs from one
//! [`FrameClock::begin_frame`] to the next, so time spent in the event loop
//! between redraws belongs to the frame before it. The clock also counts frames and
//! reports the count once per second for the window title.
//!
//! Instants are passed in rather than read inside, which keeps the clock
//! testable without sleeping.

use std::time::{Duration, Instant};

/// How often the frame counter is reported.
pub const FPS_INTERVAL: Duration = Duration::from_secs(1);

/// Frame-loop timing state.
#[derive(Debug)]
pub struct FrameClock {
    /// Start of the frame in progress.
    frame_start: Option<Instant>,
    /// Length of the last completed frame in seconds.
    last_frame_secs: f32,
    /// Frames completed since the last report.
    frames: u32,
    /// When the counter was last reported.
    report_time: Instant,
    /// Total frames since start.
    frame_count: u64,
    /// Fixed step that replaces the measured one, if set.
    fixed_delta: Option<f32>,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_start: None,
            last_frame_secs: 0.0,
            frames: 0,
            report_time: now,
            frame_count: 0,
            fixed_delta: None,
        }
    }

    /// Use a constant `dt` instead of the measured frame length.
    pub fn with_fixed_delta(mut self, delta: Option<f32>) -> Self {
        self.fixed_delta = delta;
        self
    }

    /// Mark the start of a frame, which also ends the previous one.
    pub fn begin_frame(&mut self, now: Instant) {
        if let Some(start) = self.frame_start.replace(now) {
            self.last_frame_secs = now.saturating_duration_since(start).as_secs_f32();
        }
    }

    /// Step to integrate this frame with: the length of the previous frame.
    pub fn dt(&self) -> f32 {
        match self.fixed_delta {
            // the first frame still starts from rest
            Some(delta) if self.frame_count > 0 => delta,
            Some(_) => 0.0,
            None => self.last_frame_secs,
        }
    }

    /// Count a presented frame. Returns the frame count for the last second
    /// once a second has passed since the previous report.
    pub fn end_frame(&mut self, now: Instant) -> Option<u32> {
        self.frame_count += 1;
        self.frames += 1;

        if now.saturating_duration_since(self.report_time) >= FPS_INTERVAL {
            let fps = self.frames;
            self.frames = 0;
            self.report_time = now;
            Some(fps)
        } else {
            None
        }
    }

    /// Total frames completed.
    pub fn frame(&self) -> u64 {
        self.frame_count
    }
}

/// Window title showing the frame rate.
pub fn fps_title(prefix: &str, fps: u32) -> String {
    format!("{} | FPS: {}", prefix, fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_has_zero_dt() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(t0);
        assert_eq!(clock.dt(), 0.0);

        clock.begin_frame(t0 + Duration::from_millis(500));
        assert_eq!(clock.dt(), 0.0);
    }

    #[test]
    fn test_dt_lags_one_frame() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(t0);

        clock.begin_frame(t0);
        clock.end_frame(t0 + Duration::from_millis(15));
        clock.begin_frame(t0 + Duration::from_millis(20));
        assert!((clock.dt() - 0.020).abs() < 1e-6);

        // a slow frame only shows up in the step after it
        clock.end_frame(t0 + Duration::from_millis(65));
        assert!((clock.dt() - 0.020).abs() < 1e-6);
        clock.begin_frame(t0 + Duration::from_millis(70));
        assert!((clock.dt() - 0.050).abs() < 1e-6);
    }

    #[test]
    fn test_time_between_redraws_is_counted() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(t0);

        // 10ms of drawing, then 90ms waiting in the event loop
        clock.begin_frame(t0);
        clock.end_frame(t0 + Duration::from_millis(10));
        clock.begin_frame(t0 + Duration::from_millis(100));
        assert!((clock.dt() - 0.100).abs() < 1e-6);
    }

    #[test]
    fn test_fps_reported_once_per_second() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(t0);
        let mut reports = Vec::new();

        for i in 1..=150u64 {
            let now = t0 + Duration::from_millis(i * 10);
            clock.begin_frame(now - Duration::from_millis(10));
            if let Some(fps) = clock.end_frame(now) {
                reports.push(fps);
            }
        }

        assert_eq!(reports, vec![100]);
        assert_eq!(clock.frame(), 150);
    }

    #[test]
    fn test_fixed_delta() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(t0).with_fixed_delta(Some(1.0 / 60.0));
        assert_eq!(clock.dt(), 0.0);

        clock.begin_frame(t0);
        assert_eq!(clock.dt(), 0.0);
        clock.end_frame(t0 + Duration::from_millis(10));
        clock.begin_frame(t0 + Duration::from_millis(300));
        assert_eq!(clock.dt(), 1.0 / 60.0);
    }

    #[test]
    fn test_fps_title() {
        assert_eq!(fps_title("Particles", 60), "Particles | FPS: 60");
    }
}
