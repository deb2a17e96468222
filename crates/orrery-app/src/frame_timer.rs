//! Wall-clock frame timing.

use std::time::Instant;
use tracing::warn;

/// Longest frame delta handed to the simulation. Longer stalls (window drags,
/// breakpoints) are clamped so bodies do not jump.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Measures the real time between consecutive frames.
pub struct FrameTimer {
    previous: Instant,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
            frame_count: 0,
        }
    }

    /// Seconds since the previous call (or construction), clamped to [`MAX_FRAME_TIME`].
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.previous).as_secs_f64();
        self.previous = now;
        self.frame_count += 1;
        clamp_frame_time(elapsed)
    }

    /// Restart timing from now, e.g. after the window was re-created.
    pub fn reset(&mut self) {
        self.previous = Instant::now();
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

pub fn clamp_frame_time(frame_time: f64) -> f64 {
    if frame_time > MAX_FRAME_TIME {
        warn!(
            "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
            frame_time * 1000.0,
            MAX_FRAME_TIME * 1000.0
        );
        MAX_FRAME_TIME
    } else {
        frame_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_short_frames_pass_through() {
        assert_eq!(clamp_frame_time(0.016), 0.016);
        assert_eq!(clamp_frame_time(0.0), 0.0);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        assert_eq!(clamp_frame_time(1.0), MAX_FRAME_TIME);
        assert_eq!(clamp_frame_time(MAX_FRAME_TIME), MAX_FRAME_TIME);
    }

    #[test]
    fn test_tick_measures_elapsed_time() {
        let mut timer = FrameTimer::new();
        std::thread::sleep(Duration::from_millis(5));
        let dt = timer.tick();
        assert!(dt >= 0.005, "dt = {dt}");
        assert!(dt <= MAX_FRAME_TIME);
        assert_eq!(timer.frame_count(), 1);
    }
}
