//! Simulation clock: turns real frame deltas into simulated time.

use tracing::info;

/// Accumulates simulated time from real frame deltas and owns the pause flag.
///
/// The camera always advances on real time; only the simulation stops while
/// paused. Resuming does not catch up on the time spent paused.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClock {
    sim_time: f64,
    real_time: f64,
    paused: bool,
    time_scale: f64,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(false, 1.0)
    }
}

impl AnimationClock {
    pub fn new(paused: bool, time_scale: f64) -> Self {
        Self {
            sim_time: 0.0,
            real_time: 0.0,
            paused,
            time_scale: sanitize_scale(time_scale),
        }
    }

    /// Advance by `real_dt` seconds and return `(sim_dt, cam_dt)`.
    ///
    /// `cam_dt` is always the (sanitized) real delta. `sim_dt` is zero while
    /// paused and `real_dt * time_scale` otherwise. Negative or non-finite
    /// deltas count as zero so simulated time never runs backwards.
    pub fn tick(&mut self, real_dt: f64) -> (f64, f64) {
        let cam_dt = if real_dt.is_finite() { real_dt.max(0.0) } else { 0.0 };
        let sim_dt = if self.paused {
            0.0
        } else {
            cam_dt * self.time_scale
        };
        self.real_time += cam_dt;
        self.sim_time += sim_dt;
        (sim_dt, cam_dt)
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if self.paused {
            info!("Simulation paused at t = {:.2}s", self.sim_time);
        } else {
            info!("Simulation resumed at t = {:.2}s", self.sim_time);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Simulated seconds accumulated while unpaused.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Real seconds since start, paused or not. Drives the star twinkle.
    pub fn real_time(&self) -> f64 {
        self.real_time
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = sanitize_scale(time_scale);
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale >= 0.0 {
        scale
    } else {
        1.0
    }
}
