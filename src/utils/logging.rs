use log::{Level, log_enabled, warn};
use std::time::{Duration, Instant};

/// Simple scoped timer for profiling the phases of a sub-step.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when a single sub-step took longer than the simulated time it covers.
pub fn warn_if_substep_over_budget(duration: Duration, timestep: f32, rows: usize) {
    if timestep > 0.0 && duration.as_secs_f32() > timestep {
        warn!(
            "sub-step took {:.2} ms for {:.2} ms of simulated time ({} rows)",
            duration.as_secs_f32() * 1000.0,
            timestep * 1000.0,
            rows
        );
    }
}
