//! Time management utilities

use std::time::{Duration, Instant};

/// Frame clock driving the render loop and tween updates
///
/// In real-time mode the clock reads wall time on every [`FrameClock::tick`].
/// Headless runs advance it with a fixed step through [`FrameClock::advance`],
/// which keeps animation results deterministic.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Instant,
    delta_time: f32,
    elapsed: Duration,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a new clock at time zero
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advance by the wall time since the previous tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let step = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.step(step)
    }

    /// Advance by a fixed step
    pub fn advance(&mut self, step: Duration) -> f32 {
        self.last_frame = Instant::now();
        self.step(step)
    }

    fn step(&mut self, step: Duration) -> f32 {
        self.delta_time = step.as_secs_f32();
        self.elapsed += step;
        self.frame_count += 1;
        self.delta_time
    }

    /// Seconds elapsed during the last frame
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total elapsed clock time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_advance_accumulates() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::from_millis(16));
        clock.advance(Duration::from_millis(16));

        assert_eq!(clock.frame_count(), 2);
        assert!((clock.elapsed_ms() - 32.0).abs() < 1e-9);
        assert!((clock.delta_time() - 0.016).abs() < 1e-6);
    }
}
