//! Per-frame driver
//!
//! One frame advances tweens, applies orbit-control damping and draws the scene
//! through the session's [`RenderBackend`]. The loop starts when the session is
//! created and stops on teardown.

use std::time::Duration;

use crate::foundation::time::FrameClock;
use crate::render::{BackendResult, FrameStats, RenderBackend};
use crate::viewer::state::SessionState;

/// Frame clock plus running flag
#[derive(Debug, Clone, Default)]
pub struct RenderLoop {
    clock: FrameClock,
    running: bool,
    last_stats: Option<FrameStats>,
}

impl RenderLoop {
    /// Create a stopped loop
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking
    pub fn start(&mut self) {
        if !self.running {
            log::debug!("Render loop started");
        }
        self.running = true;
    }

    /// Stop ticking; later frames are no-ops
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("Render loop stopped after {} frames", self.clock.frame_count());
        }
        self.running = false;
    }

    /// True between start and stop
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Statistics of the most recent frame
    pub fn last_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    /// Run one frame using wall time since the previous tick
    pub fn tick(&mut self, state: &mut SessionState) -> BackendResult<Option<FrameStats>> {
        if !self.running {
            return Ok(None);
        }
        let dt = self.clock.tick();
        self.frame(state, dt).map(Some)
    }

    /// Run one frame with a fixed time step
    pub fn step(&mut self, state: &mut SessionState, step: Duration) -> BackendResult<Option<FrameStats>> {
        if !self.running {
            return Ok(None);
        }
        let dt = self.clock.advance(step);
        self.frame(state, dt).map(Some)
    }

    fn frame(&mut self, state: &mut SessionState, dt: f32) -> BackendResult<FrameStats> {
        let SessionState { scene, camera, controls, renderer, tweens, .. } = state;

        let finished = tweens.update(dt, scene);
        if finished > 0 {
            log::trace!("{} tweens finished", finished);
        }
        controls.update(camera, dt);

        let backend: &mut dyn RenderBackend = renderer;
        let stats = backend.render(scene, camera)?;
        log::trace!(
            "Frame {}: {} meshes, {} triangles",
            stats.frame_index,
            stats.meshes_drawn,
            stats.triangles_drawn
        );
        self.last_stats = Some(stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn state() -> SessionState {
        let mut config = ViewerConfig::default();
        config.viewport.width = 16;
        config.viewport.height = 16;
        SessionState::new(&config).unwrap()
    }

    #[test]
    fn test_stopped_loop_does_nothing() {
        let mut render_loop = RenderLoop::new();
        let mut state = state();

        assert_eq!(render_loop.step(&mut state, Duration::from_millis(16)).unwrap(), None);
        assert_eq!(render_loop.clock().frame_count(), 0);
    }

    #[test]
    fn test_frames_advance_clock_and_renderer() {
        let mut render_loop = RenderLoop::new();
        let mut state = state();
        render_loop.start();

        render_loop.step(&mut state, Duration::from_millis(16)).unwrap();
        let stats = render_loop.step(&mut state, Duration::from_millis(16)).unwrap().unwrap();

        assert_eq!(stats.frame_index, 1);
        assert_eq!(render_loop.clock().frame_count(), 2);
        assert_eq!(render_loop.last_stats(), Some(stats));

        render_loop.stop();
        assert!(!render_loop.is_running());
    }
}
