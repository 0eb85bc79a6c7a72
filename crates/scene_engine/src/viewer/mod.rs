//! # Viewer
//!
//! The outer surface of the engine. A [`Viewer`] owns a [`Viewport`] and, once
//! mounted, a [`ViewerSession`] that lives until teardown. Callers hand it
//! [`Submission`]s (scripts or model files) and drive frames.

pub mod framing;
pub mod render_loop;
pub mod session;
pub mod state;
pub mod submission;
pub mod viewport;

use std::time::Duration;

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::{ConfigError, ViewerConfig};
use crate::render::{FrameStats, RenderError};
use crate::scene::{EnvironmentError, RegistryError, SceneError};
use crate::script::ScriptError;

pub use framing::{frame_scene, framing_distance};
pub use render_loop::RenderLoop;
pub use session::ViewerSession;
pub use state::{SessionState, SharedState};
pub use submission::Submission;
pub use viewport::{HandlerId, Viewport, ViewportEvent, ViewportHandler};

/// Errors surfaced by the viewer
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Model import failed or the file type is not supported
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The submitted script failed
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// A name could not be registered
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Rendering or frame output failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scene graph operation failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Environment map could not be loaded
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// Session state was already borrowed
    #[error("Session state is busy")]
    StateBusy,
}

impl ViewerError {
    /// Message shown to the user in the error overlay
    pub fn user_message(&self) -> String {
        match self {
            Self::Asset(AssetError::UnsupportedFormat(extension)) => {
                format!("Unsupported file type: {extension}")
            }
            other => other.to_string(),
        }
    }
}

/// Mountable viewer: viewport plus a lazily created session
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    viewport: Viewport,
    session: Option<ViewerSession>,
    resize_handler: Option<HandlerId>,
}

impl Viewer {
    /// Create an unmounted viewer
    pub fn new(config: ViewerConfig) -> Self {
        let viewport = Viewport::new(config.viewport.width, config.viewport.height);
        Self {
            config,
            viewport,
            session: None,
            resize_handler: None,
        }
    }

    /// True while a session exists
    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Create the session if needed
    pub fn mount(&mut self) -> Result<&mut ViewerSession, ViewerError> {
        if self.session.is_none() {
            let mut config = self.config.clone();
            let (width, height) = self.viewport.size();
            config.viewport.width = width;
            config.viewport.height = height;

            let session = ViewerSession::new(config)?;
            self.resize_handler = Some(self.viewport.register_handler(session.resize_handler()));
            self.session = Some(session);
        }
        self.session.as_mut().ok_or(ViewerError::StateBusy)
    }

    /// Live session, if mounted
    pub fn session(&self) -> Option<&ViewerSession> {
        self.session.as_ref()
    }

    /// Mutable live session, if mounted
    pub fn session_mut(&mut self) -> Option<&mut ViewerSession> {
        self.session.as_mut()
    }

    /// Viewport driving resize events
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Hand a submission to the session, mounting it first if needed
    pub fn submit(&mut self, submission: Submission) -> Result<(), ViewerError> {
        self.mount()?.submit(submission)
    }

    /// Latest user-visible error
    pub fn last_error(&self) -> Option<&str> {
        self.session.as_ref().and_then(ViewerSession::last_error)
    }

    /// Resize the output surface
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
        self.viewport.dispatch();
    }

    /// Run one wall-clock frame
    pub fn tick(&mut self) -> Option<FrameStats> {
        self.session.as_mut().and_then(ViewerSession::tick)
    }

    /// Run one fixed-step frame
    pub fn advance(&mut self, step: Duration) -> Option<FrameStats> {
        self.session.as_mut().and_then(|session| session.advance(step))
    }

    /// Run several fixed-step frames
    pub fn run_frames(&mut self, frames: u32, step: Duration) -> Option<FrameStats> {
        self.session.as_mut().and_then(|session| session.run_frames(frames, step))
    }

    /// Stop rendering and release the session
    pub fn teardown(&mut self) {
        if let Some(id) = self.resize_handler.take() {
            self.viewport.deregister_handler(id);
        }
        self.viewport.clear();
        if let Some(session) = self.session.take() {
            session.teardown();
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderBackend;
    use approx::assert_relative_eq;

    fn viewer() -> Viewer {
        let mut config = ViewerConfig::default();
        config.viewport.width = 40;
        config.viewport.height = 20;
        Viewer::new(config)
    }

    #[test]
    fn test_mounts_lazily_on_submit() {
        let mut viewer = viewer();
        assert!(!viewer.is_mounted());
        assert!(viewer.tick().is_none());

        viewer.submit(Submission::script("let a = 1;")).unwrap();

        assert!(viewer.is_mounted());
        assert_eq!(viewer.viewport().handler_count(), 1);
        assert!(viewer.advance(Duration::from_millis(16)).is_some());
    }

    #[test]
    fn test_resize_updates_camera_and_renderer() {
        let mut viewer = viewer();
        viewer.mount().unwrap();

        viewer.resize(60, 30);

        let state = viewer.session().unwrap().state();
        assert_relative_eq!(state.camera.aspect, 2.0);
        assert_eq!(state.renderer.size(), (60, 30));
    }

    #[test]
    fn test_teardown_releases_handlers() {
        let mut viewer = viewer();
        viewer.mount().unwrap();

        viewer.teardown();
        viewer.resize(10, 10);

        assert!(!viewer.is_mounted());
        assert_eq!(viewer.viewport().handler_count(), 0);
        assert!(viewer.last_error().is_none());
    }

    #[test]
    fn test_unsupported_type_message() {
        let error = ViewerError::from(AssetError::UnsupportedFormat(".fbx".to_string()));
        assert_eq!(error.user_message(), "Unsupported file type: .fbx");
    }
}
