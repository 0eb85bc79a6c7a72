//! Mutable state of one viewer session
//!
//! Shared between the session and the script bridge as `Rc<RefCell<_>>`. The
//! render thread is the only thread that ever touches it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::animation::TweenManager;
use crate::assets::AssetLoader;
use crate::config::ViewerConfig;
use crate::foundation::math::Vec3;
use crate::render::{BackendResult, Camera, OrbitControls, SoftwareRenderer};
use crate::scene::{ObjectRegistry, Scene};

/// Handle shared with the script bridge
pub type SharedState = Rc<RefCell<SessionState>>;

/// Scene, camera, renderer, controls and registry of a session
#[derive(Debug)]
pub struct SessionState {
    /// Retained scene graph
    pub scene: Scene,
    /// Session camera
    pub camera: Camera,
    /// Orbit controls driving the camera
    pub controls: OrbitControls,
    /// Output surface
    pub renderer: SoftwareRenderer,
    /// Name to node map
    pub registry: ObjectRegistry,
    /// Running tweens
    pub tweens: TweenManager,
    /// Background model loads
    pub loader: AssetLoader,
    /// Generation of the submission being processed
    pub generation: u64,
}

impl SessionState {
    /// Build fresh session state from configuration
    pub fn new(config: &ViewerConfig) -> BackendResult<Self> {
        let ViewerConfig { viewport, camera, controls, assets, .. } = config;
        let renderer = SoftwareRenderer::new(viewport.width, viewport.height)?;
        let camera = Camera::from_config(camera, viewport.width, viewport.height);
        let mut controls = OrbitControls::from_config(controls);
        controls.set_target(Vec3::zeros());

        Ok(Self {
            scene: Scene::new(),
            camera,
            controls,
            renderer,
            registry: ObjectRegistry::new(),
            tweens: TweenManager::new(),
            loader: AssetLoader::new(assets),
            generation: 0,
        })
    }

    /// Wrap in the shared handle
    pub fn into_shared(self) -> SharedState {
        Rc::new(RefCell::new(self))
    }
}
