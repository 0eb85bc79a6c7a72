//! # Scene Engine
//!
//! A retained 3D scene that replays generated scene scripts and imported models
//! without ever being rebuilt.
//!
//! ## Features
//!
//! - **Persistent Session**: one scene, camera, renderer and control set per viewer
//! - **Scripted Scenes**: Rhai scripts with create-or-update by name and tweens
//! - **Model Import**: OBJ and GLB parsed off the render thread, normalized and framed
//! - **Failure Isolation**: a failing script rolls back and the loop keeps rendering
//! - **Software Rendering**: CPU rasterizer with PNG frame output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), ViewerError> {
//!     scene_engine::foundation::logging::init();
//!
//!     let mut viewer = Viewer::new(ViewerConfig::default());
//!     viewer.submit(Submission::script(r#"
//!         update_or_create("cube",
//!             || three::mesh(three::box(1, 1, 1), three::standard(0x44aa88)),
//!             |cube| { cube.rotation = vec3(0.3, 0.6, 0); });
//!     "#))?;
//!     viewer.run_frames(60, Duration::from_millis(16));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod render;
pub mod scene;
pub mod assets;
pub mod animation;
pub mod script;
pub mod viewer;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{Easing, TweenManager, TweenOptions, TweenProperty},
        assets::{AssetError, MeshFormat},
        config::{Config, SceneResetPolicy, ViewerConfig},
        foundation::{
            collections::NodeId,
            math::{Mat4, Transform, Vec3},
        },
        render::{Camera, Color, Geometry, Material, OrbitControls, RenderBackend, SoftwareRenderer},
        scene::{Node, ObjectRegistry, Scene},
        script::{ScriptError, ScriptExecutor},
        viewer::{Submission, Viewer, ViewerError, ViewerSession},
    };
}
