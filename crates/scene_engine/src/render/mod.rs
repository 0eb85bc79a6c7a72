//! # Rendering
//!
//! Everything the render loop needs to present the scene: the session camera and
//! its orbit controls, geometry and materials, the [`RenderBackend`] trait and the
//! CPU [`SoftwareRenderer`] that implements it.
//!
//! ## Color management
//!
//! Colors and textures carry a [`ColorEncoding`] tag. Shading happens in linear
//! space; the backend encodes to sRGB when it resolves a frame.

pub mod backend;
pub mod camera;
pub mod controls;
pub mod geometry;
pub mod material;
pub mod software;

pub use backend::{BackendResult, FrameLights, FrameStats, RenderBackend, RenderError};
pub use camera::Camera;
pub use controls::OrbitControls;
pub use geometry::{Geometry, GeometryError};
pub use material::{
    BasicMaterial, Color, ColorEncoding, Material, PhongMaterial, Side, StandardMaterial, Texture,
};
pub use software::SoftwareRenderer;
