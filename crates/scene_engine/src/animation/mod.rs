//! Time-based animation
//!
//! Scripts start tweens; the render loop advances them once per frame with the
//! frame delta.

pub mod tween;

pub use tween::{Easing, TweenError, TweenId, TweenManager, TweenOptions, TweenProperty, TweenValue};
