//! Script execution against the session API
//!
//! Scene scripts are Rhai source. They run once per submission against an
//! explicit host-function table; see [`api`] for the surface they can reach.

pub mod api;
pub mod executor;

pub use api::{GeometryHandle, NodeHandle, ScriptVec3};
pub use executor::{ExecutorState, ScriptError, ScriptExecutor};
