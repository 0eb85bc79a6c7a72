//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honors `RUST_LOG`; defaults to `info` for this crate when unset.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("scene_engine=info,scene_viewer=info");
    // A second init (tests, embedding hosts) is not an error worth surfacing.
    let _ = env_logger::Builder::from_env(env).try_init();
}
