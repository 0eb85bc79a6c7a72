//! Viewer session
//!
//! A session owns one scene, camera, renderer, controls and registry for its
//! whole life. Each [`Submission`] runs against that state:
//!
//! 1. The generation counter is bumped and the scene is reset (lights always,
//!    everything else under [`SceneResetPolicy::Full`])
//! 2. A script runs once; on failure the scene and registry go back to their
//!    state right after the reset
//! 3. A file is parsed on a worker thread; the result is attached, normalized
//!    and framed when it arrives
//!
//! Completions carrying an older generation are dropped.

use std::cell::{Ref, RefMut};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::animation::TweenManager;
use crate::assets::{normalize_subtree, LoadCompletion, LoadRequest, LoadSource, LoadTicket};
use crate::config::{SceneResetPolicy, ViewerConfig};
use crate::render::FrameStats;
use crate::scene::{reset_lights, EnvironmentLoad, EnvironmentMap, LightSet, ObjectRegistry, Scene};
use crate::script::ScriptExecutor;
use crate::viewer::framing::frame_scene;
use crate::viewer::render_loop::RenderLoop;
use crate::viewer::state::{SessionState, SharedState};
use crate::viewer::submission::Submission;
use crate::viewer::viewport::{ViewportEvent, ViewportHandler};
use crate::viewer::ViewerError;

fn borrow_state(state: &SharedState) -> Result<RefMut<'_, SessionState>, ViewerError> {
    state.try_borrow_mut().map_err(|_| ViewerError::StateBusy)
}

/// Scene contents restored when a script fails
struct Snapshot {
    scene: Scene,
    registry: ObjectRegistry,
    tweens: TweenManager,
}

impl Snapshot {
    fn take(state: &SessionState) -> Self {
        Self {
            scene: state.scene.clone(),
            registry: state.registry.clone(),
            tweens: state.tweens.clone(),
        }
    }

    fn restore(self, state: &mut SessionState) {
        state.scene = self.scene;
        state.registry = self.registry;
        state.tweens = self.tweens;
    }
}

/// Forwards viewport resizes to the session camera and renderer
struct ResizeHandler {
    state: std::rc::Weak<std::cell::RefCell<SessionState>>,
}

impl ViewportHandler for ResizeHandler {
    fn on_viewport_event(&mut self, event: &ViewportEvent) -> bool {
        let ViewportEvent::Resized { width, height } = *event;
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            log::warn!("Resize to {}x{} skipped: session state busy", width, height);
            return false;
        };
        state.camera.set_aspect_ratio(crate::render::camera::aspect_of(width, height));
        if let Err(e) = crate::render::RenderBackend::set_size(&mut state.renderer, width, height) {
            log::error!("Renderer resize failed: {}", e);
        }
        false
    }
}

/// One live viewer: state, script executor, loads and render loop
pub struct ViewerSession {
    config: ViewerConfig,
    state: SharedState,
    executor: ScriptExecutor,
    render_loop: RenderLoop,
    environment_load: Option<EnvironmentLoad>,
    environment: Option<Arc<EnvironmentMap>>,
    frame_tickets: HashSet<LoadTicket>,
    lights: Option<LightSet>,
    last_error: Option<String>,
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("executor", &self.executor)
            .field("render_loop", &self.render_loop)
            .field("environment", &self.environment.is_some())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl ViewerSession {
    /// Create the session state and start the render loop
    pub fn new(config: ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;
        let state = SessionState::new(&config)?.into_shared();
        let executor = ScriptExecutor::new(&config.script, &state);
        let environment_load = config
            .lighting
            .environment_map
            .as_ref()
            .map(|path| EnvironmentLoad::spawn(PathBuf::from(path)));

        let mut render_loop = RenderLoop::new();
        render_loop.start();
        log::info!(
            "Viewer session created ({}x{}, reset policy {:?})",
            config.viewport.width,
            config.viewport.height,
            config.reset_policy
        );

        Ok(Self {
            config,
            state,
            executor,
            render_loop,
            environment_load,
            environment: None,
            frame_tickets: HashSet::new(),
            lights: None,
            last_error: None,
        })
    }

    /// Shared state handle
    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }

    /// Read access to the session state
    pub fn state(&self) -> Ref<'_, SessionState> {
        self.state.borrow()
    }

    /// Generation of the latest submission
    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Node ids of the light set added by the latest reset
    pub fn lights(&self) -> Option<LightSet> {
        self.lights
    }

    /// User-visible message of the latest failure, cleared by the next successful submission
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Handler that keeps camera aspect and renderer size in sync with the viewport
    pub fn resize_handler(&self) -> Box<dyn ViewportHandler> {
        Box::new(ResizeHandler {
            state: std::rc::Rc::downgrade(&self.state),
        })
    }

    /// Process one submission
    ///
    /// Failures are also recorded for [`ViewerSession::last_error`].
    pub fn submit(&mut self, submission: Submission) -> Result<(), ViewerError> {
        log::info!("Processing {} submission", submission.kind_name());
        let result = self.process(submission);
        match &result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                log::error!("Submission failed: {}", e);
                self.last_error = Some(e.user_message());
            }
        }
        result
    }

    fn process(&mut self, submission: Submission) -> Result<(), ViewerError> {
        // Validation happens before any state changes.
        let format = submission.format()?;

        let generation = {
            let mut state = borrow_state(&self.state)?;
            state.generation += 1;
            self.lights = Some(reset_scene(&mut state, &self.config, self.environment.as_ref()));
            state.generation
        };

        match submission {
            Submission::Script(source) => self.run_script(&source),
            Submission::File { name, bytes, .. } => {
                let Some(format) = format else {
                    return Ok(());
                };
                let mut state = borrow_state(&self.state)?;
                let ticket = state.loader.submit(LoadRequest {
                    name,
                    format,
                    source: LoadSource::Bytes(bytes),
                    generation,
                });
                self.frame_tickets.insert(ticket);
                Ok(())
            }
        }
    }

    fn run_script(&mut self, source: &str) -> Result<(), ViewerError> {
        let snapshot = Snapshot::take(&*borrow_state(&self.state)?);

        let result = self.executor.execute(source);
        self.executor.settle();

        let mut state = borrow_state(&self.state)?;
        match result {
            Ok(()) => {
                let pruned = state.scene.prune_detached();
                let SessionState { registry, scene, .. } = &mut *state;
                let stale = registry.prune_stale(scene);
                log::debug!("Script done: {} detached nodes pruned, {} stale entries dropped", pruned, stale);
                Ok(())
            }
            Err(error) => {
                snapshot.restore(&mut state);
                // Loads requested by the failed script carry this generation.
                state.generation += 1;
                Err(error.into())
            }
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) -> Result<bool, ViewerError> {
        let LoadCompletion { ticket, name, format, generation, result } = completion;
        let frame = self.frame_tickets.remove(&ticket);

        let mut guard = borrow_state(&self.state)?;
        let state = &mut *guard;
        if generation != state.generation {
            log::debug!(
                "Discarding load '{}' from generation {} (current {})",
                name,
                generation,
                state.generation
            );
            return Ok(false);
        }

        let model = match result {
            Ok(model) => model,
            Err(e) => {
                let error = ViewerError::from(e);
                log::error!("Loading '{}' failed: {}", name, error);
                self.last_error = Some(error.user_message());
                return Ok(false);
            }
        };

        let root = model.instantiate(&mut state.scene)?;
        if let Some(previous) = state.registry.replace(&mut state.scene, &name, root)? {
            state.tweens.cancel_node(previous);
        }

        if format.requires_normalization() {
            normalize_subtree(&mut state.scene, root);
        }
        if frame {
            frame_scene(&state.scene, &mut state.camera, &mut state.controls);
        }
        log::info!("Attached '{}' ({})", name, format);
        Ok(true)
    }

    fn drain_loads(&mut self) -> usize {
        let completions = match borrow_state(&self.state) {
            Ok(mut state) => state.loader.poll(),
            Err(_) => return 0,
        };
        let mut applied = 0;
        for completion in completions {
            match self.apply_completion(completion) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => {
                    log::error!("Applying load failed: {}", e);
                    self.last_error = Some(e.user_message());
                }
            }
        }
        applied
    }

    fn install_environment(&mut self, result: Result<EnvironmentMap, crate::scene::EnvironmentError>) {
        self.environment_load = None;
        match result {
            Ok(map) => {
                let map = Arc::new(map);
                if let Ok(mut state) = borrow_state(&self.state) {
                    state.scene.set_environment(Arc::clone(&map));
                }
                log::info!("Environment map ready ({} mip levels)", map.mip_count());
                self.environment = Some(map);
            }
            Err(e) => log::warn!("Environment map unavailable: {}", e),
        }
    }

    fn poll_environment(&mut self) {
        if let Some(result) = self.environment_load.as_ref().and_then(EnvironmentLoad::poll) {
            self.install_environment(result);
        }
    }

    /// Block until in-flight loads (and the environment map) arrive or `timeout` expires
    ///
    /// Returns how many models were attached.
    pub fn flush_pending_loads(&mut self, timeout: Duration) -> Result<usize, ViewerError> {
        let deadline = Instant::now() + timeout;
        let mut applied = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let completion = {
                let mut state = borrow_state(&self.state)?;
                if state.loader.in_flight() == 0 {
                    break;
                }
                state.loader.wait(remaining)
            };
            match completion {
                Some(completion) => {
                    if self.apply_completion(completion)? {
                        applied += 1;
                    }
                }
                None => break,
            }
        }

        if let Some(load) = self.environment_load.as_ref() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Some(result) = load.wait(remaining) {
                self.install_environment(result);
            }
        }
        Ok(applied)
    }

    /// Run one frame on wall-clock time
    pub fn tick(&mut self) -> Option<FrameStats> {
        self.frame(None)
    }

    /// Run one frame with a fixed time step
    pub fn advance(&mut self, step: Duration) -> Option<FrameStats> {
        self.frame(Some(step))
    }

    /// Run `frames` fixed-step frames; returns the stats of the last one
    pub fn run_frames(&mut self, frames: u32, step: Duration) -> Option<FrameStats> {
        (0..frames).fold(None, |last, _| self.advance(step).or(last))
    }

    fn frame(&mut self, step: Option<Duration>) -> Option<FrameStats> {
        self.drain_loads();
        self.poll_environment();

        let mut state = match borrow_state(&self.state) {
            Ok(state) => state,
            Err(e) => {
                log::error!("Frame skipped: {}", e);
                return None;
            }
        };
        let result = match step {
            Some(step) => self.render_loop.step(&mut state, step),
            None => self.render_loop.tick(&mut state),
        };
        match result {
            Ok(stats) => stats,
            Err(e) => {
                log::error!("Frame failed: {}", e);
                None
            }
        }
    }

    /// True until teardown
    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Write the last rendered frame as PNG
    pub fn save_frame(&self, path: &Path) -> Result<(), ViewerError> {
        self.state.borrow().renderer.save_png(path)?;
        Ok(())
    }

    /// Stop the render loop and release the session
    pub fn teardown(mut self) {
        self.render_loop.stop();
        log::info!("Viewer session torn down after {} submissions", self.executor.executed());
    }
}

fn reset_scene(state: &mut SessionState, config: &ViewerConfig, environment: Option<&Arc<EnvironmentMap>>) -> LightSet {
    if config.reset_policy == SceneResetPolicy::Full {
        state.scene.clear();
        state.registry.clear();
        state.tweens.clear();
    }
    let lights = reset_lights(&mut state.scene, &config.lighting);
    if let Some(map) = environment {
        state.scene.set_environment(Arc::clone(map));
    }
    lights
}
