//! Render lifecycle.
//!
//! A [`Renderer`] owns the scene, camera, controls and graphics backend of one
//! drawing surface and walks through
//!
//! ```text
//! Uninitialized -> Initializing -> Running <-> Paused -> Disposed
//! ```
//!
//! The host drives it with one [`Renderer::frame`] call per animation frame.
//! Hidden surfaces are not rendered, and with `forceContext` their GPU context
//! is released until they become visible again.

use winit::event::WindowEvent;

use crate::{
    backend::GraphicsBackend,
    camera::{Camera, OrbitControls, Projection},
    config::RenderOptions,
    data_structures::scene_graph::{AmbientLightNode, Scene, SceneNode},
    error::{Result, SkinError},
    export::{DEFAULT_MIME, encode_data_url, trim_transparent},
    helpers::{AXES_LENGTH, GRID_DIVISIONS, GRID_SIZE, axes_helper, grid_helper},
    stats::FrameStats,
    visibility::{Visibility, VisibilitySource},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Running,
    Paused,
    Disposed,
}

/// What a [`Renderer::frame`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// Skipped by the frame rate limit.
    Throttled,
    /// Skipped because the surface is hidden.
    Paused,
    /// No scene, no animation frame or already disposed.
    Inactive,
}

/// Caps the render rate of an animation loop running at display speed.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameLimiter {
    interval: f64,
    delta: f64,
}

impl FrameLimiter {
    /// `None` for limits `<= 0`, which means rendering every frame.
    pub fn new(frame_rate_limit: f64) -> Option<Self> {
        (frame_rate_limit > 0.0).then(|| Self {
            interval: 1.0 / frame_rate_limit,
            delta: 0.0,
        })
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Adds `dt` seconds and decides whether this frame renders.
    ///
    /// The time left over after a rendered frame carries into the next one.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.delta += dt;
        if self.delta <= self.interval {
            return false;
        }
        self.delta %= self.interval;
        true
    }
}

type DisposeHook = Box<dyn FnOnce()>;

pub struct Renderer<B: GraphicsBackend> {
    options: RenderOptions,
    render_type: String,
    state: LifecycleState,
    scene: Scene,
    camera: Camera,
    projection: Option<Projection>,
    controls: Option<OrbitControls>,
    backend: Option<B>,
    visibility: Option<Box<dyn VisibilitySource>>,
    on_screen: bool,
    limiter: Option<FrameLimiter>,
    stats: Option<FrameStats>,
    canvas_id: Option<String>,
    animation_frame: Option<u64>,
    next_animation_frame: u64,
    dispose_hooks: Vec<DisposeHook>,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(options: RenderOptions, render_type: impl Into<String>) -> Self {
        let camera = Camera::from_options(&options.camera);
        Self {
            options,
            render_type: render_type.into(),
            state: LifecycleState::Uninitialized,
            scene: Scene::new(),
            camera,
            projection: None,
            controls: None,
            backend: None,
            visibility: None,
            on_screen: true,
            limiter: None,
            stats: None,
            canvas_id: None,
            animation_frame: None,
            next_animation_frame: 1,
            dispose_hooks: Vec::new(),
        }
    }

    /// Builds the scene around `backend` and starts animating.
    ///
    /// `viewport` is used for every canvas dimension the options leave open.
    /// Calling this on a running renderer does nothing.
    pub fn init_scene(
        &mut self,
        mut backend: B,
        viewport: (u32, u32),
        visibility: Option<Box<dyn VisibilitySource>>,
    ) -> Result<()> {
        match self.state {
            LifecycleState::Uninitialized => (),
            LifecycleState::Disposed => return Err(SkinError::Disposed),
            _ => return Ok(()),
        }
        self.state = LifecycleState::Initializing;
        log::info!("skin-ngin/{}/{}", self.render_type, env!("CARGO_PKG_VERSION"));
        log::info!(
            "{} build",
            if cfg!(debug_assertions) { "DEVELOPMENT" } else { "PRODUCTION" }
        );

        let (width, height) = self.options.canvas_size(viewport);
        let camera_options = &self.options.camera;
        self.projection = Some(Projection::new(
            camera_options.kind,
            width,
            height,
            camera_options.zoom,
        ));
        self.camera = Camera::from_options(camera_options);
        backend.resize(width, height);

        if self.options.show_axes {
            self.scene.add(Box::new(axes_helper(AXES_LENGTH)));
        }
        if self.options.show_grid {
            self.scene.add(Box::new(grid_helper(GRID_SIZE, GRID_DIVISIONS)));
        }
        self.scene.add(Box::new(AmbientLightNode::default()));

        self.controls = self
            .options
            .controls
            .enabled
            .then(|| OrbitControls::new(self.options.controls.clone(), width, height));
        self.limiter = FrameLimiter::new(self.options.frame_rate_limit);
        self.stats = self.options.enable_stats.then(FrameStats::new);
        self.canvas_id = Some(format!(
            "skin-ngin-canvas-{}-{}",
            self.scene.id(),
            now_millis()
        ));

        // On-screen tracking only exists to pause hidden canvases.
        let visibility = match visibility {
            Some(mut source) if !self.options.pause_hidden => {
                source.detach();
                None
            }
            visibility => visibility,
        };
        self.on_screen = visibility
            .as_ref()
            .map_or(true, |source| source.initial().is_visible());
        self.visibility = visibility;
        self.backend = Some(backend);
        self.state = LifecycleState::Running;
        self.request_animation_frame();
        Ok(())
    }

    /// Renders one animation frame, `dt` is the time since the last call in seconds.
    ///
    /// `on_frame` runs right before drawing and may animate the scene.
    pub fn frame(&mut self, dt: f64, on_frame: impl FnOnce(&mut Scene)) -> Result<FrameOutcome> {
        if !matches!(self.state, LifecycleState::Running | LifecycleState::Paused)
            || self.animation_frame.is_none()
        {
            return Ok(FrameOutcome::Inactive);
        }
        if let Some(visibility) = self.visibility.as_mut().and_then(|source| source.poll()) {
            self.set_visibility(visibility);
        }
        if let Some(stats) = self.stats.as_mut() {
            stats.begin();
        }
        if self.options.pause_hidden && !self.on_screen {
            self.state = LifecycleState::Paused;
            return Ok(FrameOutcome::Paused);
        }
        self.state = LifecycleState::Running;
        if let Some(limiter) = self.limiter.as_mut() {
            if !limiter.tick(dt) {
                return Ok(FrameOutcome::Throttled);
            }
        }

        let (Some(backend), Some(projection)) = (self.backend.as_mut(), self.projection.as_ref())
        else {
            return Ok(FrameOutcome::Inactive);
        };
        if let Some(controls) = self.controls.as_mut() {
            controls.update(&mut self.camera, projection);
        }
        on_frame(&mut self.scene);
        self.scene.update_world_transforms();
        backend
            .render(&mut self.scene, &self.camera, projection)
            .map_err(SkinError::Backend)?;

        if let Some(stats) = self.stats.as_mut() {
            stats.end();
        }
        Ok(FrameOutcome::Rendered)
    }

    /// Applies an on-screen change, ignored unless `pause_hidden` is set.
    pub fn set_visibility(&mut self, visibility: Visibility) {
        let visible = visibility.is_visible();
        if !self.options.pause_hidden || visible == self.on_screen {
            return;
        }
        self.on_screen = visible;
        log::debug!("Canvas {:?} is now {visibility:?}", self.canvas_id);

        if self.options.force_context {
            if let Some(backend) = self.backend.as_mut() {
                if visible {
                    if let Err(e) = backend.restore_context() {
                        log::error!("Could not restore the graphics context: {e}");
                    }
                } else {
                    self.scene.release_gpu();
                    backend.release_context();
                }
            }
        }
        if matches!(self.state, LifecycleState::Running | LifecycleState::Paused) {
            self.state = if !visible {
                LifecycleState::Paused
            } else {
                LifecycleState::Running
            };
        }
    }

    /// Recomputes the projection for the new size and resizes the backend.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (Some(projection), Some(backend)) = (self.projection.as_mut(), self.backend.as_mut())
        else {
            log::debug!("Ignoring resize to {width}x{height} before the scene exists");
            return;
        };
        projection.resize(width, height);
        backend.resize(width, height);
        if let Some(controls) = self.controls.as_mut() {
            controls.resize(width, height);
        }
    }

    /// Feeds input to the controls, returns whether it was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Occluded(occluded) => {
                self.set_visibility(if *occluded {
                    Visibility::Hidden
                } else {
                    Visibility::Visible
                });
                false
            }
            event => self
                .controls
                .as_mut()
                .is_some_and(|controls| controls.handle_window_event(event)),
        }
    }

    /// Adds `node` to the scene tagged with this renderer's type.
    pub fn add_to_scene(&mut self, mut node: Box<dyn SceneNode>) -> Result<()> {
        if self.state == LifecycleState::Disposed {
            return Err(SkinError::Disposed);
        }
        node.set_render_type(Some(&self.render_type));
        self.scene.add(node);
        Ok(())
    }

    /// Removes and disposes root nodes of the scene.
    ///
    /// With neither `only_self_type` nor `keep` everything goes and the ambient
    /// light is added back. Returns the number of removed nodes.
    pub fn clear_scene(
        &mut self,
        only_self_type: bool,
        keep: Option<&dyn Fn(&dyn SceneNode) -> bool>,
    ) -> usize {
        if only_self_type || keep.is_some() {
            let render_type = only_self_type.then_some(self.render_type.as_str());
            self.scene.clear(render_type, keep)
        } else {
            let removed = self.scene.clear(None, None);
            self.scene.add(Box::new(AmbientLightNode::default()));
            removed
        }
    }

    /// Encodes the last rendered frame as a data url, `image/png` by default.
    pub async fn to_image(&mut self, trim: bool, mime: Option<&str>) -> Result<String> {
        let backend = match (self.state, self.backend.as_mut()) {
            (LifecycleState::Disposed, _) => return Err(SkinError::Disposed),
            (_, Some(backend)) => backend,
            (_, None) => return Err(SkinError::NotInitialized),
        };
        let image = backend.read_pixels().await.map_err(SkinError::Backend)?;
        let image = if trim { trim_transparent(&image) } else { image };
        encode_data_url(image, mime.unwrap_or(DEFAULT_MIME))
    }

    /// Runs `hook` once when the renderer is disposed.
    pub fn on_dispose(&mut self, hook: impl FnOnce() + 'static) {
        self.dispose_hooks.push(Box::new(hook));
    }

    /// Tears everything down. Safe to call repeatedly and before initialization.
    pub fn dispose(&mut self) {
        if self.state == LifecycleState::Disposed {
            return;
        }
        self.cancel_animation_frame();
        if let Some(mut visibility) = self.visibility.take() {
            visibility.detach();
        }
        self.scene.clear(None, None);
        for hook in self.dispose_hooks.drain(..) {
            hook();
        }
        if let Some(mut backend) = self.backend.take() {
            backend.release_context();
            backend.dispose();
        }
        self.controls = None;
        self.projection = None;
        self.limiter = None;
        self.stats = None;
        self.state = LifecycleState::Disposed;
        log::info!("Disposed {} renderer", self.render_type);
    }

    pub fn request_animation_frame(&mut self) -> u64 {
        let handle = self.next_animation_frame;
        self.next_animation_frame += 1;
        self.animation_frame = Some(handle);
        handle
    }

    pub fn cancel_animation_frame(&mut self) -> Option<u64> {
        self.animation_frame.take()
    }

    pub fn is_animating(&self) -> bool {
        self.animation_frame.is_some()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render_type(&self) -> &str {
        &self.render_type
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    pub fn canvas_id(&self) -> Option<&str> {
        self.canvas_id.as_deref()
    }

    pub fn is_on_screen(&self) -> bool {
        self.on_screen
    }

    pub fn limiter(&self) -> Option<&FrameLimiter> {
        self.limiter.as_ref()
    }
}

impl<B: GraphicsBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis())
}

#[cfg(target_arch = "wasm32")]
fn now_millis() -> u128 {
    js_sys::Date::now() as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_is_disabled_for_non_positive_limits() {
        assert!(FrameLimiter::new(-1.0).is_none());
        assert!(FrameLimiter::new(0.0).is_none());
    }

    #[test]
    fn limiter_keeps_the_remainder() {
        let mut limiter = FrameLimiter::new(10.0).unwrap();
        assert!(!limiter.tick(0.05));
        assert!(!limiter.tick(0.05));
        assert!(limiter.tick(0.06));
        assert!((limiter.delta - 0.06).abs() < 1e-9);
    }
}
