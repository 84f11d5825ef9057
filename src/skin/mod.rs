//! The skin viewer built on top of the render lifecycle.
//!
//! A [`SkinRender`] turns texture descriptors into player models: it loads the
//! textures, replaces the player in the scene and, on the first successful
//! load, builds the scene around the graphics backend it was given.

pub mod cube;
pub mod loader;
pub mod model;
pub mod texture_positions;

use std::future::Future;

use winit::event::WindowEvent;

use crate::{
    backend::GraphicsBackend,
    config::RenderOptions,
    data_structures::scene_graph::SceneNode,
    error::{Result, SkinError},
    renderer::{FrameOutcome, LifecycleState, Renderer},
    resources::SkinFetcher,
    visibility::VisibilitySource,
};

use loader::{LoadedSkin, TextureDescriptor, TextureLoader};
use model::{PLAYER_MODEL_NAME, PlayerTextures, create_player_model};

/// Render type tag of every node a [`SkinRender`] adds.
pub const SKIN_RENDER_TYPE: &str = "skin";

struct PendingBackend<B> {
    backend: B,
    viewport: (u32, u32),
    visibility: Option<Box<dyn VisibilitySource>>,
}

pub struct SkinRender<B: GraphicsBackend, F> {
    renderer: Renderer<B>,
    loader: TextureLoader<F>,
    generation: u64,
    pending: Option<PendingBackend<B>>,
    attached: bool,
    slim: Option<bool>,
}

impl<B, F> SkinRender<B, F>
where
    B: GraphicsBackend,
    F: SkinFetcher + Clone + 'static,
{
    /// Creates a viewer with its own renderer. `options` are layered over
    /// [`RenderOptions::skin_defaults`] by the caller.
    pub fn new(options: RenderOptions, fetcher: F) -> Self {
        let loader = TextureLoader::new(fetcher, options.endpoints.clone());
        Self {
            renderer: Renderer::new(options, SKIN_RENDER_TYPE),
            loader,
            generation: 0,
            pending: None,
            attached: false,
            slim: None,
        }
    }

    /// Creates a viewer drawing into an already running renderer.
    ///
    /// Only the viewer's own nodes are removed on [`SkinRender::reset`] and
    /// [`SkinRender::dispose`], the renderer stays alive.
    pub fn attached(renderer: Renderer<B>, fetcher: F) -> Self {
        let loader = TextureLoader::new(fetcher, renderer.options().endpoints.clone());
        Self {
            renderer,
            loader,
            generation: 0,
            pending: None,
            attached: true,
            slim: None,
        }
    }

    /// Hands over the graphics backend.
    ///
    /// The scene is only built once a skin arrived, until then the backend is
    /// kept aside.
    pub fn provide_backend(
        &mut self,
        backend: B,
        viewport: (u32, u32),
        visibility: Option<Box<dyn VisibilitySource>>,
    ) -> Result<()> {
        if self.renderer.state() != LifecycleState::Uninitialized {
            log::warn!("The {SKIN_RENDER_TYPE} renderer already has a backend");
            return Ok(());
        }
        if self.get_player_model().is_some() {
            self.renderer.init_scene(backend, viewport, visibility)
        } else {
            self.pending = Some(PendingBackend {
                backend,
                viewport,
                visibility,
            });
            Ok(())
        }
    }

    /// Starts loading `descriptor`, the result goes to [`SkinRender::apply`].
    ///
    /// Every call supersedes the previous one, older results are discarded.
    pub fn load(
        &mut self,
        descriptor: TextureDescriptor,
    ) -> impl Future<Output = Result<LoadedSkin>> + use<B, F> {
        self.generation += 1;
        self.loader.load(descriptor, self.generation)
    }

    /// Replaces the player with a model built from `loaded`.
    ///
    /// Returns `false` for a superseded load, the scene is left untouched then.
    pub fn apply(&mut self, loaded: LoadedSkin) -> Result<bool> {
        if self.renderer.state() == LifecycleState::Disposed {
            return Err(SkinError::Disposed);
        }
        if loaded.generation != self.generation {
            log::debug!(
                "Discarding skin load {}, current is {}",
                loaded.generation,
                self.generation
            );
            return Ok(false);
        }

        let mut player = create_player_model(&PlayerTextures {
            skin: &loaded.skin,
            cape: loaded.cape.as_ref(),
            version: loaded.version,
            slim: loaded.slim,
            alternate_cape: loaded.optifine,
        });
        player.set_render_type(Some(SKIN_RENDER_TYPE));
        let scene = self.renderer.scene_mut();
        scene.remove_by_name(PLAYER_MODEL_NAME);
        scene.add(Box::new(player));
        self.slim = Some(loaded.slim);

        match self.renderer.state() {
            LifecycleState::Uninitialized => match self.pending.take() {
                Some(pending) => {
                    self.renderer
                        .init_scene(pending.backend, pending.viewport, pending.visibility)?
                }
                None => log::debug!("Waiting for a graphics backend"),
            },
            _ => {
                self.renderer.request_animation_frame();
            }
        }
        Ok(true)
    }

    /// Loads `descriptor` and shows it, `on_ready` runs once the model is in
    /// the scene.
    ///
    /// A failing skin returns the error without calling `on_ready`.
    pub async fn render(
        &mut self,
        descriptor: TextureDescriptor,
        on_ready: impl FnOnce(&mut Self),
    ) -> Result<bool> {
        let loaded = self.load(descriptor).await?;
        let applied = self.apply(loaded)?;
        if applied {
            on_ready(self);
        }
        Ok(applied)
    }

    /// Renders one animation frame, `on_frame` gets the player model.
    pub fn frame(
        &mut self,
        dt: f64,
        on_frame: impl FnOnce(Option<&mut dyn SceneNode>),
    ) -> Result<FrameOutcome> {
        self.renderer.frame(dt, |scene| {
            on_frame(
                scene
                    .get_object_by_name_mut(PLAYER_MODEL_NAME)
                    .map(|player| -> &mut dyn SceneNode { player.as_mut() }),
            )
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.renderer.handle_window_event(event)
    }

    /// Stops animating and removes the player. Loads still in flight are
    /// discarded when they arrive.
    ///
    /// An attached viewer leaves the animation loop of its host running.
    pub fn reset(&mut self) {
        self.generation += 1;
        if !self.attached {
            self.renderer.cancel_animation_frame();
        }
        self.clear_own_nodes();
        self.slim = None;
    }

    pub fn get_model_by_name(&self, name: &str) -> Option<&dyn SceneNode> {
        self.renderer.scene().get_object_by_name(name)
    }

    /// Shows or hides the named part, returns whether it exists.
    pub fn toggle_skin_part(&mut self, name: &str, visible: bool) -> bool {
        match self.renderer.scene_mut().get_object_by_name_mut(name) {
            Some(part) => {
                part.set_visible(visible);
                true
            }
            None => false,
        }
    }

    pub fn get_player_model(&self) -> Option<&dyn SceneNode> {
        self.get_model_by_name(PLAYER_MODEL_NAME)
    }

    /// Base64 data url of the current frame.
    pub async fn to_image(&mut self, trim: bool, mime: Option<&str>) -> Result<String> {
        self.renderer.to_image(trim, mime).await
    }

    /// Tears the viewer down. An attached viewer only removes its own nodes.
    pub fn dispose(&mut self) {
        self.generation += 1;
        self.pending = None;
        if self.attached {
            self.clear_own_nodes();
        } else {
            self.renderer.dispose();
        }
    }

    /// Slim flag of the shown skin.
    pub fn is_slim(&self) -> Option<bool> {
        self.slim
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn has_pending_backend(&self) -> bool {
        self.pending.is_some()
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    /// Removes the viewer's nodes and gives the renderer back to its owner.
    pub fn into_renderer(mut self) -> Renderer<B> {
        self.generation += 1;
        self.clear_own_nodes();
        self.renderer
    }

    fn clear_own_nodes(&mut self) -> usize {
        self.renderer
            .scene_mut()
            .clear(Some(SKIN_RENDER_TYPE), None)
    }
}
