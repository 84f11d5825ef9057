//! Application event loop.
//!
//! Opens a window (or a canvas on the web), builds the wgpu [`Context`] and
//! loads the requested skin at the same time, then drives a [`SkinRender`]
//! from winit events.
//!
//! # Lifecycle Flow
//!
//! 1. `resumed` creates the window and starts backend setup and texture loading
//! 2. Both results arrive as [`FlowEvent`]s (immediately on native targets)
//! 3. The first loaded skin builds the scene and starts animating
//! 4. Every `RedrawRequested` renders one frame and requests the next one while
//!    the renderer is animating

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::RenderOptions,
    context::Context,
    data_structures::scene_graph::SceneNode,
    error::Result,
    resources::HttpFetcher,
    skin::{
        SkinRender,
        loader::{LoadedSkin, TextureDescriptor},
    },
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Called every rendered frame with the player model and the frame time in
/// seconds.
pub type Animation = Box<dyn FnMut(&mut dyn SceneNode, f64)>;

pub(crate) enum FlowEvent {
    Initialized(Context),
    Loaded(Result<LoadedSkin>),
    #[allow(dead_code)]
    Exit,
}

impl std::fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized(Context)"),
            Self::Loaded(result) => f
                .debug_tuple("Loaded")
                .field(&result.as_ref().map(|loaded| loaded.generation))
                .finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    window: Option<Arc<Window>>,
    viewer: SkinRender<Context, HttpFetcher>,
    texture: Option<TextureDescriptor>,
    animation: Option<Animation>,
    #[cfg(target_arch = "wasm32")]
    host: Option<String>,
    #[cfg(target_arch = "wasm32")]
    canvas: Option<web_sys::HtmlCanvasElement>,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        options: RenderOptions,
        texture: TextureDescriptor,
        #[allow(unused_variables)] host: Option<String>,
        animation: Option<Animation>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            window: None,
            viewer: SkinRender::new(options, HttpFetcher::new()),
            texture: Some(texture),
            animation,
            #[cfg(target_arch = "wasm32")]
            host,
            #[cfg(target_arch = "wasm32")]
            canvas: None,
            last_time: Instant::now(),
        })
    }

    fn on_initialized(&mut self, ctx: Context) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let size = window.inner_size();

        #[cfg(not(target_arch = "wasm32"))]
        let visibility = None;
        #[cfg(target_arch = "wasm32")]
        let visibility = self.canvas.as_ref().and_then(|canvas| {
            crate::web::IntersectionVisibility::observe(canvas)
                .inspect_err(|e| log::warn!("Visibility detection unavailable: {e:?}"))
                .ok()
                .map(|source| Box::new(source) as Box<dyn crate::visibility::VisibilitySource>)
        });

        if let Err(e) = self
            .viewer
            .provide_backend(ctx, (size.width, size.height), visibility)
        {
            log::error!("Unable to set up the scene: {e}");
            return;
        }
        self.after_setup();
    }

    fn on_loaded(&mut self, result: Result<LoadedSkin>) {
        let loaded = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("Unable to render the skin: {e}");
                return;
            }
        };
        match self.viewer.apply(loaded) {
            Ok(true) => {
                log::info!("Skin ready");
                self.after_setup();
            }
            Ok(false) => (),
            Err(e) => log::error!("Unable to show the skin: {e}"),
        }
    }

    /// Runs once the scene may have been built.
    fn after_setup(&mut self) {
        #[cfg(target_arch = "wasm32")]
        if let Some(id) = self.viewer.renderer().canvas_id().map(str::to_owned) {
            if let Some(canvas) = self.canvas.take() {
                canvas.set_id(&id);
                let auto_resize = self.viewer.renderer().options().auto_resize;
                let window = self.window.clone().filter(|_| auto_resize);
                let host = self.host.as_deref().and_then(|id| {
                    crate::web::host_element(id)
                        .inspect_err(|e| log::warn!("Host element is gone: {e:?}"))
                        .ok()
                });
                crate::web::install_teardown(self.viewer.renderer_mut(), canvas, host, window);
            }
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn dispose(&mut self) {
        self.viewer.dispose();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let options = self.viewer.renderer().options().clone();

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("skin-ngin");
        if let (Some(width), Some(height)) = (options.canvas.width, options.canvas.height) {
            window_attributes = window_attributes.with_inner_size(PhysicalSize::new(width, height));
        }

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = crate::web::create_canvas(self.host.as_deref()).unwrap_throw();
            window_attributes = window_attributes.with_canvas(Some(canvas.clone()));
            self.canvas = Some(canvas);
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create a window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let Some(texture) = self.texture.take() else {
            return;
        };
        let load = self.viewer.load(texture);
        let setup = async move { Context::new(window, &options).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let (ctx, loaded) = self
                .async_runtime
                .block_on(futures::future::join(setup, load));
            match ctx {
                Ok(ctx) => self.on_initialized(ctx),
                Err(e) => {
                    log::error!("Unable to set up the graphics backend: {e}");
                    event_loop.exit();
                    return;
                }
            }
            self.on_loaded(loaded);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match setup.await {
                    Ok(ctx) => {
                        assert!(proxy.send_event(FlowEvent::Initialized(ctx)).is_ok());
                    }
                    Err(e) => log::error!("Unable to set up the graphics backend: {e}"),
                }
            });
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let loaded = load.await;
                assert!(proxy.send_event(FlowEvent::Loaded(loaded)).is_ok());
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        log::debug!("{event:?}");
        match event {
            // These are the messages from our wasm `spawn_local`
            FlowEvent::Initialized(ctx) => self.on_initialized(ctx),
            FlowEvent::Loaded(result) => self.on_loaded(result),
            FlowEvent::Exit => {
                self.dispose();
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.viewer.handle_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.viewer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed().as_secs_f64();
                self.last_time = Instant::now();

                let animation = self.animation.as_mut();
                let outcome = self.viewer.frame(dt, |player| {
                    if let (Some(animate), Some(player)) = (animation, player) {
                        animate(player, dt);
                    }
                });
                if let Err(e) = outcome {
                    log::error!("Unable to render {e}");
                }
                if self.viewer.renderer().is_animating() {
                    if let Some(window) = self.window.as_ref() {
                        window.request_redraw();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Opens a window showing `texture` until it is closed.
///
/// `options` are used as given, layer them over
/// [`RenderOptions::skin_defaults`] first. `host` is the id of the element the
/// canvas is appended to on the web and ignored elsewhere.
pub fn run(
    options: RenderOptions,
    texture: TextureDescriptor,
    host: Option<String>,
) -> anyhow::Result<()> {
    run_animated(options, texture, host, None)
}

/// Like [`run`], `animation` gets the player model every rendered frame.
pub fn run_animated(
    options: RenderOptions,
    texture: TextureDescriptor,
    host: Option<String>,
    animation: Option<Animation>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, options, texture, host, animation)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
