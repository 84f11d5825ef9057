//! skin-ngin
//!
//! A small cross-platform renderer for blocky player skin models with a focus
//! on native and WASM compatibility. Skins are loaded from urls, usernames,
//! uuids or inline data, assembled into a textured cube hierarchy and drawn
//! with `wgpu` into a window or a canvas.
//!
//! High-level modules
//! - `skin`: texture loading, the cube builder, the player model and [`SkinRender`]
//! - `renderer`: the render lifecycle of one drawing surface
//! - `context`: the `wgpu` implementation of [`GraphicsBackend`]
//! - `camera`: camera, projection and orbit controls
//! - `data_structures`: scene graph, meshes, instances and textures
//! - `pipelines`: the skin, transparent, line and copy pipelines
//! - `flow`: the winit event loop driving a [`SkinRender`]
//! - `config`: render options as JSON-friendly structs
//!

pub mod backend;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod export;
pub mod flow;
pub mod helpers;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod skin;
pub mod stats;
pub mod visibility;
#[cfg(target_arch = "wasm32")]
pub mod web;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::GraphicsBackend;
pub use config::RenderOptions;
pub use error::{Result, SkinError};
pub use renderer::{FrameOutcome, LifecycleState, Renderer};
pub use skin::{SkinRender, loader::TextureDescriptor};
pub use visibility::{Visibility, VisibilitySource};

pub use cgmath;
pub use winit::event::WindowEvent;
