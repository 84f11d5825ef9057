//! The seam between the render lifecycle and the GPU.
//!
//! [`crate::context::Context`] implements [`GraphicsBackend`] with `wgpu`. The
//! lifecycle only talks to this trait so it can be driven without a GPU.

use std::future::Future;

use image::RgbaImage;

use crate::{
    camera::{Camera, Projection},
    data_structures::scene_graph::Scene,
};

pub trait GraphicsBackend {
    /// Current size of the drawing surface in pixels.
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    /// Uploads pending scene data and draws one frame.
    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        projection: &Projection,
    ) -> anyhow::Result<()>;

    /// Drops the surface and everything bound to it while the output is hidden.
    fn release_context(&mut self);

    fn restore_context(&mut self) -> anyhow::Result<()>;

    /// Pixels of the last rendered frame.
    fn read_pixels(&mut self) -> impl Future<Output = anyhow::Result<RgbaImage>>;

    /// Releases every GPU resource, the backend is unusable afterwards.
    fn dispose(&mut self);
}
