//! Render composition and pipeline batching.
//!
//! Scene nodes describe what they want drawn with a [`Render`]. The backend
//! walks the composed tree once per frame and sorts every entry into the batch
//! of the pipeline it belongs to (opaque, transparent, lines).

use std::sync::Arc;

use crate::data_structures::{model::GpuMesh, texture::TextureAtlas};

/// A mesh with the atlas it samples from.
pub struct Instanced<'a> {
    pub mesh: &'a GpuMesh,
    pub atlas: &'a Arc<TextureAtlas>,
}

/// Specifies how a scene object should be rendered.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single opaque textured mesh (front faces only)
/// - `Defaults(Vec<Instanced>)` renders a batch of opaque meshes
/// - `Transparent(Instanced)` renders a single alpha blended, double sided mesh
/// - `Transparents(Vec<Instanced>)` renders a batch of transparent meshes
/// - `Lines(GpuMesh)` renders unlit line segments
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Transparent(Instanced<'a>),
    Transparents(Vec<Instanced<'a>>),
    Lines(&'a GpuMesh),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(
        self,
        basics: &mut Vec<Instanced<'a>>,
        trans: &mut Vec<Instanced<'a>>,
        lines: &mut Vec<&'a GpuMesh>,
    ) {
        match self {
            Render::Default(instanced) => basics.push(instanced),
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Transparent(instanced) => trans.push(instanced),
            Render::Transparents(mut vec) => trans.append(&mut vec),
            Render::Lines(mesh) => lines.push(mesh),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(basics, trans, lines)),
            Render::None => (),
        }
    }
}
