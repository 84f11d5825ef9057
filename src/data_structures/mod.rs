//! Scene data structures: meshes, textures, scene graphs and instances.
//!
//! - `model` contains vertex types, GPU meshes and materials
//! - `texture` holds skin atlases and the GPU texture wrapper
//! - `instance` holds per-node transformation data
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
