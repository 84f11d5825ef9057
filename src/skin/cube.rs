//! Textured cuboids cut from a skin atlas.

use std::sync::Arc;

use crate::{
    data_structures::{
        model::{Geometry, ModelVertex},
        scene_graph::{MeshMaterial, MeshNode},
        texture::TextureAtlas,
    },
    skin::texture_positions::{CubeUv, Face, FaceUv},
};

/// Corner order of a face: top left, bottom left, bottom right, top right.
pub type Corners = [[f32; 2]; 4];

/// Both triangles of a face, indexing into [`Corners`].
pub const FACE_TRIANGLES: [[u16; 3]; 2] = [[0, 1, 3], [1, 2, 3]];

/// Normalizes a face rectangle against the atlas size.
///
/// `slim` swaps in the slim overrides where the face has them. Flips are applied
/// on top, Y first then X.
pub fn face_corners(face: &FaceUv, slim: bool, atlas_width: u32, atlas_height: u32) -> Corners {
    let (x, y, w, h) = face.rect(slim);
    let (aw, ah) = (atlas_width as f32, atlas_height as f32);
    let tx1 = x as f32 / aw;
    let ty1 = y as f32 / ah;
    let tx2 = (x + w) as f32 / aw;
    let ty2 = (y + h) as f32 / ah;

    let corners = [[tx1, ty1], [tx1, ty2], [tx2, ty2], [tx2, ty1]];
    apply_flips(corners, face.flip_x, face.flip_y)
}

/// `flip_y` rotates the corners by two, `flip_x` then reverses them.
pub fn apply_flips(corners: Corners, flip_x: bool, flip_y: bool) -> Corners {
    let mut corners = corners;
    if flip_y {
        corners = [corners[2], corners[3], corners[0], corners[1]];
    }
    if flip_x {
        corners = [corners[3], corners[2], corners[1], corners[0]];
    }
    corners
}

/// Face vertex positions in [`Corners`] order as seen from outside the cube.
fn face_positions(face: Face, width: f32, height: f32, depth: f32) -> [[f32; 3]; 4] {
    let (x, y, z) = (width / 2.0, height / 2.0, depth / 2.0);
    match face {
        Face::Right => [[x, y, z], [x, -y, z], [x, -y, -z], [x, y, -z]],
        Face::Left => [[-x, y, -z], [-x, -y, -z], [-x, -y, z], [-x, y, z]],
        Face::Top => [[-x, y, -z], [-x, y, z], [x, y, z], [x, y, -z]],
        Face::Bottom => [[-x, -y, z], [-x, -y, -z], [x, -y, -z], [x, -y, z]],
        Face::Front => [[-x, y, z], [-x, -y, z], [x, -y, z], [x, y, z]],
        Face::Back => [[x, y, -z], [x, -y, -z], [-x, -y, -z], [-x, y, -z]],
    }
}

/// Builds the 24 vertices and 36 indices of a cuboid centered at the origin.
pub fn cube_geometry(
    width: f32,
    height: f32,
    depth: f32,
    uvs: &CubeUv,
    slim: bool,
    atlas_width: u32,
    atlas_height: u32,
) -> Geometry {
    let mut geometry = Geometry {
        vertices: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
    };
    for face in Face::ALL {
        let corners = face_corners(uvs.face(face), slim, atlas_width, atlas_height);
        let positions = face_positions(face, width, height, depth);
        let base = geometry.vertices.len() as u16;
        geometry
            .vertices
            .extend(positions.iter().zip(corners).map(|(position, tex_coords)| {
                ModelVertex {
                    position: *position,
                    tex_coords,
                }
            }));
        geometry.indices.extend(
            FACE_TRIANGLES
                .iter()
                .flat_map(|triangle| triangle.iter().map(move |i| base + i)),
        );
    }
    geometry
}

/// Creates a named cuboid mesh node sampling `atlas`.
///
/// Transparent cubes are drawn from both sides and alpha blended, opaque ones
/// only show their front faces.
#[allow(clippy::too_many_arguments)]
pub fn create_cube(
    atlas: &Arc<TextureAtlas>,
    width: f32,
    height: f32,
    depth: f32,
    uvs: &CubeUv,
    slim: bool,
    name: &str,
    transparent: bool,
) -> MeshNode {
    let geometry = cube_geometry(
        width,
        height,
        depth,
        uvs,
        slim,
        atlas.width(),
        atlas.height(),
    );
    MeshNode::new(name, geometry, MeshMaterial::new(atlas.clone(), transparent))
}
