//! Assembles the player model from a skin (and cape) atlas.
//!
//! ```text
//! player
//! ├── headGroup      ── head, hat
//! ├── bodyGroup      ── body, jacket
//! ├── leftArmGroup   ── leftArm, leftSleeve
//! ├── rightArmGroup  ── rightArm, rightSleeve
//! ├── leftLegGroup   ── leftLeg, leftTrousers
//! ├── rightLegGroup  ── rightLeg, rightTrousers
//! └── capeGroup      ── cape
//! ```
//!
//! Units are atlas pixels, the feet rest on y = 0 and the player faces +z.
//! Limb and head groups sit on the joint, their meshes are moved back by
//! [`PIVOT_OFFSET`] so rotating a group swings the part around its joint.

use std::sync::Arc;

use cgmath::Vector3;

use crate::{
    data_structures::{
        scene_graph::{GroupNode, SceneNode},
        texture::TextureAtlas,
    },
    skin::{
        cube::create_cube,
        texture_positions::{AtlasVersion, CubeUv, Part, cape_uv},
    },
};

/// Name of the root group of a player model.
pub const PLAYER_MODEL_NAME: &str = "player";
/// How much larger an overlay is than its base part on every axis.
pub const OVERLAY_MARGIN: f32 = 0.504;
/// Distance between a part's center and its joint.
pub const PIVOT_OFFSET: f32 = 4.0;

/// Everything the assembler needs to know about the loaded textures.
pub struct PlayerTextures<'a> {
    pub skin: &'a Arc<TextureAtlas>,
    pub cape: Option<&'a Arc<TextureAtlas>>,
    /// `None` for atlases of unknown dimensions.
    pub version: Option<AtlasVersion>,
    pub slim: bool,
    /// Use the high resolution cape layout.
    pub alternate_cape: bool,
}

struct Limb {
    group: &'static str,
    base: Part,
    overlay: Part,
    x: f32,
    y: f32,
    width: f32,
}

/// Builds a fresh player hierarchy.
///
/// Atlases of unknown dimensions are logged and laid out like legacy ones,
/// which means no overlay layers.
pub fn create_player_model(textures: &PlayerTextures) -> GroupNode {
    let version = match textures.version {
        Some(version) => version,
        None => {
            log::error!(
                "Couldn't detect texture version. Invalid dimensions: {}x{}",
                textures.skin.width(),
                textures.skin.height()
            );
            AtlasVersion::Legacy
        }
    };
    let slim = textures.slim;
    let skin = textures.skin;

    let mut player = GroupNode::new(PLAYER_MODEL_NAME);

    let mut head_group = GroupNode::with_position("headGroup", 0.0, 28.0, 0.0);
    head_group
        .get_local_transform_mut()
        .translate_on_axis(Vector3::unit_y(), -PIVOT_OFFSET);
    add_part(&mut head_group, skin, version, Part::Head, [8.0, 8.0, 8.0], slim, PIVOT_OFFSET);
    add_part(&mut head_group, skin, version, Part::Hat, [8.0, 8.0, 8.0], slim, PIVOT_OFFSET);
    player.add_child(Box::new(head_group));

    let mut body_group = GroupNode::with_position("bodyGroup", 0.0, 18.0, 0.0);
    add_part(&mut body_group, skin, version, Part::Body, [8.0, 12.0, 4.0], slim, 0.0);
    add_part(&mut body_group, skin, version, Part::Jacket, [8.0, 12.0, 4.0], slim, 0.0);
    player.add_child(Box::new(body_group));

    let arm_x = if slim { 5.5 } else { 6.0 };
    let arm_width = if slim { 3.0 } else { 4.0 };
    let limbs = [
        Limb {
            group: "leftArmGroup",
            base: Part::LeftArm,
            overlay: Part::LeftSleeve,
            x: -arm_x,
            y: 18.0,
            width: arm_width,
        },
        Limb {
            group: "rightArmGroup",
            base: Part::RightArm,
            overlay: Part::RightSleeve,
            x: arm_x,
            y: 18.0,
            width: arm_width,
        },
        Limb {
            group: "leftLegGroup",
            base: Part::LeftLeg,
            overlay: Part::LeftTrousers,
            x: -2.0,
            y: 6.0,
            width: 4.0,
        },
        Limb {
            group: "rightLegGroup",
            base: Part::RightLeg,
            overlay: Part::RightTrousers,
            x: 2.0,
            y: 6.0,
            width: 4.0,
        },
    ];
    for limb in limbs {
        let mut group = GroupNode::with_position(limb.group, limb.x, limb.y, 0.0);
        group
            .get_local_transform_mut()
            .translate_on_axis(Vector3::unit_y(), PIVOT_OFFSET);
        let size = [limb.width, 12.0, 4.0];
        add_part(&mut group, skin, version, limb.base, size, slim, -PIVOT_OFFSET);
        add_part(&mut group, skin, version, limb.overlay, size, slim, -PIVOT_OFFSET);
        player.add_child(Box::new(group));
    }

    if let Some(cape) = textures.cape {
        player.add_child(Box::new(create_cape(cape, cape_uv(textures.alternate_cape))));
    }

    player
}

/// Adds `part` to `group` if the atlas version has it, overlays get the margin.
fn add_part(
    group: &mut GroupNode,
    skin: &Arc<TextureAtlas>,
    version: AtlasVersion,
    part: Part,
    [width, height, depth]: [f32; 3],
    slim: bool,
    offset_y: f32,
) {
    let Some(uvs) = part.uv(version) else {
        return;
    };
    let transparent = part.is_overlay();
    let margin = if transparent { OVERLAY_MARGIN } else { 0.0 };
    let mut mesh = create_cube(
        skin,
        width + margin,
        height + margin,
        depth + margin,
        uvs,
        slim,
        part.name(),
        transparent,
    );
    mesh.get_local_transform_mut()
        .translate_on_axis(Vector3::unit_y(), offset_y);
    group.add_child(Box::new(mesh));
}

/// The cape hangs from the shoulders, its outer face turned away from the body.
fn create_cape(atlas: &Arc<TextureAtlas>, uvs: &CubeUv) -> GroupNode {
    let mut group = GroupNode::with_position("capeGroup", 0.0, 16.0, -2.5);
    let transform = group.get_local_transform_mut();
    transform.translate_on_axis(Vector3::unit_y(), 8.0);
    transform.translate_on_axis(Vector3::unit_z(), 0.5);

    let mut cape = create_cube(atlas, 8.0, 16.0, 1.0, uvs, false, Part::Cape.name(), false);
    let transform = cape.get_local_transform_mut();
    transform.translate_on_axis(Vector3::unit_y(), -8.0);
    transform.translate_on_axis(Vector3::unit_z(), -0.5);
    transform.rotate_y(cgmath::Deg(180.0));
    group.add_child(Box::new(cape));
    group
}
