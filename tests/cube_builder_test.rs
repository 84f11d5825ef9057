use approx::assert_relative_eq;
use skin_ngin::{
    data_structures::{model::Side, scene_graph::SceneNode},
    skin::{
        cube::{FACE_TRIANGLES, apply_flips, create_cube, cube_geometry, face_corners},
        texture_positions::{AtlasVersion, Face, FaceUv, Part},
    },
};

use crate::common::test_utils::{atlas, mesh_extent};

mod common;

const TL: [f32; 2] = [0.0, 0.0];
const BL: [f32; 2] = [0.0, 1.0];
const BR: [f32; 2] = [1.0, 1.0];
const TR: [f32; 2] = [1.0, 0.0];

#[test]
fn unflipped_faces_reproduce_the_rectangle() {
    let corners = face_corners(&FaceUv::new(8, 8, 8, 8), false, 64, 64);
    let expected = [[0.125, 0.125], [0.125, 0.25], [0.25, 0.25], [0.25, 0.125]];
    for (corner, expected) in corners.iter().zip(expected) {
        assert_relative_eq!(corner[0], expected[0]);
        assert_relative_eq!(corner[1], expected[1]);
    }
}

#[test]
fn rectangles_are_normalized_against_legacy_atlases() {
    let corners = face_corners(&FaceUv::new(0, 16, 4, 16), false, 64, 32);
    assert_relative_eq!(corners[0][1], 0.5);
    assert_relative_eq!(corners[1][1], 1.0);
    assert_relative_eq!(corners[2][0], 1.0 / 16.0);
}

#[test]
fn flips_apply_y_before_x() {
    let corners = [TL, BL, BR, TR];
    assert_eq!(apply_flips(corners, false, false), [TL, BL, BR, TR]);
    assert_eq!(apply_flips(corners, false, true), [BR, TR, TL, BL]);
    assert_eq!(apply_flips(corners, true, false), [TR, BR, BL, TL]);
    assert_eq!(apply_flips(corners, true, true), [BL, TL, TR, BR]);
}

#[test]
fn slim_faces_use_their_overrides() {
    let uvs = Part::RightArm.uv(AtlasVersion::Modern).unwrap();
    let front = uvs.face(Face::Front);
    let regular = face_corners(front, false, 64, 64);
    let slim = face_corners(front, true, 64, 64);
    assert_relative_eq!(regular[2][0] - regular[0][0], 4.0 / 64.0);
    assert_relative_eq!(slim[2][0] - slim[0][0], 3.0 / 64.0);
    assert_relative_eq!(slim[0][1], regular[0][1]);
}

#[test]
fn faces_without_overrides_ignore_slim() {
    let face = FaceUv::new(16, 20, 8, 12);
    assert_eq!(face_corners(&face, true, 64, 64), face_corners(&face, false, 64, 64));
}

#[test]
fn cubes_have_four_vertices_and_two_triangles_per_face() {
    let uvs = Part::Head.uv(AtlasVersion::Modern).unwrap();
    let geometry = cube_geometry(8.0, 8.0, 8.0, uvs, false, 64, 64);
    assert_eq!(geometry.vertices.len(), 24);
    assert_eq!(geometry.indices.len(), 36);
    assert_eq!(&geometry.indices[..6], &[0, 1, 3, 1, 2, 3]);
    assert!(geometry.indices.iter().all(|&i| i < 24));
    for (face, chunk) in geometry.indices.chunks(6).enumerate() {
        let base = (face * 4) as u16;
        let expected: Vec<u16> = FACE_TRIANGLES.iter().flatten().map(|i| base + i).collect();
        assert_eq!(chunk, expected.as_slice());
    }
}

#[test]
fn faces_wind_counter_clockwise_seen_from_outside() {
    let uvs = Part::Body.uv(AtlasVersion::Modern).unwrap();
    let geometry = cube_geometry(8.0, 12.0, 4.0, uvs, false, 64, 64);
    for triangle in geometry.indices.chunks(3) {
        let [a, b, c] = [0, 1, 2].map(|i| {
            let p = geometry.vertices[triangle[i] as usize].position;
            cgmath::Vector3::new(p[0], p[1], p[2])
        });
        let normal = (b - a).cross(c - a);
        let center = (a + b + c) / 3.0;
        assert!(cgmath::dot(normal, center) > 0.0);
    }
}

#[test]
fn cubes_are_centered_with_the_requested_size() {
    let skin = atlas(64, false);
    let uvs = Part::Body.uv(AtlasVersion::Modern).unwrap();
    let cube = create_cube(&skin, 8.0, 12.0, 4.0, uvs, false, "body", false);
    let [width, height, depth] = mesh_extent(&cube);
    assert_relative_eq!(width, 8.0);
    assert_relative_eq!(height, 12.0);
    assert_relative_eq!(depth, 4.0);

    let mesh = cube.as_mesh().unwrap();
    let sum = mesh
        .geometry()
        .vertices
        .iter()
        .fold([0.0f32; 3], |acc, v| {
            [acc[0] + v.position[0], acc[1] + v.position[1], acc[2] + v.position[2]]
        });
    for axis in sum {
        assert_relative_eq!(axis, 0.0);
    }
}

#[test]
fn transparency_selects_the_rendered_sides() {
    let skin = atlas(64, false);
    let uvs = Part::Hat.uv(AtlasVersion::Modern).unwrap();
    let opaque = create_cube(&skin, 8.0, 8.0, 8.0, uvs, false, "head", false);
    let transparent = create_cube(&skin, 8.5, 8.5, 8.5, uvs, false, "hat", true);

    assert_eq!(opaque.name(), "head");
    assert_eq!(opaque.material().side, Side::Front);
    assert!(!opaque.material().transparent);
    assert_eq!(transparent.material().side, Side::Double);
    assert!(transparent.material().transparent);
    assert_eq!(transparent.material().atlas.id(), skin.id());
    assert!(!transparent.is_uploaded());
}
