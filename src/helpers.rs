//! Debug helpers drawn as unlit lines.

use crate::data_structures::{model::LineVertex, scene_graph::LineNode};

pub const AXES_LENGTH: f32 = 50.0;
pub const GRID_SIZE: f32 = 100.0;
pub const GRID_DIVISIONS: u32 = 100;

const CENTER_LINE_COLOR: u32 = 0x444444;
const GRID_COLOR: u32 = 0x888888;

fn rgb(color: u32) -> [f32; 3] {
    let channel = |shift: u32| ((color >> shift) & 0xFF) as f32 / 255.0;
    [channel(16), channel(8), channel(0)]
}

fn line(from: [f32; 3], to: [f32; 3], color: [f32; 3]) -> [LineVertex; 2] {
    [
        LineVertex {
            position: from,
            color,
        },
        LineVertex {
            position: to,
            color,
        },
    ]
}

/// X red, Y green and Z blue, starting at the origin.
pub fn axes_helper(length: f32) -> LineNode {
    let vertices = [
        line([0.0; 3], [length, 0.0, 0.0], [1.0, 0.0, 0.0]),
        line([0.0; 3], [0.0, length, 0.0], [0.0, 1.0, 0.0]),
        line([0.0; 3], [0.0, 0.0, length], [0.0, 0.0, 1.0]),
    ];
    LineNode::new("axesHelper", vertices.into_iter().flatten().collect())
}

/// A `size` x `size` grid on the XZ plane with `divisions` cells per side.
pub fn grid_helper(size: f32, divisions: u32) -> LineNode {
    let divisions = divisions.max(1);
    let half = size / 2.0;
    let step = size / divisions as f32;
    let center = divisions / 2;
    let mut vertices = Vec::with_capacity((divisions as usize + 1) * 4);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if i == center {
            rgb(CENTER_LINE_COLOR)
        } else {
            rgb(GRID_COLOR)
        };
        vertices.extend(line([-half, 0.0, k], [half, 0.0, k], color));
        vertices.extend(line([k, 0.0, -half], [k, 0.0, half], color));
    }
    LineNode::new("gridHelper", vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_two_lines_per_division_boundary() {
        let grid = grid_helper(GRID_SIZE, GRID_DIVISIONS);
        assert_eq!(grid.vertices().len(), 101 * 4);
        assert_eq!(grid.vertices()[0].position, [-50.0, 0.0, -50.0]);
    }

    #[test]
    fn axes_point_along_positive_axes() {
        let axes = axes_helper(AXES_LENGTH);
        let ends: Vec<_> = axes.vertices().iter().skip(1).step_by(2).map(|v| v.position).collect();
        assert_eq!(ends, vec![[50.0, 0.0, 0.0], [0.0, 50.0, 0.0], [0.0, 0.0, 50.0]]);
    }
}
