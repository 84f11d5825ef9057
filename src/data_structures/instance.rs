//! Node transformations.
//!
//! Every scene node carries a local [`Instance`] relative to its parent and a
//! world [`Instance`] that is recomputed top down before each frame. The world
//! transform is what ends up in the node's GPU instance buffer.

use std::ops::Mul;

use cgmath::{One, Rotation3};

use crate::data_structures::model;

/// Position, rotation (as quaternion), and scale of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transform.
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        cgmath::Vector3::new(x, y, z).into()
    }

    /// Moves the instance along one of its own (rotated) axes.
    pub fn translate_on_axis(&mut self, axis: cgmath::Vector3<f32>, distance: f32) {
        self.position += self.rotation * (axis * distance);
    }

    pub fn rotate_y(&mut self, angle: cgmath::Deg<f32>) {
        self.rotation = self.rotation * cgmath::Quaternion::from_angle_y(angle);
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
        }
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        use cgmath::ElementWise;

        // Child offsets are scaled by the parent before they are rotated.
        Instance {
            position: self.position + self.rotation * self.scale.mul_element_wise(rhs.position),
            rotation: self.rotation * rhs.rotation,
            scale: self.scale.mul_element_wise(rhs.scale),
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// World matrix of a node as uploaded to its instance buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
}

impl InstanceRaw {
    // The matrix columns occupy locations 5 to 8, after the mesh attributes.
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
    ];
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
