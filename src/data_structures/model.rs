//! Vertex layouts and GPU side meshes.
//!
//! Geometry is built on the CPU ([`crate::skin::cube`], [`crate::helpers`]) and
//! uploaded lazily the first time a node is written to the GPU.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// A textured vertex of a cuboid face.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Which faces of a mesh are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Double,
}

/// CPU side triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u16>,
}

/// A coloured line vertex used by the axes and grid helpers.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Uploaded vertex, index and instance buffers of one node.
#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub instance_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl GpuMesh {
    pub fn new<V: bytemuck::Pod>(
        device: &wgpu::Device,
        name: &str,
        vertices: &[V],
        indices: Option<&[u16]>,
        instance: crate::data_structures::instance::InstanceRaw,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = indices.map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", name)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Instance Buffer", name)),
            contents: bytemuck::cast_slice(&[instance]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let num_elements = match indices {
            Some(indices) => indices.len() as u32,
            None => vertices.len() as u32,
        };
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_elements,
        }
    }

    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        if let Some(index_buffer) = &self.index_buffer {
            index_buffer.destroy();
        }
        self.instance_buffer.destroy();
    }
}

/// An uploaded texture atlas together with its bind group.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let bind_group = diffuse_texture.bind_group(device, layout, name);
        Self {
            name: String::from(name),
            diffuse_texture,
            bind_group,
        }
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a GpuMesh,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    fn draw_lines(&mut self, mesh: &'a GpuMesh, camera_bind_group: &'a wgpu::BindGroup);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b GpuMesh,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        match &mesh.index_buffer {
            Some(index_buffer) => {
                self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                self.draw_indexed(0..mesh.num_elements, 0, instances);
            }
            None => self.draw(0..mesh.num_elements, instances),
        }
    }

    fn draw_lines(&mut self, mesh: &'b GpuMesh, camera_bind_group: &'b wgpu::BindGroup) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
        self.set_bind_group(0, camera_bind_group, &[]);
        self.draw(0..mesh.num_elements, 0..1);
    }
}
