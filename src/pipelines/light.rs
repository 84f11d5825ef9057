use wgpu::util::DeviceExt;

/// Ambient light, every fragment is multiplied by `color * intensity`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl LightUniform {
    pub fn ambient(color: [f32; 3]) -> Self {
        Self {
            color,
            intensity: 1.0,
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Writes the colour only when it changed.
    pub fn update(&mut self, queue: &wgpu::Queue, color: [f32; 3]) {
        if self.uniform.color == color {
            return;
        }
        self.uniform.color = color;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}
