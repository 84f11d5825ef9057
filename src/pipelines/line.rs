use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{LineVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::{Rasterization, mk_render_pipeline},
};

/// Unlit coloured lines for the axes and grid helpers.
pub fn mk_line_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Line Pipeline Layout"),
        bind_group_layouts: &[Some(camera_bind_group_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Line Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("line.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        color_format,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        &[LineVertex::desc(), InstanceRaw::desc()],
        shader,
        Rasterization {
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
            sample_count,
        },
    )
}
