use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::{Rasterization, mk_render_pipeline},
};

/**
 * Pipeline for the overlay layers (hat, jacket, sleeves, trousers).
 *
 * Both sides of every face are drawn and blended over what is behind them.
 * Fully transparent texels are discarded by the alpha test in the shader.
 */
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Transparent Pipeline Layout"),
        bind_group_layouts: &[
            Some(texture_bind_group_layout),
            Some(camera_bind_group_layout),
            Some(light_bind_group_layout),
        ],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Transparent Skin Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("skin.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
        Rasterization {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            sample_count,
        },
    )
}
