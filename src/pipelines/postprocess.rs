//! Anti-aliased scene pass and the copy-to-screen pass.
//!
//! Every frame is drawn into an offscreen frame texture so it can be read back.
//! With post-processing the scene is drawn into a multisampled target that is
//! resolved into the frame texture. The copy pass then draws the frame texture
//! onto the window surface.

use crate::data_structures::texture::{Texture, diffuse_layout};

pub const MSAA_SAMPLES: u32 = 4;

/// Multisampled colour and depth targets resolved into the frame texture.
#[derive(Debug)]
pub struct PostProcessing {
    pub color: Texture,
    pub depth: Texture,
}

impl PostProcessing {
    pub fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        Self {
            color: Texture::create_render_target(device, size, MSAA_SAMPLES, "msaa_target"),
            depth: Texture::create_depth_texture(device, size, MSAA_SAMPLES, "msaa_depth"),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        *self = Self::new(device, size);
    }
}

/// Full screen triangle sampling a texture.
#[derive(Debug)]
pub struct CopyPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
}

impl CopyPass {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let layout = diffuse_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Copy Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Copy Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("copy.wgsl").into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Copy Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
        });
        Self {
            pipeline,
            layout,
            bind_group: None,
        }
    }

    /// Samples `source` from now on, needed after every resize of the source.
    pub fn bind(&mut self, device: &wgpu::Device, source: &Texture) {
        self.bind_group = Some(source.bind_group(device, &self.layout, "copy_bind_group"));
    }

    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let Some(bind_group) = &self.bind_group else {
            log::warn!("Copy pass has no source bound");
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Copy Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
