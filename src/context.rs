use std::{collections::HashMap, iter, sync::Arc, time::Duration};

use image::RgbaImage;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    backend::GraphicsBackend,
    camera::{Camera, CameraUniform, Projection},
    config::RenderOptions,
    data_structures::{
        model::{DrawModel, Material},
        scene_graph::Scene,
        texture::{Texture, TextureAtlas, diffuse_layout},
    },
    pipelines::{
        basic::mk_skin_pipeline,
        light::{LightResources, LightUniform},
        line::mk_line_pipeline,
        postprocess::{CopyPass, MSAA_SAMPLES, PostProcessing},
        transparent::mk_transparent_pipeline,
    },
    render::Instanced,
};

#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    pub skin: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
}

/// Size dependent render targets, dropped while the context is released.
#[derive(Debug)]
struct Targets {
    frame: Texture,
    depth: Texture,
    postprocessing: Option<PostProcessing>,
}

impl Targets {
    fn new(device: &wgpu::Device, size: [u32; 2], postprocessing: bool) -> Self {
        Self {
            frame: Texture::create_render_target(device, size, 1, "frame_texture"),
            depth: Texture::create_depth_texture(device, size, 1, "depth_texture"),
            postprocessing: postprocessing.then(|| PostProcessing::new(device, size)),
        }
    }
}

/// The `wgpu` graphics backend.
///
/// Scenes are always drawn into an offscreen frame texture (resolved from a
/// multisampled target with post-processing enabled) which is copied onto the
/// window surface if there is one. Headless contexts only keep the frame for
/// readback.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Option<Arc<Window>>,
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'static>>,
    pub config: Option<wgpu::SurfaceConfiguration>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub camera: CameraResources,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    texture_layout: wgpu::BindGroupLayout,
    copy: Option<CopyPass>,
    targets: Option<Targets>,
    materials: HashMap<u64, Material>,
    postprocessing: bool,
    size: (u32, u32),
    released: bool,
    disposed: bool,
}

impl Context {
    /// Creates a context drawing into `window`.
    pub async fn new(window: Arc<Window>, options: &RenderOptions) -> anyhow::Result<Self> {
        let inner = window.inner_size();
        let (width, height) = options.canvas_size((inner.width, inner.height));

        log::info!("WGPU setup");
        let instance = mk_instance();
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The copy shader writes linear colour, an sRGB surface encodes it again.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface is incompatible with the adapter"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::CompositeAlphaMode::PreMultiplied)
            .or_else(|| surface_caps.alpha_modes.first().copied())
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut ctx = Self::build(instance, device, queue, (width, height), options);
        ctx.copy = Some(CopyPass::new(&ctx.device, surface_format));
        ctx.surface = Some(surface);
        ctx.config = Some(config);
        ctx.window = Some(window);
        ctx.bind_copy_source();
        Ok(ctx)
    }

    /// Creates a context without a window, frames can only be read back.
    pub async fn headless(width: u32, height: u32, options: &RenderOptions) -> anyhow::Result<Self> {
        let instance = mk_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = request_device(&adapter).await?;
        Ok(Self::build(instance, device, queue, (width, height), options))
    }

    fn build(
        instance: wgpu::Instance,
        device: wgpu::Device,
        queue: wgpu::Queue,
        (width, height): (u32, u32),
        options: &RenderOptions,
    ) -> Self {
        let postprocessing = options.render.postprocessing;
        let sample_count = if postprocessing { MSAA_SAMPLES } else { 1 };
        let size = (width.max(1), height.max(1));

        let camera = CameraResources::new(&device);
        let light = LightResources::new(
            &device,
            LightUniform::ambient([1.0, 1.0, 1.0]),
        );
        let texture_layout = diffuse_layout(&device);
        let pipelines = Pipelines {
            skin: mk_skin_pipeline(
                &device,
                Texture::FRAME_FORMAT,
                sample_count,
                &texture_layout,
                &camera.bind_group_layout,
                &light.bind_group_layout,
            ),
            transparent: mk_transparent_pipeline(
                &device,
                Texture::FRAME_FORMAT,
                sample_count,
                &texture_layout,
                &camera.bind_group_layout,
                &light.bind_group_layout,
            ),
            lines: mk_line_pipeline(
                &device,
                Texture::FRAME_FORMAT,
                sample_count,
                &camera.bind_group_layout,
            ),
        };
        let targets = Targets::new(&device, [size.0, size.1], postprocessing);

        Self {
            window: None,
            instance,
            surface: None,
            config: None,
            device,
            queue,
            camera,
            light,
            pipelines,
            clear_colour: wgpu::Color::TRANSPARENT,
            texture_layout,
            copy: None,
            targets: Some(targets),
            materials: HashMap::new(),
            postprocessing,
            size,
            released: false,
            disposed: false,
        }
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Number of uploaded atlases.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn has_material(&self, atlas: &TextureAtlas) -> bool {
        self.materials.contains_key(&atlas.id())
    }

    fn bind_copy_source(&mut self) {
        if let (Some(copy), Some(targets)) = (self.copy.as_mut(), self.targets.as_ref()) {
            copy.bind(&self.device, &targets.frame);
        }
    }

    fn configure_surface(&mut self) {
        if let (Some(surface), Some(config)) = (self.surface.as_ref(), self.config.as_mut()) {
            config.width = self.size.0;
            config.height = self.size.1;
            surface.configure(&self.device, config);
        }
    }

    fn upload_materials(&mut self, instances: &[Instanced]) {
        for instanced in instances {
            let atlas = instanced.atlas;
            self.materials.entry(atlas.id()).or_insert_with(|| {
                let diffuse = Texture::from_atlas(&self.device, &self.queue, atlas);
                Material::new(
                    &self.device,
                    &format!("atlas {}", atlas.id()),
                    diffuse,
                    &self.texture_layout,
                )
            });
        }
    }

    fn release_materials(&mut self) {
        for (_, material) in self.materials.drain() {
            material.diffuse_texture.texture.destroy();
        }
    }
}

fn mk_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        #[cfg(not(target_arch = "wasm32"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_arch = "wasm32")]
        backends: wgpu::Backends::GL,
        ..wgpu::InstanceDescriptor::new_without_display_handle()
    })
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    log::info!("device and queue");
    let device = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features, so if
            // we're building for the web we'll have to disable some.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await?;
    Ok(device)
}

impl GraphicsBackend for Context {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.disposed {
            return;
        }
        self.size = (width, height);
        self.configure_surface();
        if !self.released {
            self.targets = Some(Targets::new(
                &self.device,
                [width, height],
                self.postprocessing,
            ));
            self.bind_copy_source();
        }
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        projection: &Projection,
    ) -> anyhow::Result<()> {
        if self.disposed {
            anyhow::bail!("Rendering with a disposed context");
        }
        if self.released {
            return Ok(());
        }

        self.camera.uniform.update_view_proj(camera, projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
        self.light.update(&self.queue, scene.ambient_light());
        scene.write_to_buffers(&self.device, &self.queue);

        let mut basics: Vec<Instanced> = Vec::new();
        let mut trans: Vec<Instanced> = Vec::new();
        let mut lines = Vec::new();
        scene
            .get_render()
            .set_pipelines(&mut basics, &mut trans, &mut lines);
        self.upload_materials(&basics);
        self.upload_materials(&trans);

        let Some(targets) = self.targets.as_ref() else {
            return Ok(());
        };
        let (color_view, resolve_target, depth_view) = match &targets.postprocessing {
            Some(pp) => (&pp.color.view, Some(&targets.frame.view), &pp.depth.view),
            None => (&targets.frame.view, None, &targets.depth.view),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            for (pipeline, batch) in [
                (&self.pipelines.skin, &basics),
                (&self.pipelines.transparent, &trans),
            ] {
                render_pass.set_pipeline(pipeline);
                for instanced in batch {
                    let Some(material) = self.materials.get(&instanced.atlas.id()) else {
                        log::warn!("No material uploaded for {}", instanced.mesh.name);
                        continue;
                    };
                    render_pass.draw_mesh_instanced(
                        instanced.mesh,
                        material,
                        0..1,
                        &self.camera.bind_group,
                        &self.light.bind_group,
                    );
                }
            }

            render_pass.set_pipeline(&self.pipelines.lines);
            for mesh in lines {
                render_pass.draw_lines(mesh, &self.camera.bind_group);
            }
        }

        let output = match self.surface.as_ref() {
            Some(surface) => match surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(output)
                | wgpu::CurrentSurfaceTexture::Suboptimal(output) => Some(output),
                wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                    self.queue.submit(iter::once(encoder.finish()));
                    self.configure_surface();
                    return Ok(());
                }
                wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                    log::debug!("Skipping presentation, no surface texture available");
                    None
                }
                wgpu::CurrentSurfaceTexture::Validation => {
                    anyhow::bail!("Surface texture acquisition failed validation")
                }
            },
            None => None,
        };
        if let (Some(output), Some(copy)) = (output.as_ref(), self.copy.as_ref()) {
            let view = output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            copy.draw(&mut encoder, &view);
        }

        self.queue.submit(iter::once(encoder.finish()));
        if let Some(output) = output {
            output.present();
        }
        Ok(())
    }

    fn release_context(&mut self) {
        if self.released || self.disposed {
            return;
        }
        log::info!("Releasing graphics context");
        self.release_materials();
        self.targets = None;
        self.surface = None;
        self.released = true;
    }

    fn restore_context(&mut self) -> anyhow::Result<()> {
        if !self.released || self.disposed {
            return Ok(());
        }
        log::info!("Restoring graphics context");
        if let Some(window) = self.window.as_ref() {
            self.surface = Some(self.instance.create_surface(window.clone())?);
            self.configure_surface();
        }
        self.targets = Some(Targets::new(
            &self.device,
            [self.size.0, self.size.1],
            self.postprocessing,
        ));
        self.bind_copy_source();
        self.released = false;
        Ok(())
    }

    fn read_pixels(&mut self) -> impl Future<Output = anyhow::Result<RgbaImage>> {
        async move {
            let Some(targets) = self.targets.as_ref() else {
                anyhow::bail!("The graphics context is released");
            };
            let (width, height) = self.size;
            let unpadded_bytes_per_row = 4 * width;
            let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
            let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

            let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("Readback Buffer"),
                mapped_at_creation: false,
            });
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Readback Encoder"),
                });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &targets.frame.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_bytes_per_row),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            self.queue.submit(iter::once(encoder.finish()));

            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let buffer_slice = output_buffer.slice(..);
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
            self.device.poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })?;
            rx.receive()
                .await
                .ok_or_else(|| anyhow::anyhow!("Readback was cancelled"))??;

            let pixels = {
                let data = buffer_slice.get_mapped_range();
                data.chunks(padded_bytes_per_row as usize)
                    .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
                    .copied()
                    .collect::<Vec<u8>>()
            };
            output_buffer.unmap();
            RgbaImage::from_raw(width, height, pixels)
                .ok_or_else(|| anyhow::anyhow!("Readback returned too few pixels"))
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.release_materials();
        self.targets = None;
        self.surface = None;
        self.copy = None;
        self.window = None;
        self.disposed = true;
    }
}
