//! Texture atlases and GPU textures.
//!
//! [`TextureAtlas`] is the decoded skin or cape image as it comes out of the
//! loader. It is shared between all cubes cut from it and only turned into a
//! GPU [`Texture`] by the backend once it is first drawn.

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

static NEXT_ATLAS_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded RGBA texture atlas, origin top left.
#[derive(Debug)]
pub struct TextureAtlas {
    id: u64,
    image: RgbaImage,
}

impl TextureAtlas {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            id: NEXT_ATLAS_ID.fetch_add(1, Ordering::Relaxed),
            image,
        }
    }

    /// Decodes any image format enabled for the `image` crate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgba8()))
    }

    /// Unique per decoded atlas, used to cache GPU uploads.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Alpha of the pixel at (x, y), pixels outside the atlas are transparent.
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.image
            .get_pixel_checked(x, y)
            .map(|pixel| pixel.0[3])
            .unwrap_or(0)
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Format of the offscreen frame every scene is drawn into.
    pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// `sample_count` has to match the colour target it is used with.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create a colour target the scene is rendered into.
    ///
    /// Single sampled targets can be sampled by the copy pass and copied to a
    /// buffer for readback. Multisampled targets are only ever resolved.
    pub fn create_render_target(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let usage = if sample_count > 1 {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FRAME_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = (sample_count == 1).then(|| create_nearest_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an atlas, sampled with nearest filtering so skins stay pixelated.
    pub fn from_atlas(device: &wgpu::Device, queue: &wgpu::Queue, atlas: &TextureAtlas) -> Self {
        let rgba = atlas.image();
        let dimensions = rgba.dimensions();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("atlas {}", atlas.id())),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_nearest_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
    ) -> wgpu::BindGroup {
        let fallback;
        let sampler = match &self.sampler {
            Some(sampler) => sampler,
            None => {
                fallback = create_nearest_sampler(device);
                &fallback
            }
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(label),
        })
    }
}

/// Texture + sampler layout shared by the skin pipelines and the copy pass.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("diffuse_bind_group_layout"),
    })
}

pub fn create_nearest_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
