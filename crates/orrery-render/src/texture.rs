//! GPU texture management: upload, caching, mip chains and bind groups.
//!
//! [`TextureManager`] uploads each body/backdrop texture once and hands out an
//! [`Arc<ManagedTexture>`] with a ready-to-bind [`wgpu::BindGroup`]. Every
//! texture also receives a small copyable [`TextureHandle`] which is what the
//! scene layer and the geometry cache key on.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::asset::PixelBuffer;

/// Stable identifier of an uploaded texture, assigned in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// A GPU texture with its view, bind group, and metadata.
#[derive(Debug)]
pub struct ManagedTexture {
    pub handle: TextureHandle,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Pre-built bind group for immediate use in draw calls.
    pub bind_group: wgpu::BindGroup,
    /// Width and height in texels.
    pub dimensions: (u32, u32),
    pub mip_level_count: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture '{name}' has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    DataSizeMismatch {
        name: String,
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("texture '{name}' has zero size {width}x{height}")]
    ZeroDimensions { name: String, width: u32, height: u32 },

    /// Only 4-channel pixel buffers can be uploaded.
    #[error("texture '{name}' has {channels} channels, expected 4")]
    UnsupportedChannels { name: String, channels: u8 },
}

/// Calculates the number of mip levels for the given dimensions.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height) as f32).log2().floor() as u32 + 1
}

/// Successively halved copies of `base`, largest first, ending at 1x1.
///
/// Level 0 is `base` itself. Each level is resampled from the previous one
/// with a triangle filter.
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let levels = mip_level_count(base.width(), base.height()) as usize;
    let mut chain = Vec::with_capacity(levels);
    chain.push(base);
    while chain.len() < levels {
        let Some(prev) = chain.last() else { break };
        let width = (prev.width() / 2).max(1);
        let height = (prev.height() / 2).max(1);
        let next = imageops::resize(prev, width, height, FilterType::Triangle);
        chain.push(next);
    }
    chain
}

/// Name of the built-in 1x1 white texture used by untextured draws.
pub const WHITE_TEXTURE: &str = "__white";

/// Name-to-handle lookup used by the scene to resolve texture references.
#[derive(Debug, Default, Clone)]
pub struct TextureTable {
    entries: HashMap<String, TextureHandle>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, handle: TextureHandle) {
        self.entries.insert(name.into(), handle);
    }

    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Uploads and caches textures by name; all share one sampler and layout.
pub struct TextureManager {
    textures: HashMap<String, Arc<ManagedTexture>>,
    by_handle: HashMap<TextureHandle, Arc<ManagedTexture>>,
    next_handle: u32,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
}

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

impl TextureManager {
    pub fn new(device: &wgpu::Device) -> Self {
        // Equirectangular maps wrap around the sphere in u and clamp at the poles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler-equirect"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });

        Self {
            textures: HashMap::new(),
            by_handle: HashMap::new(),
            next_handle: 0,
            sampler,
            bind_group_layout,
        }
    }

    /// Upload a decoded RGBA image as an sRGB texture with a full mip chain.
    /// Cached by name: a second upload under the same name returns the first.
    pub fn create_from_pixels(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        pixels: &PixelBuffer,
    ) -> Result<Arc<ManagedTexture>, TextureError> {
        if let Some(existing) = self.textures.get(name) {
            return Ok(Arc::clone(existing));
        }
        if pixels.channels != 4 {
            return Err(TextureError::UnsupportedChannels {
                name: name.to_string(),
                channels: pixels.channels,
            });
        }
        let base = rgba_image(name, pixels.width, pixels.height, pixels.data.clone())?;
        Ok(self.upload(device, queue, name, mip_chain(base)))
    }

    /// The 1x1 white texture, created on first use.
    pub fn white(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Arc<ManagedTexture>, TextureError> {
        if let Some(existing) = self.textures.get(WHITE_TEXTURE) {
            return Ok(Arc::clone(existing));
        }
        let white = rgba_image(WHITE_TEXTURE, 1, 1, vec![255; 4])?;
        Ok(self.upload(device, queue, WHITE_TEXTURE, vec![white]))
    }

    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        levels: Vec<RgbaImage>,
    ) -> Arc<ManagedTexture> {
        let (width, height) = levels.first().map_or((1, 1), |base| base.dimensions());
        let mip_levels = levels.len().max(1) as u32;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, image) in levels.iter().enumerate() {
            let size = wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            };
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * image.width()),
                    rows_per_image: None,
                },
                size,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{name}-bind-group")),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;

        let managed = Arc::new(ManagedTexture {
            handle,
            texture,
            view,
            bind_group,
            dimensions: (width, height),
            mip_level_count: mip_levels,
        });
        self.textures.insert(name.to_string(), Arc::clone(&managed));
        self.by_handle.insert(handle, Arc::clone(&managed));
        log::info!("Created texture '{name}' ({width}x{height}, {mip_levels} mips)");
        managed
    }

    /// Get a previously created texture by handle.
    pub fn by_handle(&self, handle: TextureHandle) -> Option<&Arc<ManagedTexture>> {
        self.by_handle.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// The shared bind group layout for texture + sampler pairs.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

fn rgba_image(name: &str, width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage, TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions {
            name: name.to_string(),
            width,
            height,
        });
    }
    let expected = width as usize * height as usize * 4;
    let actual = data.len();
    RgbaImage::from_raw(width, height, data).ok_or_else(|| TextureError::DataSizeMismatch {
        name: name.to_string(),
        actual,
        expected,
        width,
        height,
    })
}

/// Create a test GPU device and queue. Returns `None` if no GPU is available.
#[cfg(test)]
pub(crate) fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("orrery-test-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                ..Default::default()
            })
            .await
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2048, 1024), 12);
        assert_eq!(mip_level_count(1000, 500), 10);
    }

    #[test]
    fn test_mip_chain_halves_down_to_one_texel() {
        let base = RgbaImage::from_pixel(8, 2, image::Rgba([200, 100, 50, 255]));
        let chain = mip_chain(base);
        let sizes: Vec<_> = chain.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        // A flat image stays flat at every level.
        assert_eq!(chain[3].get_pixel(0, 0), &image::Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let err = rgba_image("moon.jpg", 2, 2, vec![0; 12]).unwrap_err();
        assert!(matches!(
            err,
            TextureError::DataSizeMismatch {
                actual: 12,
                expected: 16,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            rgba_image("empty", 0, 4, Vec::new()),
            Err(TextureError::ZeroDimensions { .. })
        ));
        assert!(rgba_image("ok", 1, 1, vec![0; 4]).is_ok());
    }

    #[test]
    fn test_texture_table_lookup() {
        let mut table = TextureTable::new();
        assert!(table.is_empty());
        table.insert("earth.jpg", TextureHandle(3));
        assert_eq!(table.get("earth.jpg"), Some(TextureHandle(3)));
        assert_eq!(table.get("mars.jpg"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_create_texture_is_cached_and_handles_are_sequential() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device);
        let white = manager.white(&device, &queue).unwrap();
        let again = manager.white(&device, &queue).unwrap();
        assert!(Arc::ptr_eq(&white, &again));

        let pixels = PixelBuffer {
            width: 4,
            height: 2,
            channels: 4,
            data: vec![128; 32],
        };
        let tex = manager
            .create_from_pixels(&device, &queue, "mars.jpg", &pixels)
            .unwrap();
        assert_eq!(white.handle, TextureHandle(0));
        assert_eq!(tex.handle, TextureHandle(1));
        assert_eq!(tex.mip_level_count, 3);
        assert!(manager.by_handle(tex.handle).is_some());
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_create_from_pixels_rejects_rgb() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device);
        let pixels = PixelBuffer {
            width: 1,
            height: 1,
            channels: 3,
            data: vec![0; 3],
        };
        let err = manager
            .create_from_pixels(&device, &queue, "rgb", &pixels)
            .unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedChannels { channels: 3, .. }));
    }
}
