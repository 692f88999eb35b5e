//! wgpu render target allocator

use std::collections::HashMap;

use tracing::debug;

use crate::context::WgpuContext;
use crate::error::{PcssError, Result};
use crate::pcss::config::{FilterMode, PixelFormat};
use crate::pcss::resource::{RenderTargetAllocator, TargetDescriptor, TargetHandle};

/// wgpu format backing a [`PixelFormat`].
pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
        PixelFormat::RHalf => wgpu::TextureFormat::R16Float,
        PixelFormat::RFloat => wgpu::TextureFormat::R32Float,
        PixelFormat::RGHalf => wgpu::TextureFormat::Rg16Float,
        PixelFormat::RGFloat => wgpu::TextureFormat::Rg32Float,
        PixelFormat::ARGB32 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::ARGBHalf => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::ARGBFloat => wgpu::TextureFormat::Rgba32Float,
    }
}

/// Sampler filters for a [`FilterMode`].
pub fn sampler_filters(filter_mode: FilterMode) -> (wgpu::FilterMode, wgpu::MipmapFilterMode) {
    match filter_mode {
        FilterMode::Point => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest),
        FilterMode::Bilinear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest),
        FilterMode::Trilinear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear),
    }
}

/// A shadow target living on the GPU.
pub struct GpuRenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    descriptor: TargetDescriptor,
}

impl GpuRenderTarget {
    /// Backing texture.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Full view of the texture.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Sampler matching the target's filter mode.
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// wgpu format of the texture.
    pub fn format(&self) -> wgpu::TextureFormat {
        texture_format(self.descriptor.format)
    }

    /// MSAA sample count.
    pub fn sample_count(&self) -> u32 {
        self.descriptor.anti_aliasing.samples()
    }

    /// Descriptor the target was allocated from.
    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.descriptor
    }
}

/// [`RenderTargetAllocator`] backed by a wgpu device.
pub struct WgpuTargetAllocator {
    ctx: WgpuContext,
    targets: HashMap<TargetHandle, GpuRenderTarget>,
    next_handle: u64,
}

impl WgpuTargetAllocator {
    /// Create an allocator on `ctx`.
    pub fn new(ctx: &WgpuContext) -> Self {
        Self {
            ctx: ctx.clone(),
            targets: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Look up a live target.
    pub fn get(&self, handle: TargetHandle) -> Option<&GpuRenderTarget> {
        self.targets.get(&handle)
    }

    /// Number of live targets.
    pub fn live_count(&self) -> usize {
        self.targets.len()
    }

    fn validate(&self, descriptor: &TargetDescriptor) -> std::result::Result<(), String> {
        let max = self.ctx.max_target_resolution();
        if descriptor.resolution == 0 || descriptor.resolution > max {
            return Err(format!("edge length must be in 1..={max}"));
        }

        let format = texture_format(descriptor.format);
        let features = format.guaranteed_format_features(self.ctx.device.features());
        if !features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(format!("{format:?} cannot be rendered to"));
        }

        let samples = descriptor.anti_aliasing.samples();
        if !features.flags.sample_count_supported(samples) {
            return Err(format!("{format:?} does not support {samples}x multisampling"));
        }
        Ok(())
    }

    fn create_sampler(&self, filter_mode: FilterMode) -> wgpu::Sampler {
        let (filter, mipmap_filter) = sampler_filters(filter_mode);
        self.ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pcss shadow target sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter,
            ..Default::default()
        })
    }
}

impl RenderTargetAllocator for WgpuTargetAllocator {
    fn allocate(&mut self, descriptor: &TargetDescriptor) -> Result<TargetHandle> {
        self.validate(descriptor)
            .map_err(|reason| PcssError::ResourceAllocation {
                resolution: descriptor.resolution,
                format: descriptor.format,
                samples: descriptor.anti_aliasing.samples(),
                reason,
            })?;

        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pcss shadow target"),
            size: wgpu::Extent3d {
                width: descriptor.resolution,
                height: descriptor.resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: descriptor.anti_aliasing.samples(),
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(descriptor.format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.create_sampler(descriptor.filter_mode);

        self.next_handle += 1;
        let handle = TargetHandle(self.next_handle);
        self.targets.insert(
            handle,
            GpuRenderTarget {
                texture,
                view,
                sampler,
                descriptor: *descriptor,
            },
        );
        Ok(handle)
    }

    fn release(&mut self, handle: TargetHandle) {
        if let Some(target) = self.targets.remove(&handle) {
            target.texture.destroy();
            debug!(handle = handle.0, "destroyed wgpu shadow target");
        }
    }

    fn set_filter_mode(&mut self, handle: TargetHandle, filter_mode: FilterMode) -> Result<()> {
        if !self.targets.contains_key(&handle) {
            return Err(PcssError::UnknownTarget(handle));
        }
        let sampler = self.create_sampler(filter_mode);
        if let Some(target) = self.targets.get_mut(&handle) {
            target.sampler = sampler;
            target.descriptor.filter_mode = filter_mode;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_mapping() {
        assert_eq!(texture_format(PixelFormat::RFloat), wgpu::TextureFormat::R32Float);
        assert_eq!(texture_format(PixelFormat::RHalf), wgpu::TextureFormat::R16Float);
        assert_eq!(
            texture_format(PixelFormat::ARGBHalf),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn test_sampler_filters() {
        assert_eq!(
            sampler_filters(FilterMode::Point),
            (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest)
        );
        assert_eq!(
            sampler_filters(FilterMode::Trilinear),
            (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear)
        );
    }
}
