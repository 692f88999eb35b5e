//! Shadow render target lifecycle
//!
//! [`ShadowResourceManager`] owns the one render target the shadow map is
//! copied into. Allocation itself is delegated to the host through
//! [`RenderTargetAllocator`]; the manager only decides *when* to allocate,
//! release, or patch the target in place.

use tracing::{debug, warn};

use crate::error::Result;
use crate::pcss::config::{AntiAliasing, FilterMode, PcssConfig, PixelFormat};

/// Opaque identity of a host-allocated render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetHandle(pub u64);

/// Everything the host needs to allocate a shadow render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    /// Edge length; always a power of two.
    pub resolution: u32,
    /// Color format.
    pub format: PixelFormat,
    /// Sampling filter.
    pub filter_mode: FilterMode,
    /// MSAA level.
    pub anti_aliasing: AntiAliasing,
    /// Depth buffer bits. Always zero: the target only stores copied depth as color.
    pub depth_bits: u32,
    /// Whether a mip chain is allocated. Always false.
    pub mipmaps: bool,
}

impl TargetDescriptor {
    /// Descriptor for `config`, with the resolution normalized.
    pub fn from_config(config: &PcssConfig) -> Self {
        Self {
            resolution: config.normalized_resolution(),
            format: config.pixel_format,
            filter_mode: config.filter_mode,
            anti_aliasing: config.anti_aliasing,
            depth_bits: 0,
            mipmaps: false,
        }
    }

    /// True if a target described by `self` must be reallocated to satisfy `other`.
    pub fn requires_rebuild(&self, other: &TargetDescriptor) -> bool {
        self.format != other.format
            || self.anti_aliasing != other.anti_aliasing
            || self.resolution != other.resolution
    }
}

/// Host render-target allocation service.
pub trait RenderTargetAllocator {
    /// Allocate a `resolution x resolution` target. Failures are surfaced, never retried.
    fn allocate(&mut self, descriptor: &TargetDescriptor) -> Result<TargetHandle>;

    /// Release a target. The handle must not be used afterwards.
    fn release(&mut self, handle: TargetHandle);

    /// Change the sampling filter of a live target without reallocating.
    fn set_filter_mode(&mut self, handle: TargetHandle, filter_mode: FilterMode) -> Result<()>;
}

/// A live shadow render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowRenderTarget {
    handle: TargetHandle,
    descriptor: TargetDescriptor,
}

impl ShadowRenderTarget {
    /// Backing allocation handle.
    pub fn handle(&self) -> TargetHandle {
        self.handle
    }

    /// Descriptor the target currently matches.
    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.descriptor
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.descriptor.resolution
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.descriptor.resolution
    }

    /// Current sampling filter.
    pub fn filter_mode(&self) -> FilterMode {
        self.descriptor.filter_mode
    }
}

/// What [`ShadowResourceManager::ensure_current`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetUpdate {
    /// No target existed; a new one was allocated.
    Created,
    /// The old target was released and replaced.
    Recreated {
        /// Released handle.
        released: TargetHandle,
    },
    /// Only the filter mode changed, in place.
    FilterUpdated,
    /// Nothing changed.
    Unchanged,
}

impl TargetUpdate {
    /// True if the live handle differs from the previous one.
    pub fn handle_changed(self) -> bool {
        matches!(self, TargetUpdate::Created | TargetUpdate::Recreated { .. })
    }
}

/// Owner of the shadow render target.
#[derive(Debug, Default)]
pub struct ShadowResourceManager {
    target: Option<ShadowRenderTarget>,
}

impl ShadowResourceManager {
    /// Create a manager with no target.
    pub fn new() -> Self {
        Self::default()
    }

    /// The live target, if any.
    pub fn target(&self) -> Option<&ShadowRenderTarget> {
        self.target.as_ref()
    }

    /// Allocate a fresh target, releasing the current one first.
    ///
    /// On failure the manager is left without a target.
    pub fn create_target(
        &mut self,
        descriptor: &TargetDescriptor,
        allocator: &mut dyn RenderTargetAllocator,
    ) -> Result<&ShadowRenderTarget> {
        self.destroy_target(allocator);

        debug_assert!(descriptor.resolution.is_power_of_two());
        let handle = allocator.allocate(descriptor)?;
        debug!(
            handle = handle.0,
            resolution = descriptor.resolution,
            format = ?descriptor.format,
            samples = descriptor.anti_aliasing.samples(),
            "allocated shadow render target"
        );

        Ok(&*self.target.insert(ShadowRenderTarget {
            handle,
            descriptor: *descriptor,
        }))
    }

    /// Release the current target. A no-op when there is none.
    pub fn destroy_target(&mut self, allocator: &mut dyn RenderTargetAllocator) {
        if let Some(target) = self.target.take() {
            allocator.release(target.handle);
            debug!(handle = target.handle.0, "released shadow render target");
        }
    }

    /// Bring the target in line with `descriptor`.
    ///
    /// Reallocates when there is no target or its format, MSAA level or
    /// resolution differ; otherwise only the filter mode is patched.
    pub fn ensure_current(
        &mut self,
        descriptor: &TargetDescriptor,
        allocator: &mut dyn RenderTargetAllocator,
    ) -> Result<TargetUpdate> {
        let Some(existing) = self.target else {
            self.create_target(descriptor, allocator)?;
            return Ok(TargetUpdate::Created);
        };

        if existing.descriptor.requires_rebuild(descriptor) {
            self.create_target(descriptor, allocator)?;
            return Ok(TargetUpdate::Recreated {
                released: existing.handle,
            });
        }

        if existing.descriptor.filter_mode == descriptor.filter_mode {
            return Ok(TargetUpdate::Unchanged);
        }

        if let Err(err) = allocator.set_filter_mode(existing.handle, descriptor.filter_mode) {
            warn!(handle = existing.handle.0, %err, "dropping stale shadow render target");
            self.target = None;
            return Err(err);
        }
        if let Some(target) = self.target.as_mut() {
            target.descriptor.filter_mode = descriptor.filter_mode;
        }
        Ok(TargetUpdate::FilterUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcss::headless::HeadlessAllocator;

    fn descriptor() -> TargetDescriptor {
        TargetDescriptor::from_config(&PcssConfig {
            resolution: 1024,
            ..Default::default()
        })
    }

    #[test]
    fn test_descriptor_from_config_normalizes() {
        let desc = TargetDescriptor::from_config(&PcssConfig {
            resolution: 5000,
            ..Default::default()
        });
        assert_eq!(desc.resolution, 4096);
        assert_eq!(desc.depth_bits, 0);
        assert!(!desc.mipmaps);
    }

    #[test]
    fn test_ensure_current_reuses_handle() {
        let mut alloc = HeadlessAllocator::new();
        let mut manager = ShadowResourceManager::new();
        let desc = descriptor();

        assert_eq!(manager.ensure_current(&desc, &mut alloc), Ok(TargetUpdate::Created));
        let first = manager.target().unwrap().handle();
        assert_eq!(manager.ensure_current(&desc, &mut alloc), Ok(TargetUpdate::Unchanged));
        assert_eq!(manager.target().unwrap().handle(), first);
        assert_eq!(alloc.allocation_count(), 1);
    }

    #[test]
    fn test_ensure_current_rebuilds_on_format_change() {
        let mut alloc = HeadlessAllocator::new();
        let mut manager = ShadowResourceManager::new();
        let mut desc = descriptor();
        manager.ensure_current(&desc, &mut alloc).unwrap();
        let old = manager.target().unwrap().handle();

        desc.format = PixelFormat::RHalf;
        let update = manager.ensure_current(&desc, &mut alloc).unwrap();

        assert_eq!(update, TargetUpdate::Recreated { released: old });
        assert_ne!(manager.target().unwrap().handle(), old);
        assert_eq!(alloc.release_count(old), 1);
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn test_ensure_current_rebuilds_on_anti_aliasing_change() {
        let mut alloc = HeadlessAllocator::new();
        let mut manager = ShadowResourceManager::new();
        let mut desc = descriptor();
        manager.ensure_current(&desc, &mut alloc).unwrap();
        let old = manager.target().unwrap().handle();

        desc.anti_aliasing = AntiAliasing::Four;
        assert!(manager.ensure_current(&desc, &mut alloc).unwrap().handle_changed());
        assert_eq!(alloc.release_count(old), 1);
        assert_eq!(
            manager.target().unwrap().descriptor().anti_aliasing,
            AntiAliasing::Four
        );
    }

    #[test]
    fn test_ensure_current_patches_filter_in_place() {
        let mut alloc = HeadlessAllocator::new();
        let mut manager = ShadowResourceManager::new();
        let mut desc = descriptor();
        manager.ensure_current(&desc, &mut alloc).unwrap();
        let handle = manager.target().unwrap().handle();

        desc.filter_mode = FilterMode::Point;
        let update = manager.ensure_current(&desc, &mut alloc).unwrap();

        assert_eq!(update, TargetUpdate::FilterUpdated);
        let target = manager.target().unwrap();
        assert_eq!(target.handle(), handle);
        assert_eq!(target.filter_mode(), FilterMode::Point);
        assert_eq!(alloc.filter_mode(handle), Some(FilterMode::Point));
        assert_eq!(alloc.allocation_count(), 1);
    }

    #[test]
    fn test_destroy_target_is_idempotent() {
        let mut alloc = HeadlessAllocator::new();
        let mut manager = ShadowResourceManager::new();
        manager.destroy_target(&mut alloc);

        manager.create_target(&descriptor(), &mut alloc).unwrap();
        let handle = manager.target().unwrap().handle();
        manager.destroy_target(&mut alloc);
        manager.destroy_target(&mut alloc);

        assert!(manager.target().is_none());
        assert_eq!(alloc.release_count(handle), 1);
    }

    #[test]
    fn test_failed_allocation_leaves_no_target() {
        let mut alloc = HeadlessAllocator::with_max_resolution(512);
        let mut manager = ShadowResourceManager::new();

        let err = manager.ensure_current(&descriptor(), &mut alloc).unwrap_err();
        assert!(matches!(err, crate::PcssError::ResourceAllocation { resolution: 1024, .. }));
        assert!(manager.target().is_none());
        assert_eq!(alloc.live_count(), 0);
    }
}
