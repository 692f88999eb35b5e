//! Per-frame parameter and command synchronization.

use tracing::{debug, trace};

use crate::error::Result;
use crate::pcss::commands::{
    CommandBuffer, RenderTextureId, ShadowSamplingMode, COMMAND_BUFFER_NAME,
};
use crate::pcss::config::{PcssConfig, QualitySettings};
use crate::pcss::globals::ShaderGlobals;
use crate::pcss::params::PcssParameters;
use crate::pcss::resource::{
    RenderTargetAllocator, ShadowRenderTarget, ShadowResourceManager, TargetDescriptor,
    TargetUpdate,
};

/// Host services handed to every lifecycle call.
pub struct FrameContext<'a> {
    /// Render target allocation.
    pub allocator: &'a mut dyn RenderTargetAllocator,
    /// Process-wide shader globals.
    pub globals: &'a mut dyn ShaderGlobals,
    /// Host quality settings for this frame.
    pub quality: QualitySettings,
}

impl<'a> FrameContext<'a> {
    /// Bundle host services with default quality settings.
    pub fn new(
        allocator: &'a mut dyn RenderTargetAllocator,
        globals: &'a mut dyn ShaderGlobals,
    ) -> Self {
        Self {
            allocator,
            globals,
            quality: QualitySettings::default(),
        }
    }

    /// Override the quality settings.
    pub fn with_quality(mut self, quality: QualitySettings) -> Self {
        self.quality = quality;
        self
    }
}

/// Keeps shader globals, the shadow target and the copy commands in step with a config.
#[derive(Debug)]
pub struct FrameSynchronizer {
    resources: ShadowResourceManager,
    commands: CommandBuffer,
}

impl Default for FrameSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSynchronizer {
    /// Create a synchronizer with no target and an empty command buffer.
    pub fn new() -> Self {
        Self {
            resources: ShadowResourceManager::new(),
            commands: CommandBuffer::new(COMMAND_BUFFER_NAME),
        }
    }

    /// The owned resource manager.
    pub fn resources(&self) -> &ShadowResourceManager {
        &self.resources
    }

    /// The live shadow target, if any.
    pub fn target(&self) -> Option<&ShadowRenderTarget> {
        self.resources.target()
    }

    /// The current command sequence.
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.commands
    }

    /// Publish derived globals and bring the shadow target up to date.
    ///
    /// Globals are written even when the target cannot be allocated.
    pub fn publish_parameters(
        &mut self,
        config: &PcssConfig,
        ctx: &mut FrameContext<'_>,
    ) -> Result<TargetUpdate> {
        let params = PcssParameters::derive(config, &ctx.quality);
        params.publish(&mut *ctx.globals);
        trace!(keywords = ?params.keywords, "published PCSS globals");

        let descriptor = TargetDescriptor::from_config(config);
        let update = self
            .resources
            .ensure_current(&descriptor, &mut *ctx.allocator)?;
        if update != TargetUpdate::Unchanged {
            debug!(?update, resolution = descriptor.resolution, "shadow target updated");
        }
        Ok(update)
    }

    /// Re-record the copy sequence against the live target.
    ///
    /// Without a live target the buffer is left empty so no released handle is referenced.
    pub fn rebuild_command_sequence(&mut self, shadow_map_slot: &str) -> &CommandBuffer {
        self.commands.clear();

        let Some(target) = self.resources.target() else {
            trace!("no shadow target, command sequence left empty");
            return &self.commands;
        };
        let destination = RenderTextureId::Target(target.handle());

        self.commands.set_shadow_sampling_mode(
            RenderTextureId::CurrentActive,
            ShadowSamplingMode::RawDepth,
        );
        self.commands
            .blit(RenderTextureId::CurrentActive, destination);
        self.commands.set_global_texture(shadow_map_slot, destination);
        &self.commands
    }

    /// Release the shadow target and drop the recorded commands.
    pub fn release(&mut self, allocator: &mut dyn RenderTargetAllocator) {
        self.resources.destroy_target(allocator);
        self.commands.clear();
    }
}
