//! Recorded GPU command sequence
//!
//! The light does not talk to the GPU directly. It records a small
//! [`CommandBuffer`] that the host replays at the attached [`LightEvent`].

use crate::pcss::resource::TargetHandle;

/// Name the PCSS copy buffer is registered under.
pub const COMMAND_BUFFER_NAME: &str = "PCSS Shadows";

/// Point in the light's render loop a command buffer runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightEvent {
    /// Before the shadow map is rendered.
    BeforeShadowMap,
    /// Right after the shadow map is rendered, while it is still bound.
    #[default]
    AfterShadowMap,
    /// Before screen-space shadows are resolved.
    BeforeScreenspaceMask,
    /// After screen-space shadows are resolved.
    AfterScreenspaceMask,
}

/// How a depth texture is sampled by subsequent commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowSamplingMode {
    /// Hardware depth comparison.
    CompareDepths,
    /// Raw depth values.
    RawDepth,
}

/// A texture a command reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTextureId {
    /// Whatever render target is active when the buffer runs (the light's shadow map).
    CurrentActive,
    /// A render target allocated through the host allocator.
    Target(TargetHandle),
}

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowCommand {
    /// Switch how `target` is sampled.
    SetShadowSamplingMode {
        /// Affected texture.
        target: RenderTextureId,
        /// New sampling mode.
        mode: ShadowSamplingMode,
    },
    /// Copy `source` into `destination`.
    Blit {
        /// Texture read from.
        source: RenderTextureId,
        /// Texture written to.
        destination: RenderTextureId,
    },
    /// Bind `texture` to a shader-global slot.
    SetGlobalTexture {
        /// Slot name.
        slot: String,
        /// Bound texture.
        texture: RenderTextureId,
    },
}

/// A named, replayable list of [`ShadowCommand`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<ShadowCommand>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    /// Buffer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded commands in order.
    pub fn commands(&self) -> &[ShadowCommand] {
        &self.commands
    }

    /// True if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop all recorded commands.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Record a sampling-mode switch.
    pub fn set_shadow_sampling_mode(&mut self, target: RenderTextureId, mode: ShadowSamplingMode) {
        self.commands
            .push(ShadowCommand::SetShadowSamplingMode { target, mode });
    }

    /// Record a full-texture copy.
    pub fn blit(&mut self, source: RenderTextureId, destination: RenderTextureId) {
        self.commands.push(ShadowCommand::Blit {
            source,
            destination,
        });
    }

    /// Record a global texture binding.
    pub fn set_global_texture(&mut self, slot: impl Into<String>, texture: RenderTextureId) {
        self.commands.push(ShadowCommand::SetGlobalTexture {
            slot: slot.into(),
            texture,
        });
    }

    /// Handles of every allocator-owned target the buffer touches.
    pub fn referenced_targets(&self) -> impl Iterator<Item = TargetHandle> + '_ {
        self.commands.iter().flat_map(|command| {
            let (a, b) = match command {
                ShadowCommand::SetShadowSamplingMode { target, .. } => (Some(*target), None),
                ShadowCommand::Blit {
                    source,
                    destination,
                } => (Some(*source), Some(*destination)),
                ShadowCommand::SetGlobalTexture { texture, .. } => (Some(*texture), None),
            };
            [a, b].into_iter().flatten().filter_map(|id| match id {
                RenderTextureId::Target(handle) => Some(handle),
                RenderTextureId::CurrentActive => None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_clear() {
        let mut buffer = CommandBuffer::new(COMMAND_BUFFER_NAME);
        let target = RenderTextureId::Target(TargetHandle(7));

        buffer.set_shadow_sampling_mode(RenderTextureId::CurrentActive, ShadowSamplingMode::RawDepth);
        buffer.blit(RenderTextureId::CurrentActive, target);
        buffer.set_global_texture("_ShadowMap", target);

        assert_eq!(buffer.commands().len(), 3);
        assert_eq!(
            buffer.referenced_targets().collect::<Vec<_>>(),
            vec![TargetHandle(7), TargetHandle(7)]
        );

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.name(), "PCSS Shadows");
    }
}
