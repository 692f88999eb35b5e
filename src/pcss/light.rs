//! PCSS light lifecycle
//!
//! [`PcssLight`] is the per-light state machine the host drives:
//!
//! ```text
//! Uninitialized --setup--> Ready --update--> Ready
//!                            |
//!                            +--destroy--> Destroyed (terminal)
//! ```
//!
//! The fallible methods (`setup`, `update`, `destroy`) return errors. The
//! `on_*` hooks wrap them for the host: they log and swallow every failure so
//! a misconfigured light never takes down the frame loop.

use tracing::{debug, error, info, warn};

use crate::error::{PcssError, Result};
use crate::pcss::commands::{CommandBuffer, LightEvent, COMMAND_BUFFER_NAME};
use crate::pcss::config::PcssConfig;
use crate::pcss::resource::{ShadowRenderTarget, TargetUpdate};
use crate::pcss::sync::{FrameContext, FrameSynchronizer};

/// The light-like host object a PCSS instance attaches to.
pub trait ShadowLight {
    /// Set the light's own shadow map resolution; `0` restores the host default.
    fn set_shadow_custom_resolution(&mut self, resolution: u32);

    /// Attach `buffer` at `event`, replacing any buffer with the same name.
    fn add_command_buffer(&mut self, event: LightEvent, buffer: &CommandBuffer);

    /// Detach the buffer named `name` from `event`.
    fn remove_command_buffer(&mut self, event: LightEvent, name: &str);
}

/// Lifecycle state of a [`PcssLight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightState {
    /// Setup has not succeeded yet.
    #[default]
    Uninitialized,
    /// Set up and accepting updates.
    Ready,
    /// Torn down; no further calls are accepted.
    Destroyed,
}

/// PCSS driver for a single light.
pub struct PcssLight<L: ShadowLight> {
    config: PcssConfig,
    light: Option<L>,
    state: LightState,
    sync: FrameSynchronizer,
    applied_resolution: Option<u32>,
    attached_event: Option<LightEvent>,
}

impl<L: ShadowLight> PcssLight<L> {
    /// Create an instance with no light attached.
    pub fn new(config: PcssConfig) -> Self {
        Self {
            config,
            light: None,
            state: LightState::Uninitialized,
            sync: FrameSynchronizer::new(),
            applied_resolution: None,
            attached_event: None,
        }
    }

    /// Create an instance attached to `light`.
    pub fn with_light(config: PcssConfig, light: L) -> Self {
        let mut pcss = Self::new(config);
        pcss.light = Some(light);
        pcss
    }

    /// Attach a light, replacing (and detaching from) the previous one.
    pub fn attach_light(&mut self, light: L) -> Option<L> {
        let previous = self.detach_light();
        self.light = Some(light);
        previous
    }

    /// Detach the light, removing the copy commands from it.
    pub fn detach_light(&mut self) -> Option<L> {
        let mut light = self.light.take()?;
        if let Some(event) = self.attached_event.take() {
            light.remove_command_buffer(event, COMMAND_BUFFER_NAME);
        }
        self.applied_resolution = None;
        Some(light)
    }

    /// The attached light.
    pub fn light(&self) -> Option<&L> {
        self.light.as_ref()
    }

    /// Mutable access to the attached light.
    pub fn light_mut(&mut self) -> Option<&mut L> {
        self.light.as_mut()
    }

    /// Current configuration.
    pub fn config(&self) -> &PcssConfig {
        &self.config
    }

    /// Mutable configuration; changes take effect on the next update.
    pub fn config_mut(&mut self) -> &mut PcssConfig {
        &mut self.config
    }

    /// Lifecycle state.
    pub fn state(&self) -> LightState {
        self.state
    }

    /// The live shadow target, if any.
    pub fn target(&self) -> Option<&ShadowRenderTarget> {
        self.sync.target()
    }

    /// The current copy sequence.
    pub fn command_buffer(&self) -> &CommandBuffer {
        self.sync.command_buffer()
    }

    /// Attach to the light and build all resources.
    ///
    /// Fails with [`PcssError::MissingHostObject`] and stays uninitialized
    /// when no light is attached. An allocation failure still leaves the
    /// light `Ready` without a target; the next update retries.
    pub fn setup(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        match self.state {
            LightState::Destroyed => {
                return Err(PcssError::PostTeardownAccess { operation: "setup" })
            }
            LightState::Ready => debug!("PCSS light set up again"),
            LightState::Uninitialized => {}
        }
        if self.light.is_none() {
            return Err(PcssError::MissingHostObject);
        }

        self.state = LightState::Ready;
        info!(
            resolution = self.config.normalized_resolution(),
            custom = self.config.use_custom_resolution,
            "PCSS light set up"
        );
        self.sync_frame(ctx).map(|_| ())
    }

    /// Refresh globals, the shadow target and the copy commands.
    pub fn update(&mut self, ctx: &mut FrameContext<'_>) -> Result<TargetUpdate> {
        match self.state {
            LightState::Ready => self.sync_frame(ctx),
            LightState::Uninitialized => Err(PcssError::NotInitialized { operation: "update" }),
            LightState::Destroyed => Err(PcssError::PostTeardownAccess { operation: "update" }),
        }
    }

    /// Release the shadow target and detach from the light. Terminal.
    pub fn destroy(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        if self.state == LightState::Destroyed {
            return Err(PcssError::PostTeardownAccess { operation: "destroy" });
        }

        self.sync.release(&mut *ctx.allocator);
        if let (Some(light), Some(event)) = (self.light.as_mut(), self.attached_event.take()) {
            light.remove_command_buffer(event, COMMAND_BUFFER_NAME);
        }
        self.state = LightState::Destroyed;
        debug!("PCSS light destroyed");
        Ok(())
    }

    /// Host setup hook. Returns whether the light is ready.
    pub fn on_setup(&mut self, ctx: &mut FrameContext<'_>) -> bool {
        match self.setup(ctx) {
            Ok(()) => true,
            Err(err @ PcssError::ResourceAllocation { .. }) => {
                error!(%err, "PCSS light set up without a shadow target");
                true
            }
            Err(err) => {
                error!(%err, "failed to set up PCSS light");
                false
            }
        }
    }

    /// Host per-frame hook. Never fails.
    pub fn on_update(&mut self, ctx: &mut FrameContext<'_>) {
        match self.update(ctx) {
            Ok(_) => {}
            Err(err @ PcssError::PostTeardownAccess { .. }) => warn!(%err, "ignoring update"),
            Err(err @ PcssError::NotInitialized { .. }) => debug!(%err, "ignoring update"),
            Err(err) => error!(%err, "failed to update PCSS light"),
        }
    }

    /// Host teardown hook. Never fails.
    pub fn on_destroy(&mut self, ctx: &mut FrameContext<'_>) {
        if let Err(err) = self.destroy(ctx) {
            warn!(%err, "ignoring destroy");
        }
    }

    fn sync_frame(&mut self, ctx: &mut FrameContext<'_>) -> Result<TargetUpdate> {
        let Some(light) = self.light.as_mut() else {
            return Err(PcssError::MissingHostObject);
        };

        let custom_resolution = self.config.custom_shadow_resolution();
        if self.applied_resolution != Some(custom_resolution) {
            light.set_shadow_custom_resolution(custom_resolution);
            self.applied_resolution = Some(custom_resolution);
        }

        let published = self.sync.publish_parameters(&self.config, ctx);
        let commands = self
            .sync
            .rebuild_command_sequence(&self.config.shadow_map_slot);

        let event = self.config.light_event;
        if let Some(previous) = self.attached_event.filter(|previous| *previous != event) {
            light.remove_command_buffer(previous, COMMAND_BUFFER_NAME);
        }
        light.add_command_buffer(event, commands);
        self.attached_event = Some(event);

        published
    }
}

impl<L: ShadowLight> std::fmt::Debug for PcssLight<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcssLight")
            .field("state", &self.state)
            .field("target", &self.sync.target())
            .field("attached", &self.light.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcss::headless::{GlobalShaderState, HeadlessAllocator, HeadlessLight};

    #[test]
    fn test_setup_without_light_stays_uninitialized() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut pcss = PcssLight::<HeadlessLight>::new(PcssConfig::default());

        assert_eq!(pcss.setup(&mut ctx), Err(PcssError::MissingHostObject));
        assert!(!pcss.on_setup(&mut ctx));
        assert_eq!(pcss.state(), LightState::Uninitialized);
        assert!(pcss.target().is_none());
    }

    #[test]
    fn test_update_before_setup_is_rejected() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut pcss = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());

        assert_eq!(
            pcss.update(&mut ctx),
            Err(PcssError::NotInitialized { operation: "update" })
        );
        pcss.on_update(&mut ctx);
        assert!(pcss.target().is_none());
    }

    #[test]
    fn test_setup_attaches_commands_and_resolution() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let config = PcssConfig {
            resolution: 5000,
            use_custom_resolution: true,
            ..Default::default()
        };
        let mut pcss = PcssLight::with_light(config, HeadlessLight::new());

        assert!(pcss.on_setup(&mut ctx));
        assert_eq!(pcss.state(), LightState::Ready);

        let light = pcss.light().unwrap();
        assert_eq!(light.custom_resolution(), 4096);
        let attached = light
            .command_buffer(LightEvent::AfterShadowMap, COMMAND_BUFFER_NAME)
            .unwrap();
        assert_eq!(attached, pcss.command_buffer());
        assert_eq!(attached.commands().len(), 3);
    }

    #[test]
    fn test_custom_resolution_reapplied_on_toggle() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut pcss = PcssLight::with_light(
            PcssConfig {
                resolution: 2048,
                use_custom_resolution: true,
                ..Default::default()
            },
            HeadlessLight::new(),
        );
        pcss.setup(&mut ctx).unwrap();
        assert_eq!(pcss.light().unwrap().custom_resolution(), 2048);

        pcss.config_mut().use_custom_resolution = false;
        pcss.update(&mut ctx).unwrap();
        assert_eq!(pcss.light().unwrap().custom_resolution(), 0);
    }

    #[test]
    fn test_light_event_change_moves_commands() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut pcss = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());
        pcss.setup(&mut ctx).unwrap();

        pcss.config_mut().light_event = LightEvent::BeforeScreenspaceMask;
        pcss.update(&mut ctx).unwrap();

        let light = pcss.light().unwrap();
        assert_eq!(light.command_buffers(LightEvent::AfterShadowMap).count(), 0);
        assert_eq!(
            light
                .command_buffers(LightEvent::BeforeScreenspaceMask)
                .count(),
            1
        );
    }

    #[test]
    fn test_destroy_detaches_and_is_terminal() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut pcss = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());
        pcss.setup(&mut ctx).unwrap();

        pcss.destroy(&mut ctx).unwrap();
        assert_eq!(pcss.state(), LightState::Destroyed);
        assert!(pcss.target().is_none());
        assert_eq!(
            pcss.light()
                .unwrap()
                .command_buffers(LightEvent::AfterShadowMap)
                .count(),
            0
        );

        assert_eq!(
            pcss.destroy(&mut ctx),
            Err(PcssError::PostTeardownAccess { operation: "destroy" })
        );
        assert_eq!(
            pcss.setup(&mut ctx),
            Err(PcssError::PostTeardownAccess { operation: "setup" })
        );
        pcss.on_destroy(&mut ctx);
    }

    #[test]
    fn test_detached_light_self_heals() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut pcss = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());
        pcss.setup(&mut ctx).unwrap();

        let old = pcss.detach_light().unwrap();
        assert_eq!(old.command_buffers(LightEvent::AfterShadowMap).count(), 0);
        assert_eq!(pcss.update(&mut ctx), Err(PcssError::MissingHostObject));

        pcss.attach_light(HeadlessLight::new());
        assert_eq!(pcss.update(&mut ctx), Ok(TargetUpdate::Unchanged));
        assert_eq!(
            pcss.light()
                .unwrap()
                .command_buffers(LightEvent::AfterShadowMap)
                .count(),
            1
        );
    }
}
