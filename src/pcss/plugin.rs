//! Host lifecycle hooks.

use tracing::{error, info};

use crate::pcss::light::{PcssLight, ShadowLight};
use crate::pcss::sync::FrameContext;

/// Lifecycle hooks the host calls on a plugin.
///
/// Implementations must contain their own failures: none of these hooks may
/// panic or stall the host frame loop.
pub trait LightPlugin {
    /// Called once before the first update. Returns whether the plugin is usable.
    fn on_setup(&mut self, ctx: &mut FrameContext<'_>) -> bool;

    /// Called once per frame.
    fn on_update(&mut self, ctx: &mut FrameContext<'_>);

    /// Called once at teardown.
    fn on_destroy(&mut self, ctx: &mut FrameContext<'_>);
}

impl<L: ShadowLight> LightPlugin for PcssLight<L> {
    fn on_setup(&mut self, ctx: &mut FrameContext<'_>) -> bool {
        PcssLight::on_setup(self, ctx)
    }

    fn on_update(&mut self, ctx: &mut FrameContext<'_>) {
        PcssLight::on_update(self, ctx);
    }

    fn on_destroy(&mut self, ctx: &mut FrameContext<'_>) {
        PcssLight::on_destroy(self, ctx);
    }
}

/// Installed plugins, updated in installation order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn LightPlugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up `plugin` and keep it only if setup succeeded.
    pub fn install(&mut self, mut plugin: Box<dyn LightPlugin>, ctx: &mut FrameContext<'_>) -> bool {
        if !plugin.on_setup(ctx) {
            error!("plugin setup failed, not installing");
            return false;
        }
        self.plugins.push(plugin);
        info!(installed = self.plugins.len(), "installed light plugin");
        true
    }

    /// Run one frame on every plugin.
    pub fn update_all(&mut self, ctx: &mut FrameContext<'_>) {
        for plugin in &mut self.plugins {
            plugin.on_update(ctx);
        }
    }

    /// Tear down and drop every plugin.
    pub fn destroy_all(&mut self, ctx: &mut FrameContext<'_>) {
        for mut plugin in self.plugins.drain(..) {
            plugin.on_destroy(ctx);
        }
    }

    /// Number of installed plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True if nothing is installed.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcss::config::PcssConfig;
    use crate::pcss::headless::{GlobalShaderState, HeadlessAllocator, HeadlessLight};

    #[test]
    fn test_install_requires_successful_setup() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        let mut registry = PluginRegistry::new();

        let orphan = PcssLight::<HeadlessLight>::new(PcssConfig::default());
        assert!(!registry.install(Box::new(orphan), &mut ctx));

        let attached = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());
        assert!(registry.install(Box::new(attached), &mut ctx));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_destroy_all_releases_targets() {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut registry = PluginRegistry::new();
        {
            let mut ctx = FrameContext::new(&mut alloc, &mut globals);
            for _ in 0..2 {
                let light = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());
                registry.install(Box::new(light), &mut ctx);
            }
            registry.update_all(&mut ctx);
            registry.destroy_all(&mut ctx);
        }

        assert!(registry.is_empty());
        assert_eq!(alloc.allocation_count(), 2);
        assert_eq!(alloc.live_count(), 0);
    }
}
