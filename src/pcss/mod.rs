//! Percentage-closer soft shadows light driver
//!
//! Host-independent core: derives shader globals from a [`PcssConfig`],
//! keeps one shadow render target alive and records the commands that copy
//! the light's shadow map into it every frame.

pub mod commands;
pub mod config;
pub mod globals;
pub mod headless;
pub mod light;
pub mod params;
pub mod plugin;
pub mod resource;
pub mod sync;

pub use commands::{
    CommandBuffer, LightEvent, RenderTextureId, ShadowCommand, ShadowSamplingMode,
    COMMAND_BUFFER_NAME,
};
pub use config::{
    normalize_resolution, AntiAliasing, ExternalTexture, FilterMode, PcssConfig, PixelFormat,
    QualitySettings, DEFAULT_SHADOW_MAP_SLOT,
};
pub use globals::{PcssKeywords, ShaderGlobals, TextureRef};
pub use headless::{GlobalShaderState, GlobalValue, HeadlessAllocator, HeadlessLight};
pub use light::{LightState, PcssLight, ShadowLight};
pub use params::{PcssParameters, PcssUniform};
pub use plugin::{LightPlugin, PluginRegistry};
pub use resource::{
    RenderTargetAllocator, ShadowRenderTarget, ShadowResourceManager, TargetDescriptor,
    TargetHandle, TargetUpdate,
};
pub use sync::{FrameContext, FrameSynchronizer};
