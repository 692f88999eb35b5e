//! Rein PCSS
//!
//! Percentage-closer soft shadows driver for a single light.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **error** - `PcssError` and the crate `Result`
//! 2. **pcss** - Host-independent core (config, shadow target lifecycle,
//!    shader globals, command recording, light state machine)
//! 3. **context** - Core wgpu wrapper (Device, Queue) (feature = "gpu")
//! 4. **gpu** - wgpu host services: allocator, globals, command replay (feature = "gpu")

pub mod error;
pub mod pcss;

#[cfg(feature = "gpu")]
pub mod context;

#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export commonly used types
pub use error::{PcssError, Result};

pub use pcss::{
    normalize_resolution, AntiAliasing, CommandBuffer, ExternalTexture, FilterMode, FrameContext,
    FrameSynchronizer, GlobalShaderState, HeadlessAllocator, HeadlessLight, LightEvent,
    LightPlugin, LightState, PcssConfig, PcssKeywords, PcssLight, PcssParameters, PixelFormat,
    PluginRegistry, QualitySettings, RenderTargetAllocator, ShaderGlobals, ShadowLight,
    ShadowRenderTarget, ShadowResourceManager, TargetDescriptor, TargetHandle, TargetUpdate,
};

#[cfg(feature = "gpu")]
pub use context::WgpuContext;

#[cfg(feature = "gpu")]
pub use gpu::{CommandExecutor, GpuShaderGlobals, WgpuTargetAllocator};

// Re-export glam for convenience
pub use glam;
