//! wgpu host services
//!
//! Implementations of the PCSS host traits on top of a [`WgpuContext`]:
//! render target allocation, a uniform-backed shader-global sink and a
//! command executor that performs the raw-depth copy.
//!
//! [`WgpuContext`]: crate::context::WgpuContext

mod allocator;
mod executor;
mod globals;

pub use allocator::{sampler_filters, texture_format, GpuRenderTarget, WgpuTargetAllocator};
pub use executor::CommandExecutor;
pub use globals::GpuShaderGlobals;
