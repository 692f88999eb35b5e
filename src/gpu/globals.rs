//! Shader globals backed by a uniform buffer

use glam::Vec4;

use crate::context::WgpuContext;
use crate::pcss::globals::{names, PcssKeywords, ShaderGlobals, TextureRef};
use crate::pcss::headless::GlobalShaderState;
use crate::pcss::params::PcssUniform;

/// [`ShaderGlobals`] sink that mirrors the PCSS globals into a GPU uniform.
///
/// Writes land in CPU memory; [`flush`](Self::flush) uploads them once per frame.
pub struct GpuShaderGlobals {
    state: GlobalShaderState,
    buffer: wgpu::Buffer,
}

impl GpuShaderGlobals {
    /// Create the uniform buffer on `ctx`.
    pub fn new(ctx: &WgpuContext) -> Self {
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pcss globals uniform"),
            size: std::mem::size_of::<PcssUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            state: GlobalShaderState::new(),
            buffer,
        }
    }

    /// The uniform buffer consumer shaders bind.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// CPU-side view of every global written so far.
    pub fn state(&self) -> &GlobalShaderState {
        &self.state
    }

    /// Texture bound to a global slot.
    pub fn texture(&self, name: &str) -> Option<TextureRef> {
        self.state.texture(name)
    }

    /// Pack the current globals.
    pub fn uniform(&self) -> PcssUniform {
        let int = |name: &str| self.state.int(name).unwrap_or_default();
        let float = |name: &str| self.state.float(name).unwrap_or_default();

        let keywords = PcssKeywords::all()
            .iter_names()
            .filter(|(name, _)| self.state.keyword_enabled(name))
            .fold(PcssKeywords::empty(), |acc, (_, flag)| acc | flag);

        PcssUniform {
            noise_coords: self
                .state
                .vector(names::NOISE_COORDS)
                .unwrap_or(Vec4::ZERO)
                .to_array(),
            blocker_samples: int(names::BLOCKER_SAMPLES),
            pcf_samples: int(names::PCF_SAMPLES),
            softness: float(names::SOFTNESS),
            softness_falloff: float(names::SOFTNESS_FALLOFF),
            static_gradient_bias: float(names::STATIC_GRADIENT_BIAS),
            blocker_gradient_bias: float(names::BLOCKER_GRADIENT_BIAS),
            pcf_gradient_bias: float(names::PCF_GRADIENT_BIAS),
            cascade_blend_distance: float(names::CASCADE_BLEND_DISTANCE),
            keywords: keywords.bits(),
            _padding: [0; 3],
        }
    }

    /// Upload the current globals.
    pub fn flush(&self, ctx: &WgpuContext) {
        ctx.queue
            .write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.uniform()));
    }
}

impl ShaderGlobals for GpuShaderGlobals {
    fn set_int(&mut self, name: &str, value: i32) {
        self.state.set_int(name, value);
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.state.set_float(name, value);
    }

    fn set_vector(&mut self, name: &str, value: Vec4) {
        self.state.set_vector(name, value);
    }

    fn set_texture(&mut self, name: &str, texture: TextureRef) {
        self.state.set_texture(name, texture);
    }

    fn set_keyword(&mut self, keyword: &str, enabled: bool) {
        self.state.set_keyword(keyword, enabled);
    }
}
