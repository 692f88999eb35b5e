//! Derived shader parameters.

use glam::Vec4;

use crate::pcss::config::{ExternalTexture, PcssConfig, QualitySettings};
use crate::pcss::globals::{names, PcssKeywords, ShaderGlobals, TextureRef};

/// Threshold above which the softness falloff path is enabled.
pub const FALLOFF_EPSILON: f32 = f32::EPSILON;

/// Highest sample count served by the 32-tap Poisson disk.
const POISSON_32_MAX: u32 = 32;
/// Lowest sample count served by the 64-tap Poisson disk.
const POISSON_64_MIN: u32 = 34;

/// Shader-global values derived from a [`PcssConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcssParameters {
    /// Blocker search samples.
    pub blocker_samples: i32,
    /// PCF samples.
    pub pcf_samples: i32,
    /// `softness / 64 / sqrt(shadow_distance)`.
    pub softness: f32,
    /// `exp(softness_falloff)`.
    pub softness_falloff: f32,
    /// Static gradient bias.
    pub static_gradient_bias: f32,
    /// Blocker gradient bias.
    pub blocker_gradient_bias: f32,
    /// PCF gradient bias.
    pub pcf_gradient_bias: f32,
    /// Cascade blend distance.
    pub cascade_blend_distance: f32,
    /// Enabled shader keywords.
    pub keywords: PcssKeywords,
    /// Noise texture and its reciprocal size, if configured.
    pub noise: Option<(ExternalTexture, Vec4)>,
}

impl PcssParameters {
    /// Derive parameters from `config`, clamped into its valid ranges.
    ///
    /// `quality.shadow_distance` must be positive; otherwise softness is NaN or infinite.
    pub fn derive(config: &PcssConfig, quality: &QualitySettings) -> Self {
        let config = config.sanitized();
        let max_samples = config.blocker_sample_count.max(config.pcf_sample_count);

        let mut keywords = PcssKeywords::empty();
        keywords.set(
            PcssKeywords::USE_FALLOFF,
            config.softness_falloff > FALLOFF_EPSILON,
        );
        keywords.set(
            PcssKeywords::USE_CASCADE_BLENDING,
            config.cascade_blend_distance > 0.0,
        );
        keywords.set(
            PcssKeywords::USE_STATIC_BIAS,
            config.max_static_gradient_bias > 0.0,
        );
        keywords.set(
            PcssKeywords::USE_BLOCKER_BIAS,
            config.blocker_gradient_bias > 0.0,
        );
        keywords.set(PcssKeywords::USE_PCF_BIAS, config.pcf_gradient_bias > 0.0);
        keywords.set(
            PcssKeywords::ORTHOGRAPHIC_SUPPORTED,
            config.support_orthographic,
        );
        keywords |= poisson_tier(max_samples);

        let noise = config.noise_texture.map(|texture| {
            let coords = Vec4::new(
                1.0 / texture.width as f32,
                1.0 / texture.height as f32,
                0.0,
                0.0,
            );
            (texture, coords)
        });

        Self {
            blocker_samples: config.blocker_sample_count as i32,
            pcf_samples: config.pcf_sample_count as i32,
            softness: config.softness / 64.0 / quality.shadow_distance.sqrt(),
            softness_falloff: config.softness_falloff.exp(),
            static_gradient_bias: config.max_static_gradient_bias,
            blocker_gradient_bias: config.blocker_gradient_bias,
            pcf_gradient_bias: config.pcf_gradient_bias,
            cascade_blend_distance: config.cascade_blend_distance,
            keywords,
            noise,
        }
    }

    /// Write every parameter into `globals`.
    ///
    /// The noise globals are only written when a noise texture is configured.
    pub fn publish(&self, globals: &mut dyn ShaderGlobals) {
        globals.set_int(names::BLOCKER_SAMPLES, self.blocker_samples);
        globals.set_int(names::PCF_SAMPLES, self.pcf_samples);

        globals.set_float(names::SOFTNESS, self.softness);
        globals.set_float(names::SOFTNESS_FALLOFF, self.softness_falloff);

        globals.set_float(names::STATIC_GRADIENT_BIAS, self.static_gradient_bias);
        globals.set_float(names::BLOCKER_GRADIENT_BIAS, self.blocker_gradient_bias);
        globals.set_float(names::PCF_GRADIENT_BIAS, self.pcf_gradient_bias);
        globals.set_float(names::CASCADE_BLEND_DISTANCE, self.cascade_blend_distance);

        if let Some((texture, coords)) = self.noise {
            globals.set_vector(names::NOISE_COORDS, coords);
            globals.set_texture(names::NOISE_TEXTURE, TextureRef::External(texture));
        }

        globals.set_keywords(self.keywords);
    }

    /// Pack the scalar parameters for a uniform buffer.
    pub fn to_uniform(&self) -> PcssUniform {
        PcssUniform {
            noise_coords: self.noise.map_or([0.0; 4], |(_, coords)| coords.to_array()),
            blocker_samples: self.blocker_samples,
            pcf_samples: self.pcf_samples,
            softness: self.softness,
            softness_falloff: self.softness_falloff,
            static_gradient_bias: self.static_gradient_bias,
            blocker_gradient_bias: self.blocker_gradient_bias,
            pcf_gradient_bias: self.pcf_gradient_bias,
            cascade_blend_distance: self.cascade_blend_distance,
            keywords: self.keywords.bits(),
            _padding: [0; 3],
        }
    }
}

// A max of exactly 33 selects neither tier; the shader relies on that.
fn poisson_tier(max_samples: u32) -> PcssKeywords {
    if max_samples <= POISSON_32_MAX {
        PcssKeywords::POISSON_32
    } else if max_samples >= POISSON_64_MIN {
        PcssKeywords::POISSON_64
    } else {
        PcssKeywords::empty()
    }
}

/// PCSS globals laid out for a uniform buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PcssUniform {
    /// `(1/width, 1/height, 0, 0)` of the noise texture.
    pub noise_coords: [f32; 4],
    /// Blocker search samples.
    pub blocker_samples: i32,
    /// PCF samples.
    pub pcf_samples: i32,
    /// Normalized softness.
    pub softness: f32,
    /// Exponential falloff.
    pub softness_falloff: f32,
    /// Static gradient bias.
    pub static_gradient_bias: f32,
    /// Blocker gradient bias.
    pub blocker_gradient_bias: f32,
    /// PCF gradient bias.
    pub pcf_gradient_bias: f32,
    /// Cascade blend distance.
    pub cascade_blend_distance: f32,
    /// [`PcssKeywords`] bits.
    pub keywords: u32,
    pub _padding: [u32; 3],
}
