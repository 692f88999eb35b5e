//! PCSS light configuration.

use crate::pcss::commands::LightEvent;

/// Default shader-global slot the copied shadow map is bound to.
pub const DEFAULT_SHADOW_MAP_SLOT: &str = "_ShadowMap";

/// Color format of the shadow render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 8-bit single channel.
    R8,
    /// 16-bit float single channel.
    RHalf,
    /// 32-bit float single channel.
    #[default]
    RFloat,
    /// 16-bit float, two channels.
    RGHalf,
    /// 32-bit float, two channels.
    RGFloat,
    /// 8-bit per channel RGBA.
    ARGB32,
    /// 16-bit float RGBA.
    ARGBHalf,
    /// 32-bit float RGBA.
    ARGBFloat,
}

/// Texture filtering applied when the shadow target is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    Point,
    /// Linear within a mip level.
    #[default]
    Bilinear,
    /// Linear within and across mip levels.
    Trilinear,
}

/// MSAA sample count of the shadow target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum AntiAliasing {
    /// Single sample.
    #[default]
    None = 1,
    /// 2x MSAA.
    Two = 2,
    /// 4x MSAA.
    Four = 4,
    /// 8x MSAA.
    Eight = 8,
}

impl AntiAliasing {
    /// Sample count per pixel.
    pub fn samples(self) -> u32 {
        self as u32
    }
}

/// Handle to an externally owned texture (e.g. the blue-noise texture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalTexture {
    /// Host-defined identifier.
    pub id: u64,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

/// Host-global quality settings read (never written) by the light.
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    /// Global shadow draw distance. Must be positive.
    pub shadow_distance: f32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            shadow_distance: 150.0,
        }
    }
}

/// User-tunable PCSS parameters.
///
/// Mutated by the host between frames; the light only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct PcssConfig {
    /// Requested shadow map edge length, snapped to a power of two on use.
    pub resolution: u32,
    /// Push `resolution` into the light's own shadow map instead of the host default.
    pub use_custom_resolution: bool,

    /// Blocker search samples, in `[1, 64]`.
    pub blocker_sample_count: u32,
    /// PCF filter samples, in `[1, 64]`.
    pub pcf_sample_count: u32,

    /// Penumbra scale, in `[0, 7.5]`.
    pub softness: f32,
    /// Penumbra falloff, in `[0, 5]`.
    pub softness_falloff: f32,

    /// Receiver plane minimum fractional error, in `[0, 0.15]`.
    pub max_static_gradient_bias: f32,
    /// Blocker search gradient bias, in `[0, 1]`.
    pub blocker_gradient_bias: f32,
    /// PCF gradient bias, in `[0, 1]`.
    pub pcf_gradient_bias: f32,

    /// Cascade blend range, in `[0, 1]`.
    pub cascade_blend_distance: f32,

    /// Enable the orthographic projection path in the shader.
    pub support_orthographic: bool,

    /// Shadow target color format.
    pub pixel_format: PixelFormat,
    /// Shadow target filtering.
    pub filter_mode: FilterMode,
    /// Shadow target MSAA level.
    pub anti_aliasing: AntiAliasing,

    /// Optional noise texture used to rotate the sampling disk.
    pub noise_texture: Option<ExternalTexture>,

    /// Shader-global slot the copied shadow map is bound to.
    pub shadow_map_slot: String,
    /// Light event the copy commands are attached to.
    pub light_event: LightEvent,
}

impl Default for PcssConfig {
    fn default() -> Self {
        Self {
            resolution: 4096,
            use_custom_resolution: false,
            blocker_sample_count: 16,
            pcf_sample_count: 16,
            softness: 1.0,
            softness_falloff: 4.0,
            max_static_gradient_bias: 0.05,
            blocker_gradient_bias: 0.0,
            pcf_gradient_bias: 1.0,
            cascade_blend_distance: 0.5,
            support_orthographic: false,
            pixel_format: PixelFormat::RFloat,
            filter_mode: FilterMode::Bilinear,
            anti_aliasing: AntiAliasing::None,
            noise_texture: None,
            shadow_map_slot: DEFAULT_SHADOW_MAP_SLOT.to_string(),
            light_event: LightEvent::AfterShadowMap,
        }
    }
}

impl PcssConfig {
    /// Copy with every ranged field clamped into its interval.
    pub fn sanitized(&self) -> Self {
        Self {
            blocker_sample_count: self.blocker_sample_count.clamp(1, 64),
            pcf_sample_count: self.pcf_sample_count.clamp(1, 64),
            softness: clamp_unit(self.softness, 7.5),
            softness_falloff: clamp_unit(self.softness_falloff, 5.0),
            max_static_gradient_bias: clamp_unit(self.max_static_gradient_bias, 0.15),
            blocker_gradient_bias: clamp_unit(self.blocker_gradient_bias, 1.0),
            pcf_gradient_bias: clamp_unit(self.pcf_gradient_bias, 1.0),
            cascade_blend_distance: clamp_unit(self.cascade_blend_distance, 1.0),
            ..self.clone()
        }
    }

    /// Resolution snapped to the closest power of two.
    pub fn normalized_resolution(&self) -> u32 {
        normalize_resolution(self.resolution)
    }

    /// Value for the light's custom shadow resolution; `0` means host default.
    pub fn custom_shadow_resolution(&self) -> u32 {
        if self.use_custom_resolution {
            self.normalized_resolution()
        } else {
            0
        }
    }
}

// NaN collapses to the lower bound.
fn clamp_unit(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// Snap `resolution` to the closest power of two.
///
/// Ties round up (3 -> 4). Zero maps to 1 and values above `2^31` saturate.
pub fn normalize_resolution(resolution: u32) -> u32 {
    if resolution <= 1 {
        return 1;
    }
    if resolution.is_power_of_two() {
        return resolution;
    }
    let Some(next) = resolution.checked_next_power_of_two() else {
        return 1 << 31;
    };
    let prev = next >> 1;
    if resolution - prev < next - resolution {
        prev
    } else {
        next
    }
}
