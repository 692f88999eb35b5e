//! Shader-global namespace
//!
//! Shader globals are process-wide: every light writing them shares one
//! namespace and the last writer of a frame wins. Texture slots can be made
//! unique per light through [`PcssConfig::shadow_map_slot`]; scalar globals
//! cannot, so only one PCSS light's parameters are authoritative at a time.
//!
//! [`PcssConfig::shadow_map_slot`]: crate::pcss::PcssConfig::shadow_map_slot

use bitflags::bitflags;
use glam::Vec4;

use crate::pcss::config::ExternalTexture;
use crate::pcss::resource::TargetHandle;

/// Names of the globals consumed by the PCSS shader.
pub mod names {
    /// Blocker search sample count (int).
    pub const BLOCKER_SAMPLES: &str = "Blocker_Samples";
    /// PCF sample count (int).
    pub const PCF_SAMPLES: &str = "PCF_Samples";
    /// Normalized softness (float).
    pub const SOFTNESS: &str = "Softness";
    /// Exponential falloff (float).
    pub const SOFTNESS_FALLOFF: &str = "SoftnessFalloff";
    /// Static gradient bias (float).
    pub const STATIC_GRADIENT_BIAS: &str = "RECEIVER_PLANE_MIN_FRACTIONAL_ERROR";
    /// Blocker gradient bias (float).
    pub const BLOCKER_GRADIENT_BIAS: &str = "Blocker_GradientBias";
    /// PCF gradient bias (float).
    pub const PCF_GRADIENT_BIAS: &str = "PCF_GradientBias";
    /// Cascade blend distance (float).
    pub const CASCADE_BLEND_DISTANCE: &str = "CascadeBlendDistance";
    /// Reciprocal noise texture size (vector).
    pub const NOISE_COORDS: &str = "NoiseCoords";
    /// Noise texture (texture).
    pub const NOISE_TEXTURE: &str = "_NoiseTexture";
}

bitflags! {
    /// Feature keywords toggling shader variants.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PcssKeywords: u32 {
        const USE_FALLOFF            = 1 << 0;
        const USE_CASCADE_BLENDING   = 1 << 1;
        const USE_STATIC_BIAS        = 1 << 2;
        const USE_BLOCKER_BIAS       = 1 << 3;
        const USE_PCF_BIAS           = 1 << 4;
        const ORTHOGRAPHIC_SUPPORTED = 1 << 5;
        const POISSON_32             = 1 << 6;
        const POISSON_64             = 1 << 7;
    }
}

/// Texture bound to a global slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRef {
    /// Texture owned by the host.
    External(ExternalTexture),
    /// Render target owned by a shadow resource manager.
    Target(TargetHandle),
}

/// Write-only sink for shader globals.
pub trait ShaderGlobals {
    /// Set an integer global.
    fn set_int(&mut self, name: &str, value: i32);
    /// Set a float global.
    fn set_float(&mut self, name: &str, value: f32);
    /// Set a vector global.
    fn set_vector(&mut self, name: &str, value: Vec4);
    /// Bind a texture global.
    fn set_texture(&mut self, name: &str, texture: TextureRef);
    /// Enable or disable a feature keyword.
    fn set_keyword(&mut self, keyword: &str, enabled: bool);

    /// Apply every known keyword: enable those in `keywords`, disable the rest.
    fn set_keywords(&mut self, keywords: PcssKeywords) {
        for (name, flag) in PcssKeywords::all().iter_names() {
            self.set_keyword(name, keywords.contains(flag));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct KeywordLog(Vec<(String, bool)>);

    impl ShaderGlobals for KeywordLog {
        fn set_int(&mut self, _: &str, _: i32) {}
        fn set_float(&mut self, _: &str, _: f32) {}
        fn set_vector(&mut self, _: &str, _: Vec4) {}
        fn set_texture(&mut self, _: &str, _: TextureRef) {}
        fn set_keyword(&mut self, keyword: &str, enabled: bool) {
            self.0.push((keyword.to_string(), enabled));
        }
    }

    #[test]
    fn test_set_keywords_touches_every_keyword() {
        let mut log = KeywordLog::default();
        log.set_keywords(PcssKeywords::USE_FALLOFF | PcssKeywords::POISSON_64);

        assert_eq!(log.0.len(), 8);
        assert!(log.0.contains(&("USE_FALLOFF".to_string(), true)));
        assert!(log.0.contains(&("POISSON_64".to_string(), true)));
        assert!(log.0.contains(&("POISSON_32".to_string(), false)));
        assert!(log.0.contains(&("ORTHOGRAPHIC_SUPPORTED".to_string(), false)));
    }
}
