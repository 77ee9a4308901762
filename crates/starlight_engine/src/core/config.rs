//! # Unified Configuration System
//!
//! Every tunable the lighting subsystem reads lives here. The compositor reads
//! a [`LightingConfig`] once at construction and caches it; changing the file
//! afterwards has no effect until the next session.
//!
//! ## Configuration Categories
//!
//! - **Feature toggles**: lights, bloom, normal maps
//! - **Budgets**: maximum composited lights and line lights
//! - **Scales**: size/intensity multipliers, fighter dimming, light heights
//! - **Bloom**: quality tier, mip reduction, scale and strength
//! - **Shaders**: where backends look for program sources

use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::render::backend::ProgramKind;

pub use crate::config::{Config, ConfigError};

/// Lowest and highest bloom quality tier
pub const BLOOM_QUALITY_RANGE: (u32, u32) = (1, 5);

/// Lowest and highest bloom mip reduction count
pub const BLOOM_MIPS_RANGE: (u32, u32) = (1, 5);

/// # Lighting Configuration
///
/// Named scalar and boolean toggles for the lighting compositor. Missing
/// keys in a config file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Master switch for the compositor
    pub enable_lights: bool,
    /// HDR bloom post-process (also needs backend support)
    pub enable_bloom: bool,
    /// Normal-map and surface-map auxiliary passes
    pub enable_normal_maps: bool,
    /// Lights composited per frame, before the hard capacity
    pub max_lights: usize,
    /// Line lights composited per frame
    pub max_line_lights: usize,
    /// Multiplier on every light's size
    pub size_scale: f32,
    /// Multiplier on every light's intensity
    pub intensity_scale: f32,
    /// Dim factor applied to presets spawned by the smallest platform class
    pub fighter_brightness_scale: f32,
    /// Bloom blur width tier, 1..=5 (5, 7, 9, 11 or 13 taps)
    pub bloom_quality: u32,
    /// Bloom targets are `2^(bloom_mips - 1)` times smaller than the screen
    pub bloom_mips: u32,
    /// Bloom blur radius multiplier
    pub bloom_scale: f32,
    /// Bloom glow strength
    pub bloom_intensity: f32,
    /// Global specular strength for normal-mapped lighting
    pub specular_intensity: f32,
    /// Specular exponent control, 0..1
    pub specular_hardness: f32,
    /// Flattens normal maps; 0 keeps them as authored
    pub normal_flatness: f32,
    /// Minimum light height as a fraction of its size
    pub light_depth: f32,
    /// Height of lights spawned for weapon projectiles and beams
    pub weapon_light_height: f32,
    /// Height of muzzle-flash lights
    pub weapon_flash_height: f32,
    /// Skip hulks in the normal-map pass
    pub optimize_normals: bool,
    /// Re-validate backend programs every frame instead of once
    pub validate_every_frame: bool,
    /// Shader source locations
    pub shaders: ShaderConfig,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enable_lights: true,
            enable_bloom: true,
            enable_normal_maps: false,
            max_lights: 100,
            max_line_lights: 50,
            size_scale: 2.0,
            intensity_scale: 0.5,
            fighter_brightness_scale: 1.0,
            bloom_quality: 5,
            bloom_mips: 2,
            bloom_scale: 1.0,
            bloom_intensity: 0.5,
            specular_intensity: 2.5,
            specular_hardness: 0.85,
            normal_flatness: 0.0,
            light_depth: 0.2,
            weapon_light_height: 25.0,
            weapon_flash_height: 50.0,
            optimize_normals: false,
            validate_every_frame: false,
            shaders: ShaderConfig::default(),
        }
    }
}

impl LightingConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable bloom
    pub fn with_bloom(mut self, enabled: bool) -> Self {
        self.enable_bloom = enabled;
        self
    }

    /// Enable or disable the normal-map passes
    pub fn with_normal_maps(mut self, enabled: bool) -> Self {
        self.enable_normal_maps = enabled;
        self
    }

    /// Set the per-frame light budgets
    pub fn with_light_budget(mut self, max_lights: usize, max_line_lights: usize) -> Self {
        self.max_lights = max_lights;
        self.max_line_lights = max_line_lights;
        self
    }

    /// Set size and intensity multipliers
    pub fn with_scales(mut self, size_scale: f32, intensity_scale: f32) -> Self {
        self.size_scale = size_scale;
        self.intensity_scale = intensity_scale;
        self
    }

    /// Set bloom quality tier and mip reduction
    pub fn with_bloom_quality(mut self, quality: u32, mips: u32) -> Self {
        self.bloom_quality = quality;
        self.bloom_mips = mips;
        self
    }

    /// Re-validate programs every frame
    pub fn with_validate_every_frame(mut self, enabled: bool) -> Self {
        self.validate_every_frame = enabled;
        self
    }

    /// Copy with tiers clamped into their accepted ranges and negative
    /// scales raised to zero
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.bloom_quality = config.bloom_quality.clamp(BLOOM_QUALITY_RANGE.0, BLOOM_QUALITY_RANGE.1);
        config.bloom_mips = config.bloom_mips.clamp(BLOOM_MIPS_RANGE.0, BLOOM_MIPS_RANGE.1);
        config.size_scale = config.size_scale.max(0.0);
        config.intensity_scale = config.intensity_scale.max(0.0);
        config.fighter_brightness_scale = config.fighter_brightness_scale.max(0.0);
        config
    }

    /// Number of bloom taps selected by the quality tier
    pub fn bloom_taps(&self) -> u32 {
        let tier = self.bloom_quality.clamp(BLOOM_QUALITY_RANGE.0, BLOOM_QUALITY_RANGE.1);
        3 + 2 * tier
    }

    /// Bloom render targets are this many times smaller than the screen
    pub fn bloom_divisor(&self) -> u32 {
        let mips = self.bloom_mips.clamp(BLOOM_MIPS_RANGE.0, BLOOM_MIPS_RANGE.1);
        1 << (mips - 1)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lights == 0 {
            return Err(ConfigError::Invalid("max_lights must be at least 1".to_string()));
        }

        let scales = [
            ("size_scale", self.size_scale),
            ("intensity_scale", self.intensity_scale),
            ("fighter_brightness_scale", self.fighter_brightness_scale),
            ("bloom_scale", self.bloom_scale),
            ("bloom_intensity", self.bloom_intensity),
            ("light_depth", self.light_depth),
        ];
        for (name, value) in scales {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }

        if !(BLOOM_QUALITY_RANGE.0..=BLOOM_QUALITY_RANGE.1).contains(&self.bloom_quality) {
            return Err(ConfigError::Invalid(format!(
                "bloom_quality must be in {}..={}, got {}",
                BLOOM_QUALITY_RANGE.0, BLOOM_QUALITY_RANGE.1, self.bloom_quality
            )));
        }
        if !(BLOOM_MIPS_RANGE.0..=BLOOM_MIPS_RANGE.1).contains(&self.bloom_mips) {
            return Err(ConfigError::Invalid(format!(
                "bloom_mips must be in {}..={}, got {}",
                BLOOM_MIPS_RANGE.0, BLOOM_MIPS_RANGE.1, self.bloom_mips
            )));
        }

        Ok(())
    }
}

impl Config for LightingConfig {}

/// # Shader Configuration
///
/// Where disk-backed backends find program sources. Each program is a
/// vertex/fragment pair named after [`ProgramKind::file_stems`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory holding the shader sources
    pub shader_dir: PathBuf,
    /// Vertex shader file extension
    pub vertex_extension: String,
    /// Fragment shader file extension
    pub fragment_extension: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("data/shaders"),
            vertex_extension: "vert".to_string(),
            fragment_extension: "frag".to_string(),
        }
    }
}

impl ShaderConfig {
    /// Create a shader configuration rooted at `shader_dir`
    pub fn new(shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            shader_dir: shader_dir.into(),
            ..Self::default()
        }
    }

    /// Vertex and fragment source paths for `kind`
    pub fn program_paths(&self, kind: ProgramKind) -> (PathBuf, PathBuf) {
        let (vertex, fragment) = kind.file_stems();
        (
            self.shader_dir.join(format!("{vertex}.{}", self.vertex_extension)),
            self.shader_dir.join(format!("{fragment}.{}", self.fragment_extension)),
        )
    }
}
