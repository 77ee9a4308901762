//! Preset spawner
//!
//! Turns catalog presets into lights for projectiles, impacts and beams.
//! The caller owns the host objects and passes in their ids and positions;
//! spawned lights are returned for insertion into the registry.

use rand::Rng;

use crate::core::config::LightingConfig;
use crate::foundation::math::{rotate_offset, Vec2};
use crate::lighting::attachment::{BeamId, EntityId};
use crate::lighting::catalog::{LightEntry, LightPreset};
use crate::lighting::light::Light;

/// Size class of the platform that fired a weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformClass {
    /// Smallest class; presets flagged `fighter_dim` are dimmed
    Fighter,
    /// Any larger hull
    #[default]
    Ship,
}

/// Multipliers applied to spawned presets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnScale {
    /// Intensity multiplier
    pub intensity: f32,
    /// Size multiplier
    pub size: f32,
}

impl Default for SpawnScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SpawnScale {
    /// No scaling
    pub const IDENTITY: Self = Self { intensity: 1.0, size: 1.0 };

    /// Create a scale
    pub fn new(intensity: f32, size: f32) -> Self {
        Self { intensity, size }
    }

    /// Same factor for intensity and size
    pub fn uniform(factor: f32) -> Self {
        Self::new(factor, factor)
    }

    /// Compose two scales
    pub fn then(self, other: Self) -> Self {
        Self::new(self.intensity * other.intensity, self.size * other.size)
    }

    fn apply(self, light: Light, preset: &LightPreset) -> Light {
        light
            .with_intensity(preset.intensity * self.intensity)
            .with_size(preset.size * self.size)
            .with_color(preset.color)
    }
}

/// Config values the spawner reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnSettings {
    /// Dim factor for fighter-fired presets
    pub fighter_brightness_scale: f32,
    /// Height of weapon and impact lights
    pub weapon_light_height: f32,
    /// Height of muzzle flashes
    pub weapon_flash_height: f32,
}

impl From<&LightingConfig> for SpawnSettings {
    fn from(config: &LightingConfig) -> Self {
        Self {
            fighter_brightness_scale: config.fighter_brightness_scale,
            weapon_light_height: config.weapon_light_height,
            weapon_flash_height: config.weapon_flash_height,
        }
    }
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self::from(&LightingConfig::default())
    }
}

impl SpawnSettings {
    /// Platform dimming for `entry` fired from `platform`
    pub fn platform_scale(&self, entry: &LightEntry, platform: PlatformClass) -> SpawnScale {
        if platform == PlatformClass::Fighter && entry.fighter_dim {
            SpawnScale::uniform(self.fighter_brightness_scale)
        } else {
            SpawnScale::IDENTITY
        }
    }
}

/// A freshly fired projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    /// Projectile entity the standard light follows
    pub entity: EntityId,
    /// Current location
    pub location: Vec2,
    /// Facing in degrees
    pub facing_degrees: f32,
    /// Class of the firing platform
    pub platform: PlatformClass,
}

/// A beam that just started firing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSpawn {
    /// Beam the lights follow
    pub beam: BeamId,
    /// Class of the firing platform
    pub platform: PlatformClass,
    /// Extra category factor, e.g. for unusually bright weapon systems
    pub scale: SpawnScale,
}

/// Roll a spawn chance
pub fn roll_chance<R: Rng + ?Sized>(chance: f32, rng: &mut R) -> bool {
    rng.gen::<f32>() <= chance
}

/// Lights for a newly fired projectile.
///
/// The standard preset follows the projectile, offset behind it, and fades
/// out over its fadeout once released. The flash preset is placed behind the
/// firing point along the facing and starts fading immediately. Each rolls
/// the entry's chance on its own.
pub fn projectile_lights<R: Rng + ?Sized>(
    entry: &LightEntry,
    spawn: &ProjectileSpawn,
    settings: &SpawnSettings,
    rng: &mut R,
) -> Vec<Light> {
    let scale = settings.platform_scale(entry, spawn.platform);
    let mut lights = Vec::new();

    if let Some(preset) = &entry.standard {
        if roll_chance(entry.chance, rng) {
            let mut light = scale.apply(Light::point(spawn.location), preset);
            light.attach_to(spawn.entity, Vec2::new(-preset.offset, 0.0));
            light.set_auto_fade_out_time(preset.fadeout);
            light.set_height(settings.weapon_light_height);
            lights.push(light);
        }
    }

    if let Some(preset) = &entry.flash {
        if roll_chance(entry.chance, rng) {
            let location = rotate_offset(spawn.location, Vec2::new(-preset.offset, 0.0), spawn.facing_degrees);
            let mut light = scale.apply(Light::point(location), preset);
            light.fade_out(preset.fadeout);
            light.set_height(settings.weapon_flash_height);
            lights.push(light);
        }
    }

    lights
}

/// Scale for an impact flash given the projectile's attached light.
///
/// A projectile whose standard light has partly faded produces a
/// proportionally weaker impact.
pub fn impact_factor(entry: &LightEntry, attached_intensity: f32) -> f32 {
    match &entry.standard {
        Some(preset) if preset.intensity > 0.0 => attached_intensity / preset.intensity,
        _ => 1.0,
    }
}

/// Impact flash at `location`, scaled by `factor` in intensity, size and
/// fadeout. Returns `None` when the entry has no hit preset.
///
/// Callers decide whether the flash happens at all, usually with
/// [`roll_chance`] unless the projectile carried a light.
pub fn impact_light(
    entry: &LightEntry,
    location: Vec2,
    settings: &SpawnSettings,
    platform: PlatformClass,
    factor: f32,
) -> Option<Light> {
    let preset = entry.hit.as_ref()?;
    let scale = settings.platform_scale(entry, platform).then(SpawnScale::uniform(factor));

    let mut light = scale.apply(Light::point(location), preset);
    light.fade_out(preset.fadeout * factor);
    light.set_height(settings.weapon_light_height);
    Some(light)
}

/// Lights for a beam that just started firing.
///
/// One chance roll covers all three presets. Every light is permanent and
/// lives until the beam is released from the registry.
pub fn beam_lights<R: Rng + ?Sized>(
    entry: &LightEntry,
    spawn: &BeamSpawn,
    settings: &SpawnSettings,
    rng: &mut R,
) -> Vec<Light> {
    if !roll_chance(entry.chance, rng) {
        return Vec::new();
    }

    let scale = settings.platform_scale(entry, spawn.platform).then(spawn.scale);
    let mut lights = Vec::new();

    if let Some(preset) = &entry.standard {
        let mut light = scale.apply(Light::line(Vec2::zeros(), Vec2::zeros()), preset);
        light.attach_to_beam(spawn.beam);
        light.set_height(settings.weapon_light_height);
        light.make_permanent();
        lights.push(light);
    }

    if let Some(preset) = &entry.flash {
        let mut light = scale.apply(Light::point(Vec2::zeros()), preset);
        light.link_to_beam(spawn.beam, false);
        light.set_height(settings.weapon_flash_height);
        light.make_permanent();
        lights.push(light);
    }

    if let Some(preset) = &entry.hit {
        let mut light = scale.apply(Light::point(Vec2::zeros()), preset);
        light.link_to_beam(spawn.beam, true);
        light.set_height(settings.weapon_light_height);
        light.make_permanent();
        lights.push(light);
    }

    lights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::lighting::attachment::{Attachment, BeamState, EmptyScene, EntityState, SceneQuery, SceneSnapshot};
    use crate::lighting::light::LightKind;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn preset(size: f32, intensity: f32, fadeout: f32, offset: f32) -> LightPreset {
        LightPreset { size, intensity, color: Vec3::new(1.0, 0.5, 0.0), fadeout, offset }
    }

    fn full_entry() -> LightEntry {
        LightEntry {
            standard: Some(preset(60.0, 1.0, 0.4, 12.0)),
            hit: Some(preset(120.0, 2.0, 0.5, 0.0)),
            flash: Some(preset(80.0, 1.5, 0.1, 8.0)),
            chance: 1.0,
            fighter_dim: true,
        }
    }

    fn spawn(platform: PlatformClass) -> ProjectileSpawn {
        ProjectileSpawn {
            entity: EntityId(1),
            location: Vec2::new(100.0, 0.0),
            facing_degrees: 0.0,
            platform,
        }
    }

    #[test]
    fn test_projectile_lights() {
        let mut rng = StdRng::seed_from_u64(7);
        let settings = SpawnSettings::default();
        let lights = projectile_lights(&full_entry(), &spawn(PlatformClass::Ship), &settings, &mut rng);
        assert_eq!(lights.len(), 2);

        let standard = &lights[0];
        assert_eq!(standard.attachment(), Attachment::Entity { id: EntityId(1), offset: Vec2::new(-12.0, 0.0) });
        assert_relative_eq!(standard.auto_fade_out_time(), 0.4);
        assert_relative_eq!(standard.height(), settings.weapon_light_height);
        assert!(!standard.is_fading_out());

        let mut scene = SceneSnapshot::new();
        scene.set_entity(EntityId(1), EntityState::new(Vec2::new(100.0, 0.0), 0.0));
        assert_relative_eq!(standard.location(&scene).x, 88.0, epsilon = 1e-4);

        let flash = &lights[1];
        assert_relative_eq!(flash.location(&EmptyScene).x, 92.0, epsilon = 1e-4);
        assert!(flash.is_fading_out());
        assert_relative_eq!(flash.height(), settings.weapon_flash_height);
    }

    #[test]
    fn test_zero_chance_spawns_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut entry = full_entry();
        entry.chance = -1.0;
        let settings = SpawnSettings::default();

        assert!(projectile_lights(&entry, &spawn(PlatformClass::Ship), &settings, &mut rng).is_empty());
        let beam = BeamSpawn { beam: BeamId(1), platform: PlatformClass::Ship, scale: SpawnScale::IDENTITY };
        assert!(beam_lights(&entry, &beam, &settings, &mut rng).is_empty());
    }

    #[test]
    fn test_fighter_dim() {
        let mut rng = StdRng::seed_from_u64(3);
        let settings = SpawnSettings { fighter_brightness_scale: 0.5, ..SpawnSettings::default() };

        let lights = projectile_lights(&full_entry(), &spawn(PlatformClass::Fighter), &settings, &mut rng);
        assert_relative_eq!(lights[0].intensity(), 0.5);
        assert_relative_eq!(lights[0].size(), 30.0);

        let mut undimmed = full_entry();
        undimmed.fighter_dim = false;
        let lights = projectile_lights(&undimmed, &spawn(PlatformClass::Fighter), &settings, &mut rng);
        assert_relative_eq!(lights[0].intensity(), 1.0);
    }

    #[test]
    fn test_impact_light_scaled() {
        let entry = full_entry();
        let factor = impact_factor(&entry, 0.5);
        assert_relative_eq!(factor, 0.5);

        let light = impact_light(&entry, Vec2::new(5.0, 5.0), &SpawnSettings::default(), PlatformClass::Ship, factor)
            .unwrap();
        assert_relative_eq!(light.intensity(), 1.0);
        assert_relative_eq!(light.size(), 60.0);
        assert!(light.is_fading_out());

        let mut no_hit = entry;
        no_hit.hit = None;
        assert!(impact_light(&no_hit, Vec2::zeros(), &SpawnSettings::default(), PlatformClass::Ship, 1.0).is_none());
    }

    #[test]
    fn test_beam_lights() {
        let mut rng = StdRng::seed_from_u64(11);
        let spawn = BeamSpawn { beam: BeamId(9), platform: PlatformClass::Ship, scale: SpawnScale::new(0.5, 2.0) };
        let lights = beam_lights(&full_entry(), &spawn, &SpawnSettings::default(), &mut rng);
        assert_eq!(lights.len(), 3);

        assert_eq!(lights[0].kind(), LightKind::Line);
        assert_eq!(lights[0].attachment(), Attachment::BeamOrigin(BeamId(9)));
        assert_relative_eq!(lights[0].intensity(), 0.5);
        assert_relative_eq!(lights[0].size(), 120.0);

        assert_eq!(lights[1].attachment(), Attachment::BeamLink { beam: BeamId(9), far_end: false });
        assert_eq!(lights[2].attachment(), Attachment::BeamLink { beam: BeamId(9), far_end: true });
        assert!(lights.iter().all(|light| light.remaining_max_age().is_none()));

        let mut scene = SceneSnapshot::new();
        scene.set_beam(BeamId(9), BeamState::new(Vec2::zeros(), Vec2::new(10.0, 0.0), 1.0));
        assert!(scene.beam(BeamId(9)).is_some());
        assert_relative_eq!(lights[2].effective_intensity(&scene), 0.0);
    }
}
