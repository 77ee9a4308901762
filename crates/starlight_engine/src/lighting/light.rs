//! Light objects
//!
//! A [`Light`] is one of four fixed kinds with its own motion, attachment and
//! fade state. Geometry that depends on a host object is resolved lazily
//! through a [`SceneQuery`], so the light itself only stores ids.

use crate::foundation::math::{normalize_degrees, rotate_offset, Vec2, Vec3};
use crate::lighting::attachment::{Attachment, BeamId, DamageWindow, EntityId, SceneQuery};

/// Seconds a light survives before the leak guard removes it
pub const DEFAULT_MAX_AGE: f32 = 60.0;

/// Default fade-out duration once a lifetime runs out
pub const DEFAULT_AUTO_FADE_OUT_TIME: f32 = 1.0;

/// Default height above the playfield for normal-mapped shading
pub const DEFAULT_HEIGHT: f32 = 200.0;

/// Light kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Radial light around one location
    Point,
    /// Light along the segment from location to location2
    Line,
    /// Point light restricted to an arc
    Cone,
    /// Scene-wide light from a direction (like starlight)
    Directional,
}

/// Intensity fade state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fade {
    /// Not fading
    Steady,
    /// Rising towards `target`
    FadingIn {
        /// Intensity to settle at
        target: f32,
        /// Intensity gained per second
        rate: f32,
        /// Seconds until the target is reached
        remaining: f32,
    },
    /// Falling towards zero
    FadingOut {
        /// Intensity lost per second
        rate: f32,
        /// Seconds until the intensity reaches zero
        remaining: f32,
    },
}

/// A light source
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    kind: LightKind,
    location: Vec2,
    location2: Vec2,
    velocity: Vec2,
    velocity2: Vec2,
    direction: Vec3,
    arc_start: f32,
    arc_end: f32,
    color: Vec3,
    size: f32,
    intensity: f32,
    specular_intensity: f32,
    specular_multiplier: f32,
    height: f32,
    fade: Fade,
    lifetime: Option<f32>,
    auto_fade_out_time: f32,
    max_age: Option<f32>,
    attachment: Attachment,
    damage: DamageWindow,
}

impl Light {
    fn new(kind: LightKind) -> Self {
        Self {
            kind,
            location: Vec2::zeros(),
            location2: Vec2::zeros(),
            velocity: Vec2::zeros(),
            velocity2: Vec2::zeros(),
            direction: Vec3::new(0.0, 0.0, -1.0),
            arc_start: 0.0,
            arc_end: 0.0,
            color: Vec3::new(1.0, 1.0, 1.0),
            size: 0.0,
            intensity: 0.0,
            specular_intensity: 0.0,
            specular_multiplier: 1.0,
            height: DEFAULT_HEIGHT,
            fade: Fade::Steady,
            lifetime: None,
            auto_fade_out_time: DEFAULT_AUTO_FADE_OUT_TIME,
            max_age: Some(DEFAULT_MAX_AGE),
            attachment: Attachment::None,
            damage: DamageWindow::default(),
        }
    }

    /// Create a point light at `location`
    pub fn point(location: Vec2) -> Self {
        let mut light = Self::new(LightKind::Point);
        light.location = location;
        light
    }

    /// Create a line light from `from` to `to`
    pub fn line(from: Vec2, to: Vec2) -> Self {
        let mut light = Self::new(LightKind::Line);
        light.location = from;
        light.location2 = to;
        light
    }

    /// Create a cone light at `location` covering the arc from `arc_start`
    /// to `arc_end` degrees
    pub fn cone(location: Vec2, arc_start: f32, arc_end: f32) -> Self {
        let mut light = Self::new(LightKind::Cone);
        light.location = location;
        light.set_arc(arc_start, arc_end);
        light
    }

    /// Create a directional light shining along `direction`
    pub fn directional(direction: Vec3) -> Self {
        let mut light = Self::new(LightKind::Directional);
        light.set_direction(direction);
        light
    }

    /// Set intensity (builder)
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Set size (builder)
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Set color from unit floats (builder)
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    // ===== Mutators =====

    /// Set the stored location. Tethered lights keep it as a fallback for
    /// when their host disappears.
    pub fn set_location(&mut self, location: Vec2) {
        self.location = location;
    }

    /// Set the stored secondary endpoint (line lights)
    pub fn set_location2(&mut self, location: Vec2) {
        self.location2 = location;
    }

    /// Set velocity. Ignored while tethered.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        if !self.attachment.is_tethered() {
            self.velocity = velocity;
        }
    }

    /// Set the secondary endpoint's velocity. Ignored while tethered.
    pub fn set_velocity2(&mut self, velocity: Vec2) {
        if !self.attachment.is_tethered() {
            self.velocity2 = velocity;
        }
    }

    /// Set color from unit floats
    pub fn set_color(&mut self, red: f32, green: f32, blue: f32) {
        self.color = Vec3::new(red, green, blue);
    }

    /// Set color from 8-bit channels
    pub fn set_color_rgb8(&mut self, red: u8, green: u8, blue: u8) {
        self.color = Vec3::new(
            f32::from(red) / 255.0,
            f32::from(green) / 255.0,
            f32::from(blue) / 255.0,
        );
    }

    /// Set size in world units
    pub fn set_size(&mut self, size: f32) {
        self.size = size;
    }

    /// Set raw intensity
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Set height above the playfield
    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    /// Set specular intensity (directional lights)
    pub fn set_specular_intensity(&mut self, intensity: f32) {
        self.specular_intensity = intensity;
    }

    /// Set specular multiplier (point lights)
    pub fn set_specular_multiplier(&mut self, multiplier: f32) {
        self.specular_multiplier = multiplier;
    }

    /// Set direction; stored normalized. A zero vector is ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(unit) = direction.try_normalize(f32::EPSILON) {
            self.direction = unit;
        }
    }

    /// Set the cone arc; both angles are wrapped into `[0, 360)`
    pub fn set_arc(&mut self, start: f32, end: f32) {
        self.arc_start = normalize_degrees(start);
        self.arc_end = normalize_degrees(end);
    }

    /// Change the attachment offset. No effect unless attached to an entity.
    pub fn set_offset(&mut self, offset: Vec2) {
        if let Attachment::Entity { offset: current, .. } = &mut self.attachment {
            *current = offset;
        }
    }

    /// Attach rigidly to `entity` at `offset` in its local frame
    pub fn attach_to(&mut self, entity: EntityId, offset: Vec2) {
        self.attachment = Attachment::Entity { id: entity, offset };
    }

    /// Span `beam` from its start to its end, brightness-modulated
    pub fn attach_to_beam(&mut self, beam: BeamId) {
        self.attachment = Attachment::BeamOrigin(beam);
        self.damage.reset();
    }

    /// Sit on one end of `beam`
    pub fn link_to_beam(&mut self, beam: BeamId, far_end: bool) {
        self.attachment = Attachment::BeamLink { beam, far_end };
        self.damage.reset();
    }

    /// Drop any attachment
    pub fn unattach(&mut self) {
        self.attachment = Attachment::None;
    }

    /// Fade in over `seconds`, starting from zero up to the current intensity.
    ///
    /// A non-positive duration completes an in-progress fade-in immediately
    /// and otherwise does nothing.
    pub fn fade_in(&mut self, seconds: f32) {
        if seconds <= 0.0 {
            if let Fade::FadingIn { target, .. } = self.fade {
                self.intensity = target;
                self.fade = Fade::Steady;
            }
        } else {
            self.fade = Fade::FadingIn {
                target: self.intensity,
                rate: self.intensity / seconds,
                remaining: seconds,
            };
            self.intensity = 0.0;
        }
    }

    /// Fade out over `seconds`. A non-positive duration zeroes intensity.
    pub fn fade_out(&mut self, seconds: f32) {
        if seconds <= 0.0 {
            self.intensity = 0.0;
            self.fade = Fade::FadingOut { rate: 0.0, remaining: 0.0 };
        } else {
            self.fade = Fade::FadingOut {
                rate: self.intensity / seconds,
                remaining: seconds,
            };
        }
    }

    /// Start a countdown that fades the light out once it expires.
    /// A negative value clears it. Only counts down while not fading.
    pub fn set_lifetime(&mut self, seconds: f32) {
        self.lifetime = (seconds >= 0.0).then_some(seconds);
    }

    /// Fade-out duration used when the lifetime expires
    pub fn set_auto_fade_out_time(&mut self, seconds: f32) {
        self.auto_fade_out_time = seconds;
    }

    /// Hard age ceiling; a negative value disables it
    pub fn set_max_age(&mut self, seconds: f32) {
        self.max_age = (seconds >= 0.0).then_some(seconds);
    }

    /// Clear both the lifetime and the age ceiling
    pub fn make_permanent(&mut self) {
        self.lifetime = None;
        self.max_age = None;
    }

    // ===== Per-tick update =====

    /// Advance timers, motion and fades by `dt` seconds.
    ///
    /// Returns `true` when the light is spent or has outlived its age
    /// ceiling and should be removed.
    pub fn advance(&mut self, dt: f32, scene: &dyn SceneQuery) -> bool {
        if let Some(beam) = self.attachment.beam() {
            let dealt = scene.beam(beam).is_some_and(|state| state.dealt_damage);
            self.damage.record(dealt);
        }

        if !self.attachment.is_tethered() {
            self.location += self.velocity * dt;
            self.location2 += self.velocity2 * dt;
        }

        match self.fade {
            Fade::FadingOut { rate, remaining } => {
                if dt >= remaining {
                    self.intensity = 0.0;
                    self.fade = Fade::FadingOut { rate, remaining: 0.0 };
                } else {
                    self.intensity -= rate * dt;
                    self.fade = Fade::FadingOut { rate, remaining: remaining - dt };
                }
            }
            Fade::FadingIn { target, rate, remaining } => {
                self.intensity += rate * dt;
                if dt >= remaining || self.intensity >= target {
                    self.intensity = target;
                    self.fade = Fade::Steady;
                } else {
                    self.fade = Fade::FadingIn { target, rate, remaining: remaining - dt };
                }
            }
            Fade::Steady => {
                if let Some(lifetime) = self.lifetime {
                    let left = lifetime - dt;
                    if left < 0.0 {
                        self.lifetime = None;
                        self.fade_out(self.auto_fade_out_time);
                    } else {
                        self.lifetime = Some(left);
                    }
                }
            }
        }

        if let Some(age) = self.max_age {
            let left = age - dt;
            self.max_age = Some(left);
            if left < 0.0 {
                return true;
            }
        }

        self.is_spent()
    }

    /// Whether the light has decayed to nothing
    pub fn is_spent(&self) -> bool {
        match self.kind {
            LightKind::Directional => !(self.intensity > 0.0 || self.specular_intensity > 0.0),
            LightKind::Point | LightKind::Line | LightKind::Cone => !(self.size > 0.0 && self.intensity > 0.0),
        }
    }

    // ===== Queries =====

    /// Light kind
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Current location, following the attachment when its host exists
    pub fn location(&self, scene: &dyn SceneQuery) -> Vec2 {
        match self.attachment {
            Attachment::None => self.location,
            Attachment::Entity { id, offset } => scene
                .entity(id)
                .map_or(self.location, |host| rotate_offset(host.location, offset, host.facing_degrees)),
            Attachment::BeamOrigin(beam) => scene.beam(beam).map_or(self.location, |state| state.from),
            Attachment::BeamLink { beam, far_end } => scene
                .beam(beam)
                .map_or(self.location, |state| if far_end { state.to } else { state.from }),
        }
    }

    /// Current secondary endpoint, following the attachment when its host
    /// exists
    pub fn location2(&self, scene: &dyn SceneQuery) -> Vec2 {
        match self.attachment {
            Attachment::Entity { id, offset } => scene
                .entity(id)
                .map_or(self.location2, |host| rotate_offset(host.location, offset, host.facing_degrees)),
            Attachment::BeamOrigin(beam) => scene.beam(beam).map_or(self.location2, |state| state.to),
            Attachment::None | Attachment::BeamLink { .. } => self.location2,
        }
    }

    /// Own velocity; zero while tethered
    pub fn velocity(&self) -> Vec2 {
        if self.attachment.is_tethered() {
            Vec2::zeros()
        } else {
            self.velocity
        }
    }

    /// Secondary endpoint velocity; zero while tethered
    pub fn velocity2(&self) -> Vec2 {
        if self.attachment.is_tethered() {
            Vec2::zeros()
        } else {
            self.velocity2
        }
    }

    /// Color as unit floats
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Size in world units
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Raw intensity, ignoring any beam modulation
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Intensity as composited.
    ///
    /// Far-end beam links are dark until the beam has dealt damage within the
    /// last few ticks, then scale with beam brightness. Beam spans scale with
    /// brightness. Everything else passes the raw intensity through.
    pub fn effective_intensity(&self, scene: &dyn SceneQuery) -> f32 {
        match self.attachment {
            Attachment::BeamLink { beam, far_end: true } => {
                if !self.damage.any() {
                    return 0.0;
                }
                scene.beam(beam).map_or(self.intensity, |state| self.intensity * state.brightness)
            }
            Attachment::BeamOrigin(beam) => {
                scene.beam(beam).map_or(self.intensity, |state| self.intensity * state.brightness)
            }
            Attachment::None | Attachment::Entity { .. } | Attachment::BeamLink { .. } => self.intensity,
        }
    }

    /// Specular intensity (directional lights)
    pub fn specular_intensity(&self) -> f32 {
        self.specular_intensity
    }

    /// Specular multiplier (point lights)
    pub fn specular_multiplier(&self) -> f32 {
        self.specular_multiplier
    }

    /// Height above the playfield
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Unit direction (directional lights)
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Arc start in degrees, within `[0, 360)`
    pub fn arc_start(&self) -> f32 {
        self.arc_start
    }

    /// Arc end in degrees, within `[0, 360)`
    pub fn arc_end(&self) -> f32 {
        self.arc_end
    }

    /// Current fade state
    pub fn fade(&self) -> Fade {
        self.fade
    }

    /// Whether a fade-in is in progress
    pub fn is_fading_in(&self) -> bool {
        matches!(self.fade, Fade::FadingIn { .. })
    }

    /// Whether the light is fading out
    pub fn is_fading_out(&self) -> bool {
        matches!(self.fade, Fade::FadingOut { .. })
    }

    /// Seconds left before the automatic fade-out, if counting down
    pub fn remaining_lifetime(&self) -> Option<f32> {
        self.lifetime
    }

    /// Fade-out duration used when the lifetime expires
    pub fn auto_fade_out_time(&self) -> f32 {
        self.auto_fade_out_time
    }

    /// Seconds left before forced removal, if bounded
    pub fn remaining_max_age(&self) -> Option<f32> {
        self.max_age
    }

    /// Current attachment
    pub fn attachment(&self) -> Attachment {
        self.attachment
    }
}
