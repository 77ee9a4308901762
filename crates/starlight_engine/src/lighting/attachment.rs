//! Host objects and light attachment
//!
//! Lights never own the ships, projectiles or beams they follow. They hold an
//! id and read the host's current state through [`SceneQuery`] each time a
//! position or brightness is needed.

use std::collections::HashMap;

use crate::foundation::math::Vec2;

/// Opaque id of a movable host entity (ship, projectile, missile)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Opaque id of a beam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeamId(pub u64);

/// Current state of a host entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    /// World-space location
    pub location: Vec2,
    /// Facing in degrees, counter-clockwise from +x
    pub facing_degrees: f32,
}

impl EntityState {
    /// Create an entity state
    pub fn new(location: Vec2, facing_degrees: f32) -> Self {
        Self { location, facing_degrees }
    }
}

/// Current state of a beam
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamState {
    /// Start of the beam (the emitter)
    pub from: Vec2,
    /// End of the beam (the impact point)
    pub to: Vec2,
    /// Brightness factor, usually 0..1 while the beam charges up or down
    pub brightness: f32,
    /// Whether the beam dealt damage this tick
    pub dealt_damage: bool,
}

impl BeamState {
    /// Create a beam state that has not dealt damage
    pub fn new(from: Vec2, to: Vec2, brightness: f32) -> Self {
        Self { from, to, brightness, dealt_damage: false }
    }

    /// Set the damage flag for this tick
    pub fn with_damage(mut self, dealt_damage: bool) -> Self {
        self.dealt_damage = dealt_damage;
        self
    }
}

/// Read-only view of the host objects lights can follow
pub trait SceneQuery {
    /// State of `id`, or `None` once the entity is gone
    fn entity(&self, id: EntityId) -> Option<EntityState>;

    /// State of `id`, or `None` once the beam is gone
    fn beam(&self, id: BeamId) -> Option<BeamState>;
}

/// Scene with no host objects; every tethered light falls back to its own
/// stored location
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl SceneQuery for EmptyScene {
    fn entity(&self, _id: EntityId) -> Option<EntityState> {
        None
    }

    fn beam(&self, _id: BeamId) -> Option<BeamState> {
        None
    }
}

/// Snapshot of host objects kept in hash maps
///
/// Useful for headless drivers and tests that simulate their own entities.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    entities: HashMap<EntityId, EntityState>,
    beams: HashMap<BeamId, BeamState>,
}

impl SceneSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity
    pub fn set_entity(&mut self, id: EntityId, state: EntityState) {
        self.entities.insert(id, state);
    }

    /// Remove an entity, returning its last state
    pub fn remove_entity(&mut self, id: EntityId) -> Option<EntityState> {
        self.entities.remove(&id)
    }

    /// Insert or replace a beam
    pub fn set_beam(&mut self, id: BeamId, state: BeamState) {
        self.beams.insert(id, state);
    }

    /// Remove a beam, returning its last state
    pub fn remove_beam(&mut self, id: BeamId) -> Option<BeamState> {
        self.beams.remove(&id)
    }

    /// Mutable access to a beam, e.g. to flip its damage flag
    pub fn beam_mut(&mut self, id: BeamId) -> Option<&mut BeamState> {
        self.beams.get_mut(&id)
    }

    /// Mutable access to an entity
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entities.get_mut(&id)
    }
}

impl SceneQuery for SceneSnapshot {
    fn entity(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(&id).copied()
    }

    fn beam(&self, id: BeamId) -> Option<BeamState> {
        self.beams.get(&id).copied()
    }
}

/// What a light follows. At most one binding at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Attachment {
    /// Free-floating, integrates its own velocity
    #[default]
    None,
    /// Rigidly attached to an entity; `offset` rotates with the entity's facing
    Entity {
        /// Host entity
        id: EntityId,
        /// Offset in the entity's local frame
        offset: Vec2,
    },
    /// Spans a beam: location is the beam start, location2 the beam end
    BeamOrigin(BeamId),
    /// Sits on one end of a beam
    BeamLink {
        /// Host beam
        beam: BeamId,
        /// Follow the impact end instead of the emitter end
        far_end: bool,
    },
}

impl Attachment {
    /// Whether the light follows anything
    pub fn is_tethered(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Beam this attachment reads, if any
    pub fn beam(&self) -> Option<BeamId> {
        match *self {
            Self::BeamOrigin(beam) | Self::BeamLink { beam, .. } => Some(beam),
            Self::None | Self::Entity { .. } => None,
        }
    }

    /// Entity this attachment reads, if any
    pub fn entity(&self) -> Option<EntityId> {
        match *self {
            Self::Entity { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Number of ticks the beam damage window remembers
pub const DAMAGE_WINDOW_TICKS: usize = 4;

/// Trailing window of per-tick beam damage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageWindow {
    frames: [bool; DAMAGE_WINDOW_TICKS],
    cursor: usize,
}

impl DamageWindow {
    /// Record one tick, evicting the oldest
    pub fn record(&mut self, dealt_damage: bool) {
        self.frames[self.cursor] = dealt_damage;
        self.cursor = (self.cursor + 1) % DAMAGE_WINDOW_TICKS;
    }

    /// Whether any remembered tick dealt damage
    pub fn any(&self) -> bool {
        self.frames.iter().any(|&frame| frame)
    }

    /// Forget every recorded tick
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_window_expires() {
        let mut window = DamageWindow::default();
        assert!(!window.any());

        window.record(true);
        assert!(window.any());

        for _ in 0..DAMAGE_WINDOW_TICKS - 1 {
            window.record(false);
            assert!(window.any());
        }

        window.record(false);
        assert!(!window.any());
    }

    #[test]
    fn test_attachment_accessors() {
        let beam = BeamId(3);
        assert_eq!(Attachment::BeamLink { beam, far_end: true }.beam(), Some(beam));
        assert_eq!(Attachment::BeamOrigin(beam).beam(), Some(beam));
        assert!(!Attachment::None.is_tethered());

        let entity = Attachment::Entity { id: EntityId(1), offset: Vec2::zeros() };
        assert_eq!(entity.entity(), Some(EntityId(1)));
        assert_eq!(entity.beam(), None);
    }

    #[test]
    fn test_snapshot_lookup() {
        let mut scene = SceneSnapshot::new();
        scene.set_entity(EntityId(7), EntityState::new(Vec2::new(1.0, 2.0), 90.0));
        assert_eq!(scene.entity(EntityId(7)).map(|e| e.location), Some(Vec2::new(1.0, 2.0)));

        scene.remove_entity(EntityId(7));
        assert!(scene.entity(EntityId(7)).is_none());
        assert!(EmptyScene.beam(BeamId(0)).is_none());
    }
}
