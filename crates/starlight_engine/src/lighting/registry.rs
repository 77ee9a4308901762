//! Light registry and per-tick advancer
//!
//! The registry is the one mutable collection shared by light producers, the
//! frame advancer and the compositor. Producers insert during simulation, the
//! advancer prunes once per tick, and the compositor only reads.

use crate::foundation::collections::{HandleMap, LightHandle};
use crate::lighting::attachment::{Attachment, BeamId, EntityId, EntityState, SceneQuery};
use crate::lighting::light::Light;
use crate::foundation::math::rotate_offset;

/// Insertion-ordered collection of active lights
#[derive(Debug, Clone, Default)]
pub struct LightRegistry {
    lights: HandleMap<Light>,
    order: Vec<LightHandle>,
}

impl LightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a light. The same light value may be inserted more than once.
    pub fn insert(&mut self, light: Light) -> LightHandle {
        let handle = self.lights.insert(light);
        self.order.push(handle);
        handle
    }

    /// Remove a light. Stale handles are ignored.
    pub fn remove(&mut self, handle: LightHandle) -> Option<Light> {
        let light = self.lights.remove(handle)?;
        self.order.retain(|&h| h != handle);
        Some(light)
    }

    /// Borrow a light
    pub fn get(&self, handle: LightHandle) -> Option<&Light> {
        self.lights.get(handle)
    }

    /// Mutably borrow a light
    pub fn get_mut(&mut self, handle: LightHandle) -> Option<&mut Light> {
        self.lights.get_mut(handle)
    }

    /// Whether `handle` refers to a live light
    pub fn contains(&self, handle: LightHandle) -> bool {
        self.lights.contains_key(handle)
    }

    /// Iterate lights in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (LightHandle, &Light)> + '_ {
        self.order
            .iter()
            .filter_map(move |&handle| self.lights.get(handle).map(|light| (handle, light)))
    }

    /// Number of lights
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every light
    pub fn clear(&mut self) {
        self.lights.clear();
        self.order.clear();
    }

    /// Advance every light by `dt` and drop the spent ones.
    ///
    /// Lights are advanced in insertion order and marked; the sweep then
    /// compacts the order in one pass. Returns the number removed.
    pub fn advance_all(&mut self, dt: f32, scene: &dyn SceneQuery) -> usize {
        let mut spent = Vec::new();
        for &handle in &self.order {
            if let Some(light) = self.lights.get_mut(handle) {
                if light.advance(dt, scene) {
                    spent.push(handle);
                }
            }
        }

        if spent.is_empty() {
            return 0;
        }

        for &handle in &spent {
            self.lights.remove(handle);
        }
        let lights = &self.lights;
        self.order.retain(|&handle| lights.contains_key(handle));

        log::trace!("Pruned {} spent lights, {} remain", spent.len(), self.order.len());
        spent.len()
    }

    /// Untether every light attached to `entity` at the entity's last known
    /// state and fade it out over its auto fade-out time.
    ///
    /// Returns the number of lights released.
    pub fn release_entity(&mut self, entity: EntityId, last: EntityState) -> usize {
        let mut released = 0;
        for light in self.lights.values_mut() {
            if let Attachment::Entity { id, offset } = light.attachment() {
                if id == entity {
                    let location = rotate_offset(last.location, offset, last.facing_degrees);
                    light.set_location(location);
                    light.set_location2(location);
                    light.unattach();
                    light.fade_out(light.auto_fade_out_time());
                    released += 1;
                }
            }
        }
        released
    }

    /// Remove every light tethered to `beam`. Returns the number removed.
    pub fn release_beam(&mut self, beam: BeamId) -> usize {
        let tethered: Vec<LightHandle> = self
            .iter()
            .filter(|(_, light)| light.attachment().beam() == Some(beam))
            .map(|(handle, _)| handle)
            .collect();

        for &handle in &tethered {
            self.lights.remove(handle);
        }
        if !tethered.is_empty() {
            let lights = &self.lights;
            self.order.retain(|&handle| lights.contains_key(handle));
        }
        tethered.len()
    }
}

/// Lighting state for one combat session
///
/// Created when the session starts and dropped when it ends, so no lights
/// leak between sessions.
#[derive(Debug, Clone, Default)]
pub struct LightingSession {
    registry: LightRegistry,
    paused: bool,
}

impl LightingSession {
    /// Start a session with an empty registry
    pub fn new() -> Self {
        log::debug!("Lighting session started");
        Self::default()
    }

    /// Shared registry
    pub fn registry(&self) -> &LightRegistry {
        &self.registry
    }

    /// Shared registry, mutably
    pub fn registry_mut(&mut self) -> &mut LightRegistry {
        &mut self.registry
    }

    /// Whether simulation time is stopped
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop or resume simulation time
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advance every light by `dt`. Does nothing while paused.
    /// Returns the number of lights removed.
    pub fn advance(&mut self, dt: f32, scene: &dyn SceneQuery) -> usize {
        if self.paused {
            return 0;
        }
        self.registry.advance_all(dt, scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;
    use crate::lighting::attachment::{BeamState, EmptyScene, SceneSnapshot};

    fn lit(x: f32) -> Light {
        Light::point(Vec2::new(x, 0.0)).with_size(10.0).with_intensity(1.0)
    }

    #[test]
    fn test_insert_remove_order() {
        let mut registry = LightRegistry::new();
        let a = registry.insert(lit(1.0));
        let b = registry.insert(lit(2.0));
        let c = registry.insert(lit(1.0));
        assert_eq!(registry.len(), 3);

        assert!(registry.remove(b).is_some());
        assert!(registry.remove(b).is_none());

        let order: Vec<LightHandle> = registry.iter().map(|(h, _)| h).collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn test_advance_prunes_spent() {
        let mut registry = LightRegistry::new();
        let keep = registry.insert(lit(0.0));
        let mut fading = lit(1.0);
        fading.fade_out(0.5);
        registry.insert(fading);
        registry.insert(Light::point(Vec2::zeros()).with_intensity(1.0));

        let removed = registry.advance_all(0.5, &EmptyScene);
        assert_eq!(removed, 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(keep));
    }

    #[test]
    fn test_paused_session_is_noop() {
        let mut session = LightingSession::new();
        for i in 0..5 {
            let mut light = lit(i as f32);
            light.set_velocity(Vec2::new(1.0, 1.0));
            light.fade_out(0.1);
            session.registry_mut().insert(light);
        }
        let before: Vec<(LightHandle, Light)> =
            session.registry().iter().map(|(h, l)| (h, l.clone())).collect();

        session.set_paused(true);
        assert_eq!(session.advance(1.0, &EmptyScene), 0);

        let after: Vec<(LightHandle, Light)> =
            session.registry().iter().map(|(h, l)| (h, l.clone())).collect();
        assert_eq!(before, after);

        session.set_paused(false);
        assert_eq!(session.advance(1.0, &EmptyScene), 5);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_release_entity_untethers_and_fades() {
        let mut registry = LightRegistry::new();
        let mut attached = lit(0.0);
        attached.attach_to(EntityId(4), Vec2::new(10.0, 0.0));
        attached.set_auto_fade_out_time(0.25);
        let handle = registry.insert(attached);
        registry.insert(lit(5.0));

        let released = registry.release_entity(EntityId(4), EntityState::new(Vec2::new(100.0, 0.0), 0.0));
        assert_eq!(released, 1);

        let light = registry.get(handle).unwrap();
        assert_eq!(light.attachment(), Attachment::None);
        assert!(light.is_fading_out());
        assert_eq!(light.location(&EmptyScene), Vec2::new(110.0, 0.0));

        assert_eq!(registry.advance_all(0.25, &EmptyScene), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_release_beam_removes_tethered() {
        let beam = BeamId(2);
        let mut scene = SceneSnapshot::new();
        scene.set_beam(beam, BeamState::new(Vec2::zeros(), Vec2::new(50.0, 0.0), 1.0));

        let mut registry = LightRegistry::new();
        let mut span = lit(0.0);
        span.attach_to_beam(beam);
        let mut tip = lit(0.0);
        tip.link_to_beam(beam, true);
        registry.insert(span);
        registry.insert(tip);
        let other = registry.insert(lit(1.0));

        assert_eq!(registry.release_beam(beam), 2);
        let remaining: Vec<LightHandle> = registry.iter().map(|(h, _)| h).collect();
        assert_eq!(remaining, vec![other]);
    }
}
