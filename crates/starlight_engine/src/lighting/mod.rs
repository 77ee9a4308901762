//! # Lighting Model
//!
//! Light objects, the registry that holds them, and the catalog of
//! per-weapon presets that spawns them.
//!
//! ## Frame flow
//!
//! Producers insert lights into a [`LightRegistry`] (usually owned by a
//! [`LightingSession`]). Each simulation tick the session advances every
//! light and prunes the spent ones. Each render frame the compositor reads
//! the registry and draws.

pub mod attachment;
pub mod catalog;
pub mod light;
pub mod registry;
pub mod spawner;

pub use attachment::{
    Attachment, BeamId, BeamState, DamageWindow, EmptyScene, EntityId, EntityState, SceneQuery, SceneSnapshot,
};
pub use catalog::{CatalogError, LightCatalog, LightDataKind, LightEntry, LightPreset, LoadMode, LoadReport};
pub use light::{Fade, Light, LightKind};
pub use registry::{LightRegistry, LightingSession};
pub use spawner::{BeamSpawn, PlatformClass, ProjectileSpawn, SpawnScale, SpawnSettings};
