//! # Starlight Engine
//!
//! Real-time additive 2D lighting for a top-down space combat game.
//!
//! ## Features
//!
//! - **Light model**: point, line, cone and directional lights with fading,
//!   lifetimes and attachment to ships, projectiles and beams
//! - **Light catalog**: per-weapon light presets loaded from CSV content files
//! - **Registry**: the per-session light collection, advanced once per tick
//! - **Compositor**: per-frame selection, batch-normalized packing, a
//!   full-screen composite, optional normal-mapped passes and HDR bloom
//! - **Backend agnostic**: everything GPU-side goes through the
//!   [`render::RenderBackend`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use starlight_engine::prelude::*;
//!
//! let mut backend = RecordingBackend::new(1280, 720);
//! let mut compositor = LightCompositor::new(&LightingConfig::default(), &mut backend);
//! let mut session = LightingSession::new();
//!
//! let mut flash = Light::point(Vec2::new(0.0, 0.0)).with_size(150.0).with_intensity(2.0);
//! flash.fade_out(0.5);
//! session.registry_mut().insert(flash);
//!
//! let viewport = Viewport::centered(Vec2::zeros(), Vec2::new(1280.0, 720.0), 1.0);
//! for _ in 0..3 {
//!     session.advance(1.0 / 60.0, &EmptyScene);
//!     compositor.render_frame(&mut backend, session.registry(), &EmptyScene, &viewport, &[]);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;

// Lighting subsystem
pub mod lighting;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, LightingConfig, ShaderConfig},
        foundation::math::{Vec2, Vec3},
        lighting::{
            Attachment, BeamId, EmptyScene, EntityId, Light, LightCatalog, LightDataKind, LightKind, LightRegistry,
            LightingSession, LoadMode, SceneQuery, SceneSnapshot,
        },
        render::{FrameStats, LightCompositor, RecordingBackend, RenderBackend, SurfaceSprite, Viewport},
    };
}
