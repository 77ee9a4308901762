//! # Lighting Compositor
//!
//! Backend-agnostic rendering of the light registry on top of a finished
//! 2D frame.
//!
//! ## Architecture
//!
//! - [`backend`]: the [`RenderBackend`] trait and the handle and value types
//!   crossing it
//! - [`viewport`]: world to screen to texture-coordinate mapping and culling
//! - [`sprite`]: host sprites seen by the normal-map and surface-map passes
//! - [`compositor`]: light selection, batch packing, auxiliary passes and bloom
//! - [`recording`]: headless backend that records commands
//!
//! The compositor never aborts the host. Unsupported capabilities, failed
//! program loads and failed validations disable the affected stage and are
//! logged.

pub mod backend;
pub mod compositor;
pub mod recording;
pub mod sprite;
pub mod viewport;

use thiserror::Error;

pub use backend::{
    BackendCapabilities, BackendResult, ProgramHandle, ProgramKind, RenderBackend, RenderTargetBinding,
    RenderTargetDesc, RenderTargetHandle, SpriteLayer, StencilMode, TextureHandle, TextureSource, UniformValue,
};
pub use compositor::{FrameStats, LightCompositor};
pub use recording::{BackendCommand, RecordingBackend};
pub use sprite::SurfaceSprite;
pub use viewport::Viewport;

/// High-level rendering error types
///
/// Backends translate their API-specific failures into these variants. The
/// compositor turns every one of them into a disabled stage plus a log line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A program or pipeline stage could not be set up
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A texture, render target or program could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A linked program failed validation against the current state
    #[error("Program validation failed for {program}: {log}")]
    ValidationFailed {
        /// Program name
        program: String,
        /// Driver info log
        log: String,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The backend lacks a required capability
    #[error("Unsupported: {0}")]
    Unsupported(String),
}
