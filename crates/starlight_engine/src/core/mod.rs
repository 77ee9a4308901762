//! # Core Engine Module
//!
//! Shared abstractions used by every subsystem.
//!
//! ## Organization
//!
//! - **Config**: lighting toggles, budgets, bloom tiers and shader locations

pub mod config;

// Re-export commonly used config types
pub use config::{
    LightingConfig,
    ShaderConfig,
    Config,
    ConfigError,
};
