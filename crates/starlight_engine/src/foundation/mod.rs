//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and planar geometry helpers
//! - Collections and stable handles
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
