//! Per-frame light selection
//!
//! Lights are ranked with directional lights first and everything else by
//! descending size, then walked in that order: line lights past their cap and
//! lights outside the view are dropped until the frame budget is full.
//! Lights with a NaN size rank last and are never selected.

use std::cmp::Ordering;

use crate::core::config::LightingConfig;
use crate::lighting::{Light, LightKind, LightRegistry, SceneQuery};
use crate::render::viewport::Viewport;

/// Most lights the data texture can carry in one frame
pub const HARD_CAPACITY: usize = 372;

/// Limits applied while selecting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionLimits {
    /// Lights per frame before the hard capacity
    pub max_lights: usize,
    /// Line lights per frame
    pub max_line_lights: usize,
    /// Multiplier on light sizes for culling
    pub size_scale: f32,
}

impl SelectionLimits {
    /// Effective frame budget
    pub fn capacity(&self) -> usize {
        self.max_lights.min(HARD_CAPACITY)
    }
}

impl From<&LightingConfig> for SelectionLimits {
    fn from(config: &LightingConfig) -> Self {
        Self {
            max_lights: config.max_lights,
            max_line_lights: config.max_line_lights,
            size_scale: config.size_scale,
        }
    }
}

/// Lights chosen for one frame, in draw order
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    /// Selected lights
    pub lights: Vec<&'a Light>,
    /// How many of them are line lights
    pub line_lights: usize,
    /// Lights considered before the budget filled
    pub considered: usize,
}

impl Selection<'_> {
    /// Number of selected lights
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

fn rank(a: &Light, b: &Light) -> Ordering {
    let a_directional = a.kind() == LightKind::Directional;
    let b_directional = b.kind() == LightKind::Directional;
    b_directional
        .cmp(&a_directional)
        .then_with(|| rank_size(b).total_cmp(&rank_size(a)))
}

fn rank_size(light: &Light) -> f32 {
    let size = light.size();
    if size.is_nan() {
        f32::NEG_INFINITY
    } else {
        size
    }
}

/// Pick this frame's lights from `registry`.
///
/// The sort is stable, so equal-ranked lights keep insertion order.
pub fn select_lights<'a>(
    registry: &'a LightRegistry,
    scene: &dyn SceneQuery,
    viewport: &Viewport,
    limits: &SelectionLimits,
) -> Selection<'a> {
    let mut candidates: Vec<&Light> = registry.iter().map(|(_, light)| light).collect();
    candidates.sort_by(|a, b| rank(a, b));

    let capacity = limits.capacity();
    let mut selection = Selection::default();
    if capacity == 0 {
        return selection;
    }

    for light in candidates {
        selection.considered += 1;
        if light.size().is_nan() {
            continue;
        }
        let radius = (light.size() * limits.size_scale).max(0.0);

        let visible = match light.kind() {
            LightKind::Directional => true,
            LightKind::Line => {
                selection.line_lights < limits.max_line_lights
                    && viewport.is_segment_near(light.location(scene), light.location2(scene), radius)
            }
            LightKind::Point | LightKind::Cone => viewport.is_near(light.location(scene), radius),
        };
        if !visible {
            continue;
        }

        if light.kind() == LightKind::Line {
            selection.line_lights += 1;
        }
        selection.lights.push(light);
        if selection.lights.len() >= capacity {
            break;
        }
    }

    selection
}
