//! Sprites drawn by the auxiliary passes

use crate::foundation::math::Vec2;

/// A host sprite as seen by the normal-map and surface-map passes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSprite {
    /// World-space center
    pub location: Vec2,
    /// Cull radius in world units
    pub radius: f32,
    /// Rotation in degrees
    pub angle: f32,
    /// Mirrored along x
    pub flip_horizontal: bool,
    /// Mirrored along y
    pub flip_vertical: bool,
    /// Normal map strength, `None` without a normal map
    pub normal_depth: Option<f32>,
    /// Has a surface map
    pub has_surface_map: bool,
    /// Has a custom silhouette that must mask its rectangle
    pub custom_bounds: bool,
    /// Wreck rather than a live ship
    pub hulk: bool,
    /// Hidden from lighting
    pub do_not_render: bool,
}

impl SurfaceSprite {
    /// A plain sprite at `location` with no maps
    pub fn new(location: Vec2, radius: f32) -> Self {
        Self {
            location,
            radius,
            angle: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            normal_depth: None,
            has_surface_map: false,
            custom_bounds: false,
            hulk: false,
            do_not_render: false,
        }
    }

    /// Set rotation (builder)
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Give the sprite a normal map of `depth` strength (builder)
    pub fn with_normal_map(mut self, depth: f32) -> Self {
        self.normal_depth = Some(depth);
        self
    }

    /// Give the sprite a surface map (builder)
    pub fn with_surface_map(mut self) -> Self {
        self.has_surface_map = true;
        self
    }

    /// Mask the sprite by its custom silhouette (builder)
    pub fn with_custom_bounds(mut self) -> Self {
        self.custom_bounds = true;
        self
    }

    /// Flatness sent to the normal transform.
    ///
    /// Sprites without a normal map get 2, which the shader treats as flat.
    pub fn flatness(&self, normal_flatness: f32) -> f32 {
        self.normal_depth
            .map_or(2.0, |depth| 1.0 - (1.0 - normal_flatness) * depth)
    }

    /// `data` uniform: angle, flatness, horizontal flip, vertical flip
    pub fn transform_data(&self, normal_flatness: f32) -> [f32; 4] {
        [
            self.angle,
            self.flatness(normal_flatness),
            if self.flip_horizontal { -1.0 } else { 1.0 },
            if self.flip_vertical { -1.0 } else { 1.0 },
        ]
    }
}
