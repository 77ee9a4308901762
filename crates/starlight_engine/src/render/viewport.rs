//! Camera view used for culling and screen-space packing

use crate::foundation::math::{segments_intersect, Vec2};

/// The visible world rectangle and its mapping onto the screen texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// World-space lower-left corner of the view
    pub lower_left: Vec2,
    /// World-space size of the view
    pub visible_size: Vec2,
    /// World units per screen pixel (zoom)
    pub view_mult: f32,
    /// Screen pixels per logical pixel (UI scaling)
    pub screen_scale: f32,
    /// Internal screen texture size in pixels
    pub target_size: Vec2,
}

impl Viewport {
    /// Create a viewport with unit screen scale
    pub fn new(lower_left: Vec2, visible_size: Vec2, view_mult: f32, target_size: Vec2) -> Self {
        Self {
            lower_left,
            visible_size,
            view_mult,
            screen_scale: 1.0,
            target_size,
        }
    }

    /// A view centered on `center` showing `screen_pixels` at `view_mult` zoom,
    /// rendered into a texture of the same size.
    pub fn centered(center: Vec2, screen_pixels: Vec2, view_mult: f32) -> Self {
        let visible_size = screen_pixels * view_mult;
        Self::new(center - visible_size * 0.5, visible_size, view_mult, screen_pixels)
    }

    /// Set the UI scale (builder)
    pub fn with_screen_scale(mut self, screen_scale: f32) -> Self {
        self.screen_scale = screen_scale;
        self
    }

    /// World position to screen pixels
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.lower_left) / self.view_mult * self.screen_scale
    }

    /// Screen pixels to screen texture coordinates
    pub fn screen_to_uv(&self, screen: Vec2) -> Vec2 {
        screen.component_div(&self.target_size)
    }

    /// World position straight to texture coordinates
    pub fn world_to_uv(&self, world: Vec2) -> Vec2 {
        self.screen_to_uv(self.world_to_screen(world))
    }

    /// A world-space length as a fraction of the texture height
    pub fn units_to_uv(&self, units: f32) -> f32 {
        units / (self.target_size.y * self.view_mult)
    }

    /// Whether a circle of `radius` around `point` touches the view
    pub fn is_near(&self, point: Vec2, radius: f32) -> bool {
        let (min, max) = self.expanded(radius);
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Whether the segment `a`-`b`, thickened by `radius`, touches the view
    pub fn is_segment_near(&self, a: Vec2, b: Vec2, radius: f32) -> bool {
        if self.is_near(a, radius) || self.is_near(b, radius) {
            return true;
        }

        let (min, max) = self.expanded(radius);
        let corners = [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ];
        (0..corners.len()).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % corners.len()]))
    }

    fn expanded(&self, radius: f32) -> (Vec2, Vec2) {
        let pad = Vec2::new(radius, radius);
        (self.lower_left - pad, self.lower_left + self.visible_size + pad)
    }
}
